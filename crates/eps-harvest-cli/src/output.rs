use std::io::Write;
use std::path::Path;

use eps_harvest_parsing::EpsRecord;
use owo_colors::OwoColorize;

use crate::batch::BatchSummary;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the records extracted from one report.
pub fn print_records(
    w: &mut dyn Write,
    pdf: &Path,
    records: &[EpsRecord],
    color: ColorMode,
) -> std::io::Result<()> {
    let Some(first) = records.first() else {
        if color.enabled() {
            writeln!(w, "{}", format!("No EPS figures found in {}", pdf.display()).yellow())?;
        } else {
            writeln!(w, "No EPS figures found in {}", pdf.display())?;
        }
        return Ok(());
    };

    let heading = format!(
        "{}  report {}  ({} values)",
        first.sec_code,
        first.report_date,
        records.len()
    );
    if color.enabled() {
        writeln!(w, "{}", heading.bold())?;
    } else {
        writeln!(w, "{}", heading)?;
    }

    for record in records {
        let eps = record.eps_value.to_string();
        let label = if record.is_forecast { "forecast" } else { "actual" };
        if color.enabled() {
            let label = if record.is_forecast {
                label.cyan().to_string()
            } else {
                label.dimmed().to_string()
            };
            writeln!(
                w,
                "  {:<10} {}  {:>10}  {}",
                record.raw_year,
                record.clean_year.bold(),
                eps.green(),
                label
            )?;
        } else {
            writeln!(
                w,
                "  {:<10} {}  {:>10}  {}",
                record.raw_year, record.clean_year, eps, label
            )?;
        }
    }
    Ok(())
}

/// Print the outcome of a batch run.
pub fn print_batch_summary(
    w: &mut dyn Write,
    summary: &BatchSummary,
    csv: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    writeln!(
        w,
        "Processed {} reports, {} rows appended to {}",
        summary.processed,
        summary.records,
        csv.display()
    )?;

    let notes = [
        (summary.empty, "without EPS figures"),
        (summary.failed, "failed"),
        (summary.too_old, "older than the minimum year"),
        (summary.cancelled, "not started (interrupted)"),
    ];
    for (count, what) in notes {
        if count == 0 {
            continue;
        }
        let line = format!("  {} {}", count, what);
        if color.enabled() && what == "failed" {
            writeln!(w, "{}", line.red())?;
        } else if color.enabled() {
            writeln!(w, "{}", line.dimmed())?;
        } else {
            writeln!(w, "{}", line)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eps_harvest_parsing::{EpsValue, ReportDate};

    fn record(raw: &str, clean: &str, eps: i64, forecast: bool) -> EpsRecord {
        EpsRecord {
            raw_year: raw.to_string(),
            clean_year: clean.to_string(),
            eps_value: EpsValue::Integer(eps),
            is_forecast: forecast,
            report_date: ReportDate::from_dmy(15, 6, 2023).unwrap(),
            sec_code: "VHM".to_string(),
            firm: None,
            url: None,
        }
    }

    #[test]
    fn plain_record_listing() {
        let mut out = Vec::new();
        let records = [record("2022", "2022", 3679, false), record("2023F", "2023", 3993, true)];
        print_records(&mut out, Path::new("vhm.pdf"), &records, ColorMode(false)).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "VHM  report 15/06/2023  (2 values)");
        assert!(lines[1].contains("2022") && lines[1].ends_with("3679  actual"));
        assert!(lines[2].starts_with("  2023F") && lines[2].ends_with("forecast"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn empty_listing_names_file() {
        let mut out = Vec::new();
        print_records(&mut out, Path::new("r.pdf"), &[], ColorMode(false)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No EPS figures found in r.pdf\n");
    }

    #[test]
    fn summary_lists_only_nonzero_counts() {
        let summary = BatchSummary {
            processed: 3,
            failed: 1,
            records: 6,
            ..Default::default()
        };
        let mut out = Vec::new();
        print_batch_summary(&mut out, &summary, Path::new("eps.csv"), ColorMode(false)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Processed 3 reports, 6 rows appended to eps.csv"));
        assert!(text.contains("  1 failed"));
        assert!(!text.contains("interrupted"));
    }
}
