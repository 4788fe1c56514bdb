use eps_harvest_core::{PageLayout, RawTable};

use crate::layout::{self, TextLine};

/// Horizontal gap, relative to line height, that separates two cells.
const COLUMN_GAP_RATIO: f64 = 1.0;
/// Vertical gap, relative to line height, that ends a table region.
const REGION_GAP_RATIO: f64 = 2.0;
const MIN_ROWS: usize = 2;
const MIN_CELLS_PER_ROW: usize = 2;

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    x0: f64,
    x1: f64,
}

struct Row {
    cells: Vec<Cell>,
    top: f64,
    bottom: f64,
}

fn split_cells(line: &TextLine) -> Vec<Cell> {
    let gap = COLUMN_GAP_RATIO * line.height();
    let mut cells: Vec<Cell> = Vec::new();
    for word in &line.words {
        match cells.last_mut() {
            Some(cell) if word.x0 - cell.x1 < gap => {
                cell.text.push(' ');
                cell.text.push_str(&word.text);
                cell.x1 = cell.x1.max(word.x1);
            }
            _ => cells.push(Cell {
                text: word.text.clone(),
                x0: word.x0,
                x1: word.x1,
            }),
        }
    }
    cells
}

/// Borderless table detection.
///
/// Consecutive lines with at least two whitespace-separated cells form a
/// region; the merged horizontal extents of all cells in the region become
/// its columns.
pub(super) fn find_tables(page: &PageLayout) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut region: Vec<Row> = Vec::new();

    for line in layout::lines(page) {
        let cells = split_cells(&line);
        let row = Row {
            cells,
            top: line.top,
            bottom: line.bottom,
        };

        let detached = region
            .last()
            .is_some_and(|prev| row.top - prev.bottom > REGION_GAP_RATIO * line.height());

        if row.cells.len() < MIN_CELLS_PER_ROW || detached {
            tables.extend(build_table(page.number, std::mem::take(&mut region)));
        }
        if row.cells.len() >= MIN_CELLS_PER_ROW {
            region.push(row);
        }
    }
    tables.extend(build_table(page.number, region));
    tables
}

fn build_table(page: usize, region: Vec<Row>) -> Option<RawTable> {
    if region.len() < MIN_ROWS {
        return None;
    }

    let columns = merge_intervals(
        region
            .iter()
            .flat_map(|r| r.cells.iter().map(|c| (c.x0, c.x1)))
            .collect(),
    );

    let rows = region
        .iter()
        .map(|row| {
            let mut out: Vec<Option<String>> = vec![None; columns.len()];
            for cell in &row.cells {
                let center = (cell.x0 + cell.x1) / 2.0;
                let idx = columns
                    .iter()
                    .position(|&(x0, x1)| center >= x0 && center <= x1)
                    .unwrap_or(columns.len() - 1);
                super::push_fragment(&mut out[idx], &cell.text);
            }
            out
        })
        .collect();

    Some(RawTable { page, rows })
}

fn merge_intervals(mut spans: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in spans {
        match merged.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => merged.push((x0, x1)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_support::page;

    fn cell_text(table: &RawTable) -> Vec<Vec<&str>> {
        table
            .rows
            .iter()
            .map(|r| r.iter().map(|c| c.as_deref().unwrap_or("")).collect())
            .collect()
    }

    #[test]
    fn test_borderless_table() {
        let page = page(
            2,
            &[
                (50.0, &[(10.0, "Báo cáo cập nhật")]),
                (
                    100.0,
                    &[(10.0, "Chỉ số"), (200.0, "2022"), (260.0, "2023F"), (320.0, "2024F")],
                ),
                (
                    115.0,
                    &[(10.0, "Doanh thu"), (200.0, "12,345"), (260.0, "13,000"), (320.0, "14,100")],
                ),
                (
                    130.0,
                    &[(10.0, "EPS (VND)"), (200.0, "3,679"), (260.0, "3,993"), (320.0, "4,726")],
                ),
            ],
        );

        let tables = find_tables(&page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 2);
        assert_eq!(
            cell_text(&tables[0]),
            vec![
                vec!["Chỉ số", "2022", "2023F", "2024F"],
                vec!["Doanh thu", "12,345", "13,000", "14,100"],
                vec!["EPS (VND)", "3,679", "3,993", "4,726"],
            ]
        );
    }

    #[test]
    fn test_missing_cell_is_none() {
        let page = page(
            1,
            &[
                (100.0, &[(10.0, "Năm"), (200.0, "2022"), (260.0, "2023F")]),
                (115.0, &[(10.0, "EPS"), (260.0, "3,993")]),
            ],
        );
        let tables = find_tables(&page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[1][1], None);
        assert_eq!(tables[0].rows[1][2].as_deref(), Some("3,993"));
    }

    #[test]
    fn test_distant_regions_are_separate_tables() {
        let page = page(
            1,
            &[
                (100.0, &[(10.0, "A"), (200.0, "1")]),
                (115.0, &[(10.0, "B"), (200.0, "2")]),
                (400.0, &[(10.0, "C"), (200.0, "3")]),
                (415.0, &[(10.0, "D"), (200.0, "4")]),
            ],
        );
        assert_eq!(find_tables(&page).len(), 2);
    }

    #[test]
    fn test_prose_yields_no_table() {
        let page = page(
            1,
            &[
                (100.0, &[(10.0, "Doanh thu quý 3 tăng mạnh")]),
                (115.0, &[(10.0, "nhờ mảng bán lẻ")]),
            ],
        );
        assert!(find_tables(&page).is_empty());
    }

    #[test]
    fn test_merge_intervals() {
        let merged = merge_intervals(vec![(10.0, 20.0), (15.0, 30.0), (40.0, 50.0)]);
        assert_eq!(merged, vec![(10.0, 30.0), (40.0, 50.0)]);
    }
}
