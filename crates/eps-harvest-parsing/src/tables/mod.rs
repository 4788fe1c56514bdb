//! Table finding on positioned page layouts.
//!
//! Two flavors are provided. [`TableFlavor::Stream`] infers columns from the
//! whitespace between text runs and suits the borderless tables common in
//! brokerage reports. [`TableFlavor::Lattice`] reads the grid from drawn
//! ruling lines.

use std::fmt;
use std::str::FromStr;

use eps_harvest_core::{PageLayout, RawTable};

mod lattice;
mod stream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableFlavor {
    #[default]
    Stream,
    Lattice,
}

impl fmt::Display for TableFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableFlavor::Stream => write!(f, "stream"),
            TableFlavor::Lattice => write!(f, "lattice"),
        }
    }
}

impl FromStr for TableFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" => Ok(TableFlavor::Stream),
            "lattice" => Ok(TableFlavor::Lattice),
            other => Err(format!(
                "unknown table flavor '{}' (expected 'stream' or 'lattice')",
                other
            )),
        }
    }
}

/// Find every table on a page, top to bottom.
pub fn find_tables(page: &PageLayout, flavor: TableFlavor) -> Vec<RawTable> {
    let tables = match flavor {
        TableFlavor::Stream => stream::find_tables(page),
        TableFlavor::Lattice => lattice::find_tables(page),
    };
    tracing::debug!(
        page = page.number,
        flavor = %flavor,
        tables = tables.len(),
        "tables found"
    );
    tables
}

/// Find tables on every page of a document, in page order.
pub fn find_all_tables(pages: &[PageLayout], flavor: TableFlavor) -> Vec<RawTable> {
    pages
        .iter()
        .flat_map(|page| find_tables(page, flavor))
        .collect()
}

/// Join cell fragments that landed in the same grid slot.
fn push_fragment(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_parse() {
        assert_eq!("stream".parse::<TableFlavor>().unwrap(), TableFlavor::Stream);
        assert_eq!(" Lattice ".parse::<TableFlavor>().unwrap(), TableFlavor::Lattice);
        assert!("camelot".parse::<TableFlavor>().is_err());
        assert_eq!(TableFlavor::Lattice.to_string(), "lattice");
        assert_eq!(TableFlavor::default(), TableFlavor::Stream);
    }

    #[test]
    fn test_push_fragment() {
        let mut slot = None;
        push_fragment(&mut slot, "Lãi cơ bản");
        push_fragment(&mut slot, "trên cổ phiếu");
        assert_eq!(slot.as_deref(), Some("Lãi cơ bản trên cổ phiếu"));
    }
}
