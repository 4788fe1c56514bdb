//! Reading order reconstruction: glyphs → words → lines → text.

use eps_harvest_core::{Glyph, PageLayout};

/// Horizontal gap, relative to glyph height, that separates two words.
const WORD_GAP_RATIO: f64 = 0.15;
/// Vertical distance, relative to glyph height, within which glyphs share a line.
const LINE_TOLERANCE_RATIO: f64 = 0.5;
/// Height assumed for glyphs reported with no vertical extent.
const MIN_GLYPH_HEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Word {
    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(MIN_GLYPH_HEIGHT)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }
}

/// A visual line of text, words ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub words: Vec<Word>,
    pub top: f64,
    pub bottom: f64,
}

impl TextLine {
    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(MIN_GLYPH_HEIGHT)
    }

    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn glyph_height(g: &Glyph) -> f64 {
    g.height().max(MIN_GLYPH_HEIGHT)
}

fn mid_y(g: &Glyph) -> f64 {
    (g.top + g.bottom) / 2.0
}

/// Group a page's glyphs into lines of words, top to bottom.
pub fn lines(page: &PageLayout) -> Vec<TextLine> {
    let mut glyphs: Vec<&Glyph> = page.glyphs.iter().collect();
    glyphs.sort_by(|a, b| mid_y(a).total_cmp(&mid_y(b)).then(a.x0.total_cmp(&b.x0)));

    // Baseline clustering
    let mut rows: Vec<Vec<&Glyph>> = Vec::new();
    let mut row_mid = f64::NEG_INFINITY;
    let mut row_height = 0.0_f64;
    for g in glyphs {
        let tolerance = LINE_TOLERANCE_RATIO * glyph_height(g).max(row_height);
        match rows.last_mut() {
            Some(row) if (mid_y(g) - row_mid).abs() <= tolerance => {
                row.push(g);
                row_height = row_height.max(glyph_height(g));
            }
            _ => {
                rows.push(vec![g]);
                row_mid = mid_y(g);
                row_height = glyph_height(g);
            }
        }
    }

    rows.into_iter()
        .filter_map(|mut row| {
            row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let words = group_words(&row);
            if words.is_empty() {
                return None;
            }
            let top = words.iter().map(|w| w.top).fold(f64::INFINITY, f64::min);
            let bottom = words.iter().map(|w| w.bottom).fold(f64::NEG_INFINITY, f64::max);
            Some(TextLine { words, top, bottom })
        })
        .collect()
}

fn group_words(row: &[&Glyph]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<Word> = None;

    for g in row {
        if g.text.trim().is_empty() {
            words.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(w) if g.x0 - w.x1 <= WORD_GAP_RATIO * glyph_height(g) => {
                w.text.push_str(&g.text);
                w.x1 = w.x1.max(g.x1);
                w.top = w.top.min(g.top);
                w.bottom = w.bottom.max(g.bottom);
            }
            _ => {
                words.extend(current.take());
                current = Some(Word {
                    text: g.text.clone(),
                    x0: g.x0,
                    x1: g.x1,
                    top: g.top,
                    bottom: g.bottom,
                });
            }
        }
    }
    words.extend(current);
    words
}

/// Plain text of a page, one visual line per output line.
pub fn page_text(page: &PageLayout) -> String {
    lines(page)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of the first `max_pages` pages (all pages when `None`), pages
/// separated by a blank line.
pub fn document_text(pages: &[PageLayout], max_pages: Option<usize>) -> String {
    let take = max_pages.unwrap_or(pages.len());
    pages
        .iter()
        .take(take)
        .map(page_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
pub(crate) mod test_support {
    use eps_harvest_core::{Glyph, PageLayout};

    /// Lay out `text` as fixed-width glyphs starting at `(x, top)`.
    pub fn glyph_run(text: &str, x: f64, top: f64) -> Vec<Glyph> {
        const ADVANCE: f64 = 5.0;
        const HEIGHT: f64 = 10.0;
        text.chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| Glyph {
                text: c.to_string(),
                x0: x + i as f64 * ADVANCE,
                x1: x + (i as f64 + 1.0) * ADVANCE,
                top,
                bottom: top + HEIGHT,
            })
            .collect()
    }

    /// A page whose lines are given as `(top, [(x, text), ...])`.
    pub fn page(number: usize, rows: &[(f64, &[(f64, &str)])]) -> PageLayout {
        let glyphs = rows
            .iter()
            .flat_map(|(top, cells)| {
                cells
                    .iter()
                    .flat_map(move |(x, text)| glyph_run(text, *x, *top))
            })
            .collect();
        PageLayout {
            number,
            width: 600.0,
            height: 800.0,
            glyphs,
            rulings: Vec::new(),
        }
    }
}
