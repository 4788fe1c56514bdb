use eps_harvest_core::{PageLayout, RawTable, Ruling};

use crate::layout;

/// Maximum thickness of a ruling, and snapping distance for intersections.
const TOLERANCE: f64 = 2.0;

/// Ruled table detection.
///
/// Horizontal and vertical rulings that touch are grouped into grids. Each
/// grid's distinct vertical x positions and horizontal y positions bound its
/// cells; words are placed in the cell containing their centre.
pub(super) fn find_tables(page: &PageLayout) -> Vec<RawTable> {
    let horizontal: Vec<Ruling> = page
        .rulings
        .iter()
        .copied()
        .filter(|r| r.is_horizontal(TOLERANCE))
        .collect();
    let vertical: Vec<Ruling> = page
        .rulings
        .iter()
        .copied()
        .filter(|r| r.is_vertical(TOLERANCE))
        .collect();

    if horizontal.len() < 2 || vertical.len() < 2 {
        return Vec::new();
    }

    let words: Vec<layout::Word> = layout::lines(page)
        .into_iter()
        .flat_map(|line| line.words)
        .collect();

    let mut grids = connected_grids(&horizontal, &vertical);
    grids.sort_by(|a, b| a.ys[0].total_cmp(&b.ys[0]));

    grids
        .into_iter()
        .filter_map(|grid| grid.fill(page.number, &words))
        .collect()
}

struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Grid {
    fn fill(&self, page: usize, words: &[layout::Word]) -> Option<RawTable> {
        let ncols = self.xs.len().checked_sub(1)?;
        let nrows = self.ys.len().checked_sub(1)?;
        if ncols == 0 || nrows == 0 {
            return None;
        }

        let mut rows: Vec<Vec<Option<String>>> = vec![vec![None; ncols]; nrows];
        for word in words {
            let (cx, cy) = word.center();
            let (Some(col), Some(row)) = (slot(&self.xs, cx), slot(&self.ys, cy)) else {
                continue;
            };
            super::push_fragment(&mut rows[row][col], &word.text);
        }

        Some(RawTable { page, rows })
    }
}

/// Index of the interval of `edges` containing `v`.
fn slot(edges: &[f64], v: f64) -> Option<usize> {
    edges.windows(2).position(|w| v >= w[0] && v <= w[1])
}

fn touches(h: &Ruling, v: &Ruling) -> bool {
    v.x0 >= h.x0 - TOLERANCE
        && v.x0 <= h.x1 + TOLERANCE
        && h.top >= v.top - TOLERANCE
        && h.top <= v.bottom + TOLERANCE
}

/// Group rulings into connected components and derive each grid's edges.
fn connected_grids(horizontal: &[Ruling], vertical: &[Ruling]) -> Vec<Grid> {
    let n = horizontal.len() + vertical.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (hi, h) in horizontal.iter().enumerate() {
        for (vi, v) in vertical.iter().enumerate() {
            if touches(h, v) {
                let a = find(&mut parent, hi);
                let b = find(&mut parent, horizontal.len() + vi);
                parent[a] = b;
            }
        }
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut grids: Vec<(Vec<f64>, Vec<f64>)> = Vec::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let idx = match roots.iter().position(|&r| r == root) {
            Some(idx) => idx,
            None => {
                roots.push(root);
                grids.push((Vec::new(), Vec::new()));
                roots.len() - 1
            }
        };
        if i < horizontal.len() {
            grids[idx].1.push(horizontal[i].top);
        } else {
            grids[idx].0.push(vertical[i - horizontal.len()].x0);
        }
    }

    grids
        .into_iter()
        .map(|(xs, ys)| Grid {
            xs: distinct(xs),
            ys: distinct(ys),
        })
        .filter(|g| g.xs.len() >= 2 && g.ys.len() >= 2)
        .collect()
}

/// Sort and collapse positions closer than the tolerance.
fn distinct(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let mut out: Vec<f64> = Vec::new();
    for v in values {
        if out.last().is_none_or(|last| v - last > TOLERANCE) {
            out.push(v);
        }
    }
    out
}
