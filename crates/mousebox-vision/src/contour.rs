//! Connected foreground region extraction.
//!
//! Rows of the binary mask are run-length encoded, runs touching across
//! adjacent rows (8-connected) are unioned, and each surviving component is
//! reported as a single contour: its exact filled area, its exact bounding
//! extent, and a simplified ordered outer boundary. Only external boundaries
//! are produced; a hole inside a component never yields a contour of its own.

use std::cmp;

use mousebox_types::{BoundingBox, Point};

use crate::mask::ForegroundMask;

/// Minimum filled area (in pixels) a component must cover to survive the
/// noise filter. Fixed, not a pipeline parameter.
pub const MIN_CONTOUR_AREA: u64 = 500;

/// Boundary of one connected foreground region.
#[derive(Debug, Clone)]
pub struct Contour {
    /// Ordered outer boundary, adjacent collinear points collapsed.
    pub points: Vec<Point>,
    /// Filled pixel count of the component.
    pub area: u64,
    /// Minimal axis-aligned rectangle enclosing the component.
    pub bounds: BoundingBox,
}

#[derive(Clone, Copy)]
struct RowRun {
    start: usize,
    end: usize,
    row: usize,
    label: u32,
}

fn runs_touch(a: &RowRun, b: &RowRun) -> bool {
    let overlap = cmp::min(a.end, b.end).saturating_sub(cmp::max(a.start, b.start));
    if overlap > 0 {
        return true;
    }
    let gap = if a.end <= b.start {
        b.start - a.end
    } else {
        a.start - b.end
    };
    gap <= 1
}

/// Extract external contours of every connected foreground component with at
/// least [`MIN_CONTOUR_AREA`] filled pixels.
pub fn extract_contours(mask: &ForegroundMask) -> Vec<Contour> {
    let width = mask.width();
    let height = mask.height();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let data = mask.data();
    let mut runs: Vec<RowRun> = Vec::new();
    let mut offsets = vec![0usize; height + 1];

    let mut cursor = 0usize;
    for row in 0..height {
        offsets[row] = cursor;
        let row_data = &data[row * width..(row + 1) * width];
        let mut x = 0usize;
        while x < width {
            while x < width && row_data[x] == 0 {
                x += 1;
            }
            if x >= width {
                break;
            }
            let start = x;
            while x < width && row_data[x] != 0 {
                x += 1;
            }
            runs.push(RowRun {
                start,
                end: x,
                row,
                label: 0,
            });
            cursor += 1;
        }
    }
    offsets[height] = cursor;

    if runs.is_empty() {
        return Vec::new();
    }

    let mut dsu = DisjointSet::new();
    for run in runs.iter_mut() {
        run.label = dsu.make_set();
    }

    for row in 1..height {
        let mut prev = offsets[row - 1];
        let prev_end = offsets[row];
        let mut curr = offsets[row];
        let curr_end = offsets[row + 1];

        while prev < prev_end && curr < curr_end {
            let run_a = runs[prev];
            let run_b = runs[curr];
            if runs_touch(&run_a, &run_b) {
                dsu.union(run_a.label, run_b.label);
            }
            if run_a.end <= run_b.end {
                prev += 1;
            } else {
                curr += 1;
            }
        }
    }

    let mut components: Vec<Option<ComponentBuilder>> = vec![None; dsu.len()];
    for run in runs.iter() {
        let root = dsu.find(run.label);
        let entry = components[root as usize].get_or_insert_with(ComponentBuilder::default);
        entry.absorb(run);
    }

    let mut contours = Vec::new();
    for comp in components.into_iter().flatten() {
        if comp.area < MIN_CONTOUR_AREA {
            continue;
        }
        contours.push(comp.into_contour());
    }
    contours
}

/// Per-component accumulator: exact area and bounds, plus per-row horizontal
/// extents for the boundary trace. Runs arrive in scan order, so rows are
/// already sorted.
#[derive(Clone, Default)]
struct ComponentBuilder {
    area: u64,
    rows: Vec<(usize, usize, usize)>,
}

impl ComponentBuilder {
    fn absorb(&mut self, run: &RowRun) {
        self.area += (run.end - run.start) as u64;
        if let Some((row, left, right)) = self.rows.last_mut() {
            if *row == run.row {
                *left = (*left).min(run.start);
                *right = (*right).max(run.end);
                return;
            }
        }
        self.rows.push((run.row, run.start, run.end));
    }

    fn into_contour(self) -> Contour {
        let min_y = self.rows.first().map(|&(row, _, _)| row).unwrap_or(0);
        let max_y = self.rows.last().map(|&(row, _, _)| row).unwrap_or(0);
        let mut min_x = usize::MAX;
        let mut max_x = 0usize;
        for &(_, left, right) in &self.rows {
            min_x = min_x.min(left);
            max_x = max_x.max(right);
        }
        let bounds = BoundingBox::new(
            min_x as i64,
            min_y as i64,
            (max_x - min_x) as i64,
            (max_y - min_y + 1) as i64,
        );
        Contour {
            points: trace_boundary(&self.rows),
            area: self.area,
            bounds,
        }
    }
}

/// Ordered outer boundary: down the leftmost edges, back up the rightmost
/// edges. Adjacent collinear points collapse away.
fn trace_boundary(rows: &[(usize, usize, usize)]) -> Vec<Point> {
    let mut points = Vec::with_capacity(rows.len() * 2);
    for &(row, left, _) in rows {
        points.push(Point::new(left as i64, row as i64));
    }
    for &(row, _, right) in rows.iter().rev() {
        points.push(Point::new(right as i64 - 1, row as i64));
    }
    collapse_collinear(points)
}

fn collapse_collinear(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        let n = out.len();
        if n >= 2 && cross(out[n - 2], out[n - 1], p) == 0 {
            out[n - 1] = p;
        } else {
            out.push(p);
        }
    }
    out
}

fn cross(a: Point, b: Point, c: Point) -> i64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[derive(Default)]
struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new() -> Self {
        Self {
            parent: vec![0],
            rank: vec![0],
        }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn make_set(&mut self) -> u32 {
        let idx = self.parent.len() as u32;
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    fn find(&mut self, x: u32) -> u32 {
        let idx = x as usize;
        let parent = self.parent[idx];
        if parent == x {
            return x;
        }
        let root = self.find(parent);
        self.parent[idx] = root;
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let rank_a = self.rank[root_a as usize];
        let rank_b = self.rank[root_b as usize];
        if rank_a < rank_b {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b as usize] = root_a;
        if rank_a == rank_b {
            self.rank[root_a as usize] = rank_a + 1;
        }
    }
}
