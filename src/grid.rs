use crate::model::{Extent, TiledLayer};

/// One tile to fetch: pyramid level plus column/row in that level's grid.
/// Columns count from the west edge of the layer's `maxExtent`, rows from
/// the north edge (XYZ convention, row 0 at the top).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRequest {
    pub level: usize,
    pub col: i64,
    pub row: i64,
}

/// Relative slack when comparing resolutions, so a target that matches a
/// pyramid level up to float dust selects that level instead of the next
/// finer one.
const RES_EPSILON: f64 = 1e-9;

/// Guard subtracted before `ceil` on exclusive tile bounds so an extent edge
/// that lands exactly on a tile boundary does not drag in an extra tile.
const EDGE_EPSILON: f64 = 1e-9;

/// Pick the pyramid level for a target ground resolution: the closest
/// resolution that is not finer than the target. A target finer than every
/// level gets the finest level. Near-equal comparisons prefer the coarser
/// level, which keeps level choice deterministic across platforms.
///
/// `resolutions` must be strictly decreasing (validated on the layer).
pub fn select_level(resolutions: &[f64], target: f64) -> usize {
    let mut chosen = 0;
    for (i, &res) in resolutions.iter().enumerate() {
        if res >= target * (1.0 - RES_EPSILON) {
            chosen = i;
        } else {
            break;
        }
    }
    chosen
}

/// The finite set of tiles of one layer intersecting a page extent, as a
/// lazy row-major iterator of [`TileRequest`]. Empty when the page extent
/// and the layer's `maxExtent` are disjoint.
#[derive(Clone, Debug)]
pub struct TileGrid {
    level: usize,
    /// World units spanned by one tile horizontally / vertically.
    span_x: f64,
    span_y: f64,
    /// North-west corner of the layer's maxExtent; grid origin.
    origin_x: f64,
    origin_y: f64,
    col_range: (i64, i64),
    row_range: (i64, i64),
    next_col: i64,
    next_row: i64,
}

impl TileGrid {
    /// Build the grid covering `extent` at the level selected for
    /// `target_resolution`.
    pub fn covering(layer: &TiledLayer, target_resolution: f64, extent: &Extent) -> Self {
        let level = select_level(&layer.resolutions, target_resolution);
        let resolution = layer.resolutions[level];
        let span_x = resolution * f64::from(layer.tile_size[0]);
        let span_y = resolution * f64::from(layer.tile_size[1]);
        let origin_x = layer.max_extent.min_x;
        let origin_y = layer.max_extent.max_y;

        let (col_range, row_range) = match extent.intersection(&layer.max_extent) {
            Some(clip) => {
                let col0 = ((clip.min_x - origin_x) / span_x).floor() as i64;
                let col1 = ((clip.max_x - origin_x) / span_x - EDGE_EPSILON).ceil() as i64;
                let row0 = ((origin_y - clip.max_y) / span_y).floor() as i64;
                let row1 = ((origin_y - clip.min_y) / span_y - EDGE_EPSILON).ceil() as i64;
                ((col0.max(0), col1), (row0.max(0), row1))
            }
            None => ((0, 0), (0, 0)),
        };

        Self {
            level,
            span_x,
            span_y,
            origin_x,
            origin_y,
            col_range,
            row_range,
            next_col: col_range.0,
            next_row: row_range.0,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_empty(&self) -> bool {
        self.col_range.0 >= self.col_range.1 || self.row_range.0 >= self.row_range.1
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.col_range.1 - self.col_range.0) * (self.row_range.1 - self.row_range.0))
                as usize
        }
    }

    /// World-space footprint of one tile of this grid. Adjacent tiles share
    /// exact edge coordinates, which is what lets the compositor place them
    /// seamlessly.
    pub fn tile_extent(&self, request: &TileRequest) -> Extent {
        // each edge is computed from the grid origin, never by adding a
        // span to the opposite edge, so neighbours get bit-identical
        // boundary coordinates
        Extent::new(
            self.origin_x + request.col as f64 * self.span_x,
            self.origin_y - (request.row + 1) as f64 * self.span_y,
            self.origin_x + (request.col + 1) as f64 * self.span_x,
            self.origin_y - request.row as f64 * self.span_y,
        )
    }
}

impl Iterator for TileGrid {
    type Item = TileRequest;

    fn next(&mut self) -> Option<TileRequest> {
        if self.is_empty() || self.next_row >= self.row_range.1 {
            return None;
        }
        let request = TileRequest {
            level: self.level,
            col: self.next_col,
            row: self.next_row,
        };
        self.next_col += 1;
        if self.next_col >= self.col_range.1 {
            self.next_col = self.col_range.0;
            self.next_row += 1;
        }
        Some(request)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // upper bound only; some of the grid may already be consumed
        (0, Some(self.len()))
    }
}
