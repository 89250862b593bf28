//! Sampling grid construction
//!
//! Builds an axis-aligned latitude/longitude lattice covering the polygon's
//! bounding box at a shared angular resolution, together with an
//! inside-polygon mask. Rows run north to south (row 0 is the northern edge)
//! and columns west to east, matching the raster convention downstream
//! writers expect.

use serde::Serialize;

use crate::request::{LatLon, Region};

/// Tolerance used when deciding whether the far bound lands on the lattice.
const STEP_EPSILON: f64 = 1e-9;

/// Immutable sampling grid: per-row latitudes, per-column longitudes and a
/// row-major inside-polygon mask.
#[derive(Debug, Clone)]
pub struct Grid {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    mask: Vec<bool>,
    resolution_deg: f64,
    alt_m: f64,
}

/// Compact grid geometry handed to result consumers and external writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridDescriptor {
    /// Latitude of row 0 (northern edge), degrees.
    pub lat_origin_deg: f64,
    /// Longitude of column 0 (western edge), degrees.
    pub lon_origin_deg: f64,
    pub resolution_deg: f64,
    pub height: usize,
    pub width: usize,
    pub alt_m: f64,
}

impl Grid {
    /// Number of rows (north to south).
    pub fn height(&self) -> usize {
        self.latitudes.len()
    }

    /// Number of columns (west to east).
    pub fn width(&self) -> usize {
        self.longitudes.len()
    }

    /// Total cell count, height * width.
    pub fn len(&self) -> usize {
        self.latitudes.len() * self.longitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major flat index of cell (i, j).
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.longitudes.len() + j
    }

    #[inline]
    pub fn lat(&self, i: usize) -> f64 {
        self.latitudes[i]
    }

    #[inline]
    pub fn lon(&self, j: usize) -> f64 {
        self.longitudes[j]
    }

    /// Whether cell (i, j) lies inside the request polygon.
    #[inline]
    pub fn is_inside(&self, i: usize, j: usize) -> bool {
        self.mask[self.index(i, j)]
    }

    /// Count of cells inside the polygon.
    pub fn inside_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn resolution_deg(&self) -> f64 {
        self.resolution_deg
    }

    pub fn alt_m(&self) -> f64 {
        self.alt_m
    }

    pub fn descriptor(&self) -> GridDescriptor {
        GridDescriptor {
            lat_origin_deg: self.latitudes.first().copied().unwrap_or(f64::NAN),
            lon_origin_deg: self.longitudes.first().copied().unwrap_or(f64::NAN),
            resolution_deg: self.resolution_deg,
            height: self.height(),
            width: self.width(),
            alt_m: self.alt_m,
        }
    }
}

/// Build the sampling grid for a region.
///
/// The lattice spans the polygon bounding box: latitudes descend from
/// `lat_max` in `resolution_deg` steps until `lat_min` is covered, longitudes
/// ascend from `lon_min` likewise. Both far bounds are included; when the
/// span is not an exact multiple of the step the last line overshoots by
/// less than one step. The construction is a pure function of its inputs.
pub fn build_grid(region: &Region, resolution_deg: f64, alt_m: f64) -> Grid {
    let (lat_min, lat_max, lon_min, lon_max) = region.bounds();

    let latitudes = descending_axis(lat_max, lat_min, resolution_deg);
    let longitudes = ascending_axis(lon_min, lon_max, resolution_deg);

    let mut mask = vec![false; latitudes.len() * longitudes.len()];
    for (i, &lat) in latitudes.iter().enumerate() {
        for (j, &lon) in longitudes.iter().enumerate() {
            mask[i * longitudes.len() + j] = point_in_polygon(lat, lon, &region.polygon);
        }
    }

    Grid {
        latitudes,
        longitudes,
        mask,
        resolution_deg,
        alt_m,
    }
}

fn step_count(span: f64, step: f64) -> usize {
    if span <= 0.0 {
        return 0;
    }
    (span / step - STEP_EPSILON).ceil().max(0.0) as usize
}

fn ascending_axis(from: f64, to: f64, step: f64) -> Vec<f64> {
    let n = step_count(to - from, step);
    (0..=n).map(|k| from + k as f64 * step).collect()
}

fn descending_axis(from: f64, to: f64, step: f64) -> Vec<f64> {
    let n = step_count(from - to, step);
    (0..=n).map(|k| from - k as f64 * step).collect()
}

/// Even-odd ray-casting point-in-polygon test in the (lon, lat) plane.
///
/// The ray runs toward increasing longitude; a point exactly on an edge may
/// land on either side, which is acceptable at the half-cell scale of this
/// grid.
pub fn point_in_polygon(lat: f64, lon: f64, polygon: &[LatLon]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let yi = polygon[i].lat;
        let yj = polygon[j].lat;
        let xi = polygon[i].lon;
        let xj = polygon[j].lon;
        let straddles = (yi > lat) != (yj > lat);
        if straddles {
            let denom = if (yj - yi).abs() < 1e-12 { 1e-12 } else { yj - yi };
            let x_cross = (xj - xi) * (lat - yi) / denom + xi;
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
