//! Compute result container and point-query surface
//!
//! Holds one field-strength raster and one Top-K table per band, the
//! post-filter source ordering and the grid geometry. Results are immutable
//! once packaged; serialisation to GeoTIFF/Parquet lives with external
//! writer collaborators behind the [`ResultWriter`] seam.

use std::path::Path;

use serde::Serialize;

use crate::grid::GridDescriptor;
use crate::types::{EngineError, EngineResult};

/// Altitude agreement required between a point query and the computed slice.
const QUERY_ALT_TOLERANCE_M: f64 = 1e-3;

/// One Top-K diagnostic row: the cell, the rank (0 is the strongest), the
/// contributing source and its fraction of the cell's total power density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKRecord {
    /// Grid row, counted north to south.
    pub row: usize,
    /// Grid column, counted west to east.
    pub col: usize,
    pub rank: usize,
    pub source_id: String,
    /// Share of the cell's total power density, in (0, 1].
    pub fraction: f64,
}

/// Per-band output: the field-strength raster (row-major, NaN for no-data)
/// and the surviving Top-K rows, ordered by (row, col, rank).
#[derive(Debug, Clone)]
pub struct BandResult {
    pub name: String,
    pub center_freq_mhz: f64,
    pub field_dbuv_per_m: Vec<f64>,
    pub top_contributors: Vec<TopKRecord>,
}

impl BandResult {
    /// Field strength at cell (row, col); NaN means masked or sub-threshold.
    pub fn field_at(&self, grid: &GridDescriptor, row: usize, col: usize) -> f64 {
        self.field_dbuv_per_m[row * grid.width + col]
    }
}

/// One point-query answer: the nearest cell's field strength plus its Top-K
/// rows in descending fraction order.
#[derive(Debug, Clone, Serialize)]
pub struct PointSample {
    pub band: String,
    /// Centre coordinates of the answering cell.
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
    pub field_dbuv_per_m: f64,
    pub contributors: Vec<TopKRecord>,
}

/// External-writer seam: format-specific serialisation (GeoTIFF raster,
/// Parquet Top-K table) is a collaborator's concern, one call per band.
pub trait ResultWriter {
    fn write_band(
        &self,
        grid: &GridDescriptor,
        band: &BandResult,
        output_dir: &Path,
    ) -> std::io::Result<()>;
}

/// Immutable result of one engine invocation.
#[derive(Debug, Clone)]
pub struct ComputeResult {
    grid: GridDescriptor,
    bands: Vec<BandResult>,
    source_ids: Vec<String>,
}

impl ComputeResult {
    pub(crate) fn new(grid: GridDescriptor, bands: Vec<BandResult>, source_ids: Vec<String>) -> Self {
        Self {
            grid,
            bands,
            source_ids,
        }
    }

    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    /// Band results in request order.
    pub fn bands(&self) -> &[BandResult] {
        &self.bands
    }

    /// Retained source identifiers, in the order sources were consumed from
    /// the request after filtering. Top-K source ids resolve against this.
    pub fn source_ids(&self) -> &[String] {
        &self.source_ids
    }

    pub fn band(&self, name: &str) -> Option<&BandResult> {
        self.bands.iter().find(|b| b.name == name)
    }

    /// Nearest-cell point query.
    ///
    /// The queried altitude must match the computed slice within a tight
    /// tolerance; a masked or sub-threshold (NaN) cell is reported as a
    /// mismatch as well, which the service boundary translates to not-found.
    pub fn query_point(
        &self,
        lat: f64,
        lon: f64,
        alt_m: f64,
        band_name: &str,
    ) -> EngineResult<PointSample> {
        let band = self.band(band_name).ok_or_else(|| {
            EngineError::QueryMismatch(format!("band `{}` is not in this result", band_name))
        })?;

        if (alt_m - self.grid.alt_m).abs() > QUERY_ALT_TOLERANCE_M {
            return Err(EngineError::QueryMismatch(format!(
                "altitude {} m does not match the computed slice at {} m",
                alt_m, self.grid.alt_m
            )));
        }

        if self.grid.height == 0 || self.grid.width == 0 {
            return Err(EngineError::QueryMismatch("grid is empty".to_string()));
        }

        let (row, col) = self.nearest_cell(lat, lon);
        let value = band.field_dbuv_per_m[row * self.grid.width + col];
        if value.is_nan() {
            return Err(EngineError::QueryMismatch(format!(
                "cell ({}, {}) holds no data",
                row, col
            )));
        }

        // Rows of one cell arrive rank-ordered, which is descending fraction.
        let contributors: Vec<TopKRecord> = band
            .top_contributors
            .iter()
            .filter(|r| r.row == row && r.col == col)
            .cloned()
            .collect();

        Ok(PointSample {
            band: band.name.clone(),
            lat: self.grid.lat_origin_deg - row as f64 * self.grid.resolution_deg,
            lon: self.grid.lon_origin_deg + col as f64 * self.grid.resolution_deg,
            alt_m: self.grid.alt_m,
            field_dbuv_per_m: value,
            contributors,
        })
    }

    /// Index of the cell whose centre is closest in absolute lat/lon terms.
    fn nearest_cell(&self, lat: f64, lon: f64) -> (usize, usize) {
        let step = self.grid.resolution_deg;
        let row = ((self.grid.lat_origin_deg - lat) / step).round();
        let col = ((lon - self.grid.lon_origin_deg) / step).round();
        let row = row.clamp(0.0, (self.grid.height - 1) as f64) as usize;
        let col = col.clamp(0.0, (self.grid.width - 1) as f64) as usize;
        (row, col)
    }

    /// Hand every band to the external writer, one directory for all.
    pub fn write_outputs(&self, output_dir: &Path, writer: &dyn ResultWriter) -> std::io::Result<()> {
        for band in &self.bands {
            writer.write_band(&self.grid, band, output_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn descriptor() -> GridDescriptor {
        GridDescriptor {
            lat_origin_deg: 34.0,
            lon_origin_deg: 118.0,
            resolution_deg: 0.1,
            height: 3,
            width: 3,
            alt_m: 100.0,
        }
    }

    fn result_with_one_band() -> ComputeResult {
        // 3x3 raster with data only at the centre cell (1, 1).
        let mut field = vec![f64::NAN; 9];
        field[4] = 75.0;
        let band = BandResult {
            name: "S".to_string(),
            center_freq_mhz: 3000.0,
            field_dbuv_per_m: field,
            top_contributors: vec![
                TopKRecord {
                    row: 1,
                    col: 1,
                    rank: 0,
                    source_id: "alpha".to_string(),
                    fraction: 0.7,
                },
                TopKRecord {
                    row: 1,
                    col: 1,
                    rank: 1,
                    source_id: "bravo".to_string(),
                    fraction: 0.3,
                },
            ],
        };
        ComputeResult::new(
            descriptor(),
            vec![band],
            vec!["alpha".to_string(), "bravo".to_string()],
        )
    }

    #[test]
    fn test_query_hits_nearest_cell() {
        let result = result_with_one_band();
        // (33.93, 118.08) rounds to row 1 (lat 33.9), col 1 (lon 118.1).
        let sample = result.query_point(33.93, 118.08, 100.0, "S").unwrap();
        assert_eq!(sample.field_dbuv_per_m, 75.0);
        assert!((sample.lat - 33.9).abs() < 1e-9);
        assert!((sample.lon - 118.1).abs() < 1e-9);
        assert_eq!(sample.contributors.len(), 2);
        assert_eq!(sample.contributors[0].source_id, "alpha");
        assert!(sample.contributors[0].fraction >= sample.contributors[1].fraction);
    }

    #[test]
    fn test_query_altitude_mismatch_rejected() {
        let result = result_with_one_band();
        let err = result.query_point(33.9, 118.1, 101.0, "S").unwrap_err();
        assert!(matches!(err, EngineError::QueryMismatch(_)));
        // One metre off is already out of tolerance.
        let err = result.query_point(33.9, 118.1, 99.0, "S").unwrap_err();
        assert!(matches!(err, EngineError::QueryMismatch(_)));
    }

    #[test]
    fn test_query_nan_cell_is_not_found() {
        let result = result_with_one_band();
        let err = result.query_point(34.0, 118.0, 100.0, "S").unwrap_err();
        assert!(matches!(err, EngineError::QueryMismatch(_)));
    }

    #[test]
    fn test_query_unknown_band() {
        let result = result_with_one_band();
        let err = result.query_point(33.9, 118.1, 100.0, "X").unwrap_err();
        assert!(err.to_string().contains("band"), "got: {}", err);
    }

    #[test]
    fn test_query_clamps_outside_coordinates() {
        let result = result_with_one_band();
        // Far north-west of the grid clamps to cell (0, 0), which is NaN.
        let err = result.query_point(40.0, 110.0, 100.0, "S").unwrap_err();
        assert!(matches!(err, EngineError::QueryMismatch(_)));
    }

    #[test]
    fn test_writer_receives_every_band() {
        struct Recorder {
            seen: RefCell<Vec<String>>,
        }
        impl ResultWriter for Recorder {
            fn write_band(
                &self,
                _grid: &GridDescriptor,
                band: &BandResult,
                _output_dir: &Path,
            ) -> std::io::Result<()> {
                self.seen.borrow_mut().push(band.name.clone());
                Ok(())
            }
        }

        let mut result = result_with_one_band();
        result.bands.push(BandResult {
            name: "X".to_string(),
            center_freq_mhz: 10000.0,
            field_dbuv_per_m: vec![f64::NAN; 9],
            top_contributors: Vec::new(),
        });

        let recorder = Recorder {
            seen: RefCell::new(Vec::new()),
        };
        result
            .write_outputs(Path::new("/tmp/out"), &recorder)
            .unwrap();
        assert_eq!(*recorder.seen.borrow(), vec!["S".to_string(), "X".to_string()]);
    }

    #[test]
    fn test_field_at_indexing() {
        let result = result_with_one_band();
        let band = result.band("S").unwrap();
        assert_eq!(band.field_at(result.grid(), 1, 1), 75.0);
        assert!(band.field_at(result.grid(), 0, 0).is_nan());
    }
}
