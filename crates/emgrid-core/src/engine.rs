//! Compute orchestrator
//!
//! Drives the full estimation pipeline for one request: validate, build the
//! sampling grid, cull out-of-buffer sources, then for every band fold each
//! source's power density into the per-cell accumulator, convert to field
//! strength, and apply the no-data threshold together with its Top-K
//! consistency rule (a NaN cell never carries Top-K rows).
//!
//! The engine is a pure function of the request: no shared state, no
//! observable side effects, byte-identical rasters on repeated runs. Bands
//! are independent, so with the `parallel` feature they are computed on a
//! rayon pool; per-source folding inside a band always runs sequentially in
//! post-filter source order, which keeps the accumulation order (and the
//! Top-K tie-breaking) fixed either way.
//!
//! # Example
//!
//! ```
//! use emgrid_core::engine::ComputeEngine;
//! use emgrid_core::request::ComputeRequest;
//!
//! let json = r#"{
//!     "region": { "polygon": [
//!         {"lat": 34.0, "lon": 118.0},
//!         {"lat": 34.0, "lon": 118.2},
//!         {"lat": 33.8, "lon": 118.2},
//!         {"lat": 33.8, "lon": 118.0}
//!     ]},
//!     "grid": { "resolution_deg": 0.05, "alt_m": 0.0 },
//!     "bands": [ {"name": "S", "f_min_mhz": 2000.0, "f_max_mhz": 4000.0} ],
//!     "sources": []
//! }"#;
//! let request: ComputeRequest = serde_json::from_str(json).unwrap();
//! let result = ComputeEngine::new().compute(&request).unwrap();
//! assert_eq!(result.bands().len(), 1);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::accumulator::CellAccumulator;
use crate::antenna::peak_gain_dbi;
use crate::filter::filter_sources;
use crate::geodesy;
use crate::grid::{build_grid, Grid};
use crate::power::{eirp_dbm_to_watts, field_strength_dbuv_per_m, power_density_w_m2};
use crate::propagation::extra_loss_db;
use crate::request::{Band, ComputeRequest, Environment, Source};
use crate::result::{BandResult, ComputeResult, TopKRecord};
use crate::types::EngineResult;

/// Stateless compute engine. One instance can serve any number of requests.
#[derive(Debug, Default)]
pub struct ComputeEngine;

impl ComputeEngine {
    pub fn new() -> Self {
        ComputeEngine
    }

    /// Run the full pipeline for one validated request.
    ///
    /// A polygon that masks no cells, or a source set that the influence
    /// buffer empties, is not an error: the band rasters come back fully
    /// NaN with empty Top-K tables.
    pub fn compute(&self, request: &ComputeRequest) -> EngineResult<ComputeResult> {
        request.validate()?;

        let grid = build_grid(&request.region, request.grid.resolution_deg, request.grid.alt_m);
        info!(
            height = grid.height(),
            width = grid.width(),
            inside = grid.inside_count(),
            "sampling grid built"
        );

        let sources = filter_sources(&request.sources, &request.region, request.influence_buffer_km);
        let source_ids: Vec<String> = sources.iter().map(|s| s.id.clone()).collect();

        let threshold = request.threshold_dbuv_per_m;
        let environment = request.environment;

        #[cfg(feature = "parallel")]
        let bands: Vec<BandResult> = request
            .bands
            .par_iter()
            .map(|band| compute_band(band, &grid, &sources, &source_ids, &environment, threshold))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let bands: Vec<BandResult> = request
            .bands
            .iter()
            .map(|band| compute_band(band, &grid, &sources, &source_ids, &environment, threshold))
            .collect();

        Ok(ComputeResult::new(grid.descriptor(), bands, source_ids))
    }
}

/// Compute one band: accumulate every retained source over the masked cells,
/// convert totals to field strength, then apply threshold and mask in a
/// single pass that also decides which Top-K rows survive.
fn compute_band(
    band: &Band,
    grid: &Grid,
    sources: &[Source],
    source_ids: &[String],
    environment: &Environment,
    threshold_dbuv_per_m: f64,
) -> BandResult {
    let f_mhz = band.center_freq_mhz();
    let mut acc = CellAccumulator::new(grid.len());

    for (source_index, source) in sources.iter().enumerate() {
        fold_source(&mut acc, source, source_index, f_mhz, grid, environment);
    }

    let mut field = vec![f64::NAN; grid.len()];
    let mut records = Vec::new();

    for i in 0..grid.height() {
        for j in 0..grid.width() {
            if !grid.is_inside(i, j) {
                continue;
            }
            let cell = grid.index(i, j);
            let total = acc.total(cell);
            let strength = field_strength_dbuv_per_m(total);
            if strength < threshold_dbuv_per_m {
                // Below threshold: the raster stays NaN and the cell's
                // Top-K entries are discarded with it.
                continue;
            }
            field[cell] = strength;
            for (rank, contribution) in acc.top(cell).iter().enumerate() {
                records.push(TopKRecord {
                    row: i,
                    col: j,
                    rank,
                    source_id: source_ids[contribution.source_index].clone(),
                    fraction: contribution.power_w_m2 / total,
                });
            }
        }
    }

    debug!(
        band = band.name.as_str(),
        center_freq_mhz = f_mhz,
        cells_above_threshold = field.iter().filter(|v| v.is_finite()).count(),
        topk_rows = records.len(),
        "band computed"
    );

    BandResult {
        name: band.name.clone(),
        center_freq_mhz: f_mhz,
        field_dbuv_per_m: field,
        top_contributors: records,
    }
}

/// Fold one source's power density into the accumulator over all masked
/// cells: geometry, antenna gain, propagation extras, then the spreading
/// conversion to W/m^2.
fn fold_source(
    acc: &mut CellAccumulator,
    source: &Source,
    source_index: usize,
    f_mhz: f64,
    grid: &Grid,
    environment: &Environment,
) {
    let eirp_w = eirp_dbm_to_watts(source.emission.eirp_dbm);
    let src_lat = source.position.lat;
    let src_lon = source.position.lon;
    let src_alt_m = source.position.alt_m;
    let rx_alt_m = grid.alt_m();
    let delta_alt_m = rx_alt_m - src_alt_m;

    for i in 0..grid.height() {
        let lat = grid.lat(i);
        for j in 0..grid.width() {
            if !grid.is_inside(i, j) {
                continue;
            }
            let lon = grid.lon(j);

            let horizontal_km = geodesy::effective_distance_km(src_lat, src_lon, lat, lon);
            let bearing_deg = geodesy::forward_azimuth_deg(src_lat, src_lon, lat, lon);
            let elevation_deg = geodesy::elevation_angle_deg(horizontal_km, delta_alt_m);
            let slant_km = geodesy::slant_range_km(horizontal_km, delta_alt_m);

            let gain_dbi = peak_gain_dbi(bearing_deg, elevation_deg, &source.antenna);
            let extra_db = extra_loss_db(f_mhz, slant_km, horizontal_km, src_alt_m, rx_alt_m, environment);
            let density = power_density_w_m2(eirp_w, gain_dbi, slant_km, extra_db);

            acc.fold(grid.index(i, j), density, source_index);
        }
    }
}
