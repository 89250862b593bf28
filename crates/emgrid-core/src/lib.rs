//! # EM Field-Strength Grid Engine
//!
//! This crate estimates electromagnetic field strength over a bounded
//! geographic region at a single AMSL altitude slice, contributed by a set
//! of radiating sources (radars, communications transmitters, jammers) and
//! binned into named frequency bands. For every grid cell and band it
//! produces a field-strength value in dBuV/m plus the top three contributing
//! sources with their share of the received power density.
//!
//! ## Pipeline
//!
//! ```text
//! request -> validate -> grid (polygon mask)
//!                     -> source culling (influence buffer)
//!   per band: geometry -> antenna gain -> path loss -> power density
//!             -> per-cell (sum, top-3) -> field strength -> threshold/NaN
//! result: rasters + Top-K tables + source ordering + grid descriptor
//! ```
//!
//! The engine is pure and synchronous: one request in, one immutable result
//! out, byte-identical on repeated runs. With the `parallel` feature
//! (default) bands are computed on a rayon pool; determinism is unaffected
//! because bands are independent and per-source accumulation order is fixed.
//!
//! ## Example
//!
//! ```
//! use emgrid_core::prelude::*;
//!
//! let json = r#"{
//!     "region": { "polygon": [
//!         {"lat": 34.0, "lon": 118.0},
//!         {"lat": 34.0, "lon": 118.2},
//!         {"lat": 33.8, "lon": 118.2},
//!         {"lat": 33.8, "lon": 118.0}
//!     ]},
//!     "grid": { "resolution_deg": 0.02, "alt_m": 0.0 },
//!     "bands": [ {"name": "S", "f_min_mhz": 2000.0, "f_max_mhz": 4000.0} ],
//!     "sources": [ {
//!         "id": "radar-1",
//!         "kind": "radar",
//!         "position": { "lat": 33.9, "lon": 118.1, "alt_m": 50.0 },
//!         "emission": {
//!             "eirp_dbm": 95.0, "center_freq_mhz": 3000.0,
//!             "bandwidth_mhz": 10.0, "polarization": "H"
//!         },
//!         "antenna": {
//!             "pattern": { "hpbw_deg": 3.0, "vpbw_deg": 3.0 },
//!             "scan": { "mode": "circular", "rpm": 12.0 }
//!         }
//!     } ]
//! }"#;
//!
//! let request: ComputeRequest = serde_json::from_str(json).unwrap();
//! let result = ComputeEngine::new().compute(&request).unwrap();
//!
//! let band = result.band("S").unwrap();
//! assert!(band.field_dbuv_per_m.iter().any(|v| v.is_finite()));
//!
//! let sample = result.query_point(33.9, 118.1, 0.0, "S").unwrap();
//! assert_eq!(sample.contributors[0].source_id, "radar-1");
//! ```

pub mod accumulator;
pub mod antenna;
pub mod engine;
pub mod filter;
pub mod geodesy;
pub mod grid;
pub mod power;
pub mod propagation;
pub mod request;
pub mod result;
pub mod types;

pub use engine::ComputeEngine;
pub use grid::{Grid, GridDescriptor};
pub use request::{Band, ComputeRequest, Environment, Region, Source};
pub use result::{BandResult, ComputeResult, PointSample, ResultWriter, TopKRecord};
pub use types::{EngineError, EngineResult};

pub mod prelude {
    pub use crate::engine::ComputeEngine;
    pub use crate::request::{Band, ComputeRequest, Environment, Region, Source};
    pub use crate::result::{BandResult, ComputeResult, PointSample, TopKRecord};
    pub use crate::types::{EngineError, EngineResult};
}
