//! Request model for the field-strength engine
//!
//! The request is an immutable bundle describing the region of interest, the
//! sampling grid, the propagation environment, the frequency bands and the
//! radiating sources. It is serialisable as JSON so the same contract serves
//! the CLI, a REST surface, or tests:
//!
//! ```json
//! {
//!   "region": { "polygon": [ {"lat": 34.0, "lon": 118.0}, ... ] },
//!   "grid": { "resolution_deg": 0.01, "alt_m": 100.0 },
//!   "bands": [ {"name": "S", "f_min_mhz": 2000.0, "f_max_mhz": 4000.0} ],
//!   "sources": [ ... ]
//! }
//! ```
//!
//! Validation happens once at the boundary through
//! [`ComputeRequest::validate`]; past that point the engine treats every
//! field as well-formed.

use serde::{Deserialize, Serialize};

use crate::geodesy;
use crate::types::{
    EngineError, EngineResult, DEFAULT_INFLUENCE_BUFFER_KM, DEFAULT_THRESHOLD_DBUV_PER_M,
    MAX_REGION_EXTENT_KM, MAX_SOURCES, MEAN_EARTH_RADIUS_KM,
};

/// Geographic coordinate pair in degrees (WGS-84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Closed polygonal region of interest, vertices in clockwise order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub polygon: Vec<LatLon>,
}

impl Region {
    /// Axis-aligned bounding box as (lat_min, lat_max, lon_min, lon_max).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut lat_min = f64::INFINITY;
        let mut lat_max = f64::NEG_INFINITY;
        let mut lon_min = f64::INFINITY;
        let mut lon_max = f64::NEG_INFINITY;
        for v in &self.polygon {
            lat_min = lat_min.min(v.lat);
            lat_max = lat_max.max(v.lat);
            lon_min = lon_min.min(v.lon);
            lon_max = lon_max.max(v.lon);
        }
        (lat_min, lat_max, lon_min, lon_max)
    }

    /// Shoelace signed area in the (lon, lat) plane. Negative for the
    /// clockwise winding this engine requires.
    pub fn signed_area(&self) -> f64 {
        let n = self.polygon.len();
        let mut area = 0.0;
        for i in 0..n {
            let a = &self.polygon[i];
            let b = &self.polygon[(i + 1) % n];
            area += a.lon * b.lat - b.lon * a.lat;
        }
        0.5 * area
    }
}

/// Sampling grid specification: one shared angular cell size and a single
/// AMSL altitude slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub resolution_deg: f64,
    pub alt_m: f64,
}

/// Propagation model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationModel {
    #[default]
    FreeSpace,
    TwoRayFlat,
}

/// Gaseous attenuation: either the built-in frequency-dependent model or a
/// caller-supplied constant in dB/km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GasLoss {
    DbPerKm(f64),
    Mode(GasLossMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasLossMode {
    Auto,
}

impl Default for GasLoss {
    fn default() -> Self {
        GasLoss::Mode(GasLossMode::Auto)
    }
}

/// Atmospheric conditions feeding the per-kilometre attenuation models.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Atmosphere {
    #[serde(default)]
    pub gas_loss: GasLoss,
    /// Rain rate in mm/h.
    #[serde(default)]
    pub rain_rate_mmph: f64,
    /// Fog liquid water content in g/m^3.
    #[serde(default)]
    pub fog_lwc_gm3: f64,
}

/// Combined propagation environment. The effective-earth factor is fixed at
/// k = 4/3 and is intentionally absent here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub propagation: PropagationModel,
    #[serde(default)]
    pub atmosphere: Atmosphere,
}

/// Named frequency band in MHz with a reference bandwidth in kHz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub f_min_mhz: f64,
    pub f_max_mhz: f64,
    #[serde(default = "default_ref_bw_khz")]
    pub ref_bw_khz: f64,
}

fn default_ref_bw_khz() -> f64 {
    1000.0
}

impl Band {
    /// Band centre frequency, (f_min + f_max) / 2, in MHz.
    pub fn center_freq_mhz(&self) -> f64 {
        0.5 * (self.f_min_mhz + self.f_max_mhz)
    }
}

/// Wave polarisation of an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarization {
    H,
    V,
    Rhcp,
    Lhcp,
}

/// Emission characteristics of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Equivalent isotropically radiated power in dBm.
    pub eirp_dbm: f64,
    pub center_freq_mhz: f64,
    pub bandwidth_mhz: f64,
    pub polarization: Polarization,
    /// Fraction of time the emitter is keyed, in [0, 1]. Carried for the
    /// contract; peak aggregation does not scale by it.
    #[serde(default = "default_duty_cycle")]
    pub duty_cycle: f64,
}

fn default_duty_cycle() -> f64 {
    1.0
}

/// Sidelobe envelope templates, an upper bound on gain outside the mainlobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SidelobeTemplate {
    #[default]
    #[serde(rename = "MIL-STD-20")]
    MilStd20,
    #[serde(rename = "RCS-13")]
    Rcs13,
    #[serde(rename = "Radar-Narrow-25")]
    RadarNarrow25,
    #[serde(rename = "Comm-Omni-Back-10")]
    CommOmniBack10,
}

/// Simplified directional pattern: Gaussian mainlobe plus a sidelobe template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaPattern {
    /// Horizontal half-power beamwidth in degrees.
    pub hpbw_deg: f64,
    /// Vertical half-power beamwidth in degrees.
    pub vpbw_deg: f64,
    #[serde(default)]
    pub sidelobe_template: SidelobeTemplate,
}

/// Boresight pointing, azimuth clockwise from geographic north.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pointing {
    #[serde(default)]
    pub az_deg: f64,
    #[serde(default)]
    pub el_deg: f64,
}

/// Antenna scanning behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    None,
    Circular,
    Sector,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanSpec {
    #[serde(default)]
    pub mode: ScanMode,
    /// Rotation rate in revolutions per minute.
    #[serde(default)]
    pub rpm: f64,
    /// Sector width in degrees, centred on the pointing azimuth.
    #[serde(default)]
    pub sector_deg: f64,
}

/// Complete antenna configuration: pattern, pointing and scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    pub pattern: AntennaPattern,
    #[serde(default)]
    pub pointing: Pointing,
    #[serde(default)]
    pub scan: ScanSpec,
}

/// Source category tag. Informational; the physics is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Radar,
    Comm,
    Jammer,
    #[default]
    Other,
}

/// Geodetic position of a source: degrees plus AMSL altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

/// One radiating source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(default)]
    pub kind: SourceKind,
    pub position: SourcePosition,
    pub emission: Emission,
    pub antenna: Antenna,
}

/// Top-level compute request.
///
/// `metric`, `combine_sources` and `temporal_agg` are policy-locked: they are
/// accepted as strings so a non-default value surfaces as
/// [`EngineError::UnsupportedOption`] rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub region: Region,
    pub grid: GridSpec,
    #[serde(default = "default_influence_buffer_km")]
    pub influence_buffer_km: f64,
    #[serde(default)]
    pub environment: Environment,
    pub bands: Vec<Band>,
    pub sources: Vec<Source>,
    #[serde(default = "default_threshold")]
    pub threshold_dbuv_per_m: f64,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_combine")]
    pub combine_sources: String,
    #[serde(default = "default_temporal_agg")]
    pub temporal_agg: String,
}

fn default_influence_buffer_km() -> f64 {
    DEFAULT_INFLUENCE_BUFFER_KM
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_DBUV_PER_M
}

fn default_metric() -> String {
    "E_field_dBuV_per_m".to_string()
}

fn default_combine() -> String {
    "power_sum".to_string()
}

fn default_temporal_agg() -> String {
    "peak".to_string()
}

impl ComputeRequest {
    /// Validate the full request contract.
    ///
    /// Checks structure (polygon shape, winding, self-intersection), limits
    /// (region extent, source count), per-field ranges, and the policy-locked
    /// option surfaces. Returns the first violation found with its field path.
    pub fn validate(&self) -> EngineResult<()> {
        self.validate_locked_options()?;
        self.validate_region()?;
        self.validate_grid()?;
        self.validate_bands()?;
        self.validate_sources()?;
        if self.influence_buffer_km < 0.0 {
            return Err(EngineError::invalid(
                "influence_buffer_km",
                "must be non-negative",
            ));
        }
        if !self.threshold_dbuv_per_m.is_finite() {
            return Err(EngineError::invalid(
                "threshold_dbuv_per_m",
                "must be finite",
            ));
        }
        Ok(())
    }

    fn validate_locked_options(&self) -> EngineResult<()> {
        if self.metric != "E_field_dBuV_per_m" {
            return Err(EngineError::unsupported(
                "metric",
                &self.metric,
                "E_field_dBuV_per_m",
            ));
        }
        if self.combine_sources != "power_sum" {
            return Err(EngineError::unsupported(
                "combine_sources",
                &self.combine_sources,
                "power_sum",
            ));
        }
        if self.temporal_agg != "peak" {
            return Err(EngineError::unsupported(
                "temporal_agg",
                &self.temporal_agg,
                "peak",
            ));
        }
        Ok(())
    }

    fn validate_region(&self) -> EngineResult<()> {
        let poly = &self.region.polygon;
        if poly.len() < 3 {
            return Err(EngineError::invalid(
                "region.polygon",
                "must contain at least 3 vertices",
            ));
        }
        for (idx, v) in poly.iter().enumerate() {
            if !(-90.0..=90.0).contains(&v.lat) || !(-180.0..=180.0).contains(&v.lon) {
                return Err(EngineError::invalid(
                    &format!("region.polygon[{}]", idx),
                    "coordinates out of range",
                ));
            }
        }

        let area = self.region.signed_area();
        if area == 0.0 {
            return Err(EngineError::invalid("region.polygon", "polygon is degenerate"));
        }
        if area > 0.0 {
            return Err(EngineError::invalid(
                "region.polygon",
                "vertices must be listed clockwise",
            ));
        }

        if polygon_self_intersects(poly) {
            return Err(EngineError::invalid(
                "region.polygon",
                "polygon must not self-intersect",
            ));
        }

        // Extent limit on the true-radius sphere: a region bigger than the
        // configured cap is a workload guard, not a physics question.
        let (lat_min, lat_max, lon_min, lon_max) = self.region.bounds();
        let lat_mid = 0.5 * (lat_min + lat_max);
        let ns_km = geodesy::haversine_km(lat_min, lon_min, lat_max, lon_min, MEAN_EARTH_RADIUS_KM);
        let ew_km = geodesy::haversine_km(lat_mid, lon_min, lat_mid, lon_max, MEAN_EARTH_RADIUS_KM);
        if ns_km > MAX_REGION_EXTENT_KM || ew_km > MAX_REGION_EXTENT_KM {
            return Err(EngineError::invalid(
                "region.polygon",
                format!(
                    "region extent {:.1} x {:.1} km exceeds the {:.0} km limit",
                    ns_km, ew_km, MAX_REGION_EXTENT_KM
                ),
            ));
        }
        Ok(())
    }

    fn validate_grid(&self) -> EngineResult<()> {
        if !(self.grid.resolution_deg > 0.0) {
            return Err(EngineError::invalid(
                "grid.resolution_deg",
                "must be positive",
            ));
        }
        if !self.grid.alt_m.is_finite() {
            return Err(EngineError::invalid("grid.alt_m", "must be finite"));
        }
        Ok(())
    }

    fn validate_bands(&self) -> EngineResult<()> {
        if self.bands.is_empty() {
            return Err(EngineError::invalid("bands", "at least one band is required"));
        }
        for (idx, band) in self.bands.iter().enumerate() {
            if !(band.f_min_mhz > 0.0) {
                return Err(EngineError::invalid(
                    &format!("bands[{}].f_min_mhz", idx),
                    "must be positive",
                ));
            }
            if band.f_min_mhz >= band.f_max_mhz {
                return Err(EngineError::invalid(
                    &format!("bands[{}]", idx),
                    "f_min_mhz must be below f_max_mhz",
                ));
            }
            if !(band.ref_bw_khz > 0.0) {
                return Err(EngineError::invalid(
                    &format!("bands[{}].ref_bw_khz", idx),
                    "must be positive",
                ));
            }
        }
        Ok(())
    }

    fn validate_sources(&self) -> EngineResult<()> {
        if self.sources.len() > MAX_SOURCES {
            return Err(EngineError::invalid(
                "sources",
                format!("source count {} exceeds the limit of {}", self.sources.len(), MAX_SOURCES),
            ));
        }
        for (idx, src) in self.sources.iter().enumerate() {
            if src.id.is_empty() {
                return Err(EngineError::invalid(
                    &format!("sources[{}].id", idx),
                    "must be non-empty",
                ));
            }
            if !(src.emission.center_freq_mhz > 0.0) {
                return Err(EngineError::invalid(
                    &format!("sources[{}].emission.center_freq_mhz", idx),
                    "must be positive",
                ));
            }
            if !(src.emission.bandwidth_mhz > 0.0) {
                return Err(EngineError::invalid(
                    &format!("sources[{}].emission.bandwidth_mhz", idx),
                    "must be positive",
                ));
            }
            if !(0.0..=1.0).contains(&src.emission.duty_cycle) {
                return Err(EngineError::invalid(
                    &format!("sources[{}].emission.duty_cycle", idx),
                    "must lie in [0, 1]",
                ));
            }
            if !(src.antenna.pattern.hpbw_deg > 0.0) || !(src.antenna.pattern.vpbw_deg > 0.0) {
                return Err(EngineError::invalid(
                    &format!("sources[{}].antenna.pattern", idx),
                    "beamwidths must be positive",
                ));
            }
            if !(0.0..=360.0).contains(&src.antenna.scan.sector_deg) {
                return Err(EngineError::invalid(
                    &format!("sources[{}].antenna.scan.sector_deg", idx),
                    "must lie in [0, 360]",
                ));
            }
            if src.antenna.scan.rpm < 0.0 {
                return Err(EngineError::invalid(
                    &format!("sources[{}].antenna.scan.rpm", idx),
                    "must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Proper-crossing test for two closed segments in the (lon, lat) plane.
fn segments_cross(a1: &LatLon, a2: &LatLon, b1: &LatLon, b2: &LatLon) -> bool {
    fn orient(p: &LatLon, q: &LatLon, r: &LatLon) -> f64 {
        (q.lon - p.lon) * (r.lat - p.lat) - (q.lat - p.lat) * (r.lon - p.lon)
    }
    let d1 = orient(a1, a2, b1);
    let d2 = orient(a1, a2, b2);
    let d3 = orient(b1, b2, a1);
    let d4 = orient(b1, b2, a2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Even-odd edge walk over all non-adjacent edge pairs.
fn polygon_self_intersects(poly: &[LatLon]) -> bool {
    let n = poly.len();
    for i in 0..n {
        let a1 = &poly[i];
        let a2 = &poly[(i + 1) % n];
        for j in (i + 1)..n {
            // Skip adjacent edges (shared vertex) including the wrap-around pair.
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = &poly[j];
            let b2 = &poly[(j + 1) % n];
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}
