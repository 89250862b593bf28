//! Directional antenna gain with scan-peak semantics
//!
//! Gain toward a target is evaluated under the "peak over one scan period"
//! contract: if the antenna's scan ever sweeps the mainlobe across the
//! target bearing, the target sees the mainlobe peak (0 dBi); otherwise it
//! sees the static pattern, a separable Gaussian mainlobe bounded below by a
//! sidelobe envelope template.
//!
//! # Example
//!
//! ```
//! use emgrid_core::antenna::peak_gain_dbi;
//! use emgrid_core::request::{Antenna, AntennaPattern, Pointing, ScanMode, ScanSpec, SidelobeTemplate};
//!
//! let antenna = Antenna {
//!     pattern: AntennaPattern {
//!         hpbw_deg: 3.0,
//!         vpbw_deg: 3.0,
//!         sidelobe_template: SidelobeTemplate::MilStd20,
//!     },
//!     pointing: Pointing { az_deg: 0.0, el_deg: 0.0 },
//!     scan: ScanSpec { mode: ScanMode::Circular, rpm: 12.0, sector_deg: 360.0 },
//! };
//!
//! // A circular scan illuminates every bearing at its peak.
//! assert_eq!(peak_gain_dbi(137.0, 0.0, &antenna), 0.0);
//! ```

use crate::request::{Antenna, ScanMode, SidelobeTemplate};

/// Beamwidth floor keeping the Gaussian exponent finite.
const MIN_BEAMWIDTH_DEG: f64 = 1e-6;

/// Smallest signed angular difference `a - b` in degrees, wrapped to
/// [-180, 180).
pub fn angular_diff_deg(a_deg: f64, b_deg: f64) -> f64 {
    (a_deg - b_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Separable Gaussian mainlobe gain in dBi relative to a 0 dBi peak.
///
/// Each axis decays as -(10 log10 e)(4 ln 2)(delta / beamwidth)^2, which puts
/// the -3 dB point at half the beamwidth; the tighter axis dominates.
pub fn mainlobe_gain_dbi(delta_az_deg: f64, delta_el_deg: f64, hpbw_deg: f64, vpbw_deg: f64) -> f64 {
    let k = 4.0 * std::f64::consts::LN_2;
    let log10_e = std::f64::consts::E.log10();

    let az_ratio = delta_az_deg / hpbw_deg.max(MIN_BEAMWIDTH_DEG);
    let el_ratio = delta_el_deg / vpbw_deg.max(MIN_BEAMWIDTH_DEG);
    let g_az = -10.0 * log10_e * k * az_ratio * az_ratio;
    let g_el = -10.0 * log10_e * k * el_ratio * el_ratio;
    g_az.min(g_el)
}

impl SidelobeTemplate {
    /// Sidelobe envelope level in dBi as a function of the absolute azimuth
    /// off-axis angle.
    pub fn floor_dbi(&self, off_axis_az_deg: f64) -> f64 {
        let off = off_axis_az_deg.abs();
        match self {
            SidelobeTemplate::MilStd20 => -20.0,
            SidelobeTemplate::Rcs13 => {
                if off < 10.0 {
                    -13.0
                } else {
                    -20.0
                }
            }
            SidelobeTemplate::RadarNarrow25 => {
                if off < 10.0 {
                    -20.0
                } else {
                    -25.0
                }
            }
            SidelobeTemplate::CommOmniBack10 => -10.0,
        }
    }
}

/// Whether a target bearing falls inside the antenna's scan coverage.
///
/// Under peak semantics a fixed antenna (mode `none`) covers nothing — its
/// directionality comes entirely from the static pattern — while a circular
/// scan covers the full ring and a sector scan covers an arc of
/// `sector_deg` centred on the pointing azimuth.
pub fn in_scan_coverage(bearing_deg: f64, antenna: &Antenna) -> bool {
    match antenna.scan.mode {
        ScanMode::None => false,
        ScanMode::Circular => true,
        ScanMode::Sector => {
            let half = (0.5 * antenna.scan.sector_deg).max(0.0);
            angular_diff_deg(bearing_deg, antenna.pointing.az_deg).abs() <= half
        }
    }
}

/// Peak gain in dBi toward a target at the given bearing and elevation.
///
/// Inside scan coverage the mainlobe peak applies; outside, the static
/// pattern: the Gaussian mainlobe bounded below by the sidelobe template.
pub fn peak_gain_dbi(bearing_deg: f64, elevation_deg: f64, antenna: &Antenna) -> f64 {
    if in_scan_coverage(bearing_deg, antenna) {
        return 0.0;
    }

    let delta_az = angular_diff_deg(bearing_deg, antenna.pointing.az_deg);
    let delta_el = elevation_deg - antenna.pointing.el_deg;
    let mainlobe = mainlobe_gain_dbi(
        delta_az,
        delta_el,
        antenna.pattern.hpbw_deg,
        antenna.pattern.vpbw_deg,
    );
    let floor = antenna.pattern.sidelobe_template.floor_dbi(delta_az);
    mainlobe.max(floor)
}
