//! Power density and field-strength conversions
//!
//! EIRP in dBm to watts, power density at range through the 4 pi r^2
//! spreading term plus any extra path loss, and power density to electric
//! field strength in dBuV/m via the free-space wave impedance.

use crate::types::FREE_SPACE_IMPEDANCE_OHMS;

/// Range floor in metres guarding the source-coincident cell.
const MIN_RANGE_M: f64 = 1.0;

/// Field-strength floor in V/m before taking the logarithm.
const MIN_FIELD_V_PER_M: f64 = 1e-15;

/// Convert EIRP from dBm to watts.
pub fn eirp_dbm_to_watts(eirp_dbm: f64) -> f64 {
    10f64.powf((eirp_dbm - 30.0) / 10.0)
}

/// Convert a dB figure to a linear power ratio.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Power density in W/m^2 at slant range `r_km`.
///
/// Free-space spreading is carried by the 4 pi r^2 term; `extra_loss_db`
/// stacks the propagation-model delta and atmospheric attenuation on top
/// (positive values attenuate). The range is floored at one metre.
pub fn power_density_w_m2(eirp_w: f64, gain_dbi: f64, r_km: f64, extra_loss_db: f64) -> f64 {
    let r_m = (r_km * 1000.0).max(MIN_RANGE_M);
    let spreading = eirp_w * db_to_linear(gain_dbi) / (4.0 * std::f64::consts::PI * r_m * r_m);
    spreading * db_to_linear(-extra_loss_db)
}

/// Convert a total power density in W/m^2 to field strength in dBuV/m.
///
/// E = sqrt(Z0 * S); the field is floored at 1e-15 V/m so an empty cell
/// produces a deeply negative but finite figure rather than -inf.
pub fn field_strength_dbuv_per_m(power_density_w_m2: f64) -> f64 {
    let e_v_per_m = (FREE_SPACE_IMPEDANCE_OHMS * power_density_w_m2.max(0.0)).sqrt();
    20.0 * e_v_per_m.max(MIN_FIELD_V_PER_M).log10() + 120.0
}
