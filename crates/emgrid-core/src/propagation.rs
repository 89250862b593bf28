//! Propagation loss models
//!
//! Free-space path loss, a two-ray flat-earth interference delta, and
//! per-kilometre atmospheric extras (gas, rain, fog). Frequencies are MHz,
//! distances kilometres, altitudes metres, losses dB.
//!
//! The two-ray model is expressed as an *additional* loss relative to FSPL:
//! the coherent sum of the direct and ground-reflected rays is converted to
//! a delta that the caller stacks on top of the free-space figure. The delta
//! may be negative (constructive interference) and is clamped to +/-40 dB to
//! keep the destructive nulls finite.
//!
//! # Example
//!
//! ```
//! use emgrid_core::propagation::fspl_db;
//!
//! // Doubling the range adds ~6.02 dB.
//! let near = fspl_db(3000.0, 50.0);
//! let far = fspl_db(3000.0, 100.0);
//! assert!((far - near - 6.02).abs() < 0.01);
//! ```

use num_complex::Complex64;

use crate::request::{Atmosphere, Environment, GasLoss, GasLossMode, PropagationModel};
use crate::types::SPEED_OF_LIGHT_M_S;

/// Clamp applied to the two-ray interference delta, dB.
const TWO_RAY_CLAMP_DB: f64 = 40.0;

/// Floor for numeric gas attenuation figures, dB/km.
const MIN_GAS_DB_PER_KM: f64 = 0.001;

/// Free-space path loss in dB: 32.45 + 20 log10(f_MHz) + 20 log10(r_km).
///
/// Frequency and range are floored at 1e-6 so the source-coincident cell
/// stays finite.
pub fn fspl_db(f_mhz: f64, r_km: f64) -> f64 {
    32.45 + 20.0 * f_mhz.max(1e-6).log10() + 20.0 * r_km.max(1e-6).log10()
}

/// Two-ray flat-earth additional loss relative to FSPL, in dB.
///
/// Direct and ground-reflected path lengths are taken over a perfectly flat
/// reflecting ground with both terminals at their AMSL altitudes (floored at
/// 1 m). The reflection coefficient is -1 (horizontal-polarisation
/// baseline). Within ten wavelengths of horizontal separation the coherent
/// term is rejected and the delta is exactly zero; elsewhere it is clamped
/// to +/-40 dB.
pub fn two_ray_delta_db(f_mhz: f64, horizontal_km: f64, tx_alt_m: f64, rx_alt_m: f64) -> f64 {
    let wavelength_m = SPEED_OF_LIGHT_M_S / (f_mhz.max(1e-6) * 1e6);
    let horizontal_m = horizontal_km.max(1e-6) * 1000.0;

    // Near-field guard: the flat-earth image construction is meaningless
    // this close to the mast.
    if horizontal_m < 10.0 * wavelength_m {
        return 0.0;
    }

    let ht = tx_alt_m.max(1.0);
    let hr = rx_alt_m.max(1.0);
    let direct_m = (horizontal_m * horizontal_m + (ht - hr) * (ht - hr)).sqrt();
    let reflected_m = (horizontal_m * horizontal_m + (ht + hr) * (ht + hr)).sqrt();

    let phase = 2.0 * std::f64::consts::PI * (reflected_m - direct_m) / wavelength_m;
    let reflection = Complex64::new(-1.0, 0.0);
    let field = Complex64::new(1.0, 0.0) + reflection * Complex64::from_polar(1.0, -phase);

    let delta = -20.0 * field.norm().max(1e-6).log10();
    delta.clamp(-TWO_RAY_CLAMP_DB, TWO_RAY_CLAMP_DB)
}

/// Gaseous attenuation in dB/km for the automatic model.
///
/// A slowly rising baseline with resonance bumps at the 22.235 GHz water
/// vapour and 60 GHz oxygen lines, so the curve tracks the standard
/// attenuation peaks without a full line-by-line computation.
fn gas_auto_db_per_km(f_ghz: f64) -> f64 {
    let base = 0.004 * (1.0 + 0.1 * f_ghz.powf(1.2));
    let water = {
        let t = (f_ghz - 22.235) / 2.5;
        0.05 / (1.0 + t * t * t * t)
    };
    let oxygen = {
        let t = (f_ghz - 60.0) / 3.5;
        10.0 / (1.0 + t * t * t * t)
    };
    base + water + oxygen
}

/// Combined gas, rain and fog attenuation per kilometre in dB/km.
///
/// Rain follows an ITU-R flavoured power law in frequency scaled by the rain
/// rate (mm/h); fog scales with liquid water content (g/m^3) and the square
/// of frequency. Both are monotone in their drivers.
pub fn atmospheric_db_per_km(f_mhz: f64, atmosphere: &Atmosphere) -> f64 {
    let f_ghz = f_mhz.max(1e-6) / 1000.0;

    let gas = match atmosphere.gas_loss {
        GasLoss::Mode(GasLossMode::Auto) => gas_auto_db_per_km(f_ghz),
        GasLoss::DbPerKm(value) => value.max(MIN_GAS_DB_PER_KM),
    };
    let rain = 1e-4 * atmosphere.rain_rate_mmph * f_ghz.powf(0.8);
    let fog = 2e-4 * atmosphere.fog_lwc_gm3 * f_ghz * f_ghz;

    gas + rain + fog
}

/// Total extra loss beyond FSPL for one path, in dB.
///
/// The two-ray interference delta (zero under the free-space model) plus
/// atmospheric attenuation accumulated over the slant range.
pub fn extra_loss_db(
    f_mhz: f64,
    slant_km: f64,
    horizontal_km: f64,
    tx_alt_m: f64,
    rx_alt_m: f64,
    environment: &Environment,
) -> f64 {
    let model_delta = match environment.propagation {
        PropagationModel::FreeSpace => 0.0,
        PropagationModel::TwoRayFlat => two_ray_delta_db(f_mhz, horizontal_km, tx_alt_m, rx_alt_m),
    };
    let atmospheric = atmospheric_db_per_km(f_mhz, &environment.atmosphere) * slant_km.max(0.0);
    model_delta + atmospheric
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fspl_anchor_3ghz_100km() {
        // 32.45 + 20 log10(3000) + 20 log10(100) = 141.99 dB
        let loss = fspl_db(3000.0, 100.0);
        assert_relative_eq!(loss, 141.992, epsilon = 0.01);
    }

    #[test]
    fn test_fspl_distance_doubling_adds_6db() {
        for (f, r) in [(300.0, 1.0), (3000.0, 10.0), (10000.0, 50.0)] {
            let delta = fspl_db(f, 2.0 * r) - fspl_db(f, r);
            assert!((delta - 6.0206).abs() < 0.01, "delta = {:.4}", delta);
        }
    }

    #[test]
    fn test_fspl_frequency_doubling_adds_6db() {
        let delta = fspl_db(6000.0, 10.0) - fspl_db(3000.0, 10.0);
        assert!((delta - 6.0206).abs() < 0.01, "delta = {:.4}", delta);
    }

    #[test]
    fn test_two_ray_near_field_is_exactly_zero() {
        // 3 GHz: wavelength ~0.1 m; two wavelengths of separation is deep
        // inside the 10-lambda guard.
        let f_mhz = 3000.0;
        let lambda_km = SPEED_OF_LIGHT_M_S / (f_mhz * 1e6) / 1000.0;
        let delta = two_ray_delta_db(f_mhz, 2.0 * lambda_km, 30.0, 5.0);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_two_ray_far_field_nonzero_and_clamped() {
        let delta = two_ray_delta_db(3000.0, 20.0, 30.0, 5.0);
        assert!(delta.is_finite());
        assert!(delta.abs() <= TWO_RAY_CLAMP_DB);
        assert!(delta != 0.0, "far-field two-ray delta should interfere");
    }

    #[test]
    fn test_two_ray_grazing_incidence_destructive() {
        // Very low terminals at long range: path difference shrinks toward
        // zero phase, the -1 reflection cancels the direct ray, loss is
        // strongly positive.
        let delta = two_ray_delta_db(300.0, 100.0, 2.0, 2.0);
        assert!(delta > 10.0, "expected deep destructive fade, got {:.2}", delta);
    }

    #[test]
    fn test_two_ray_can_be_constructive() {
        // Sweep range until the rays align in phase at least once.
        let mut best = f64::INFINITY;
        for step in 1..2000 {
            let r = 1.0 + step as f64 * 0.01;
            best = best.min(two_ray_delta_db(1000.0, r, 150.0, 100.0));
        }
        assert!(best < -2.0, "expected a constructive lobe, min delta {:.2}", best);
    }

    #[test]
    fn test_gas_auto_has_standard_peaks() {
        let at_22 = gas_auto_db_per_km(22.235);
        let at_15 = gas_auto_db_per_km(15.0);
        let at_60 = gas_auto_db_per_km(60.0);
        let at_45 = gas_auto_db_per_km(45.0);
        assert!(at_22 > at_15, "water vapour line missing");
        assert!(at_60 > at_45, "oxygen line missing");
        assert!(at_60 > at_22, "oxygen peak should dominate");
        // Low microwave frequencies stay near the dry baseline.
        assert!(gas_auto_db_per_km(3.0) < 0.01);
    }

    #[test]
    fn test_numeric_gas_floor() {
        let atmo = Atmosphere {
            gas_loss: GasLoss::DbPerKm(0.0),
            rain_rate_mmph: 0.0,
            fog_lwc_gm3: 0.0,
        };
        assert_eq!(atmospheric_db_per_km(3000.0, &atmo), MIN_GAS_DB_PER_KM);
    }

    #[test]
    fn test_rain_and_fog_monotone() {
        let dry = Atmosphere {
            gas_loss: GasLoss::DbPerKm(0.01),
            rain_rate_mmph: 0.0,
            fog_lwc_gm3: 0.0,
        };
        let light_rain = Atmosphere {
            rain_rate_mmph: 5.0,
            ..dry
        };
        let heavy_rain = Atmosphere {
            rain_rate_mmph: 50.0,
            ..dry
        };
        let foggy = Atmosphere {
            fog_lwc_gm3: 0.5,
            ..dry
        };
        let f = 10_000.0;
        assert!(atmospheric_db_per_km(f, &light_rain) > atmospheric_db_per_km(f, &dry));
        assert!(atmospheric_db_per_km(f, &heavy_rain) > atmospheric_db_per_km(f, &light_rain));
        assert!(atmospheric_db_per_km(f, &foggy) > atmospheric_db_per_km(f, &dry));
        // Rain attenuation grows with frequency as well.
        assert!(
            atmospheric_db_per_km(20_000.0, &heavy_rain) > atmospheric_db_per_km(5_000.0, &heavy_rain)
        );
    }

    #[test]
    fn test_extra_loss_free_space_is_atmospheric_only() {
        let env = Environment::default();
        let per_km = atmospheric_db_per_km(3000.0, &env.atmosphere);
        let extra = extra_loss_db(3000.0, 10.0, 10.0, 50.0, 0.0, &env);
        assert_relative_eq!(extra, per_km * 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_extra_loss_zero_distance() {
        let env = Environment::default();
        let extra = extra_loss_db(3000.0, 0.0, 0.0, 10.0, 5.0, &env);
        assert_eq!(extra, 0.0);
    }

    #[test]
    fn test_extra_loss_two_ray_model_selected() {
        let env = Environment {
            propagation: PropagationModel::TwoRayFlat,
            atmosphere: Atmosphere {
                gas_loss: GasLoss::DbPerKm(MIN_GAS_DB_PER_KM),
                rain_rate_mmph: 0.0,
                fog_lwc_gm3: 0.0,
            },
        };
        let horizontal = 20.0;
        let slant = 20.0;
        let extra = extra_loss_db(3000.0, slant, horizontal, 30.0, 5.0, &env);
        let expected = two_ray_delta_db(3000.0, horizontal, 30.0, 5.0) + MIN_GAS_DB_PER_KM * slant;
        assert_relative_eq!(extra, expected, max_relative = 1e-12);
    }
}
