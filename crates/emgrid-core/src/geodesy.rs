//! Spherical geodesy under the effective-earth-radius model
//!
//! Distances, bearings and apparent elevation angles between a source and
//! grid cells, computed on a sphere of radius k * R_E (k = 4/3). The
//! inflated radius folds standard atmospheric refraction into straight-line
//! geometry, which is the usual trick for radio horizon work.
//!
//! All angles are degrees, distances kilometres, altitudes metres. Every
//! function returns finite values for every input; degenerate geometry
//! (coincident points) collapses to zero distance and a zero bearing.

use crate::types::{EFFECTIVE_EARTH_RADIUS_KM, MEAN_EARTH_RADIUS_KM};

/// Horizontal-distance floor used when a cell sits exactly on the source.
const MIN_HORIZONTAL_KM: f64 = 1e-6;

/// Great-circle distance between two points in kilometres on a sphere of the
/// given radius (haversine form, stable for short distances).
pub fn haversine_km(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64, radius_km: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let sin_dlat = (0.5 * dlat).sin();
    let sin_dlon = (0.5 * dlon).sin();
    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    radius_km * c
}

/// Great-circle distance on the effective-earth sphere (k * R_E).
pub fn effective_distance_km(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    haversine_km(lat1_deg, lon1_deg, lat2_deg, lon2_deg, EFFECTIVE_EARTH_RADIUS_KM)
}

/// Great-circle distance on the true mean-radius sphere.
pub fn surface_distance_km(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    haversine_km(lat1_deg, lon1_deg, lat2_deg, lon2_deg, MEAN_EARTH_RADIUS_KM)
}

/// Forward azimuth from point 1 toward point 2, degrees clockwise from
/// geographic north in [0, 360). Coincident points yield 0.
pub fn forward_azimuth_deg(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    if y == 0.0 && x == 0.0 {
        return 0.0;
    }
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Apparent elevation angle from a source to a target, in degrees.
///
/// `delta_alt_m` is target AMSL minus source AMSL. The effective-earth
/// curvature drop d^2 / (2 k R_E) is subtracted from the apparent target
/// height, so distant co-altitude targets sink below the local horizontal.
pub fn elevation_angle_deg(horizontal_km: f64, delta_alt_m: f64) -> f64 {
    let horizontal = horizontal_km.max(MIN_HORIZONTAL_KM);
    let drop_m = horizontal * horizontal / (2.0 * EFFECTIVE_EARTH_RADIUS_KM) * 1000.0;
    let apparent_m = delta_alt_m - drop_m;
    apparent_m.atan2(horizontal * 1000.0).to_degrees()
}

/// Slant range in kilometres from the horizontal ground distance and the
/// altitude difference in metres.
pub fn slant_range_km(horizontal_km: f64, delta_alt_m: f64) -> f64 {
    let dz_km = delta_alt_m / 1000.0;
    (horizontal_km * horizontal_km + dz_km * dz_km).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_haversine_zero_distance() {
        let d = effective_distance_km(30.0, 120.0, 30.0, 120.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude on the true sphere is ~111.2 km.
        let d = surface_distance_km(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, MEAN_EARTH_RADIUS_KM.to_radians(), max_relative = 1e-12);
        assert!((d - 111.19).abs() < 0.1, "got {} km", d);
    }

    #[test]
    fn test_effective_radius_inflates_distance() {
        let true_d = surface_distance_km(0.0, 0.0, 1.0, 0.0);
        let eff_d = effective_distance_km(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(eff_d / true_d, 4.0 / 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_forward_azimuth_cardinal_directions() {
        assert_relative_eq!(forward_azimuth_deg(0.0, 0.0, 0.0, 90.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(forward_azimuth_deg(0.0, 0.0, 1.0, 0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(forward_azimuth_deg(1.0, 0.0, 0.0, 0.0), 180.0, epsilon = 1e-9);
        assert_relative_eq!(forward_azimuth_deg(0.0, 1.0, 0.0, 0.0), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_forward_azimuth_coincident_points_is_zero() {
        assert_eq!(forward_azimuth_deg(45.0, 10.0, 45.0, 10.0), 0.0);
    }

    #[test]
    fn test_elevation_positive_above() {
        // 1000 m up at 10 km out: a bit under atan(1/10) because of the
        // curvature drop.
        let elev = elevation_angle_deg(10.0, 1000.0);
        assert!(elev > 0.0 && elev < 10.0, "got {} deg", elev);
        let flat = (1000.0f64).atan2(10_000.0).to_degrees();
        assert!(elev < flat);
    }

    #[test]
    fn test_elevation_curvature_drop_sinks_coaltitude_target() {
        // Same altitude, 50 km away: the target is below the local horizontal.
        let elev = elevation_angle_deg(50.0, 0.0);
        assert!(elev < 0.0, "got {} deg", elev);
        // Drop at 50 km is 50^2 / (2 * 8494.7) km ~ 147 m.
        let expected = (-147.15f64).atan2(50_000.0).to_degrees();
        assert_relative_eq!(elev, expected, epsilon = 1e-2);
    }

    #[test]
    fn test_elevation_zero_distance_is_finite() {
        let elev = elevation_angle_deg(0.0, 500.0);
        assert!(elev.is_finite());
        assert!(elev > 89.0, "source-coincident cell looks straight up, got {}", elev);
    }

    #[test]
    fn test_slant_range() {
        assert_relative_eq!(slant_range_km(3.0, 4000.0), 5.0, epsilon = 1e-12);
        assert_eq!(slant_range_km(0.0, 0.0), 0.0);
    }
}
