//! Directional-angle conventions.
//!
//! Models report directions either as mathematical angles (counter-clockwise
//! from east) or as compass azimuths (clockwise from north). The two are
//! related by `azimuth = 90° - math`, which is its own inverse.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

/// How a directional angle is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleConvention {
    /// Counter-clockwise from the positive x axis (east).
    Math,
    /// Clockwise from north.
    Azimuth,
}

impl AngleConvention {
    /// The convention a variable uses, inferred from its name.
    pub fn of_variable(name: &str) -> AngleConvention {
        if name.contains("azimuth") {
            AngleConvention::Azimuth
        } else {
            AngleConvention::Math
        }
    }
}

impl std::fmt::Display for AngleConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AngleConvention::Math => write!(f, "math"),
            AngleConvention::Azimuth => write!(f, "azimuth"),
        }
    }
}

fn quarter_turn(radians: bool) -> f64 {
    if radians {
        FRAC_PI_2
    } else {
        90.0
    }
}

/// Convert mathematical angles to azimuths in place.
pub fn to_azimuth(angles: &mut [f64], radians: bool) {
    let q = quarter_turn(radians);
    for a in angles.iter_mut() {
        *a = q - *a;
    }
}

/// Convert azimuths to mathematical angles in place.
pub fn to_math(angles: &mut [f64], radians: bool) {
    let q = quarter_turn(radians);
    for a in angles.iter_mut() {
        *a = q - *a;
    }
}

/// Re-express `angles`, currently in `from`, in the `to` convention.
pub fn convert(angles: &mut [f64], from: AngleConvention, to: AngleConvention, radians: bool) {
    match (from, to) {
        (AngleConvention::Math, AngleConvention::Azimuth) => to_azimuth(angles, radians),
        (AngleConvention::Azimuth, AngleConvention::Math) => to_math(angles, radians),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_east_is_azimuth_ninety() {
        let mut a = [0.0, 90.0, 180.0];
        to_azimuth(&mut a, false);
        assert_eq!(a, [90.0, 0.0, -90.0]);
    }

    #[test]
    fn test_radians() {
        let mut a = [FRAC_PI_2];
        to_math(&mut a, true);
        assert_eq!(a, [0.0]);
    }

    #[test]
    fn test_convention_from_name() {
        assert_eq!(
            AngleConvention::of_variable("sea_surface_wave__azimuth_angle_of_opposite_of_phase_velocity"),
            AngleConvention::Azimuth
        );
        assert_eq!(AngleConvention::of_variable("wind__direction"), AngleConvention::Math);
    }

    #[test]
    fn test_same_convention_is_noop() {
        let mut a = [12.5];
        convert(&mut a, AngleConvention::Azimuth, AngleConvention::Azimuth, false);
        assert_eq!(a, [12.5]);
    }

    proptest! {
        #[test]
        fn prop_azimuth_math_inverse(x in -1.0e4f64..1.0e4, radians in any::<bool>()) {
            let mut a = [x];
            to_math(&mut a, radians);
            to_azimuth(&mut a, radians);
            prop_assert!((a[0] - x).abs() <= 1e-9 * x.abs().max(1.0));

            let mut b = [x];
            to_azimuth(&mut b, radians);
            to_math(&mut b, radians);
            prop_assert!((b[0] - x).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }
}
