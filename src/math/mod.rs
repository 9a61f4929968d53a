use crate::error::{GeometryError, Result};

pub mod phi;
pub mod polygon_2d;
pub mod roots;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Rigid placement of a component inside a composite shape.
pub type Isometry3 = nalgebra::Isometry3<f64>;

/// Global geometric tolerance for floating-point comparisons.
///
/// Radii below this value are treated as absent (no inner surface).
pub const TOLERANCE: f64 = 1e-10;

/// Slack used when re-checking that a computed hit lies on the finite patch
/// of a surface.
pub const PATCH_TOLERANCE: f64 = 1e-9;

/// Distance returned when a ray never reaches a boundary.
pub const BIG: f64 = 1e30;

/// Number of azimuthal segments used by mesh generators.
///
/// Not consulted by any query in this crate.
pub const DEFAULT_PHI_SEGMENTS: u32 = 20;

/// Orients `normal` so that it does not point against `dir`.
#[must_use]
pub fn orient_along(normal: Vector3, dir: &Vector3) -> Vector3 {
    if normal.dot(dir) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Rejects NaN and infinite parameter values.
pub(crate) fn check_finite(parameter: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeometryError::ParameterOutOfRange {
            parameter,
            value,
            min: f64::MIN,
            max: f64::MAX,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeonavError;

    #[test]
    fn check_finite_passes_values_through() {
        assert_eq!(check_finite("dz", 1.5).ok(), Some(1.5));
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                check_finite("dz", bad),
                Err(GeonavError::Geometry(GeometryError::ParameterOutOfRange { parameter: "dz", .. }))
            ));
        }
    }
}
