//! Shape construction from flat parameter arrays.
//!
//! The layouts follow the GEANT3 conventions: a four-letter shape name and
//! a list of numbers, angles in degrees. A negative length marks a
//! dimension inherited from the mother shape for the kinds that support
//! deferral (tubes, cones and trapezoids).

use crate::error::{GeometryError, ParameterError, Result};
use crate::math::{Point2, Vector3};

use super::polycone::Section;
use super::runtime::{Dimension, RuntimeShape, ShapeDef};
use super::trap::TrapDims;
use super::{Arb8, Cone, ConeSeg, CutTube, Polycone, Polygon, Shape, Tube, TubeSeg};

fn expect_len(shape: &'static str, params: &[f64], expected: usize) -> Result<()> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(ParameterError::Count {
            shape,
            expected,
            got: params.len(),
        }
        .into())
    }
}

fn expect_at_least(shape: &'static str, params: &[f64], expected: usize) -> Result<()> {
    if params.len() < expected {
        return Err(ParameterError::Count {
            shape,
            expected,
            got: params.len(),
        }
        .into());
    }
    Ok(())
}

/// Reads a count stored as a float, at most `u32::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(parameter: &'static str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) || value.fract() != 0.0 {
        return Err(GeometryError::ParameterOutOfRange {
            parameter,
            value,
            min: 0.0,
            max: f64::from(u32::MAX),
        }
        .into());
    }
    Ok(value as usize)
}

fn any_deferred(values: &[f64]) -> bool {
    values.iter().any(|v| *v < 0.0)
}

fn ready(shape: impl Into<Shape>) -> ShapeDef {
    ShapeDef::Ready(shape.into())
}

fn sections(shape: &'static str, params: &[f64], header: usize, nz: usize) -> Result<Vec<Section>> {
    let expected = nz
        .checked_mul(3)
        .and_then(|n| n.checked_add(header))
        .ok_or(ParameterError::Count {
            shape,
            expected: usize::MAX,
            got: params.len(),
        })?;
    expect_len(shape, params, expected)?;
    Ok(params[header..]
        .chunks_exact(3)
        .map(|s| Section::new(s[0], s[1], s[2]))
        .collect())
}

fn trap_dims(p: &[f64]) -> TrapDims {
    TrapDims {
        dz: p[0],
        theta: p[1],
        phi: p[2],
        h1: p[3],
        bl1: p[4],
        tl1: p[5],
        alpha1: p[6],
        h2: p[7],
        bl2: p[8],
        tl2: p[9],
        alpha2: p[10],
    }
}

/// Builds a shape from its name and parameter array.
///
/// | name | parameters |
/// |------|------------|
/// | `TUBE` | rmin rmax dz |
/// | `TUBS` | rmin rmax dz phi1 phi2 |
/// | `CTUB` | rmin rmax dz phi1 phi2 lx ly lz hx hy hz |
/// | `CONE` | dz rmin1 rmax1 rmin2 rmax2 |
/// | `CONS` | dz rmin1 rmax1 rmin2 rmax2 phi1 phi2 |
/// | `PCON` | phi1 dphi nz, then z rmin rmax per plane |
/// | `PGON` | phi1 dphi nedges nz, then z rmin rmax per plane |
/// | `TRAP` | dz theta phi h1 bl1 tl1 alpha1 h2 bl2 tl2 alpha2 |
/// | `GTRA` | dz theta phi twist h1 bl1 tl1 alpha1 h2 bl2 tl2 alpha2 |
/// | `ARB8` | dz, then x y for each of the eight vertices |
///
/// # Errors
///
/// Returns [`ParameterError::UnknownShape`] for an unrecognized name,
/// [`ParameterError::Count`] for a wrong number of values, or the
/// constructor error of the shape.
pub fn from_params(name: &str, params: &[f64]) -> Result<ShapeDef> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TUBE" => {
            expect_len("TUBE", params, 3)?;
            let [rmin, rmax, dz] = [params[0], params[1], params[2]];
            if any_deferred(params) {
                return Ok(ShapeDef::Runtime(RuntimeShape::Tube {
                    rmin: Dimension::from_signed(rmin),
                    rmax: Dimension::from_signed(rmax),
                    dz: Dimension::from_signed(dz),
                }));
            }
            Ok(ready(Tube::new(rmin, rmax, dz)?))
        }
        "TUBS" => {
            expect_len("TUBS", params, 5)?;
            let [rmin, rmax, dz, phi1, phi2] = [params[0], params[1], params[2], params[3], params[4]];
            if any_deferred(&params[..3]) {
                return Ok(ShapeDef::Runtime(RuntimeShape::TubeSeg {
                    rmin: Dimension::from_signed(rmin),
                    rmax: Dimension::from_signed(rmax),
                    dz: Dimension::from_signed(dz),
                    phi1,
                    phi2,
                }));
            }
            Ok(ready(TubeSeg::new(rmin, rmax, dz, phi1, phi2)?))
        }
        "CTUB" => {
            expect_len("CTUB", params, 11)?;
            let low = Vector3::new(params[5], params[6], params[7]);
            let high = Vector3::new(params[8], params[9], params[10]);
            Ok(ready(CutTube::new(
                params[0], params[1], params[2], params[3], params[4], low, high,
            )?))
        }
        "CONE" => {
            expect_len("CONE", params, 5)?;
            if any_deferred(params) {
                return Ok(ShapeDef::Runtime(RuntimeShape::Cone {
                    dz: Dimension::from_signed(params[0]),
                    rmin1: Dimension::from_signed(params[1]),
                    rmax1: Dimension::from_signed(params[2]),
                    rmin2: Dimension::from_signed(params[3]),
                    rmax2: Dimension::from_signed(params[4]),
                }));
            }
            Ok(ready(Cone::new(params[0], params[1], params[2], params[3], params[4])?))
        }
        "CONS" => {
            expect_len("CONS", params, 7)?;
            if any_deferred(&params[..5]) {
                return Ok(ShapeDef::Runtime(RuntimeShape::ConeSeg {
                    dz: Dimension::from_signed(params[0]),
                    rmin1: Dimension::from_signed(params[1]),
                    rmax1: Dimension::from_signed(params[2]),
                    rmin2: Dimension::from_signed(params[3]),
                    rmax2: Dimension::from_signed(params[4]),
                    phi1: params[5],
                    phi2: params[6],
                }));
            }
            Ok(ready(ConeSeg::new(
                params[0], params[1], params[2], params[3], params[4], params[5], params[6],
            )?))
        }
        "PCON" => {
            expect_at_least("PCON", params, 3)?;
            let nz = count("nz", params[2])?;
            let sections = sections("PCON", params, 3, nz)?;
            Ok(ready(Polycone::new(params[0], params[1], sections)?))
        }
        "PGON" => {
            expect_at_least("PGON", params, 4)?;
            let nedges = count("nedges", params[2])?;
            let nz = count("nz", params[3])?;
            let sections = sections("PGON", params, 4, nz)?;
            Ok(ready(Polygon::new(params[0], params[1], nedges, sections)?))
        }
        "TRAP" => {
            expect_len("TRAP", params, 11)?;
            ShapeDef::trap(&trap_dims(params), None)
        }
        "GTRA" => {
            expect_len("GTRA", params, 12)?;
            let twist = params[3];
            let rest: Vec<f64> = params[..3].iter().chain(&params[4..]).copied().collect();
            ShapeDef::trap(&trap_dims(&rest), Some(twist))
        }
        "ARB8" => {
            expect_len("ARB8", params, 17)?;
            let mut vertices = [Point2::origin(); 8];
            for (v, xy) in vertices.iter_mut().zip(params[1..].chunks_exact(2)) {
                *v = Point2::new(xy[0], xy[1]);
            }
            Ok(ready(Arb8::new(params[0], vertices)?))
        }
        _ => Err(ParameterError::UnknownShape(name.to_string()).into()),
    }
}
