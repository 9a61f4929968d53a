//! Shapes with dimensions deferred until placement.
//!
//! A [`RuntimeShape`] carries some dimensions as
//! [`Dimension::InheritFromMother`]. Once the enclosing (mother) shape is
//! known, [`RuntimeShape::resolve`] produces an ordinary [`Shape`].

use crate::error::{Result, RuntimeError};

use super::trap::TrapDims;
use super::{Axis, Cone, ConeSeg, Gtra, Shape, Solid, Trap, Tube, TubeSeg};

/// A dimension that is either known or taken from the mother shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    Fixed(f64),
    #[default]
    InheritFromMother,
}

impl Dimension {
    /// Maps the parameter-array convention: negative values are inherited.
    #[must_use]
    pub fn from_signed(value: f64) -> Self {
        if value < 0.0 {
            Self::InheritFromMother
        } else {
            Self::Fixed(value)
        }
    }

    #[must_use]
    pub fn is_inherited(&self) -> bool {
        matches!(self, Self::InheritFromMother)
    }

    fn or_else(self, inherit: impl FnOnce() -> Result<f64>) -> Result<f64> {
        match self {
            Self::Fixed(value) => Ok(value),
            Self::InheritFromMother => inherit(),
        }
    }
}

impl From<f64> for Dimension {
    fn from(value: f64) -> Self {
        Self::Fixed(value)
    }
}

/// Trapezoid parameters whose lengths may be inherited. Angles are always
/// fixed.
///
/// Fields mirror [`TrapDims`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredTrapDims {
    /// Half-length along z.
    pub dz: Dimension,
    /// Polar angle of the line joining the cap centers.
    pub theta: f64,
    /// Azimuth of the line joining the cap centers.
    pub phi: f64,
    /// Half-height of the bottom cap.
    pub h1: Dimension,
    /// Bottom cap half-width at `y = -h1`.
    pub bl1: Dimension,
    /// Bottom cap half-width at `y = +h1`.
    pub tl1: Dimension,
    /// Tilt of the bottom cap center line.
    pub alpha1: f64,
    /// Half-height of the top cap.
    pub h2: Dimension,
    /// Top cap half-width at `y = -h2`.
    pub bl2: Dimension,
    /// Top cap half-width at `y = +h2`.
    pub tl2: Dimension,
    /// Tilt of the top cap center line.
    pub alpha2: f64,
}

impl DeferredTrapDims {
    /// Applies the parameter-array sign convention to every length.
    #[must_use]
    pub fn from_signed(dims: &TrapDims) -> Self {
        Self {
            dz: Dimension::from_signed(dims.dz),
            theta: dims.theta,
            phi: dims.phi,
            h1: Dimension::from_signed(dims.h1),
            bl1: Dimension::from_signed(dims.bl1),
            tl1: Dimension::from_signed(dims.tl1),
            alpha1: dims.alpha1,
            h2: Dimension::from_signed(dims.h2),
            bl2: Dimension::from_signed(dims.bl2),
            tl2: Dimension::from_signed(dims.tl2),
            alpha2: dims.alpha2,
        }
    }

    fn is_deferred(&self) -> bool {
        [self.dz, self.h1, self.bl1, self.tl1, self.h2, self.bl2, self.tl2]
            .iter()
            .any(Dimension::is_inherited)
    }

    fn resolve(&self, mother: &TrapDims) -> TrapDims {
        let pick = |d: Dimension, inherited: f64| match d {
            Dimension::Fixed(v) => v,
            Dimension::InheritFromMother => inherited,
        };
        TrapDims {
            dz: pick(self.dz, mother.dz),
            theta: self.theta,
            phi: self.phi,
            h1: pick(self.h1, mother.h1),
            bl1: pick(self.bl1, mother.bl1),
            tl1: pick(self.tl1, mother.tl1),
            alpha1: self.alpha1,
            h2: pick(self.h2, mother.h2),
            bl2: pick(self.bl2, mother.bl2),
            tl2: pick(self.tl2, mother.tl2),
            alpha2: self.alpha2,
        }
    }
}

/// A shape with at least one dimension taken from its mother.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeShape {
    Tube {
        rmin: Dimension,
        rmax: Dimension,
        dz: Dimension,
    },
    TubeSeg {
        rmin: Dimension,
        rmax: Dimension,
        dz: Dimension,
        phi1: f64,
        phi2: f64,
    },
    Cone {
        dz: Dimension,
        rmin1: Dimension,
        rmax1: Dimension,
        rmin2: Dimension,
        rmax2: Dimension,
    },
    ConeSeg {
        dz: Dimension,
        rmin1: Dimension,
        rmax1: Dimension,
        rmin2: Dimension,
        rmax2: Dimension,
        phi1: f64,
        phi2: f64,
    },
    Trap(DeferredTrapDims),
    Gtra { dims: DeferredTrapDims, twist: f64 },
}

/// Mother ranges consulted while resolving revolution solids.
struct MotherRanges<'a> {
    mother: &'a Shape,
}

impl MotherRanges<'_> {
    fn range(&self, axis: Axis, parameter: &'static str) -> Result<(f64, f64)> {
        self.mother.axis_range(axis).ok_or_else(|| {
            tracing::warn!(mother = self.mother.kind(), parameter, "mother has no range along the needed axis");
            RuntimeError::InvalidMother(format!("{} has no {axis:?} range", self.mother.kind())).into()
        })
    }

    fn dz(&self) -> Result<f64> {
        let (_, hi) = self.range(Axis::Z, "dz")?;
        if hi < 0.0 {
            return Err(RuntimeError::Unresolvable("dz").into());
        }
        Ok(hi)
    }

    fn rmin(&self) -> Result<f64> {
        let (lo, _) = self.range(Axis::Radial, "rmin")?;
        if lo < 0.0 {
            return Err(RuntimeError::Unresolvable("rmin").into());
        }
        Ok(lo)
    }

    fn rmax(&self) -> Result<f64> {
        let (_, hi) = self.range(Axis::Radial, "rmax")?;
        if hi <= 0.0 {
            return Err(RuntimeError::Unresolvable("rmax").into());
        }
        Ok(hi)
    }

    /// Resolves an `(rmin, rmax)` pair. With `reinherit_thin`, a fixed outer
    /// radius not above the inner one is replaced by the mother's.
    fn radii(&self, rmin: Dimension, rmax: Dimension, reinherit_thin: bool) -> Result<(f64, f64)> {
        let rmin = rmin.or_else(|| self.rmin())?;
        let rmax = match rmax {
            Dimension::Fixed(v) if reinherit_thin && v <= rmin => self.rmax()?,
            other => other.or_else(|| self.rmax())?,
        };
        Ok((rmin, rmax))
    }
}

fn trap_mother(mother: &Shape) -> Result<&TrapDims> {
    match mother {
        Shape::Trap(t) => Ok(t.dims()),
        Shape::Gtra(g) => Ok(g.dims()),
        other => {
            tracing::warn!(mother = other.kind(), "trapezoid can only inherit from a trapezoid");
            Err(RuntimeError::InvalidMother(other.kind().to_string()).into())
        }
    }
}

impl RuntimeShape {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tube { .. } => "Tube",
            Self::TubeSeg { .. } => "TubeSeg",
            Self::Cone { .. } => "Cone",
            Self::ConeSeg { .. } => "ConeSeg",
            Self::Trap(_) => "Trap",
            Self::Gtra { .. } => "Gtra",
        }
    }

    /// Builds the concrete shape, taking inherited dimensions from `mother`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidMother`] when the mother cannot
    /// supply the missing dimensions, [`RuntimeError::Unresolvable`] when
    /// its range is unusable, or the constructor error of the resolved shape.
    pub fn resolve(&self, mother: &Shape) -> Result<Shape> {
        let ranges = MotherRanges { mother };
        let shape: Shape = match *self {
            Self::Tube { rmin, rmax, dz } => {
                let dz = dz.or_else(|| ranges.dz())?;
                let (rmin, rmax) = ranges.radii(rmin, rmax, false)?;
                Tube::new(rmin, rmax, dz)?.into()
            }
            Self::TubeSeg {
                rmin,
                rmax,
                dz,
                phi1,
                phi2,
            } => {
                let dz = dz.or_else(|| ranges.dz())?;
                let (rmin, rmax) = ranges.radii(rmin, rmax, true)?;
                TubeSeg::new(rmin, rmax, dz, phi1, phi2)?.into()
            }
            Self::Cone {
                dz,
                rmin1,
                rmax1,
                rmin2,
                rmax2,
            } => {
                let dz = dz.or_else(|| ranges.dz())?;
                let (rmin1, rmax1) = ranges.radii(rmin1, rmax1, false)?;
                let (rmin2, rmax2) = ranges.radii(rmin2, rmax2, false)?;
                Cone::new(dz, rmin1, rmax1, rmin2, rmax2)?.into()
            }
            Self::ConeSeg {
                dz,
                rmin1,
                rmax1,
                rmin2,
                rmax2,
                phi1,
                phi2,
            } => {
                let dz = dz.or_else(|| ranges.dz())?;
                let (rmin1, rmax1) = ranges.radii(rmin1, rmax1, false)?;
                let (rmin2, rmax2) = ranges.radii(rmin2, rmax2, false)?;
                ConeSeg::new(dz, rmin1, rmax1, rmin2, rmax2, phi1, phi2)?.into()
            }
            Self::Trap(dims) => Trap::new(dims.resolve(trap_mother(mother)?))?.into(),
            Self::Gtra { dims, twist } => Gtra::new(dims.resolve(trap_mother(mother)?), twist)?.into(),
        };
        tracing::debug!(kind = self.kind(), mother = mother.kind(), resolved = %shape, "resolved runtime shape");
        Ok(shape)
    }
}

/// A shape definition that is either complete or awaits its mother.
#[derive(Debug, Clone)]
pub enum ShapeDef {
    Ready(Shape),
    Runtime(RuntimeShape),
}

impl ShapeDef {
    /// Wraps deferred trapezoid dimensions, or builds the shape directly
    /// when nothing is inherited.
    pub(crate) fn trap(dims: &TrapDims, twist: Option<f64>) -> Result<Self> {
        let deferred = DeferredTrapDims::from_signed(dims);
        if deferred.is_deferred() {
            return Ok(Self::Runtime(match twist {
                Some(twist) => RuntimeShape::Gtra { dims: deferred, twist },
                None => RuntimeShape::Trap(deferred),
            }));
        }
        Ok(Self::Ready(match twist {
            Some(twist) => Gtra::new(*dims, twist)?.into(),
            None => Trap::new(*dims)?.into(),
        }))
    }

    #[must_use]
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// The finished shape, resolving against `mother` when needed.
    ///
    /// # Errors
    ///
    /// Returns the resolution error of [`RuntimeShape::resolve`].
    pub fn into_shape(self, mother: &Shape) -> Result<Shape> {
        match self {
            Self::Ready(shape) => Ok(shape),
            Self::Runtime(runtime) => runtime.resolve(mother),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GeonavError;
    use crate::shape::Arb8;
    use crate::math::Point2;

    fn tube_mother() -> Shape {
        Tube::new(2.0, 6.0, 8.0).unwrap().into()
    }

    #[test]
    fn signed_values_map_to_dimensions() {
        assert_eq!(Dimension::from_signed(-1.0), Dimension::InheritFromMother);
        assert_eq!(Dimension::from_signed(0.0), Dimension::Fixed(0.0));
        assert_eq!(Dimension::from(3.5), Dimension::Fixed(3.5));
    }

    #[test]
    fn tube_inherits_length_and_radii() {
        let rt = RuntimeShape::Tube {
            rmin: Dimension::InheritFromMother,
            rmax: Dimension::Fixed(4.0),
            dz: Dimension::InheritFromMother,
        };
        let Shape::Tube(t) = rt.resolve(&tube_mother()).unwrap() else {
            panic!("expected a tube");
        };
        assert_eq!((t.rmin(), t.rmax(), t.dz()), (2.0, 4.0, 8.0));
    }

    #[test]
    fn thin_tube_segment_takes_mother_rmax() {
        let rt = RuntimeShape::TubeSeg {
            rmin: Dimension::Fixed(3.0),
            rmax: Dimension::Fixed(1.0),
            dz: Dimension::Fixed(1.0),
            phi1: 0.0,
            phi2: 90.0,
        };
        let Shape::TubeSeg(t) = rt.resolve(&tube_mother()).unwrap() else {
            panic!("expected a tube segment");
        };
        assert_eq!((t.rmin(), t.rmax(), t.dz()), (3.0, 6.0, 1.0));
        assert_eq!(t.phi().phi2(), 90.0);
    }

    #[test]
    fn cone_inherits_each_end() {
        let rt = RuntimeShape::Cone {
            dz: Dimension::Fixed(2.0),
            rmin1: Dimension::Fixed(0.0),
            rmax1: Dimension::InheritFromMother,
            rmin2: Dimension::InheritFromMother,
            rmax2: Dimension::Fixed(5.0),
        };
        let Shape::Cone(c) = rt.resolve(&tube_mother()).unwrap() else {
            panic!("expected a cone");
        };
        let f = c.frustum();
        assert_eq!((f.rmin1, f.rmax1, f.rmin2, f.rmax2), (0.0, 6.0, 2.0, 5.0));
    }

    #[test]
    fn trap_inherits_from_trap_mother() {
        let mother: Shape = Trap::new(TrapDims::cuboid(3.0, 4.0, 5.0)).unwrap().into();
        let deferred = DeferredTrapDims::from_signed(&TrapDims {
            dz: -1.0,
            ..TrapDims::cuboid(1.0, -1.0, 0.0)
        });
        let Shape::Trap(t) = RuntimeShape::Trap(deferred).resolve(&mother).unwrap() else {
            panic!("expected a trapezoid");
        };
        assert_eq!(t.dims().dz, 5.0);
        assert_eq!(t.dims().h1, 4.0);
        assert_eq!(t.dims().bl1, 1.0);

        let gtra = RuntimeShape::Gtra { dims: deferred, twist: 10.0 };
        assert!(matches!(gtra.resolve(&mother).unwrap(), Shape::Gtra(_)));
    }

    #[test]
    fn trap_rejects_other_mothers() {
        let deferred = DeferredTrapDims::from_signed(&TrapDims::cuboid(-1.0, 1.0, 1.0));
        let err = RuntimeShape::Trap(deferred).resolve(&tube_mother()).unwrap_err();
        assert!(matches!(err, GeonavError::Runtime(RuntimeError::InvalidMother(_))));
    }

    #[test]
    fn tube_needs_a_radial_mother() {
        let sq = [
            Point2::new(-1.0, -1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, -1.0),
        ];
        let arb: Shape = Arb8::new(1.0, [sq[0], sq[1], sq[2], sq[3], sq[0], sq[1], sq[2], sq[3]])
            .unwrap()
            .into();
        let rt = RuntimeShape::Tube {
            rmin: Dimension::Fixed(0.0),
            rmax: Dimension::InheritFromMother,
            dz: Dimension::Fixed(1.0),
        };
        let err = rt.resolve(&arb).unwrap_err();
        assert!(matches!(err, GeonavError::Runtime(RuntimeError::InvalidMother(_))));

        // The z range of any shape is enough for an inherited length.
        let rt = RuntimeShape::Tube {
            rmin: Dimension::Fixed(0.0),
            rmax: Dimension::Fixed(1.0),
            dz: Dimension::InheritFromMother,
        };
        let Shape::Tube(t) = rt.resolve(&arb).unwrap() else {
            panic!("expected a tube");
        };
        assert_eq!(t.dz(), 1.0);
    }

    #[test]
    fn shape_def_passes_ready_shapes_through() {
        let def = ShapeDef::trap(&TrapDims::cuboid(1.0, 1.0, 1.0), None).unwrap();
        assert!(!def.is_runtime());
        let def = ShapeDef::trap(&TrapDims::cuboid(1.0, -1.0, 1.0), Some(5.0)).unwrap();
        assert!(def.is_runtime());
        let mother: Shape = Trap::new(TrapDims::cuboid(2.0, 2.0, 2.0)).unwrap().into();
        assert!(matches!(def.into_shape(&mother).unwrap(), Shape::Gtra(_)));
    }
}
