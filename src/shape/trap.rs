//! Trapezoidal hexahedra built from angles and half-lengths.
//!
//! Both shapes compute their eight vertices once and delegate every query
//! to [`Arb8`].

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::{check_finite, Point2, Point3, Vector3};

use super::tube::check_non_negative;
use super::{Arb8, BoundingBox, Solid};

/// Parameters of a general trapezoid, angles in degrees.
///
/// `theta` and `phi` give the direction of the line joining the centers of
/// the two caps. Each cap has a half-height `h` along y, half-widths `bl`
/// at `-h` and `tl` at `+h`, and a tilt `alpha` of its center line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapDims {
    /// Half-length along z.
    pub dz: f64,
    /// Polar angle of the line joining the cap centers.
    pub theta: f64,
    /// Azimuth of the line joining the cap centers.
    pub phi: f64,
    /// Half-height of the bottom cap.
    pub h1: f64,
    /// Half-width of the bottom cap at `y = -h1`.
    pub bl1: f64,
    /// Half-width of the bottom cap at `y = +h1`.
    pub tl1: f64,
    /// Tilt of the bottom cap center line.
    pub alpha1: f64,
    /// Half-height of the top cap.
    pub h2: f64,
    /// Half-width of the top cap at `y = -h2`.
    pub bl2: f64,
    /// Half-width of the top cap at `y = +h2`.
    pub tl2: f64,
    /// Tilt of the top cap center line.
    pub alpha2: f64,
}

impl TrapDims {
    /// A right box with half-lengths `dx`, `dy`, `dz`.
    #[must_use]
    pub fn cuboid(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            dz,
            theta: 0.0,
            phi: 0.0,
            h1: dy,
            bl1: dx,
            tl1: dx,
            alpha1: 0.0,
            h2: dy,
            bl2: dx,
            tl2: dx,
            alpha2: 0.0,
        }
    }

    fn validated(self) -> Result<Self> {
        for (name, value) in [("theta", self.theta), ("phi", self.phi), ("alpha1", self.alpha1), ("alpha2", self.alpha2)] {
            check_finite(name, value)?;
        }
        for (name, value) in [
            ("dz", self.dz),
            ("h1", self.h1),
            ("bl1", self.bl1),
            ("tl1", self.tl1),
            ("h2", self.h2),
            ("bl2", self.bl2),
            ("tl2", self.tl2),
        ] {
            check_non_negative(name, value)?;
        }
        if self.theta.abs() >= 90.0 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "theta",
                value: self.theta,
                min: -90.0,
                max: 90.0,
            }
            .into());
        }
        Ok(self)
    }

    /// Cap vertices in clockwise order, bottom cap first.
    fn vertices(&self) -> [Point2; 8] {
        let (st, ct) = self.theta.to_radians().sin_cos();
        let (sp, cp) = self.phi.to_radians().sin_cos();
        let tx = st / ct * cp;
        let ty = st / ct * sp;
        let ta1 = self.alpha1.to_radians().tan();
        let ta2 = self.alpha2.to_radians().tan();
        let cap = |sign: f64, h: f64, bl: f64, tl: f64, ta: f64| {
            let (cx, cy) = (sign * self.dz * tx, sign * self.dz * ty);
            [
                Point2::new(cx - h * ta - bl, cy - h),
                Point2::new(cx + h * ta - tl, cy + h),
                Point2::new(cx + h * ta + tl, cy + h),
                Point2::new(cx - h * ta + bl, cy - h),
            ]
        };
        let b = cap(-1.0, self.h1, self.bl1, self.tl1, ta1);
        let t = cap(1.0, self.h2, self.bl2, self.tl2, ta2);
        [b[0], b[1], b[2], b[3], t[0], t[1], t[2], t[3]]
    }
}

/// A trapezoidal hexahedron with planar caps.
#[derive(Debug, Clone)]
pub struct Trap {
    dims: TrapDims,
    arb: Arb8,
}

impl Trap {
    /// Creates a trapezoid.
    ///
    /// # Errors
    ///
    /// Returns an error if a length is negative, `theta` is not within
    /// `(-90, 90)` degrees, or the vertices do not form a hexahedron.
    pub fn new(dims: TrapDims) -> Result<Self> {
        let dims = dims.validated()?;
        let arb = Arb8::new(dims.dz, dims.vertices())?;
        Ok(Self { dims, arb })
    }

    #[must_use]
    pub fn dims(&self) -> &TrapDims {
        &self.dims
    }

    /// The general hexahedron answering the queries.
    #[must_use]
    pub fn arb8(&self) -> &Arb8 {
        &self.arb
    }
}

/// A trapezoid whose top cap is turned about z by `twist` degrees.
#[derive(Debug, Clone)]
pub struct Gtra {
    dims: TrapDims,
    twist: f64,
    arb: Arb8,
}

impl Gtra {
    /// Creates a twisted trapezoid.
    ///
    /// # Errors
    ///
    /// Returns an error as [`Trap::new`] does, or if `twist` is not finite.
    pub fn new(dims: TrapDims, twist: f64) -> Result<Self> {
        let dims = dims.validated()?;
        let twist = check_finite("twist", twist)?;
        let mut vertices = dims.vertices();
        let (s, c) = twist.to_radians().sin_cos();
        for v in &mut vertices[4..] {
            *v = Point2::new(v.x * c + v.y * s, -v.x * s + v.y * c);
        }
        let arb = Arb8::new(dims.dz, vertices)?;
        Ok(Self { dims, twist, arb })
    }

    #[must_use]
    pub fn dims(&self) -> &TrapDims {
        &self.dims
    }

    /// Rotation of the top cap, in degrees.
    #[must_use]
    pub fn twist(&self) -> f64 {
        self.twist
    }

    #[must_use]
    pub fn arb8(&self) -> &Arb8 {
        &self.arb
    }
}

macro_rules! delegate_to_arb8 {
    ($($shape:ty),*) => {
        $(
            impl Solid for $shape {
                fn contains(&self, point: &Point3) -> bool {
                    self.arb.contains(point)
                }

                fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
                    self.arb.distance_in(point, dir)
                }

                fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
                    self.arb.distance_out(point, dir)
                }

                fn safety(&self, point: &Point3, inside: bool) -> f64 {
                    self.arb.safety(point, inside)
                }

                fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
                    self.arb.normal(point, dir)
                }

                fn bounding_box(&self) -> &BoundingBox {
                    self.arb.bounding_box()
                }

                fn compute_bbox(&mut self) {
                    self.arb.compute_bbox();
                }
            }
        )*
    };
}

delegate_to_arb8!(Trap, Gtra);

fn fmt_dims(f: &mut fmt::Formatter<'_>, d: &TrapDims) -> fmt::Result {
    write!(
        f,
        "dz={:.5} theta={:.5} phi={:.5} h1={:.5} bl1={:.5} tl1={:.5} alpha1={:.5} \
         h2={:.5} bl2={:.5} tl2={:.5} alpha2={:.5}",
        d.dz, d.theta, d.phi, d.h1, d.bl1, d.tl1, d.alpha1, d.h2, d.bl2, d.tl2, d.alpha2
    )
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trap ")?;
        fmt_dims(f, &self.dims)
    }
}

impl fmt::Display for Gtra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gtra ")?;
        fmt_dims(f, &self.dims)?;
        write!(f, " twist={:.5}", self.twist)
    }
}
