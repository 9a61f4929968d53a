use std::fmt;

use crate::math::{Isometry3, Point3, Vector3, BIG, PATCH_TOLERANCE};

/// An axis-aligned box given by its center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    origin: Point3,
    dx: f64,
    dy: f64,
    dz: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Point3::origin(), 0.0, 0.0, 0.0)
    }
}

impl BoundingBox {
    /// Creates a box from its center and half-extents (taken by magnitude).
    #[must_use]
    pub fn new(origin: Point3, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            origin,
            dx: dx.abs(),
            dy: dy.abs(),
            dz: dz.abs(),
        }
    }

    /// Creates the box spanning two opposite corners.
    #[must_use]
    pub fn from_corners(a: &Point3, b: &Point3) -> Self {
        let min = a.inf(b);
        let max = a.sup(b);
        let half = (max - min) * 0.5;
        Self::new(nalgebra::center(&min, &max), half.x, half.y, half.z)
    }

    /// Center of the box.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Half-extents along x, y and z.
    #[must_use]
    pub fn half_extents(&self) -> Vector3 {
        Vector3::new(self.dx, self.dy, self.dz)
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Point3 {
        self.origin - self.half_extents()
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Point3 {
        self.origin + self.half_extents()
    }

    /// Closed membership test.
    #[must_use]
    pub fn contains(&self, point: &Point3) -> bool {
        let d = point - self.origin;
        d.x.abs() <= self.dx && d.y.abs() <= self.dy && d.z.abs() <= self.dz
    }

    /// Distance along `dir` to the box, zero from inside, [`BIG`] on a miss.
    #[must_use]
    pub fn dist_to_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.clip(point, dir, 0.0)
    }

    /// Returns `true` when the ray provably never meets the box.
    ///
    /// The box is inflated by [`PATCH_TOLERANCE`] so that rays grazing a
    /// shape surface that touches the box are kept.
    #[must_use]
    pub fn misses(&self, point: &Point3, dir: &Vector3) -> bool {
        self.clip(point, dir, PATCH_TOLERANCE) >= BIG
    }

    fn clip(&self, point: &Point3, dir: &Vector3, margin: f64) -> f64 {
        let half = self.half_extents();
        let mut tmin = 0.0_f64;
        let mut tmax = BIG;
        for axis in 0..3 {
            let lo = self.origin[axis] - half[axis] - margin;
            let hi = self.origin[axis] + half[axis] + margin;
            if dir[axis] == 0.0 {
                if point[axis] < lo || point[axis] > hi {
                    return BIG;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let t0 = (lo - point[axis]) * inv;
            let t1 = (hi - point[axis]) * inv;
            tmin = tmin.max(t0.min(t1));
            tmax = tmax.min(t0.max(t1));
            if tmin > tmax {
                return BIG;
            }
        }
        tmin
    }

    /// Conservative distance to the box surface.
    #[must_use]
    pub fn safety(&self, point: &Point3, inside: bool) -> f64 {
        let d = point - self.origin;
        let gaps = [d.x.abs() - self.dx, d.y.abs() - self.dy, d.z.abs() - self.dz];
        let saf = if inside {
            -gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        } else {
            gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        };
        saf.max(0.0)
    }

    /// Smallest box holding both boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self::from_corners(&self.min().inf(&other.min()), &self.max().sup(&other.max()))
    }

    /// Overlap of the two boxes, `None` when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let lo = self.min().sup(&other.min());
        let hi = self.max().inf(&other.max());
        if lo.x > hi.x || lo.y > hi.y || lo.z > hi.z {
            return None;
        }
        Some(Self::from_corners(&lo, &hi))
    }

    /// Axis-aligned box holding this box after a rigid placement.
    #[must_use]
    pub fn transformed(&self, placement: &Isometry3) -> Self {
        let half = self.half_extents();
        let mut lo = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut hi = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in 0..8_u8 {
            let sign = |bit: u8| if corner & bit == 0 { -1.0 } else { 1.0 };
            let local = self.origin
                + Vector3::new(sign(1) * half.x, sign(2) * half.y, sign(4) * half.z);
            let p = placement.transform_point(&local);
            lo = lo.inf(&p);
            hi = hi.sup(&p);
        }
        Self::from_corners(&lo, &hi)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "box origin=({:.5}, {:.5}, {:.5}) half=({:.5}, {:.5}, {:.5})",
            self.origin.x, self.origin.y, self.origin.z, self.dx, self.dy, self.dz
        )
    }
}
