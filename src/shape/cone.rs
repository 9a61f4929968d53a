//! Conical frustums, round or limited to an azimuthal wedge.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::phi::PhiRange;
use crate::math::roots::quadratic_half;
use crate::math::{orient_along, Point3, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::tube::{check_non_negative, check_radii, z_exit};
use super::{Axis, BoundingBox, BoundingCylinder, Solid};

/// Signed distance, in the meridian half-plane, from radius `r` at height
/// `z` to the generator line through `(r1, z1)` and `(r2, z2)`.
///
/// Positive when `r` lies below the line. The magnitude is the
/// perpendicular distance to the line, which never exceeds the distance to
/// any point of the corresponding conical surface.
pub(crate) fn radial_gap(r: f64, z: f64, z1: f64, r1: f64, z2: f64, r2: f64) -> f64 {
    let tg = (r2 - r1) / (z2 - z1);
    let rz = r1 + tg * (z - z1);
    (rz - r) / (1.0 + tg * tg).sqrt()
}

/// The geometry of a frustum between `z = -dz` and `z = +dz`.
///
/// Radii vary linearly from `(rmin1, rmax1)` at `-dz` to `(rmin2, rmax2)` at
/// `+dz`. Equal radii at both ends describe a tube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Half-length along z.
    pub dz: f64,
    /// Inner radius at `z = -dz`.
    pub rmin1: f64,
    /// Outer radius at `z = -dz`.
    pub rmax1: f64,
    /// Inner radius at `z = +dz`.
    pub rmin2: f64,
    /// Outer radius at `z = +dz`.
    pub rmax2: f64,
}

impl Frustum {
    /// Returns `true` unless both inner radii vanish.
    #[must_use]
    pub fn has_inner(&self) -> bool {
        self.rmin1 > TOLERANCE || self.rmin2 > TOLERANCE
    }

    /// Inner radius at height `z`.
    #[must_use]
    pub fn rmin_at(&self, z: f64) -> f64 {
        let (ro, tg) = self.inner();
        ro + tg * z
    }

    /// Outer radius at height `z`.
    #[must_use]
    pub fn rmax_at(&self, z: f64) -> f64 {
        let (ro, tg) = self.outer();
        ro + tg * z
    }

    // Radius at z = 0 and slope dr/dz of each lateral surface.
    fn inner(&self) -> (f64, f64) {
        (
            0.5 * (self.rmin1 + self.rmin2),
            0.5 * (self.rmin2 - self.rmin1) / self.dz,
        )
    }

    fn outer(&self) -> (f64, f64) {
        (
            0.5 * (self.rmax1 + self.rmax2),
            0.5 * (self.rmax2 - self.rmax1) / self.dz,
        )
    }

    /// Exact membership, optionally limited to a wedge.
    #[must_use]
    pub fn contains(&self, point: &Point3, phi: Option<&PhiRange>) -> bool {
        if point.z.abs() > self.dz {
            return false;
        }
        let r2 = point.x * point.x + point.y * point.y;
        let rmax = self.rmax_at(point.z);
        if r2 > rmax * rmax {
            return false;
        }
        if self.has_inner() {
            let rmin = self.rmin_at(point.z);
            if r2 < rmin * rmin {
                return false;
            }
        }
        phi.map_or(true, |w| w.contains_xy(point.x, point.y))
    }

    /// Smallest `t >= 0` where the ray crosses the lateral surface
    /// `r = ro + tg * z` inside the slab, moving outward (radius growing
    /// past the surface) or inward.
    fn lateral_crossing(
        &self,
        point: &Point3,
        dir: &Vector3,
        (ro, tg): (f64, f64),
        outward: bool,
        phi: Option<&PhiRange>,
    ) -> f64 {
        let rz = ro + tg * point.z;
        let a = dir.x * dir.x + dir.y * dir.y - tg * tg * dir.z * dir.z;
        let b = point.x * dir.x + point.y * dir.y - tg * rz * dir.z;
        let c = point.x * point.x + point.y * point.y - rz * rz;
        let mut best = BIG;
        for t in quadratic_half(a, b, c).iter() {
            if t < -PATCH_TOLERANCE || t >= best {
                continue;
            }
            let slope = a * t + b;
            if (outward && slope <= 0.0) || (!outward && slope >= 0.0) {
                continue;
            }
            let z = point.z + t * dir.z;
            if z.abs() > self.dz + PATCH_TOLERANCE || ro + tg * z < -PATCH_TOLERANCE {
                continue;
            }
            if let Some(w) = phi {
                if !w.contains_xy_tol(point.x + t * dir.x, point.y + t * dir.y) {
                    continue;
                }
            }
            best = t.max(0.0);
        }
        best
    }

    /// Exit distance from a point inside the frustum.
    #[must_use]
    pub fn dist_out(&self, point: &Point3, dir: &Vector3, phi: Option<&PhiRange>) -> f64 {
        let mut dist = z_exit(point.z, dir.z, self.dz);
        dist = dist.min(self.lateral_crossing(point, dir, self.outer(), true, None));
        if self.has_inner() {
            dist = dist.min(self.lateral_crossing(point, dir, self.inner(), false, None));
        }
        if let Some(w) = phi {
            dist = dist.min(w.exit_distance(point.x, point.y, dir.x, dir.y));
        }
        dist
    }

    /// Entry distance from a point outside the frustum, or [`BIG`].
    #[must_use]
    pub fn dist_in(&self, point: &Point3, dir: &Vector3, phi: Option<&PhiRange>) -> f64 {
        let mut best = BIG;
        if point.z.abs() >= self.dz && point.z * dir.z < 0.0 {
            let s = (point.z.abs() - self.dz) / dir.z.abs();
            let x = point.x + s * dir.x;
            let y = point.y + s * dir.y;
            let (rlo, rhi) = if point.z < 0.0 {
                (self.rmin1, self.rmax1)
            } else {
                (self.rmin2, self.rmax2)
            };
            let r = x.hypot(y);
            if r >= rlo - PATCH_TOLERANCE
                && r <= rhi + PATCH_TOLERANCE
                && phi.map_or(true, |w| w.contains_xy_tol(x, y))
            {
                best = s;
            }
        }
        best = best.min(self.lateral_crossing(point, dir, self.outer(), false, phi));
        if self.has_inner() {
            best = best.min(self.lateral_crossing(point, dir, self.inner(), true, phi));
        }
        if let Some(w) = phi {
            for s in w.entry_crossings(point.x, point.y, dir.x, dir.y) {
                if s >= best {
                    continue;
                }
                let z = point.z + s * dir.z;
                if z.abs() > self.dz + PATCH_TOLERANCE {
                    continue;
                }
                let r = (point.x + s * dir.x).hypot(point.y + s * dir.y);
                let rmin = if self.has_inner() { self.rmin_at(z) } else { 0.0 };
                if r >= rmin - PATCH_TOLERANCE && r <= self.rmax_at(z) + PATCH_TOLERANCE {
                    best = s;
                }
            }
        }
        best
    }

    /// Conservative distance to the frustum boundary.
    #[must_use]
    pub fn safety(&self, point: &Point3, inside: bool, phi: Option<&PhiRange>) -> f64 {
        let r = point.x.hypot(point.y);
        let dz = self.dz;
        let gap_out = radial_gap(r, point.z, -dz, self.rmax1, dz, self.rmax2);
        let gap_in = if self.has_inner() {
            Some(radial_gap(r, point.z, -dz, self.rmin1, dz, self.rmin2))
        } else {
            None
        };
        let saf = if inside {
            let mut saf = (dz - point.z.abs()).min(gap_out);
            if let Some(g) = gap_in {
                saf = saf.min(-g);
            }
            if let Some(w) = phi {
                saf = saf.min(w.safety_in(point.x, point.y));
            }
            saf
        } else {
            let mut saf = (point.z.abs() - dz).max(-gap_out);
            if let Some(g) = gap_in {
                saf = saf.max(g);
            }
            if let Some(w) = phi {
                saf = saf.max(w.safety_out(point.x, point.y));
            }
            saf
        };
        saf.max(0.0)
    }

    /// Normal of the frustum surface closest to `point`.
    #[must_use]
    pub fn normal(&self, point: &Point3, dir: &Vector3, phi: Option<&PhiRange>) -> Vector3 {
        let r = point.x.hypot(point.y);
        let (cx, cy) = if r > 0.0 { (point.x / r, point.y / r) } else { (1.0, 0.0) };
        let dz = self.dz;
        let mut best = (dz - point.z.abs()).abs();
        let mut normal = Vector3::z();
        let lateral = |(_, tg): (f64, f64)| Vector3::new(cx, cy, -tg).normalize();
        let gap = radial_gap(r, point.z, -dz, self.rmax1, dz, self.rmax2).abs();
        if gap < best {
            best = gap;
            normal = lateral(self.outer());
        }
        if self.has_inner() {
            let gap = radial_gap(r, point.z, -dz, self.rmin1, dz, self.rmin2).abs();
            if gap < best {
                best = gap;
                normal = lateral(self.inner());
            }
        }
        if let Some(w) = phi {
            let (d, n) = w.closest_plane(point.x, point.y);
            if d < best {
                normal = Vector3::new(n.x, n.y, 0.0);
            }
        }
        orient_along(normal, dir)
    }

    // dz must be positive: the slopes divide by the full height.
    fn validated(dz: f64, rmin1: f64, rmax1: f64, rmin2: f64, rmax2: f64) -> Result<Self> {
        let dz = check_non_negative("dz", dz)?;
        if dz < TOLERANCE {
            return Err(GeometryError::Degenerate("cone half-length must be positive".into()).into());
        }
        let (rmin1, rmax1) = check_radii(rmin1, rmax1)?;
        let (rmin2, rmax2) = check_radii(rmin2, rmax2)?;
        if rmax1 < TOLERANCE && rmax2 < TOLERANCE {
            return Err(GeometryError::Degenerate("cone outer radii are both zero".into()).into());
        }
        Ok(Self {
            dz,
            rmin1,
            rmax1,
            rmin2,
            rmax2,
        })
    }

    fn radial_range(&self) -> (f64, f64) {
        (self.rmin1.min(self.rmin2), self.rmax1.max(self.rmax2))
    }
}

/// A round conical frustum.
#[derive(Debug, Clone)]
pub struct Cone {
    frustum: Frustum,
    bbox: BoundingBox,
}

impl Cone {
    /// Creates a cone.
    ///
    /// # Arguments
    ///
    /// * `dz` - Half-length along z
    /// * `rmin1`, `rmax1` - Radii at `z = -dz`
    /// * `rmin2`, `rmax2` - Radii at `z = +dz`
    ///
    /// # Errors
    ///
    /// Returns an error if `dz` is not positive, a radius is negative, or
    /// both outer radii vanish. Unlike [`Tube`](super::Tube), a flat cone
    /// is rejected: its wall slopes are undefined.
    pub fn new(dz: f64, rmin1: f64, rmax1: f64, rmin2: f64, rmax2: f64) -> Result<Self> {
        let mut cone = Self {
            frustum: Frustum::validated(dz, rmin1, rmax1, rmin2, rmax2)?,
            bbox: BoundingBox::default(),
        };
        cone.compute_bbox();
        Ok(cone)
    }

    /// Replaces the dimensions without touching the cached bounding box.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Cone::new`].
    pub fn set_dimensions(&mut self, dz: f64, rmin1: f64, rmax1: f64, rmin2: f64, rmax2: f64) -> Result<()> {
        self.frustum = Frustum::validated(dz, rmin1, rmax1, rmin2, rmax2)?;
        Ok(())
    }

    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

impl Solid for Cone {
    fn contains(&self, point: &Point3) -> bool {
        self.frustum.contains(point, None)
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.frustum.dist_in(point, dir, None)
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.frustum.dist_out(point, dir, None)
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        self.frustum.safety(point, inside, None)
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        self.frustum.normal(point, dir, None)
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        let (_, rmax) = self.frustum.radial_range();
        self.bbox = BoundingBox::new(Point3::origin(), rmax, rmax, self.frustum.dz);
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => self.frustum.radial_range(),
            Axis::Phi => (0.0, 360.0),
            Axis::Z => (-self.frustum.dz, self.frustum.dz),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        let (rmin, rmax) = self.frustum.radial_range();
        Some(BoundingCylinder {
            rmin,
            rmax,
            phi1: 0.0,
            phi2: 360.0,
        })
    }
}

impl fmt::Display for Cone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.frustum;
        write!(
            f,
            "Cone dz={:.5} rmin1={:.5} rmax1={:.5} rmin2={:.5} rmax2={:.5}",
            c.dz, c.rmin1, c.rmax1, c.rmin2, c.rmax2
        )
    }
}

/// A conical frustum limited to an azimuthal wedge.
#[derive(Debug, Clone)]
pub struct ConeSeg {
    frustum: Frustum,
    phi: PhiRange,
    bbox: BoundingBox,
}

impl ConeSeg {
    /// Creates a cone segment; angles in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error under the conditions of [`Cone::new`] or when an
    /// angle is not finite.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dz: f64,
        rmin1: f64,
        rmax1: f64,
        rmin2: f64,
        rmax2: f64,
        phi1: f64,
        phi2: f64,
    ) -> Result<Self> {
        let mut seg = Self {
            frustum: Frustum::validated(dz, rmin1, rmax1, rmin2, rmax2)?,
            phi: PhiRange::from_limits(phi1, phi2)?,
            bbox: BoundingBox::default(),
        };
        seg.compute_bbox();
        Ok(seg)
    }

    /// Replaces the dimensions without touching the cached bounding box.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ConeSeg::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn set_dimensions(
        &mut self,
        dz: f64,
        rmin1: f64,
        rmax1: f64,
        rmin2: f64,
        rmax2: f64,
        phi1: f64,
        phi2: f64,
    ) -> Result<()> {
        let frustum = Frustum::validated(dz, rmin1, rmax1, rmin2, rmax2)?;
        self.phi = PhiRange::from_limits(phi1, phi2)?;
        self.frustum = frustum;
        Ok(())
    }

    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    #[must_use]
    pub fn phi(&self) -> &PhiRange {
        &self.phi
    }
}

impl Solid for ConeSeg {
    fn contains(&self, point: &Point3) -> bool {
        self.frustum.contains(point, Some(&self.phi))
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.frustum.dist_in(point, dir, self.phi.as_cut())
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.frustum.dist_out(point, dir, self.phi.as_cut())
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        self.frustum.safety(point, inside, self.phi.as_cut())
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        self.frustum.normal(point, dir, self.phi.as_cut())
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        let (rmin, rmax) = self.frustum.radial_range();
        let (xmin, xmax, ymin, ymax) = self.phi.xy_extent(rmin, rmax);
        self.bbox = BoundingBox::from_corners(
            &Point3::new(xmin, ymin, -self.frustum.dz),
            &Point3::new(xmax, ymax, self.frustum.dz),
        );
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => self.frustum.radial_range(),
            Axis::Phi => (self.phi.phi1(), self.phi.phi2()),
            Axis::Z => (-self.frustum.dz, self.frustum.dz),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        let (rmin, rmax) = self.frustum.radial_range();
        Some(BoundingCylinder {
            rmin,
            rmax,
            phi1: self.phi.phi1(),
            phi2: self.phi.phi2(),
        })
    }
}

impl fmt::Display for ConeSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.frustum;
        write!(
            f,
            "ConeSeg dz={:.5} rmin1={:.5} rmax1={:.5} rmin2={:.5} rmax2={:.5} phi1={:.5} phi2={:.5}",
            c.dz,
            c.rmin1,
            c.rmax1,
            c.rmin2,
            c.rmax2,
            self.phi.phi1(),
            self.phi.phi2()
        )
    }
}
