use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::phi::PhiRange;
use crate::math::{orient_along, Point3, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::tube::{check_non_negative, check_radii, dist_to_tube, tube_dist_out, tube_safety};
use super::{Axis, BoundingBox, BoundingCylinder, Solid};

/// A tube segment whose ends are cut by two oblique planes.
///
/// The lower plane passes through `(0, 0, -dz)` with an outward normal
/// pointing down (`nz < 0`), the upper one through `(0, 0, +dz)` with an
/// outward normal pointing up (`nz > 0`).
#[derive(Debug, Clone)]
pub struct CutTube {
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: PhiRange,
    low: Vector3,
    high: Vector3,
    bbox: BoundingBox,
}

impl CutTube {
    /// Creates a cut tube; angles in degrees, normals of any length.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is invalid, a normal is zero, or the
    /// normals do not point away from the solid along z.
    pub fn new(
        rmin: f64,
        rmax: f64,
        dz: f64,
        phi1: f64,
        phi2: f64,
        low: Vector3,
        high: Vector3,
    ) -> Result<Self> {
        let (rmin, rmax) = check_radii(rmin, rmax)?;
        if rmax < TOLERANCE {
            return Err(GeometryError::Degenerate("tube outer radius must be positive".into()).into());
        }
        let low = low.try_normalize(TOLERANCE).ok_or(GeometryError::ZeroVector)?;
        let high = high.try_normalize(TOLERANCE).ok_or(GeometryError::ZeroVector)?;
        if low.z >= 0.0 || high.z <= 0.0 {
            return Err(GeometryError::Degenerate(
                "cut plane normals must point down at the bottom and up at the top".into(),
            )
            .into());
        }
        let mut tube = Self {
            rmin,
            rmax,
            dz: check_non_negative("dz", dz)?,
            phi: PhiRange::from_limits(phi1, phi2)?,
            low,
            high,
            bbox: BoundingBox::default(),
        };
        tube.compute_bbox();
        Ok(tube)
    }

    #[must_use]
    pub fn rmin(&self) -> f64 {
        self.rmin
    }

    #[must_use]
    pub fn rmax(&self) -> f64 {
        self.rmax
    }

    #[must_use]
    pub fn dz(&self) -> f64 {
        self.dz
    }

    #[must_use]
    pub fn phi(&self) -> &PhiRange {
        &self.phi
    }

    /// Outward unit normal of the lower cut plane.
    #[must_use]
    pub fn low_normal(&self) -> &Vector3 {
        &self.low
    }

    /// Outward unit normal of the upper cut plane.
    #[must_use]
    pub fn high_normal(&self) -> &Vector3 {
        &self.high
    }

    /// Signed distances beyond the lower and upper planes (negative inside).
    fn plane_offsets(&self, point: &Point3) -> (f64, f64) {
        let low = self.low.dot(&(point.coords - Vector3::new(0.0, 0.0, -self.dz)));
        let high = self.high.dot(&(point.coords - Vector3::new(0.0, 0.0, self.dz)));
        (low, high)
    }

    /// Height of the lower (`upper == false`) or upper cut plane above `(x, y)`.
    fn cut_height(&self, x: f64, y: f64, upper: bool) -> f64 {
        let (n, z0) = if upper {
            (&self.high, self.dz)
        } else {
            (&self.low, -self.dz)
        };
        z0 - (n.x * x + n.y * y) / n.z
    }

    fn between_planes(&self, point: &Point3) -> bool {
        let (low, high) = self.plane_offsets(point);
        low <= PATCH_TOLERANCE && high <= PATCH_TOLERANCE
    }
}

impl Solid for CutTube {
    fn contains(&self, point: &Point3) -> bool {
        let (low, high) = self.plane_offsets(point);
        if low > 0.0 || high > 0.0 {
            return false;
        }
        let r2 = point.x * point.x + point.y * point.y;
        if r2 < self.rmin * self.rmin || r2 > self.rmax * self.rmax {
            return false;
        }
        self.phi.contains_xy(point.x, point.y)
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        let phi = self.phi.as_cut();
        let in_wedge = |q: &Point3| phi.map_or(true, |w| w.contains_xy_tol(q.x, q.y));
        let in_annulus = |q: &Point3| {
            let r = q.x.hypot(q.y);
            r >= self.rmin - PATCH_TOLERANCE && r <= self.rmax + PATCH_TOLERANCE
        };
        let mut best = BIG;

        let (off_low, off_high) = self.plane_offsets(point);
        for (offset, normal) in [(off_low, &self.low), (off_high, &self.high)] {
            let dn = normal.dot(dir);
            if offset < 0.0 || dn >= 0.0 {
                continue;
            }
            let s = -offset / dn;
            let hit = point + dir * s;
            if s < best && self.between_planes(&hit) && in_annulus(&hit) && in_wedge(&hit) {
                best = s;
            }
        }

        let nsq = dir.x * dir.x + dir.y * dir.y;
        if nsq >= TOLERANCE {
            let rsq = point.x * point.x + point.y * point.y;
            let rdotn = point.x * dir.x + point.y * dir.y;
            for (radius, outward) in [(self.rmax, false), (self.rmin, true)] {
                if radius <= TOLERANCE {
                    continue;
                }
                let Some((b, delta)) = dist_to_tube(rsq, nsq, rdotn, radius) else {
                    continue;
                };
                let s = if outward { -b + delta } else { -b - delta };
                if delta <= 0.0 || s < 0.0 || s >= best {
                    continue;
                }
                let hit = point + dir * s;
                if self.between_planes(&hit) && in_wedge(&hit) {
                    best = s;
                }
            }
        }

        if let Some(w) = phi {
            for s in w.entry_crossings(point.x, point.y, dir.x, dir.y) {
                if s >= best {
                    continue;
                }
                let hit = point + dir * s;
                if self.between_planes(&hit) && in_annulus(&hit) {
                    best = s;
                }
            }
        }
        best
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        let mut dist = tube_dist_out(point, dir, self.rmin, self.rmax, BIG, self.phi.as_cut());
        let (off_low, off_high) = self.plane_offsets(point);
        for (offset, normal) in [(off_low, &self.low), (off_high, &self.high)] {
            let dn = normal.dot(dir);
            if dn > 0.0 {
                dist = dist.min((-offset / dn).max(0.0));
            }
        }
        dist
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        let radial = tube_safety(point, inside, self.rmin, self.rmax, BIG, self.phi.as_cut());
        let (low, high) = self.plane_offsets(point);
        if inside {
            radial.min(-low).min(-high).max(0.0)
        } else {
            radial.max(low).max(high)
        }
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        let (low, high) = self.plane_offsets(point);
        let r = point.x.hypot(point.y);
        let radial = if r > 0.0 {
            Vector3::new(point.x / r, point.y / r, 0.0)
        } else {
            Vector3::x()
        };
        let mut candidates = vec![
            (low.abs(), self.low),
            (high.abs(), self.high),
            ((self.rmax - r).abs(), radial),
        ];
        if self.rmin > TOLERANCE {
            candidates.push(((r - self.rmin).abs(), radial));
        }
        if let Some(w) = self.phi.as_cut() {
            let (d, n) = w.closest_plane(point.x, point.y);
            candidates.push((d, Vector3::new(n.x, n.y, 0.0)));
        }
        let normal = candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(Vector3::z(), |(_, n)| n);
        orient_along(normal, dir)
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        let (xmin, xmax, ymin, ymax) = self.phi.xy_extent(self.rmin, self.rmax);
        // A plane height is linear in (x, y): its extremes over the sector lie
        // on the outer arc along the plane gradient or at the sector corners.
        let mut samples: Vec<(f64, f64)> = Vec::with_capacity(8);
        if !self.phi.is_full() {
            for angle in [self.phi.phi1(), self.phi.phi2()] {
                let (s, c) = angle.to_radians().sin_cos();
                samples.push((self.rmin * c, self.rmin * s));
                samples.push((self.rmax * c, self.rmax * s));
            }
        }
        for n in [&self.low, &self.high] {
            let g = n.x.hypot(n.y);
            if g < TOLERANCE {
                continue;
            }
            for sign in [1.0, -1.0] {
                let (x, y) = (sign * self.rmax * n.x / g, sign * self.rmax * n.y / g);
                if self.phi.contains_xy_tol(x, y) {
                    samples.push((x, y));
                }
            }
        }
        let mut zmin = -self.dz;
        let mut zmax = self.dz;
        for &(x, y) in &samples {
            zmin = zmin.min(self.cut_height(x, y, false));
            zmax = zmax.max(self.cut_height(x, y, true));
        }
        self.bbox = BoundingBox::from_corners(&Point3::new(xmin, ymin, zmin), &Point3::new(xmax, ymax, zmax));
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => (self.rmin, self.rmax),
            Axis::Phi => (self.phi.phi1(), self.phi.phi2()),
            Axis::Z => (self.bbox.min().z, self.bbox.max().z),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        Some(BoundingCylinder {
            rmin: self.rmin,
            rmax: self.rmax,
            phi1: self.phi.phi1(),
            phi2: self.phi.phi2(),
        })
    }
}

impl fmt::Display for CutTube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CutTube rmin={:.5} rmax={:.5} dz={:.5} phi1={:.5} phi2={:.5} \
             low=({:.5}, {:.5}, {:.5}) high=({:.5}, {:.5}, {:.5})",
            self.rmin,
            self.rmax,
            self.dz,
            self.phi.phi1(),
            self.phi.phi2(),
            self.low.x,
            self.low.y,
            self.low.z,
            self.high.x,
            self.high.y,
            self.high.z
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shape::TubeSeg;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z).normalize()
    }

    // Top cut at 45 degrees: z <= 5 - x.
    fn slanted() -> CutTube {
        CutTube::new(0.0, 4.0, 5.0, 0.0, 360.0, -Vector3::z(), Vector3::new(1.0, 0.0, 1.0)).unwrap()
    }

    #[test]
    fn flat_cuts_match_tube_segment() {
        let cut = CutTube::new(1.0, 4.0, 3.0, 20.0, 200.0, -Vector3::z(), Vector3::z()).unwrap();
        let seg = TubeSeg::new(1.0, 4.0, 3.0, 20.0, 200.0).unwrap();
        let points = [p(0.0, 2.0, 0.0), p(-6.0, 1.0, 1.0), p(0.5, 2.5, 5.0), p(3.0, -3.0, -2.5)];
        let dirs = [v(1.0, 0.2, 0.1), v(-0.3, 1.0, -0.5), v(0.0, 0.0, -1.0), v(-1.0, 1.0, 0.3)];
        for pt in &points {
            assert_eq!(cut.contains(pt), seg.contains(pt));
            for d in &dirs {
                let (a, b) = (cut.distance_in(pt, d), seg.distance_in(pt, d));
                assert!((a - b).abs() < 1e-9 || (a >= BIG && b >= BIG), "{a} vs {b}");
                if seg.contains(pt) {
                    assert_relative_eq!(cut.distance_out(pt, d), seg.distance_out(pt, d), epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn slanted_top_membership() {
        let cut = slanted();
        assert!(cut.contains(&p(-2.0, 0.0, 6.0)));
        assert!(!cut.contains(&p(2.0, 0.0, 4.0)));
        assert!(cut.contains(&p(2.0, 0.0, 2.5)));
    }

    #[test]
    fn slanted_top_distances() {
        let cut = slanted();
        let s = cut.distance_out(&p(0.0, 0.0, 0.0), &v(0.0, 0.0, 1.0));
        assert!((s - 5.0).abs() < 1e-9, "s={s}");
        let s = cut.distance_out(&p(2.0, 0.0, 0.0), &v(0.0, 0.0, 1.0));
        assert!((s - 3.0).abs() < 1e-9, "s={s}");
        let s = cut.distance_in(&p(2.0, 0.0, 10.0), &v(0.0, 0.0, -1.0));
        assert!((s - 7.0).abs() < 1e-9, "s={s}");
        // Above the cut, passing beside the tube.
        assert!(cut.distance_in(&p(5.0, 0.0, 10.0), &v(0.0, 0.0, -1.0)) >= BIG);
    }

    #[test]
    fn slanted_bbox_reaches_high_side() {
        let cut = slanted();
        assert_relative_eq!(cut.bounding_box().max().z, 9.0, epsilon = 1e-9);
        assert_relative_eq!(cut.bounding_box().min().z, -5.0, epsilon = 1e-9);
    }

    #[test]
    fn safety_includes_cut_planes() {
        let cut = slanted();
        let saf = cut.safety(&p(0.0, 0.0, 0.0), true);
        assert_relative_eq!(saf, 5.0 / 2.0_f64.sqrt(), epsilon = 1e-12);
        let saf = cut.safety(&p(0.0, 0.0, 10.0), false);
        assert_relative_eq!(saf, 5.0 / 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn normal_on_cut_plane() {
        let cut = slanted();
        let n = cut.normal(&p(1.0, 0.0, 4.0), &v(0.0, 0.0, 1.0));
        assert!((n - v(1.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn rejects_inverted_normals() {
        assert!(CutTube::new(0.0, 1.0, 1.0, 0.0, 360.0, Vector3::z(), Vector3::z()).is_err());
        assert!(CutTube::new(0.0, 1.0, 1.0, 0.0, 360.0, -Vector3::z(), Vector3::zeros()).is_err());
    }
}
