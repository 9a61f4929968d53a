//! Hollow cylinders and their azimuthal segments.
//!
//! The free functions in this module solve the tube geometry for plain
//! numeric dimensions, so that stacked solids can reuse them per segment.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::phi::PhiRange;
use crate::math::{check_finite, orient_along, Point3, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::{Axis, BoundingBox, BoundingCylinder, Solid};

/// Crossing parameters of a ray with the cylinder `x^2 + y^2 = radius^2`.
///
/// `rsq` is the squared radius of the start point, `nsq` the squared
/// transverse length of the direction and `rdotn` their transverse dot
/// product. Returns `(b, delta)` such that the crossings are at
/// `-b - delta` (moving inward) and `-b + delta` (moving outward), or `None`
/// when the line misses the cylinder or runs parallel to it.
#[must_use]
pub fn dist_to_tube(rsq: f64, nsq: f64, rdotn: f64, radius: f64) -> Option<(f64, f64)> {
    if nsq < TOLERANCE {
        return None;
    }
    let b = rdotn / nsq;
    let c = (rsq - radius * radius) / nsq;
    let d2 = b * b - c;
    if d2 < 0.0 {
        return None;
    }
    Some((b, d2.sqrt()))
}

/// Distance from height `z` moving with axial speed `vz` to the plane
/// `z = +dz` or `z = -dz` ahead of it.
pub(crate) fn z_exit(z: f64, vz: f64, dz: f64) -> f64 {
    if vz > 0.0 {
        ((dz - z) / vz).max(0.0)
    } else if vz < 0.0 {
        ((-dz - z) / vz).max(0.0)
    } else {
        BIG
    }
}

fn in_annulus(x: f64, y: f64, rmin: f64, rmax: f64) -> bool {
    let r = x.hypot(y);
    r >= rmin - PATCH_TOLERANCE && r <= rmax + PATCH_TOLERANCE
}

/// Exit distance from a point inside the tube `rmin <= r <= rmax`,
/// `|z| <= dz`, optionally limited to the wedge `phi`.
#[must_use]
pub fn tube_dist_out(
    point: &Point3,
    dir: &Vector3,
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: Option<&PhiRange>,
) -> f64 {
    let mut dist = z_exit(point.z, dir.z, dz);
    let nsq = dir.x * dir.x + dir.y * dir.y;
    if nsq < TOLERANCE {
        return dist;
    }
    let rsq = point.x * point.x + point.y * point.y;
    let rdotn = point.x * dir.x + point.y * dir.y;
    if rmin > TOLERANCE && rdotn < 0.0 {
        if let Some((b, delta)) = dist_to_tube(rsq, nsq, rdotn, rmin) {
            if delta > 0.0 {
                dist = dist.min((-b - delta).max(0.0));
            }
        }
    }
    if let Some((b, delta)) = dist_to_tube(rsq, nsq, rdotn, rmax) {
        dist = dist.min((-b + delta).max(0.0));
    }
    if let Some(phi) = phi {
        dist = dist.min(phi.exit_distance(point.x, point.y, dir.x, dir.y));
    }
    dist
}

/// Entry distance from a point outside the tube, or [`BIG`].
#[must_use]
pub fn tube_dist_in(
    point: &Point3,
    dir: &Vector3,
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: Option<&PhiRange>,
) -> f64 {
    let in_wedge = |x: f64, y: f64| phi.map_or(true, |w| w.contains_xy_tol(x, y));
    let mut best = BIG;

    if point.z.abs() >= dz && point.z * dir.z < 0.0 {
        let s = (point.z.abs() - dz) / dir.z.abs();
        let x = point.x + s * dir.x;
        let y = point.y + s * dir.y;
        if in_annulus(x, y, rmin, rmax) && in_wedge(x, y) {
            best = s;
        }
    }

    let nsq = dir.x * dir.x + dir.y * dir.y;
    if nsq < TOLERANCE {
        return best;
    }
    let rsq = point.x * point.x + point.y * point.y;
    let rdotn = point.x * dir.x + point.y * dir.y;
    let on_patch = |s: f64| {
        let z = point.z + s * dir.z;
        z.abs() <= dz + PATCH_TOLERANCE && in_wedge(point.x + s * dir.x, point.y + s * dir.y)
    };

    // Outer wall, entered moving inward.
    if let Some((b, delta)) = dist_to_tube(rsq, nsq, rdotn, rmax) {
        let s = -b - delta;
        if delta > 0.0 && s >= 0.0 && s < best && on_patch(s) {
            best = s;
        }
    }
    // Inner wall, entered moving outward from the bore.
    if rmin > TOLERANCE {
        if let Some((b, delta)) = dist_to_tube(rsq, nsq, rdotn, rmin) {
            let s = -b + delta;
            if delta > 0.0 && s >= 0.0 && s < best && on_patch(s) {
                best = s;
            }
        }
    }
    if let Some(phi) = phi {
        for s in phi.entry_crossings(point.x, point.y, dir.x, dir.y) {
            if s >= best {
                continue;
            }
            let z = point.z + s * dir.z;
            if z.abs() <= dz + PATCH_TOLERANCE
                && in_annulus(point.x + s * dir.x, point.y + s * dir.y, rmin, rmax)
            {
                best = s;
            }
        }
    }
    best
}

/// Conservative distance to the tube boundary.
#[must_use]
pub fn tube_safety(
    point: &Point3,
    inside: bool,
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: Option<&PhiRange>,
) -> f64 {
    let r = point.x.hypot(point.y);
    let has_inner = rmin > TOLERANCE;
    let saf = if inside {
        let mut saf = (dz - point.z.abs()).min(rmax - r);
        if has_inner {
            saf = saf.min(r - rmin);
        }
        if let Some(phi) = phi {
            saf = saf.min(phi.safety_in(point.x, point.y));
        }
        saf
    } else {
        let mut saf = (point.z.abs() - dz).max(r - rmax);
        if has_inner {
            saf = saf.max(rmin - r);
        }
        if let Some(phi) = phi {
            saf = saf.max(phi.safety_out(point.x, point.y));
        }
        saf
    };
    saf.max(0.0)
}

/// Normal of the tube surface closest to `point`.
fn tube_normal(
    point: &Point3,
    dir: &Vector3,
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: Option<&PhiRange>,
) -> Vector3 {
    let r = point.x.hypot(point.y);
    let radial = if r > 0.0 {
        Vector3::new(point.x / r, point.y / r, 0.0)
    } else {
        Vector3::x()
    };
    let mut best = (dz - point.z.abs()).abs();
    let mut normal = Vector3::z();
    if (rmax - r).abs() < best {
        best = (rmax - r).abs();
        normal = radial;
    }
    if rmin > TOLERANCE && (r - rmin).abs() < best {
        best = (r - rmin).abs();
        normal = radial;
    }
    if let Some(phi) = phi {
        let (d, n) = phi.closest_plane(point.x, point.y);
        if d < best {
            normal = Vector3::new(n.x, n.y, 0.0);
        }
    }
    orient_along(normal, dir)
}

pub(crate) fn check_non_negative(parameter: &'static str, value: f64) -> Result<f64> {
    let value = check_finite(parameter, value)?;
    if value < 0.0 {
        return Err(GeometryError::ParameterOutOfRange {
            parameter,
            value,
            min: 0.0,
            max: f64::MAX,
        }
        .into());
    }
    Ok(value)
}

/// Validates a radius pair, swapping it when given in the wrong order.
pub(crate) fn check_radii(rmin: f64, rmax: f64) -> Result<(f64, f64)> {
    let rmin = check_non_negative("rmin", rmin)?;
    let rmax = check_non_negative("rmax", rmax)?;
    if rmin > rmax {
        tracing::warn!(rmin, rmax, "rmin exceeds rmax, swapping");
        return Ok((rmax, rmin));
    }
    Ok((rmin, rmax))
}

/// A hollow cylinder `rmin <= r <= rmax`, `|z| <= dz`.
#[derive(Debug, Clone)]
pub struct Tube {
    rmin: f64,
    rmax: f64,
    dz: f64,
    bbox: BoundingBox,
}

impl Tube {
    /// Creates a tube.
    ///
    /// # Arguments
    ///
    /// * `rmin` - Inner radius, zero for a solid cylinder
    /// * `rmax` - Outer radius
    /// * `dz` - Half-length along z
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is negative or not finite, or the
    /// outer radius is zero. Radii given in the wrong order are swapped.
    /// A zero `dz` is accepted and gives a flat annulus.
    pub fn new(rmin: f64, rmax: f64, dz: f64) -> Result<Self> {
        let mut tube = Self {
            rmin: 0.0,
            rmax: 0.0,
            dz: 0.0,
            bbox: BoundingBox::default(),
        };
        tube.set_dimensions(rmin, rmax, dz)?;
        tube.compute_bbox();
        Ok(tube)
    }

    /// Replaces the dimensions.
    ///
    /// The cached bounding box is left untouched; call
    /// [`Solid::compute_bbox`] afterwards.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Tube::new`].
    pub fn set_dimensions(&mut self, rmin: f64, rmax: f64, dz: f64) -> Result<()> {
        let (rmin, rmax) = check_radii(rmin, rmax)?;
        if rmax < TOLERANCE {
            return Err(GeometryError::Degenerate("tube outer radius must be positive".into()).into());
        }
        self.rmin = rmin;
        self.rmax = rmax;
        self.dz = check_non_negative("dz", dz)?;
        Ok(())
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
}

impl Solid for Tube {
    fn contains(&self, point: &Point3) -> bool {
        if point.z.abs() > self.dz {
            return false;
        }
        let r2 = point.x * point.x + point.y * point.y;
        r2 >= self.rmin * self.rmin && r2 <= self.rmax * self.rmax
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        tube_dist_in(point, dir, self.rmin, self.rmax, self.dz, None)
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        tube_dist_out(point, dir, self.rmin, self.rmax, self.dz, None)
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        tube_safety(point, inside, self.rmin, self.rmax, self.dz, None)
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        tube_normal(point, dir, self.rmin, self.rmax, self.dz, None)
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        self.bbox = BoundingBox::new(Point3::origin(), self.rmax, self.rmax, self.dz);
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => (self.rmin, self.rmax),
            Axis::Phi => (0.0, 360.0),
            Axis::Z => (-self.dz, self.dz),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        Some(BoundingCylinder {
            rmin: self.rmin,
            rmax: self.rmax,
            phi1: 0.0,
            phi2: 360.0,
        })
    }
}

impl fmt::Display for Tube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tube rmin={:.5} rmax={:.5} dz={:.5}",
            self.rmin, self.rmax, self.dz
        )
    }
}

/// A tube limited to the azimuthal wedge `[phi1, phi2]`.
#[derive(Debug, Clone)]
pub struct TubeSeg {
    rmin: f64,
    rmax: f64,
    dz: f64,
    phi: PhiRange,
    bbox: BoundingBox,
}

impl TubeSeg {
    /// Creates a tube segment; angles in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error under the conditions of [`Tube::new`] or when an
    /// angle is not finite.
    pub fn new(rmin: f64, rmax: f64, dz: f64, phi1: f64, phi2: f64) -> Result<Self> {
        let mut seg = Self {
            rmin: 0.0,
            rmax: 0.0,
            dz: 0.0,
            phi: PhiRange::full(),
            bbox: BoundingBox::default(),
        };
        seg.set_dimensions(rmin, rmax, dz, phi1, phi2)?;
        seg.compute_bbox();
        Ok(seg)
    }

    /// Replaces the dimensions without touching the cached bounding box.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TubeSeg::new`].
    pub fn set_dimensions(&mut self, rmin: f64, rmax: f64, dz: f64, phi1: f64, phi2: f64) -> Result<()> {
        let (rmin, rmax) = check_radii(rmin, rmax)?;
        if rmax < TOLERANCE {
            return Err(GeometryError::Degenerate("tube outer radius must be positive".into()).into());
        }
        self.dz = check_non_negative("dz", dz)?;
        self.phi = PhiRange::from_limits(phi1, phi2)?;
        self.rmin = rmin;
        self.rmax = rmax;
        Ok(())
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
}

impl Solid for TubeSeg {
    fn contains(&self, point: &Point3) -> bool {
        if point.z.abs() > self.dz {
            return false;
        }
        let r2 = point.x * point.x + point.y * point.y;
        if r2 < self.rmin * self.rmin || r2 > self.rmax * self.rmax {
            return false;
        }
        self.phi.contains_xy(point.x, point.y)
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        tube_dist_in(point, dir, self.rmin, self.rmax, self.dz, self.phi.as_cut())
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        tube_dist_out(point, dir, self.rmin, self.rmax, self.dz, self.phi.as_cut())
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        tube_safety(point, inside, self.rmin, self.rmax, self.dz, self.phi.as_cut())
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        tube_normal(point, dir, self.rmin, self.rmax, self.dz, self.phi.as_cut())
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        let (xmin, xmax, ymin, ymax) = self.phi.xy_extent(self.rmin, self.rmax);
        self.bbox = BoundingBox::from_corners(
            &Point3::new(xmin, ymin, -self.dz),
            &Point3::new(xmax, ymax, self.dz),
        );
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => (self.rmin, self.rmax),
            Axis::Phi => (self.phi.phi1(), self.phi.phi2()),
            Axis::Z => (-self.dz, self.dz),
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

impl fmt::Display for TubeSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TubeSeg rmin={:.5} rmax={:.5} dz={:.5} phi1={:.5} phi2={:.5}",
            self.rmin,
            self.rmax,
            self.dz,
            self.phi.phi1(),
            self.phi.phi2()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z).normalize()
    }

    #[test]
    fn solid_cylinder_exit_and_entry() {
        let tube = Tube::new(0.0, 5.0, 10.0).unwrap();
        assert!(tube.contains(&p(0.0, 0.0, 0.0)));
        let out = tube.distance_out(&p(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!((out - 5.0).abs() < TOLERANCE, "out={out}");
        let inn = tube.distance_in(&p(10.0, 0.0, 0.0), &v(-1.0, 0.0, 0.0));
        assert!((inn - 5.0).abs() < TOLERANCE, "in={inn}");
    }

    #[test]
    fn hollow_tube_bore() {
        let tube = Tube::new(2.0, 5.0, 10.0).unwrap();
        assert!(!tube.contains(&p(1.0, 0.0, 0.0)));
        assert!(tube.contains(&p(3.0, 0.0, 0.0)));
        // Leaving the material into the bore.
        let out = tube.distance_out(&p(3.0, 0.0, 0.0), &v(-1.0, 0.0, 0.0));
        assert!((out - 1.0).abs() < TOLERANCE, "out={out}");
        // From the axis, out through the inner wall.
        let inn = tube.distance_in(&p(0.0, 0.0, 0.0), &v(0.0, 1.0, 0.0));
        assert!((inn - 2.0).abs() < TOLERANCE, "in={inn}");
        // Crossing the bore from outside: enter, leave, and the next entry is
        // the near wall.
        let inn = tube.distance_in(&p(-10.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!((inn - 5.0).abs() < TOLERANCE, "in={inn}");
    }

    #[test]
    fn entry_through_end_cap() {
        let tube = Tube::new(1.0, 5.0, 10.0).unwrap();
        let s = tube.distance_in(&p(3.0, 0.0, 20.0), &v(0.0, 0.0, -1.0));
        assert!((s - 10.0).abs() < TOLERANCE);
        // Straight down the bore never touches the tube.
        assert!(tube.distance_in(&p(0.5, 0.0, 20.0), &v(0.0, 0.0, -1.0)) >= BIG);
        // Moving away.
        assert!(tube.distance_in(&p(3.0, 0.0, 20.0), &v(0.0, 0.0, 1.0)) >= BIG);
    }

    #[test]
    fn axial_ray_exits_through_cap() {
        let tube = Tube::new(0.0, 5.0, 10.0).unwrap();
        let s = tube.distance_out(&p(1.0, 1.0, 4.0), &v(0.0, 0.0, 1.0));
        assert!((s - 6.0).abs() < TOLERANCE);
    }

    #[test]
    fn oblique_miss() {
        let tube = Tube::new(0.0, 1.0, 1.0).unwrap();
        assert!(tube.distance_in(&p(-5.0, 3.0, 0.0), &v(1.0, 0.0, 0.0)) >= BIG);
        // Hits the infinite cylinder beyond the end planes.
        assert!(tube.distance_in(&p(-5.0, 0.0, 3.0), &v(1.0, 0.0, 0.0)) >= BIG);
    }

    #[test]
    fn safety_bounds() {
        let tube = Tube::new(2.0, 5.0, 10.0).unwrap();
        assert_relative_eq!(tube.safety(&p(3.0, 0.0, 0.0), true), 1.0);
        assert_relative_eq!(tube.safety(&p(4.5, 0.0, 9.8), true), 0.2, epsilon = 1e-12);
        assert_relative_eq!(tube.safety(&p(8.0, 0.0, 0.0), false), 3.0);
        assert_relative_eq!(tube.safety(&p(0.5, 0.0, 0.0), false), 1.5);
        // Wrong side clamps to zero.
        assert!(tube.safety(&p(8.0, 0.0, 0.0), true).abs() < TOLERANCE);
    }

    #[test]
    fn normals_follow_closest_surface() {
        let tube = Tube::new(2.0, 5.0, 10.0).unwrap();
        let n = tube.normal(&p(4.9, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!((n - Vector3::x()).norm() < TOLERANCE);
        let n = tube.normal(&p(0.0, 2.1, 0.0), &v(0.0, 1.0, 0.0));
        assert!((n - Vector3::y()).norm() < TOLERANCE);
        let n = tube.normal(&p(3.0, 0.0, -9.9), &v(0.0, 0.0, 1.0));
        assert!((n - Vector3::z()).norm() < TOLERANCE);
    }

    #[test]
    fn swapped_radii_are_corrected() {
        let tube = Tube::new(5.0, 2.0, 1.0).unwrap();
        assert_relative_eq!(tube.rmin(), 2.0);
        assert_relative_eq!(tube.rmax(), 5.0);
        assert!(Tube::new(0.0, 5.0, -1.0).is_err());
        assert!(Tube::new(0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn bbox_is_recomputed_only_on_request() {
        let mut tube = Tube::new(0.0, 5.0, 10.0).unwrap();
        tube.set_dimensions(0.0, 7.0, 10.0).unwrap();
        assert_relative_eq!(tube.bounding_box().half_extents().x, 5.0);
        tube.compute_bbox();
        assert_relative_eq!(tube.bounding_box().half_extents().x, 7.0);
    }

    #[test]
    fn segment_wedge_membership() {
        let seg = TubeSeg::new(1.0, 5.0, 2.0, 0.0, 90.0).unwrap();
        assert!(seg.contains(&p(2.0, 2.0, 0.0)));
        assert!(!seg.contains(&p(-2.0, 2.0, 0.0)));
        assert!(!seg.contains(&p(2.0, -0.1, 0.0)));
    }

    #[test]
    fn segment_exit_through_phi_plane() {
        let seg = TubeSeg::new(0.0, 5.0, 2.0, 0.0, 90.0).unwrap();
        let s = seg.distance_out(&p(2.0, 1.0, 0.0), &v(0.0, -1.0, 0.0));
        assert!((s - 1.0).abs() < TOLERANCE, "s={s}");
        let s = seg.distance_out(&p(1.0, 1.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!((s - (24.0_f64.sqrt() - 1.0)).abs() < 1e-9, "s={s}");
    }

    #[test]
    fn segment_entry_through_phi_plane() {
        let seg = TubeSeg::new(0.0, 5.0, 2.0, 0.0, 90.0).unwrap();
        let s = seg.distance_in(&p(2.0, -3.0, 0.0), &v(0.0, 1.0, 0.0));
        assert!((s - 3.0).abs() < TOLERANCE, "s={s}");
        // The opposite side of the wedge plane is not a face.
        assert!(seg.distance_in(&p(-2.0, -3.0, 0.0), &v(0.0, 1.0, 0.0)) >= BIG);
        // Passing the axis into the wedge.
        let s = seg.distance_in(&p(-3.0, -3.0, 0.0), &v(1.0, 1.0, 0.0));
        assert!((s - 18.0_f64.sqrt()).abs() < 1e-9, "s={s}");
    }

    #[test]
    fn segment_bbox_covers_quadrant() {
        let seg = TubeSeg::new(1.0, 5.0, 2.0, 0.0, 90.0).unwrap();
        let b = seg.bounding_box();
        assert!(b.min().x.abs() < 1e-9);
        assert_relative_eq!(b.max().x, 5.0);
        assert_relative_eq!(b.max().y, 5.0);
        assert!(b.min().y.abs() < 1e-9);
    }

    #[test]
    fn full_segment_matches_tube() {
        let tube = Tube::new(1.0, 4.0, 3.0).unwrap();
        let seg = TubeSeg::new(1.0, 4.0, 3.0, 0.0, 360.0).unwrap();
        assert!(seg.phi().is_full());
        let points = [p(2.0, 0.5, 0.0), p(-6.0, 1.0, 1.0), p(0.2, 0.1, 5.0), p(0.0, -3.0, -2.5)];
        let dirs = [v(1.0, 0.2, 0.1), v(-0.3, 1.0, -0.5), v(0.0, 0.0, -1.0), v(1.0, -1.0, 0.3)];
        for pt in &points {
            assert_eq!(tube.contains(pt), seg.contains(pt));
            for d in &dirs {
                assert_relative_eq!(tube.distance_in(pt, d), seg.distance_in(pt, d));
                assert_relative_eq!(tube.distance_out(pt, d), seg.distance_out(pt, d));
                assert_relative_eq!(tube.safety(pt, true), seg.safety(pt, true));
            }
        }
    }

    #[test]
    fn static_solver_reports_both_crossings() {
        // From x = -10 toward +x through a radius-2 cylinder.
        let (b, delta) = dist_to_tube(100.0, 1.0, -10.0, 2.0).unwrap();
        assert_relative_eq!(-b - delta, 8.0);
        assert_relative_eq!(-b + delta, 12.0);
        assert!(dist_to_tube(100.0, 1.0, 0.0, 2.0).is_none());
    }
}
