//! Stacks of round tube and cone segments keyed by z.
//!
//! The section helpers at the top of this module are shared with the
//! faceted [`Polygon`](super::Polygon), which uses the same stacking model.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::phi::PhiRange;
use crate::math::{check_finite, orient_along, Point3, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::cone::{radial_gap, Frustum};
use super::tube::{check_radii, tube_dist_in, tube_dist_out};
use super::{Axis, BoundingBox, BoundingCylinder, Solid};

/// One z-plane of a stacked solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    /// Height of the plane.
    pub z: f64,
    /// Inner radius, apothem for a [`Polygon`](super::Polygon).
    pub rmin: f64,
    /// Outer radius, apothem for a [`Polygon`](super::Polygon).
    pub rmax: f64,
}

impl Section {
    #[must_use]
    pub fn new(z: f64, rmin: f64, rmax: f64) -> Self {
        Self { z, rmin, rmax }
    }
}

/// Validates one section, swapping its radii when needed.
pub(crate) fn checked_section(section: Section) -> Result<Section> {
    let z = check_finite("z", section.z)?;
    let (rmin, rmax) = check_radii(section.rmin, section.rmax)?;
    Ok(Section { z, rmin, rmax })
}

/// Validates a full section list.
pub(crate) fn checked_sections(sections: Vec<Section>) -> Result<Vec<Section>> {
    if sections.len() < 2 {
        return Err(GeometryError::ParameterOutOfRange {
            parameter: "nz",
            value: sections.len() as f64,
            min: 2.0,
            max: f64::MAX,
        }
        .into());
    }
    let sections = sections
        .into_iter()
        .map(checked_section)
        .collect::<Result<Vec<_>>>()?;
    check_order(&sections)?;
    Ok(sections)
}

pub(crate) fn check_order(sections: &[Section]) -> Result<()> {
    if sections.windows(2).any(|w| w[1].z < w[0].z) {
        return Err(GeometryError::Degenerate("z planes must be non-decreasing".into()).into());
    }
    let first = sections.first().map_or(0.0, |s| s.z);
    let last = sections.last().map_or(0.0, |s| s.z);
    if last - first < TOLERANCE {
        return Err(GeometryError::Degenerate("z planes enclose no volume".into()).into());
    }
    Ok(())
}

/// Copy of `sections` with plane `i` replaced, or an error leaving the
/// original untouched.
pub(crate) fn with_section(sections: &[Section], i: usize, section: Section) -> Result<Vec<Section>> {
    let n = sections.len();
    if i >= n {
        return Err(GeometryError::ParameterOutOfRange {
            parameter: "section",
            value: i as f64,
            min: 0.0,
            max: n.saturating_sub(1) as f64,
        }
        .into());
    }
    let mut updated = sections.to_vec();
    updated[i] = checked_section(section)?;
    check_order(&updated)?;
    Ok(updated)
}

/// Index of the slab whose lower plane is the last one at or below `z`,
/// clamped to the valid slab range.
pub(crate) fn bracket(sections: &[Section], z: f64) -> usize {
    let n = sections.len();
    sections
        .partition_point(|s| s.z <= z)
        .saturating_sub(1)
        .min(n.saturating_sub(2))
}

pub(crate) fn is_degenerate(sections: &[Section], j: usize) -> bool {
    sections[j + 1].z - sections[j].z < TOLERANCE
}

/// Range `[k0, k1]` of planes sharing the height of plane `k`.
fn plane_group(sections: &[Section], k: usize) -> (usize, usize) {
    let z = sections[k].z;
    let mut k0 = k;
    while k0 > 0 && sections[k0 - 1].z - z > -TOLERANCE {
        k0 -= 1;
    }
    let mut k1 = k;
    while k1 + 1 < sections.len() && sections[k1 + 1].z - z < TOLERANCE {
        k1 += 1;
    }
    (k0, k1)
}

/// Whether the planes `[k0, k1]` carry a flat face: an end cap or a step in
/// the radii.
fn is_face(sections: &[Section], (k0, k1): (usize, usize)) -> bool {
    if k0 == 0 || k1 + 1 == sections.len() {
        return true;
    }
    let (a, b) = (sections[k0], sections[k1]);
    (a.rmin - b.rmin).abs() > TOLERANCE || (a.rmax - b.rmax).abs() > TOLERANCE
}

/// Widens an inside safety bound found in slab `j` by scanning neighbouring
/// planes while they are closer than the current bound.
///
/// `lateral(k)` must bound from below the distance from the point to the
/// side walls of slab `k`.
pub(crate) fn widen_inside_safety(
    sections: &[Section],
    j: usize,
    z: f64,
    mut best: f64,
    lateral: impl Fn(usize) -> f64,
) -> f64 {
    let n = sections.len();
    let mut k = j + 1;
    while k < n {
        let dzp = sections[k].z - z;
        if dzp >= best {
            break;
        }
        let group = plane_group(sections, k);
        if is_face(sections, group) {
            best = dzp.max(0.0);
            break;
        }
        best = best.min(dzp.max(lateral(group.1)));
        k = group.1 + 1;
    }
    // A plane group that is not a face always has a slab below it.
    let mut k = j;
    loop {
        let dzp = z - sections[k].z;
        if dzp >= best {
            break;
        }
        let group = plane_group(sections, k);
        if is_face(sections, group) {
            best = dzp.max(0.0);
            break;
        }
        best = best.min(dzp.max(lateral(group.0 - 1)));
        k = group.0 - 1;
    }
    best
}

/// Outside safety as the minimum of per-slab bounds, widening from the
/// slab bracketing `z` while the slabs are closer than the current bound.
///
/// `slab_bound(j)` must bound from below the distance to slab `j`.
pub(crate) fn widen_outside_safety(
    sections: &[Section],
    z: f64,
    slab_bound: impl Fn(usize) -> f64,
) -> f64 {
    let n = sections.len();
    let j0 = bracket(sections, z);
    let mut best = BIG;
    for j in j0..n - 1 {
        if sections[j].z - z >= best {
            break;
        }
        if !is_degenerate(sections, j) {
            best = best.min(slab_bound(j));
        }
    }
    for j in (0..j0).rev() {
        if z - sections[j + 1].z >= best {
            break;
        }
        if !is_degenerate(sections, j) {
            best = best.min(slab_bound(j));
        }
    }
    best.max(0.0)
}

/// Planes bounding the slab `j` that carry a face, as `(distance, normal)`.
pub(crate) fn face_candidates(sections: &[Section], j: usize, z: f64) -> Vec<(f64, Vector3)> {
    let mut out = Vec::with_capacity(2);
    if is_face(sections, plane_group(sections, j)) {
        out.push(((z - sections[j].z).abs(), -Vector3::z()));
    }
    if is_face(sections, plane_group(sections, j + 1)) {
        out.push(((sections[j + 1].z - z).abs(), Vector3::z()));
    }
    out
}

/// One non-degenerate segment between two adjacent planes.
#[derive(Debug, Clone, Copy)]
struct Slab {
    z1: f64,
    z2: f64,
    frustum: Frustum,
}

impl Slab {
    fn new(sections: &[Section], j: usize) -> Option<Self> {
        if is_degenerate(sections, j) {
            return None;
        }
        let (a, b) = (sections[j], sections[j + 1]);
        if a.rmax < TOLERANCE && b.rmax < TOLERANCE {
            return None;
        }
        Some(Self {
            z1: a.z,
            z2: b.z,
            frustum: Frustum {
                dz: 0.5 * (b.z - a.z),
                rmin1: a.rmin,
                rmax1: a.rmax,
                rmin2: b.rmin,
                rmax2: b.rmax,
            },
        })
    }

    fn local(&self, point: &Point3) -> Point3 {
        Point3::new(point.x, point.y, point.z - 0.5 * (self.z1 + self.z2))
    }

    fn is_tube(&self) -> bool {
        let f = &self.frustum;
        f.rmin1 == f.rmin2 && f.rmax1 == f.rmax2
    }

    fn dist_in(&self, point: &Point3, dir: &Vector3, phi: Option<&PhiRange>) -> f64 {
        let f = &self.frustum;
        let local = self.local(point);
        if self.is_tube() {
            tube_dist_in(&local, dir, f.rmin1, f.rmax1, f.dz, phi)
        } else {
            f.dist_in(&local, dir, phi)
        }
    }

    fn dist_out(&self, point: &Point3, dir: &Vector3, phi: Option<&PhiRange>) -> f64 {
        let f = &self.frustum;
        let local = self.local(point);
        if self.is_tube() {
            tube_dist_out(&local, dir, f.rmin1, f.rmax1, f.dz, phi)
        } else {
            f.dist_out(&local, dir, phi)
        }
    }

    /// Radii at height `z`, clamped to the slab.
    fn radii_at(&self, z: f64) -> (f64, f64) {
        let f = &self.frustum;
        let t = ((z - self.z1) / (self.z2 - self.z1)).clamp(0.0, 1.0);
        (f.rmin1 + (f.rmin2 - f.rmin1) * t, f.rmax1 + (f.rmax2 - f.rmax1) * t)
    }

    fn contains_radially(&self, point: &Point3, tol: f64) -> bool {
        let (rmin, rmax) = self.radii_at(point.z);
        let r2 = point.x * point.x + point.y * point.y;
        let lo = (rmin - tol).max(0.0);
        let hi = rmax + tol;
        r2 >= lo * lo && r2 <= hi * hi
    }

    /// Signed meridian gaps to the outer and, when present, inner walls.
    fn gaps(&self, point: &Point3) -> (f64, Option<f64>) {
        let f = &self.frustum;
        let r = point.x.hypot(point.y);
        let outer = radial_gap(r, point.z, self.z1, f.rmax1, self.z2, f.rmax2);
        let inner = f
            .has_inner()
            .then(|| radial_gap(r, point.z, self.z1, f.rmin1, self.z2, f.rmin2));
        (outer, inner)
    }

    fn lateral_in(&self, point: &Point3) -> f64 {
        let (outer, inner) = self.gaps(point);
        inner.map_or(outer, |g| outer.min(-g))
    }
}

/// A revolution solid made of stacked round segments.
#[derive(Debug, Clone)]
pub struct Polycone {
    phi: PhiRange,
    sections: Vec<Section>,
    bbox: BoundingBox,
}

impl Polycone {
    /// Creates a polycone from its azimuthal range (degrees) and planes.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two planes are given, the planes are
    /// not ordered by z, a value is not finite, or `dphi` is not positive.
    pub fn new(phi1: f64, dphi: f64, sections: Vec<Section>) -> Result<Self> {
        let mut pcon = Self {
            phi: PhiRange::from_start(phi1, dphi)?,
            sections: checked_sections(sections)?,
            bbox: BoundingBox::default(),
        };
        pcon.compute_bbox();
        Ok(pcon)
    }

    /// Redefines plane `i`.
    ///
    /// The planes must stay ordered by z after every call; a rejected call
    /// leaves the stack unchanged. Defining the last plane finalizes the
    /// stack and recomputes the bounding box.
    ///
    /// # Errors
    ///
    /// Returns an error if `i` is out of range, a value is invalid, or the
    /// new plane breaks the z ordering.
    pub fn define_section(&mut self, i: usize, z: f64, rmin: f64, rmax: f64) -> Result<()> {
        self.sections = with_section(&self.sections, i, Section::new(z, rmin, rmax))?;
        if i + 1 == self.sections.len() {
            self.compute_bbox();
        }
        Ok(())
    }

    #[must_use]
    pub fn phi(&self) -> &PhiRange {
        &self.phi
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn slab(&self, j: usize) -> Option<Slab> {
        Slab::new(&self.sections, j)
    }

    /// Slabs that touch height `z`, from the highest down.
    fn slabs_at(&self, z: f64) -> impl Iterator<Item = (usize, Slab)> + '_ {
        let j0 = bracket(&self.sections, z);
        (0..=j0)
            .rev()
            .take_while(move |&j| self.sections[j + 1].z >= z - PATCH_TOLERANCE)
            .filter_map(move |j| self.slab(j).map(|s| (j, s)))
            .filter(move |(_, s)| s.z1 <= z + PATCH_TOLERANCE)
    }

    /// Slab holding the inside point `point`, preferring the one the ray
    /// travels into when the point sits on a plane.
    fn current_slab(&self, point: &Point3, dir: &Vector3) -> Option<(usize, Slab)> {
        let mut found = self
            .slabs_at(point.z)
            .filter(|(_, s)| s.contains_radially(point, PATCH_TOLERANCE));
        if dir.z < 0.0 {
            found.last()
        } else {
            found.next()
        }
    }

    fn ray_limits(&self) -> (f64, f64) {
        let n = self.sections.len();
        (self.sections[0].z, self.sections[n - 1].z)
    }
}

impl Solid for Polycone {
    fn contains(&self, point: &Point3) -> bool {
        let (zlo, zhi) = self.ray_limits();
        if point.z < zlo || point.z > zhi {
            return false;
        }
        if !self.phi.contains_xy(point.x, point.y) {
            return false;
        }
        let mut j = bracket(&self.sections, point.z);
        loop {
            if let Some(slab) = self.slab(j) {
                if slab.contains_radially(point, 0.0) {
                    return true;
                }
            }
            if j == 0 || self.sections[j].z < point.z {
                return false;
            }
            j -= 1;
        }
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        if self.bbox.misses(point, dir) {
            return BIG;
        }
        let phi = self.phi.as_cut();
        let n = self.sections.len();
        if dir.z > 0.0 {
            for j in 0..n - 1 {
                if self.sections[j + 1].z < point.z - PATCH_TOLERANCE {
                    continue;
                }
                if let Some(slab) = self.slab(j) {
                    let t = slab.dist_in(point, dir, phi);
                    if t < BIG {
                        return t;
                    }
                }
            }
            BIG
        } else if dir.z < 0.0 {
            for j in (0..n - 1).rev() {
                if self.sections[j].z > point.z + PATCH_TOLERANCE {
                    continue;
                }
                if let Some(slab) = self.slab(j) {
                    let t = slab.dist_in(point, dir, phi);
                    if t < BIG {
                        return t;
                    }
                }
            }
            BIG
        } else {
            self.slabs_at(point.z)
                .map(|(_, s)| s.dist_in(point, dir, phi))
                .fold(BIG, f64::min)
        }
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        let phi = self.phi.as_cut();
        if dir.z == 0.0 {
            return self
                .slabs_at(point.z)
                .filter(|(_, s)| s.contains_radially(point, PATCH_TOLERANCE))
                .map(|(_, s)| s.dist_out(point, dir, phi))
                .fold(0.0, f64::max);
        }
        let Some((mut j, mut slab)) = self.current_slab(point, dir) else {
            return 0.0;
        };
        let n = self.sections.len();
        let mut travelled = 0.0;
        let mut q = *point;
        for _ in 0..n {
            let t = slab.dist_out(&q, dir, phi);
            let (plane, tz) = if dir.z > 0.0 {
                (slab.z2, (slab.z2 - q.z) / dir.z)
            } else {
                (slab.z1, (slab.z1 - q.z) / dir.z)
            };
            if t < tz - PATCH_TOLERANCE {
                return travelled + t;
            }
            let mut hit = q + dir * tz;
            hit.z = plane;
            let next = if dir.z > 0.0 {
                (j + 1..n - 1).find_map(|k| self.slab(k).map(|s| (k, s)))
            } else {
                (0..j).rev().find_map(|k| self.slab(k).map(|s| (k, s)))
            };
            match next {
                Some((k, s)) if s.contains_radially(&hit, PATCH_TOLERANCE) => {
                    travelled += tz.max(0.0);
                    q = hit;
                    j = k;
                    slab = s;
                }
                _ => return travelled + t,
            }
        }
        travelled
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        let (x, y) = (point.x, point.y);
        if inside {
            let Some((j, slab)) = self
                .slabs_at(point.z)
                .find(|(_, s)| s.contains_radially(point, 0.0))
            else {
                return 0.0;
            };
            let best = slab.lateral_in(point).min(self.phi.safety_in(x, y));
            let lateral = |k: usize| self.slab(k).map_or(BIG, |s| s.lateral_in(point).abs());
            widen_inside_safety(&self.sections, j, point.z, best, lateral).max(0.0)
        } else {
            let phi_out = self.phi.safety_out(x, y);
            widen_outside_safety(&self.sections, point.z, |j| {
                self.slab(j).map_or(BIG, |s| {
                    let zdist = (s.z1 - point.z).max(point.z - s.z2);
                    let (outer, inner) = s.gaps(point);
                    let mut bound = zdist.max(-outer).max(phi_out);
                    if let Some(g) = inner {
                        bound = bound.max(g);
                    }
                    bound
                })
            })
        }
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        let j = bracket(&self.sections, point.z);
        let Some(slab) = self.slabs_at(point.z).map(|(_, s)| s).next().or_else(|| self.slab(j)) else {
            return orient_along(Vector3::z(), dir);
        };
        let j = bracket(&self.sections, slab.z1);
        let r = point.x.hypot(point.y);
        let (cx, cy) = if r > 0.0 { (point.x / r, point.y / r) } else { (1.0, 0.0) };
        let f = slab.frustum;
        let wall = |r1: f64, r2: f64| {
            let tg = (r2 - r1) / (slab.z2 - slab.z1);
            Vector3::new(cx, cy, -tg).normalize()
        };
        let (outer, inner) = slab.gaps(point);
        let mut candidates = face_candidates(&self.sections, j, point.z);
        candidates.push((outer.abs(), wall(f.rmax1, f.rmax2)));
        if let Some(g) = inner {
            candidates.push((g.abs(), wall(f.rmin1, f.rmin2)));
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
        let (rmin, rmax) = radial_extent(&self.sections);
        let (xmin, xmax, ymin, ymax) = self.phi.xy_extent(rmin, rmax);
        let (zmin, zmax) = self.ray_limits();
        self.bbox = BoundingBox::from_corners(&Point3::new(xmin, ymin, zmin), &Point3::new(xmax, ymax, zmax));
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => radial_extent(&self.sections),
            Axis::Phi => (self.phi.phi1(), self.phi.phi2()),
            Axis::Z => self.ray_limits(),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        let (rmin, rmax) = radial_extent(&self.sections);
        Some(BoundingCylinder {
            rmin,
            rmax,
            phi1: self.phi.phi1(),
            phi2: self.phi.phi2(),
        })
    }
}

/// Smallest inner and largest outer radius over all planes.
pub(crate) fn radial_extent(sections: &[Section]) -> (f64, f64) {
    sections.iter().fold((BIG, 0.0_f64), |(lo, hi), s| {
        (lo.min(s.rmin), hi.max(s.rmax))
    })
}

pub(crate) fn fmt_sections(f: &mut fmt::Formatter<'_>, sections: &[Section]) -> fmt::Result {
    for (i, s) in sections.iter().enumerate() {
        write!(f, "\n  z[{i}]={:.5} rmin={:.5} rmax={:.5}", s.z, s.rmin, s.rmax)?;
    }
    Ok(())
}

impl fmt::Display for Polycone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polycone phi1={:.5} dphi={:.5} nz={}",
            self.phi.phi1(),
            self.phi.dphi(),
            self.sections.len()
        )?;
        fmt_sections(f, &self.sections)
    }
}
