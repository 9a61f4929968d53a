//! Stacks of regular-polygon segments keyed by z.
//!
//! Radii are apothems: the distance from the axis to the middle of each
//! flat facet. Every slab between two planes is split by sector into convex
//! cells, and the ray queries clip against those cells.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::phi::PhiRange;
use crate::math::{orient_along, Point3, Vector2, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::polycone::{
    bracket, checked_sections, face_candidates, fmt_sections, is_degenerate, radial_extent,
    widen_inside_safety, widen_outside_safety, with_section, Section,
};
use super::{Axis, BoundingBox, BoundingCylinder, Solid};

/// The half-space `normal . p <= offset`.
#[derive(Debug, Clone, Copy)]
struct HalfSpace {
    normal: Vector3,
    offset: f64,
}

impl HalfSpace {
    fn new(normal: Vector3, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// Signed distance, positive outside.
    fn signed_distance(&self, point: &Point3) -> f64 {
        (self.normal.dot(&point.coords) - self.offset) / self.normal.norm()
    }
}

/// A convex cell as an intersection of at most six half-spaces.
#[derive(Debug, Clone, Copy)]
struct Cell {
    planes: [HalfSpace; 6],
    len: usize,
}

impl Cell {
    fn planes(&self) -> &[HalfSpace] {
        &self.planes[..self.len]
    }

    /// Parameter interval `(tin, tout)` of the line inside the cell.
    fn clip(&self, point: &Point3, dir: &Vector3) -> Option<(f64, f64)> {
        let mut tin = -BIG;
        let mut tout = BIG;
        for plane in self.planes() {
            let num = plane.offset - plane.normal.dot(&point.coords);
            let den = plane.normal.dot(dir);
            if den == 0.0 {
                if num < -PATCH_TOLERANCE {
                    return None;
                }
                continue;
            }
            let t = num / den;
            if den < 0.0 {
                tin = tin.max(t);
            } else {
                tout = tout.min(t);
            }
        }
        (tin <= tout).then_some((tin, tout))
    }

    /// Lower bound on the distance from an outside point to the cell.
    fn safety_out(&self, point: &Point3) -> f64 {
        self.planes()
            .iter()
            .map(|h| h.signed_distance(point))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Bisector and edge normals of one azimuthal sector.
#[derive(Debug, Clone, Copy)]
struct Sector {
    u: Vector2,
    // Outward normals of the lower and upper edge half-planes.
    lo: Vector2,
    hi: Vector2,
}

/// Linear description of one slab: radii at its lower plane and slopes.
#[derive(Debug, Clone, Copy)]
struct Slab {
    z1: f64,
    z2: f64,
    rmin1: f64,
    rmax1: f64,
    tg_in: f64,
    tg_out: f64,
    has_inner: bool,
}

impl Slab {
    fn radii_at(&self, z: f64) -> (f64, f64) {
        let dz = (z - self.z1).clamp(0.0, self.z2 - self.z1);
        (self.rmin1 + self.tg_in * dz, self.rmax1 + self.tg_out * dz)
    }

    fn outer(&self, u: &Vector2) -> HalfSpace {
        HalfSpace::new(
            Vector3::new(u.x, u.y, -self.tg_out),
            self.rmax1 - self.tg_out * self.z1,
        )
    }

    fn inner(&self, u: &Vector2) -> HalfSpace {
        HalfSpace::new(
            Vector3::new(-u.x, -u.y, self.tg_in),
            -(self.rmin1 - self.tg_in * self.z1),
        )
    }
}

/// A faceted revolution solid made of stacked regular-polygon segments.
#[derive(Debug, Clone)]
pub struct Polygon {
    phi: PhiRange,
    nedges: usize,
    sections: Vec<Section>,
    sectors: Vec<Sector>,
    bbox: BoundingBox,
}

impl Polygon {
    /// Creates a polygon from its azimuthal range (degrees), number of
    /// facets over that range, and planes.
    ///
    /// # Errors
    ///
    /// Returns an error if `nedges` is zero or leaves facets spanning 180
    /// degrees or more, or if the planes are invalid as for a
    /// [`Polycone`](super::Polycone).
    pub fn new(phi1: f64, dphi: f64, nedges: usize, sections: Vec<Section>) -> Result<Self> {
        let phi = PhiRange::from_start(phi1, dphi)?;
        if nedges == 0 || phi.dphi() / nedges as f64 >= 180.0 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "nedges",
                value: nedges as f64,
                min: (phi.dphi() / 180.0).floor() + 1.0,
                max: f64::MAX,
            }
            .into());
        }
        let mut pgon = Self {
            phi,
            nedges,
            sections: checked_sections(sections)?,
            sectors: build_sectors(&phi, nedges),
            bbox: BoundingBox::default(),
        };
        pgon.compute_bbox();
        Ok(pgon)
    }

    /// Redefines plane `i` as [`Polycone::define_section`](super::Polycone::define_section)
    /// does.
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
    pub fn nedges(&self) -> usize {
        self.nedges
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Angular width of one facet, in degrees.
    fn divphi(&self) -> f64 {
        self.phi.dphi() / self.nedges as f64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sector_of(&self, x: f64, y: f64) -> usize {
        let ddp = self.phi.offset_of(x, y);
        ((ddp / self.divphi()).floor() as usize).min(self.nedges - 1)
    }

    fn slab(&self, j: usize) -> Option<Slab> {
        if is_degenerate(&self.sections, j) {
            return None;
        }
        let (a, b) = (self.sections[j], self.sections[j + 1]);
        let h = b.z - a.z;
        Some(Slab {
            z1: a.z,
            z2: b.z,
            rmin1: a.rmin,
            rmax1: a.rmax,
            tg_in: (b.rmin - a.rmin) / h,
            tg_out: (b.rmax - a.rmax) / h,
            has_inner: a.rmin > TOLERANCE || b.rmin > TOLERANCE,
        })
    }

    fn cell(&self, slab: &Slab, sector: &Sector) -> Cell {
        let filler = HalfSpace::new(Vector3::z(), slab.z2);
        let mut planes = [filler; 6];
        planes[0] = HalfSpace::new(-Vector3::z(), -slab.z1);
        planes[1] = HalfSpace::new(Vector3::z(), slab.z2);
        planes[2] = slab.outer(&sector.u);
        planes[3] = HalfSpace::new(Vector3::new(sector.lo.x, sector.lo.y, 0.0), 0.0);
        planes[4] = HalfSpace::new(Vector3::new(sector.hi.x, sector.hi.y, 0.0), 0.0);
        let mut len = 5;
        if slab.has_inner {
            planes[5] = slab.inner(&sector.u);
            len = 6;
        }
        Cell { planes, len }
    }

    /// Non-degenerate slabs touching height `z`, from the highest down.
    fn slabs_near(&self, z: f64) -> impl Iterator<Item = (usize, Slab)> + '_ {
        let j0 = bracket(&self.sections, z);
        (0..=j0)
            .rev()
            .take_while(move |&j| self.sections[j + 1].z >= z - PATCH_TOLERANCE)
            .filter_map(move |j| self.slab(j).map(|s| (j, s)))
            .filter(move |(_, s)| s.z1 <= z + PATCH_TOLERANCE)
    }

    /// Whether `point` lies within the projected radial range of slab `s`.
    fn within_slab(&self, slab: &Slab, point: &Point3, tol: f64) -> bool {
        let sector = &self.sectors[self.sector_of(point.x, point.y)];
        let rp = point.x * sector.u.x + point.y * sector.u.y;
        let (rmin, rmax) = slab.radii_at(point.z);
        rp >= rmin - tol && rp <= rmax + tol
    }

    /// Slab holding the inside point `point`, preferring the one the ray
    /// travels into when the point sits on a plane.
    fn current_slab(&self, point: &Point3, dir: &Vector3) -> Option<(usize, Slab)> {
        let mut found = self
            .slabs_near(point.z)
            .filter(|(_, s)| self.within_slab(s, point, PATCH_TOLERANCE));
        if dir.z < 0.0 {
            found.last()
        } else {
            found.next()
        }
    }

    /// Furthest parameter the ray reaches through the cells of one slab,
    /// starting from `t` where it is already inside.
    fn slab_reach(&self, slab: &Slab, point: &Point3, dir: &Vector3, mut t: f64) -> f64 {
        for _ in 0..=self.nedges {
            let reach = self
                .sectors
                .iter()
                .filter_map(|sector| self.cell(slab, sector).clip(point, dir))
                .filter(|&(tin, _)| tin <= t + PATCH_TOLERANCE)
                .fold(t, |reach, (_, tout)| reach.max(tout));
            if reach <= t + PATCH_TOLERANCE {
                return reach;
            }
            t = reach;
        }
        t
    }

    /// First entry into any cell of the slab, or [`BIG`].
    fn slab_entry(&self, slab: &Slab, point: &Point3, dir: &Vector3) -> f64 {
        self.sectors
            .iter()
            .filter_map(|sector| self.cell(slab, sector).clip(point, dir))
            .filter(|&(tin, tout)| tin >= -PATCH_TOLERANCE && tout >= 0.0)
            .map(|(tin, _)| tin.max(0.0))
            .fold(BIG, f64::min)
    }

    /// Lower bound on the distance to the facets of a slab.
    ///
    /// The facets of the sector holding the point are the nearest facet
    /// planes: its bisector has the largest projection of the point, so its
    /// outer plane is the closest and its inner plane the furthest out.
    fn lateral(&self, slab: &Slab, point: &Point3) -> f64 {
        let sector = &self.sectors[self.sector_of(point.x, point.y)];
        let out = slab.outer(&sector.u).signed_distance(point).abs();
        if slab.has_inner {
            out.min(slab.inner(&sector.u).signed_distance(point).abs())
        } else {
            out
        }
    }

    fn circumscribed(&self, rmax: f64) -> f64 {
        rmax / (0.5 * self.divphi()).to_radians().cos()
    }

    fn z_limits(&self) -> (f64, f64) {
        let n = self.sections.len();
        (self.sections[0].z, self.sections[n - 1].z)
    }
}

fn build_sectors(phi: &PhiRange, nedges: usize) -> Vec<Sector> {
    let divphi = phi.dphi() / nedges as f64;
    (0..nedges)
        .map(|s| {
            let lower = phi.phi1() + s as f64 * divphi;
            let (sm, cm) = (lower + 0.5 * divphi).to_radians().sin_cos();
            let (s1, c1) = lower.to_radians().sin_cos();
            let (s2, c2) = (lower + divphi).to_radians().sin_cos();
            Sector {
                u: Vector2::new(cm, sm),
                lo: Vector2::new(s1, -c1),
                hi: Vector2::new(-s2, c2),
            }
        })
        .collect()
}

impl Solid for Polygon {
    fn contains(&self, point: &Point3) -> bool {
        let (zlo, zhi) = self.z_limits();
        if point.z < zlo || point.z > zhi {
            return false;
        }
        if !self.phi.contains_xy(point.x, point.y) {
            return false;
        }
        let mut j = bracket(&self.sections, point.z);
        loop {
            if let Some(slab) = self.slab(j) {
                if self.within_slab(&slab, point, 0.0) {
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
        let n = self.sections.len();
        if dir.z == 0.0 {
            return self
                .slabs_near(point.z)
                .map(|(_, s)| self.slab_entry(&s, point, dir))
                .fold(BIG, f64::min);
        }
        // Slabs are visited in travel order: the first one hit holds the entry.
        let visit = |j: usize| {
            let behind = if dir.z > 0.0 {
                self.sections[j + 1].z < point.z - PATCH_TOLERANCE
            } else {
                self.sections[j].z > point.z + PATCH_TOLERANCE
            };
            if behind {
                return BIG;
            }
            self.slab(j).map_or(BIG, |slab| self.slab_entry(&slab, point, dir))
        };
        if dir.z > 0.0 {
            (0..n - 1).map(visit).find(|&t| t < BIG).unwrap_or(BIG)
        } else {
            (0..n - 1).rev().map(visit).find(|&t| t < BIG).unwrap_or(BIG)
        }
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        if dir.z == 0.0 {
            // The ray stays at one height: every slab touching it counts.
            let slabs: Vec<Slab> = self.slabs_near(point.z).map(|(_, s)| s).collect();
            let mut t = 0.0_f64;
            for _ in 0..=slabs.len() * (self.nedges + 1) {
                let reach = slabs
                    .iter()
                    .map(|s| self.slab_reach(s, point, dir, t))
                    .fold(t, f64::max);
                if reach <= t + PATCH_TOLERANCE {
                    return reach.max(0.0);
                }
                t = reach;
            }
            return t.max(0.0);
        }
        let Some((mut j, mut slab)) = self.current_slab(point, dir) else {
            return 0.0;
        };
        let n = self.sections.len();
        let mut t = 0.0_f64;
        for _ in 0..n {
            let reach = self.slab_reach(&slab, point, dir, t);
            let (plane, tz) = if dir.z > 0.0 {
                (slab.z2, (slab.z2 - point.z) / dir.z)
            } else {
                (slab.z1, (slab.z1 - point.z) / dir.z)
            };
            if reach < tz - PATCH_TOLERANCE {
                return reach.max(0.0);
            }
            let mut hit = point + dir * tz;
            hit.z = plane;
            let next = if dir.z > 0.0 {
                (j + 1..n - 1).find_map(|k| self.slab(k).map(|s| (k, s)))
            } else {
                (0..j).rev().find_map(|k| self.slab(k).map(|s| (k, s)))
            };
            match next {
                Some((k, s)) if self.within_slab(&s, &hit, PATCH_TOLERANCE) => {
                    t = tz.max(t);
                    j = k;
                    slab = s;
                }
                _ => return reach.max(0.0),
            }
        }
        t.max(0.0)
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        if inside {
            let Some((j, slab)) = self
                .slabs_near(point.z)
                .find(|(_, s)| self.within_slab(s, point, 0.0))
            else {
                return 0.0;
            };
            let best = self
                .lateral(&slab, point)
                .min(self.phi.safety_in(point.x, point.y));
            let lateral = |k: usize| self.slab(k).map_or(BIG, |s| self.lateral(&s, point));
            widen_inside_safety(&self.sections, j, point.z, best, lateral).max(0.0)
        } else {
            widen_outside_safety(&self.sections, point.z, |j| {
                self.slab(j).map_or(BIG, |slab| {
                    self.sectors
                        .iter()
                        .map(|sector| self.cell(&slab, sector).safety_out(point))
                        .fold(BIG, f64::min)
                })
            })
        }
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        let Some((j, slab)) = self
            .slabs_near(point.z)
            .next()
            .or_else(|| {
                let j = bracket(&self.sections, point.z);
                self.slab(j).map(|s| (j, s))
            })
        else {
            return orient_along(Vector3::z(), dir);
        };
        let sector = &self.sectors[self.sector_of(point.x, point.y)];
        let mut candidates = face_candidates(&self.sections, j, point.z);
        let outer = slab.outer(&sector.u);
        candidates.push((outer.signed_distance(point).abs(), outer.normal.normalize()));
        if slab.has_inner {
            let inner = slab.inner(&sector.u);
            candidates.push((inner.signed_distance(point).abs(), inner.normal.normalize()));
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
        let (xmin, xmax, ymin, ymax) = self.phi.xy_extent(rmin, self.circumscribed(rmax));
        let (zmin, zmax) = self.z_limits();
        self.bbox = BoundingBox::from_corners(&Point3::new(xmin, ymin, zmin), &Point3::new(xmax, ymax, zmax));
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        Some(match axis {
            Axis::Radial => radial_extent(&self.sections),
            Axis::Phi => (self.phi.phi1(), self.phi.phi2()),
            Axis::Z => self.z_limits(),
        })
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        let (rmin, rmax) = radial_extent(&self.sections);
        Some(BoundingCylinder {
            rmin,
            rmax: self.circumscribed(rmax),
            phi1: self.phi.phi1(),
            phi2: self.phi.phi2(),
        })
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polygon phi1={:.5} dphi={:.5} nedges={} nz={}",
            self.phi.phi1(),
            self.phi.dphi(),
            self.nedges,
            self.sections.len()
        )?;
        fmt_sections(f, &self.sections)
    }
}
