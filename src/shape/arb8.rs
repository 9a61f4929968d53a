//! General hexahedra with two quadrilateral caps and ruled lateral faces.
//!
//! Face `i` joins the bottom edge `v[i] -> v[i+1]` to the matching top edge
//! `v[i+4] -> v[i+5]` (indices wrap within each cap). When the two edges are
//! parallel the face is planar; otherwise it is a twisted ruled surface and
//! the ray equations become quadratic.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::math::polygon_2d::{
    is_convex, region_distance, scanline_contains, segment_distance, signed_area_2d,
};
use crate::math::roots::quadratic_half;
use crate::math::{check_finite, orient_along, Point2, Point3, Vector2, Vector3, BIG, PATCH_TOLERANCE, TOLERANCE};

use super::tube::z_exit;
use super::{BoundingBox, Solid};

/// Relative cross product below which a face counts as planar.
const PLANAR_TOLERANCE: f64 = 1e-9;

/// Classification of one lateral face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceKind {
    /// A flat face `normal . p = offset` with outward unit normal.
    Planar { normal: Vector3, offset: f64 },
    /// A non-planar ruled face; `twist` is the sine of the angle between
    /// the bottom and top edges.
    Twisted { twist: f64 },
    /// Both edges reduced to points: the face has no area.
    Collapsed,
}

/// Geometry of face `i` relative to its bottom start vertex.
#[derive(Debug, Clone, Copy)]
struct FaceFrame {
    a: Point2,
    // Bottom edge and the lateral drifts of both end vertices over the full height.
    edge: Vector2,
    la: Vector2,
    lb: Vector2,
}

impl FaceFrame {
    /// Edge start and direction of the cross-section at height fraction `s`.
    fn at(&self, s: f64) -> (Point2, Vector2) {
        (self.a + self.la * s, self.edge + (self.lb - self.la) * s)
    }
}

/// An eight-vertex hexahedron between `z = -dz` and `z = +dz`.
#[derive(Debug, Clone)]
pub struct Arb8 {
    dz: f64,
    vertices: [Point2; 8],
    faces: [FaceKind; 4],
    // +1 for counter-clockwise caps, -1 for clockwise.
    sigma: f64,
    convex: bool,
    bbox: BoundingBox,
}

impl Arb8 {
    /// Creates a hexahedron; the first four vertices lie at `-dz`, the last
    /// four at `+dz`, both in the same winding order.
    ///
    /// # Errors
    ///
    /// Returns an error if `dz` is not positive, a coordinate is not
    /// finite, both caps have zero area, or the caps wind in opposite
    /// directions.
    pub fn new(dz: f64, vertices: [Point2; 8]) -> Result<Self> {
        let dz = check_finite("dz", dz)?;
        if dz <= 0.0 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "dz",
                value: dz,
                min: 0.0,
                max: f64::MAX,
            }
            .into());
        }
        for v in &vertices {
            check_finite("vertex", v.x)?;
            check_finite("vertex", v.y)?;
        }
        let mut arb = Self {
            dz,
            vertices,
            faces: [FaceKind::Collapsed; 4],
            sigma: 1.0,
            convex: false,
            bbox: BoundingBox::default(),
        };
        arb.compute_twist()?;
        arb.compute_bbox();
        Ok(arb)
    }

    /// Moves vertex `i` and reclassifies the faces.
    ///
    /// The bounding box is left untouched until
    /// [`compute_bbox`](Solid::compute_bbox) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if `i` is not below 8, a coordinate is not finite,
    /// or the new vertex set is not a valid hexahedron.
    pub fn set_vertex(&mut self, i: usize, x: f64, y: f64) -> Result<()> {
        if i >= 8 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "vertex",
                value: i as f64,
                min: 0.0,
                max: 7.0,
            }
            .into());
        }
        self.vertices[i] = Point2::new(check_finite("vertex", x)?, check_finite("vertex", y)?);
        self.compute_twist()
    }

    #[must_use]
    pub fn dz(&self) -> f64 {
        self.dz
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point2; 8] {
        &self.vertices
    }

    #[must_use]
    pub fn faces(&self) -> &[FaceKind; 4] {
        &self.faces
    }

    /// Classifies every lateral face and caches the cap orientation.
    fn compute_twist(&mut self) -> Result<()> {
        let bottom = self.cap(false);
        let top = self.cap(true);
        let area_bottom = signed_area_2d(&bottom);
        let area_top = signed_area_2d(&top);
        if area_bottom.abs() < TOLERANCE && area_top.abs() < TOLERANCE {
            return Err(GeometryError::Degenerate("arb8 caps have no area".into()).into());
        }
        if area_bottom.abs() >= TOLERANCE
            && area_top.abs() >= TOLERANCE
            && area_bottom.signum() != area_top.signum()
        {
            return Err(
                GeometryError::Degenerate("arb8 caps wind in opposite directions".into()).into(),
            );
        }
        self.sigma = if area_bottom.abs() >= TOLERANCE {
            area_bottom.signum()
        } else {
            area_top.signum()
        };
        for i in 0..4 {
            self.faces[i] = self.classify(i);
        }
        self.convex = is_convex(&bottom)
            && is_convex(&top)
            && self.faces.iter().all(|f| !matches!(f, FaceKind::Twisted { .. }));
        Ok(())
    }

    fn classify(&self, i: usize) -> FaceKind {
        let f = self.frame(i);
        let top_edge = f.edge + f.lb - f.la;
        let (nb, nt) = (f.edge.norm(), top_edge.norm());
        if nb < TOLERANCE && nt < TOLERANCE {
            return FaceKind::Collapsed;
        }
        let twist = if nb < TOLERANCE || nt < TOLERANCE {
            0.0
        } else {
            (f.edge.x * top_edge.y - f.edge.y * top_edge.x) / (nb * nt)
        };
        if twist.abs() >= PLANAR_TOLERANCE {
            return FaceKind::Twisted { twist };
        }
        let along = if nb >= TOLERANCE { f.edge } else { top_edge };
        let lateral = Vector3::new(f.la.x, f.la.y, 2.0 * self.dz);
        let normal = Vector3::new(along.x, along.y, 0.0).cross(&lateral) * self.sigma;
        let normal = normal.normalize();
        let offset = normal.dot(&Vector3::new(f.a.x, f.a.y, -self.dz));
        FaceKind::Planar { normal, offset }
    }

    fn frame(&self, i: usize) -> FaceFrame {
        let j = (i + 1) % 4;
        let v = &self.vertices;
        FaceFrame {
            a: v[i],
            edge: v[j] - v[i],
            la: v[i + 4] - v[i],
            lb: v[j + 4] - v[j],
        }
    }

    fn cap(&self, top: bool) -> [Point2; 4] {
        let o = if top { 4 } else { 0 };
        [
            self.vertices[o],
            self.vertices[o + 1],
            self.vertices[o + 2],
            self.vertices[o + 3],
        ]
    }

    fn fraction(&self, z: f64) -> f64 {
        (z + self.dz) / (2.0 * self.dz)
    }

    /// Cross-section polygon at height `z`.
    #[must_use]
    pub fn section(&self, z: f64) -> [Point2; 4] {
        let s = self.fraction(z);
        std::array::from_fn(|k| self.vertices[k] + (self.vertices[k + 4] - self.vertices[k]) * s)
    }

    /// Crossings of the ray with the surface of face `i`, as `(t, slope)`
    /// pairs. A positive slope enters the solid, a negative one leaves it.
    fn crossings(&self, i: usize, point: &Point3, dir: &Vector3) -> [(f64, f64); 2] {
        let mut out = [(BIG, 0.0); 2];
        match self.faces[i] {
            FaceKind::Collapsed => {}
            FaceKind::Planar { normal, offset } => {
                let den = normal.dot(dir);
                if den != 0.0 {
                    out[0] = ((offset - normal.dot(&point.coords)) / den, -den);
                }
            }
            FaceKind::Twisted { .. } => {
                let f = self.frame(i);
                let s0 = self.fraction(point.z);
                let s1 = dir.z / (2.0 * self.dz);
                let dl = f.lb - f.la;
                let e0 = f.edge + dl * s0;
                let e1 = dl * s1;
                let w0 = Vector2::new(point.x, point.y) - f.a.coords - f.la * s0;
                let w1 = Vector2::new(dir.x, dir.y) - f.la * s1;
                let cross = |a: &Vector2, b: &Vector2| a.x * b.y - a.y * b.x;
                let c2 = self.sigma * cross(&e1, &w1);
                let c1 = self.sigma * (cross(&e0, &w1) + cross(&e1, &w0));
                let c0 = self.sigma * cross(&e0, &w0);
                for (slot, t) in out.iter_mut().zip(quadratic_half(c2, 0.5 * c1, c0).iter()) {
                    *slot = (t, 2.0 * c2 * t + c1);
                }
            }
        }
        out
    }

    /// Whether the hit at `t` lies on the finite patch of face `i`.
    fn on_patch(&self, i: usize, point: &Point3, dir: &Vector3, t: f64) -> bool {
        let q = point + dir * t;
        if q.z.abs() > self.dz + PATCH_TOLERANCE {
            return false;
        }
        let (start, edge) = self.frame(i).at(self.fraction(q.z).clamp(0.0, 1.0));
        let w = Vector2::new(q.x, q.y) - start.coords;
        let len_sq = edge.norm_squared();
        if len_sq < TOLERANCE * TOLERANCE {
            return w.norm() <= PATCH_TOLERANCE;
        }
        let u = w.dot(&edge) / len_sq;
        let slack = PATCH_TOLERANCE / len_sq.sqrt();
        (-slack..=1.0 + slack).contains(&u)
    }

    /// Nearest crossing of any face ahead of the point, entering or leaving.
    fn face_distance(&self, point: &Point3, dir: &Vector3, entering: bool) -> f64 {
        let mut best = BIG;
        for i in 0..4 {
            for (t, slope) in self.crossings(i, point, dir) {
                let wanted = if entering { slope > 0.0 } else { slope < 0.0 };
                if !wanted || t < -PATCH_TOLERANCE || t >= best {
                    continue;
                }
                if self.on_patch(i, point, dir, t) {
                    best = t.max(0.0);
                }
            }
        }
        best
    }

    /// Lower bound on the distance from `point` to face `i`.
    fn face_safety(&self, i: usize, point: &Point3) -> f64 {
        match self.faces[i] {
            FaceKind::Collapsed => BIG,
            FaceKind::Planar { normal, offset } => (normal.dot(&point.coords) - offset).abs(),
            FaceKind::Twisted { .. } => {
                // Points of the face at height z stay within a cone of slope
                // `drift` around the edge at the clamped height of the point.
                let f = self.frame(i);
                let z0 = point.z.clamp(-self.dz, self.dz);
                let (start, edge) = f.at(self.fraction(z0));
                let d0 = segment_distance(&Point2::new(point.x, point.y), &start, &(start + edge));
                let drift = f.la.norm().max(f.lb.norm()) / (2.0 * self.dz);
                d0 / (1.0 + drift * drift).sqrt()
            }
        }
    }

    /// Outward normal of the ruled face `i` at the point of the face
    /// nearest to `point` at its height.
    fn face_normal(&self, i: usize, point: &Point3) -> Vector3 {
        if let FaceKind::Planar { normal, .. } = self.faces[i] {
            return normal;
        }
        let f = self.frame(i);
        let s = self.fraction(point.z.clamp(-self.dz, self.dz));
        let (start, edge) = f.at(s);
        let len_sq = edge.norm_squared();
        let u = if len_sq < TOLERANCE * TOLERANCE {
            0.0
        } else {
            ((Vector2::new(point.x, point.y) - start.coords).dot(&edge) / len_sq).clamp(0.0, 1.0)
        };
        let du = Vector3::new(edge.x, edge.y, 0.0);
        let drift = f.la + (f.lb - f.la) * u;
        let ds = Vector3::new(drift.x, drift.y, 2.0 * self.dz);
        (du.cross(&ds) * self.sigma)
            .try_normalize(TOLERANCE)
            .unwrap_or_else(Vector3::z)
    }
}

impl Solid for Arb8 {
    fn contains(&self, point: &Point3) -> bool {
        if point.z.abs() > self.dz {
            return false;
        }
        scanline_contains(&self.section(point.z), &Point2::new(point.x, point.y))
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        if self.bbox.misses(point, dir) {
            return BIG;
        }
        let mut best = BIG;
        if point.z.abs() >= self.dz && point.z * dir.z < 0.0 {
            let s = (point.z.abs() - self.dz) / dir.z.abs();
            let hit = Point2::new(point.x + s * dir.x, point.y + s * dir.y);
            if scanline_contains(&self.cap(point.z > 0.0), &hit) {
                best = s;
            }
        }
        best.min(self.face_distance(point, dir, true))
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        z_exit(point.z, dir.z, self.dz).min(self.face_distance(point, dir, false))
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        if self.contains(point) != inside {
            return 0.0;
        }
        let xy = Point2::new(point.x, point.y);
        let mut best = BIG;
        for (zc, top) in [(-self.dz, false), (self.dz, true)] {
            best = best.min((point.z - zc).hypot(region_distance(&self.cap(top), &xy)));
        }
        for i in 0..4 {
            best = best.min(self.face_safety(i, point));
        }
        if !inside && self.convex {
            let planes = self.faces.iter().filter_map(|f| match f {
                FaceKind::Planar { normal, offset } => Some(normal.dot(&point.coords) - offset),
                _ => None,
            });
            let slab = planes.fold(point.z.abs() - self.dz, f64::max);
            best = best.max(slab);
        }
        best.max(0.0)
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        let cap_sign = if point.z >= 0.0 { 1.0 } else { -1.0 };
        let mut best = (self.dz - point.z.abs()).abs();
        let mut normal = Vector3::z() * cap_sign;
        for i in 0..4 {
            if self.faces[i] == FaceKind::Collapsed {
                continue;
            }
            let d = self.face_safety(i, point);
            if d < best {
                best = d;
                normal = self.face_normal(i, point);
            }
        }
        orient_along(normal, dir)
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        let (lo, hi) = self.vertices.iter().fold(
            (Point2::new(f64::INFINITY, f64::INFINITY), Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY)),
            |(lo, hi), v| (lo.inf(v), hi.sup(v)),
        );
        self.bbox = BoundingBox::from_corners(
            &Point3::new(lo.x, lo.y, -self.dz),
            &Point3::new(hi.x, hi.y, self.dz),
        );
    }
}

impl fmt::Display for Arb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arb8 dz={:.5}", self.dz)?;
        for (i, v) in self.vertices.iter().enumerate() {
            write!(f, " v{i}=({:.5}, {:.5})", v.x, v.y)?;
        }
        Ok(())
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

    fn square(half: f64) -> [Point2; 4] {
        [
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ]
    }

    fn stack(bottom: [Point2; 4], top: [Point2; 4]) -> [Point2; 8] {
        [bottom[0], bottom[1], bottom[2], bottom[3], top[0], top[1], top[2], top[3]]
    }

    fn cube() -> Arb8 {
        Arb8::new(1.0, stack(square(1.0), square(1.0))).unwrap()
    }

    // Top cap is the bottom square turned by 90 degrees, so every face twists
    // and the mid-height section is a diamond |x| + |y| <= 1.
    fn twisted() -> Arb8 {
        let sq = square(1.0);
        Arb8::new(1.0, stack(sq, [sq[1], sq[2], sq[3], sq[0]])).unwrap()
    }

    #[test]
    fn cube_queries() {
        let arb = cube();
        assert!(arb.contains(&p(0.0, 0.0, 0.0)));
        assert!(!arb.contains(&p(2.0, 0.0, 0.0)));
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(arb.distance_in(&p(5.0, 0.0, 0.0), &v(-1.0, 0.0, 0.0)), 4.0, epsilon = 1e-12);
        assert_relative_eq!(arb.distance_in(&p(0.2, 0.3, 5.0), &v(0.0, 0.0, -1.0)), 4.0, epsilon = 1e-12);
        assert!(arb.distance_in(&p(5.0, 2.0, 0.0), &v(-1.0, 0.0, 0.0)) >= BIG);
        assert!(arb.faces().iter().all(|f| matches!(f, FaceKind::Planar { .. })));
    }

    #[test]
    fn clockwise_vertices_give_the_same_solid() {
        let sq = square(1.0);
        let cw = [sq[0], sq[3], sq[2], sq[1]];
        let arb = Arb8::new(1.0, stack(cw, cw)).unwrap();
        assert!(arb.contains(&p(0.5, -0.5, 0.5)));
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(0.0, -1.0, 0.0)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(arb.distance_in(&p(-3.0, 0.0, 0.0), &v(1.0, 0.0, 0.0)), 2.0, epsilon = 1e-12);
        let n = arb.normal(&p(1.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!((n - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn cube_safety() {
        let arb = cube();
        assert_relative_eq!(arb.safety(&p(0.5, 0.0, 0.0), true), 0.5, epsilon = 1e-12);
        assert_relative_eq!(arb.safety(&p(3.0, 0.0, 0.0), false), 2.0, epsilon = 1e-12);
        assert!(arb.safety(&p(3.0, 0.0, 0.0), true).abs() < 1e-12);
    }

    #[test]
    fn tapered_faces_are_planar() {
        let arb = Arb8::new(2.0, stack(square(2.0), square(1.0))).unwrap();
        assert!(arb.faces().iter().all(|f| matches!(f, FaceKind::Planar { .. })));
        assert!(arb.contains(&p(1.4, 0.0, 0.0)));
        assert!(!arb.contains(&p(1.6, 0.0, 0.0)));
        // Side wall x = 1.5 - z / 4 at y = 0.
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0)), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn twisted_faces() {
        let arb = twisted();
        assert!(arb.faces().iter().all(|f| matches!(f, FaceKind::Twisted { .. })));
        assert!(arb.contains(&p(0.0, 0.0, 0.0)));
        assert!(arb.contains(&p(0.6, 0.0, 0.0)));
        assert!(!arb.contains(&p(0.9, 0.2, 0.0)));
        assert!(arb.contains(&p(0.9, 0.2, 1.0)));
    }

    #[test]
    fn twisted_distances() {
        let arb = twisted();
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.2, 0.0), &v(1.0, 0.0, 0.0)), 0.8, epsilon = 1e-9);
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(0.0, 0.0, 1.0)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(arb.distance_in(&p(5.0, 0.2, 0.0), &v(-1.0, 0.0, 0.0)), 4.2, epsilon = 1e-9);
        assert_relative_eq!(arb.distance_in(&p(0.9, 0.05, -5.0), &v(0.0, 0.0, 1.0)), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn twisted_oblique_exit_lands_on_boundary() {
        let arb = twisted();
        let start = p(0.1, -0.2, -0.3);
        for d in [v(1.0, 0.0, 1.0), v(-0.3, 1.0, 0.4), v(0.5, 0.5, -0.2), v(-1.0, -0.7, 0.1)] {
            let t = arb.distance_out(&start, &d);
            assert!(t > 0.0 && t < BIG);
            assert!(arb.contains(&(start + d * (t - 1e-6))));
            assert!(!arb.contains(&(start + d * (t + 1e-6))));
        }
    }

    #[test]
    fn twisted_safety_is_conservative() {
        let arb = twisted();
        let saf = arb.safety(&p(0.0, 0.0, 0.0), true);
        assert!(saf > 0.0 && saf <= 0.5_f64.sqrt() + 1e-12, "saf={saf}");
    }

    #[test]
    fn set_vertex_reclassifies_but_keeps_bbox() {
        let mut arb = cube();
        arb.set_vertex(4, -2.0, -1.0).unwrap();
        assert!(matches!(arb.faces()[0], FaceKind::Twisted { .. }) || matches!(arb.faces()[3], FaceKind::Twisted { .. }));
        assert_relative_eq!(arb.bounding_box().min().x, -1.0);
        arb.compute_bbox();
        assert_relative_eq!(arb.bounding_box().min().x, -2.0);
        assert!(arb.set_vertex(8, 0.0, 0.0).is_err());
    }

    #[test]
    fn rejects_flat_and_inverted_caps() {
        let point = [Point2::origin(); 4];
        assert!(Arb8::new(1.0, stack(point, point)).is_err());
        let sq = square(1.0);
        let cw = [sq[0], sq[3], sq[2], sq[1]];
        assert!(Arb8::new(1.0, stack(sq, cw)).is_err());
        assert!(Arb8::new(0.0, stack(sq, sq)).is_err());
    }

    #[test]
    fn pyramid_apex_collapses_top() {
        let apex = [Point2::origin(); 4];
        let arb = Arb8::new(1.0, stack(square(1.0), apex)).unwrap();
        assert!(arb.contains(&p(0.0, 0.0, 0.9)));
        assert!(!arb.contains(&p(0.5, 0.0, 0.5)));
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(0.0, 0.0, 1.0)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(arb.distance_out(&p(0.0, 0.0, 0.0), &v(1.0, 0.0, 0.0)), 0.5, epsilon = 1e-12);
    }
}
