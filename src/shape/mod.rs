//! Solid primitives and the navigation queries they answer.
//!
//! Every primitive is expressed in its own local frame: revolution solids
//! have their axis along z, and all shapes are centered on the origin in z.
//! Directions passed to the ray queries must be unit vectors.

pub mod arb8;
pub mod bbox;
pub mod composite;
pub mod cone;
pub mod cut_tube;
pub mod params;
pub mod polycone;
pub mod polygon;
pub mod runtime;
pub mod trap;
pub mod tube;

use std::fmt;

use crate::math::{Point3, Vector3, BIG};

pub use arb8::Arb8;
pub use bbox::BoundingBox;
pub use composite::{BoolNode, Component, CompositeShape};
pub use cone::{Cone, ConeSeg};
pub use cut_tube::CutTube;
pub use params::from_params;
pub use polycone::{Polycone, Section};
pub use polygon::Polygon;
pub use runtime::{DeferredTrapDims, Dimension, RuntimeShape, ShapeDef};
pub use trap::{Gtra, Trap, TrapDims};
pub use tube::{Tube, TubeSeg};

/// How much work a ray-distance query performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Compute only the safety bound; the distance is [`BIG`].
    SafetyOnly,
    /// Compute the safety bound and skip the exact distance when the bound
    /// already exceeds the step budget.
    RejectIfExceedsStep,
    /// Compute the exact distance without a safety bound.
    #[default]
    FullComputation,
}

/// Result of a ray-distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    /// Distance to the boundary crossing, [`BIG`] when there is none or the
    /// computation was skipped.
    pub distance: f64,
    /// Lower bound on the distance to any boundary, when requested.
    pub safety: Option<f64>,
}

impl Distance {
    /// Returns `true` when the distance is a real crossing.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.distance < BIG
    }
}

/// Coordinate axes of the revolution solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Distance from the z axis.
    Radial,
    /// Azimuth in degrees.
    Phi,
    /// Position along z.
    Z,
}

/// Cylinder enclosing a shape, used by navigators as a cheap pre-filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingCylinder {
    /// Smallest inner radius.
    pub rmin: f64,
    /// Largest outer radius, circumscribed for faceted shapes.
    pub rmax: f64,
    /// Lower azimuthal limit in degrees.
    pub phi1: f64,
    /// Upper azimuthal limit in degrees.
    pub phi2: f64,
}

/// The query capability shared by every shape.
pub trait Solid {
    /// Exact closed membership test.
    fn contains(&self, point: &Point3) -> bool;

    /// Distance along `dir` to the first entry crossing, or [`BIG`].
    ///
    /// The point is expected to lie outside the solid.
    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64;

    /// Distance along `dir` to the first exit crossing.
    ///
    /// The point is expected to lie inside the solid.
    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64;

    /// Lower bound on the distance to the nearest boundary, never negative.
    ///
    /// `inside` states on which side of the boundary the caller believes the
    /// point to be.
    fn safety(&self, point: &Point3, inside: bool) -> f64;

    /// Unit normal of the surface closest to `point`, oriented so that it
    /// does not point against `dir`.
    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3;

    /// The cached bounding box.
    fn bounding_box(&self) -> &BoundingBox;

    /// Recomputes the cached bounding box from the current dimensions.
    fn compute_bbox(&mut self);

    /// Range of the shape along `axis`, when it is meaningful.
    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        match axis {
            Axis::Z => {
                let b = self.bounding_box();
                Some((b.min().z, b.max().z))
            }
            Axis::Radial | Axis::Phi => None,
        }
    }

    /// Enclosing cylinder, for shapes built around the z axis.
    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        None
    }

    /// Entry distance with the early-exit behavior selected by `mode`.
    fn dist_to_in(&self, point: &Point3, dir: &Vector3, mode: QueryMode, step: f64) -> Distance {
        run_mode(
            mode,
            step,
            || self.safety(point, false),
            || self.distance_in(point, dir),
        )
    }

    /// Exit distance with the early-exit behavior selected by `mode`.
    fn dist_to_out(&self, point: &Point3, dir: &Vector3, mode: QueryMode, step: f64) -> Distance {
        run_mode(
            mode,
            step,
            || self.safety(point, true),
            || self.distance_out(point, dir),
        )
    }
}

fn run_mode(
    mode: QueryMode,
    step: f64,
    safety: impl FnOnce() -> f64,
    exact: impl FnOnce() -> f64,
) -> Distance {
    match mode {
        QueryMode::FullComputation => Distance {
            distance: exact(),
            safety: None,
        },
        QueryMode::SafetyOnly => Distance {
            distance: BIG,
            safety: Some(safety()),
        },
        QueryMode::RejectIfExceedsStep => {
            let saf = safety();
            let distance = if saf > step { BIG } else { exact() };
            Distance {
                distance,
                safety: Some(saf),
            }
        }
    }
}

/// Every primitive, as a closed sum type.
#[derive(Debug, Clone)]
pub enum Shape {
    Tube(Tube),
    TubeSeg(TubeSeg),
    CutTube(CutTube),
    Cone(Cone),
    ConeSeg(ConeSeg),
    Polycone(Polycone),
    Polygon(Polygon),
    Arb8(Arb8),
    Trap(Trap),
    Gtra(Gtra),
    Composite(CompositeShape),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Shape::Tube($inner) => $body,
            Shape::TubeSeg($inner) => $body,
            Shape::CutTube($inner) => $body,
            Shape::Cone($inner) => $body,
            Shape::ConeSeg($inner) => $body,
            Shape::Polycone($inner) => $body,
            Shape::Polygon($inner) => $body,
            Shape::Arb8($inner) => $body,
            Shape::Trap($inner) => $body,
            Shape::Gtra($inner) => $body,
            Shape::Composite($inner) => $body,
        }
    };
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Shape {
                fn from(value: $variant) -> Self {
                    Shape::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant!(Tube, TubeSeg, CutTube, Cone, ConeSeg, Polycone, Polygon, Arb8, Trap, Gtra);

impl From<CompositeShape> for Shape {
    fn from(value: CompositeShape) -> Self {
        Shape::Composite(value)
    }
}

impl Shape {
    /// Short name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Tube(_) => "Tube",
            Shape::TubeSeg(_) => "TubeSeg",
            Shape::CutTube(_) => "CutTube",
            Shape::Cone(_) => "Cone",
            Shape::ConeSeg(_) => "ConeSeg",
            Shape::Polycone(_) => "Polycone",
            Shape::Polygon(_) => "Polygon",
            Shape::Arb8(_) => "Arb8",
            Shape::Trap(_) => "Trap",
            Shape::Gtra(_) => "Gtra",
            Shape::Composite(_) => "Composite",
        }
    }
}

impl Solid for Shape {
    fn contains(&self, point: &Point3) -> bool {
        dispatch!(self, s => s.contains(point))
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        dispatch!(self, s => s.distance_in(point, dir))
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        dispatch!(self, s => s.distance_out(point, dir))
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        dispatch!(self, s => s.safety(point, inside))
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        dispatch!(self, s => s.normal(point, dir))
    }

    fn bounding_box(&self) -> &BoundingBox {
        dispatch!(self, s => s.bounding_box())
    }

    fn compute_bbox(&mut self) {
        dispatch!(self, s => s.compute_bbox());
    }

    fn axis_range(&self, axis: Axis) -> Option<(f64, f64)> {
        dispatch!(self, s => s.axis_range(axis))
    }

    fn bounding_cylinder(&self) -> Option<BoundingCylinder> {
        dispatch!(self, s => s.bounding_cylinder())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, s => fmt::Display::fmt(s, f))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Isometry3, Point2};
    use approx::assert_relative_eq;

    /// Reproducible sample points and directions.
    struct Lcg(u64);

    impl Lcg {
        #[allow(clippy::cast_precision_loss)]
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 11) as f64 / (1_u64 << 53) as f64
        }

        fn signed(&mut self) -> f64 {
            2.0 * self.next_f64() - 1.0
        }

        fn point_near(&mut self, bbox: &BoundingBox) -> Point3 {
            let h = bbox.half_extents().add_scalar(0.5);
            bbox.origin() + Vector3::new(h.x * self.signed(), h.y * self.signed(), h.z * self.signed())
        }

        fn direction(&mut self) -> Vector3 {
            loop {
                let v = Vector3::new(self.signed(), self.signed(), self.signed());
                if let Some(u) = v.try_normalize(0.1) {
                    return u;
                }
            }
        }
    }

    fn square() -> [Point2; 4] {
        [
            Point2::new(-1.0, -1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, -1.0),
        ]
    }

    fn cube() -> Arb8 {
        let sq = square();
        Arb8::new(1.0, [sq[0], sq[1], sq[2], sq[3], sq[0], sq[1], sq[2], sq[3]]).unwrap()
    }

    fn samples() -> Vec<Shape> {
        let sq = square();
        let cross = CompositeShape::new(
            vec![
                Component::unplaced(Tube::new(0.0, 1.0, 2.0).unwrap()),
                Component::new(
                    Trap::new(TrapDims::cuboid(2.5, 0.5, 0.5)).unwrap(),
                    Isometry3::translation(0.0, 0.0, 1.0),
                ),
            ],
            BoolNode::union(BoolNode::Leaf(0), BoolNode::Leaf(1)),
        )
        .unwrap();
        vec![
            Tube::new(1.0, 3.0, 2.0).unwrap().into(),
            TubeSeg::new(0.5, 3.0, 2.0, 30.0, 250.0).unwrap().into(),
            CutTube::new(
                0.5,
                3.0,
                2.0,
                0.0,
                360.0,
                Vector3::new(0.0, -0.3, -1.0),
                Vector3::new(0.2, 0.0, 1.0),
            )
            .unwrap()
            .into(),
            Cone::new(2.0, 0.5, 1.0, 1.0, 3.0).unwrap().into(),
            ConeSeg::new(2.0, 0.0, 1.0, 0.5, 3.0, -40.0, 120.0).unwrap().into(),
            Polycone::new(
                0.0,
                360.0,
                vec![
                    Section::new(-2.0, 0.0, 1.0),
                    Section::new(0.0, 0.0, 1.0),
                    Section::new(0.0, 0.0, 2.0),
                    Section::new(2.0, 0.0, 2.0),
                ],
            )
            .unwrap()
            .into(),
            Polycone::new(
                20.0,
                280.0,
                vec![
                    Section::new(-2.0, 0.5, 2.0),
                    Section::new(1.0, 1.0, 3.0),
                    Section::new(2.0, 0.2, 1.0),
                ],
            )
            .unwrap()
            .into(),
            Polycone::new(
                30.0,
                240.0,
                vec![
                    Section::new(-2.0, 0.5, 1.5),
                    Section::new(0.0, 0.5, 1.5),
                    Section::new(0.0, 1.0, 2.5),
                    Section::new(2.0, 0.8, 2.0),
                ],
            )
            .unwrap()
            .into(),
            Polygon::new(0.0, 360.0, 6, vec![Section::new(-2.0, 0.0, 2.0), Section::new(2.0, 0.0, 2.0)])
                .unwrap()
                .into(),
            Polygon::new(
                10.0,
                250.0,
                5,
                vec![
                    Section::new(-2.0, 1.0, 2.0),
                    Section::new(0.0, 0.5, 3.0),
                    Section::new(0.0, 1.0, 2.0),
                    Section::new(2.0, 1.2, 2.5),
                ],
            )
            .unwrap()
            .into(),
            Arb8::new(1.0, [sq[0], sq[1], sq[2], sq[3], sq[1], sq[2], sq[3], sq[0]])
                .unwrap()
                .into(),
            Trap::new(TrapDims {
                theta: 20.0,
                phi: 30.0,
                alpha1: 10.0,
                alpha2: 10.0,
                ..TrapDims::cuboid(1.0, 1.5, 2.0)
            })
            .unwrap()
            .into(),
            Gtra::new(TrapDims::cuboid(1.0, 1.5, 2.0), 30.0).unwrap().into(),
            cross.into(),
        ]
    }

    fn check_exit(shape: &Shape, p: &Point3, d: &Vector3) {
        let saf = shape.safety(p, true);
        let t = shape.distance_out(p, d);
        assert!(t < BIG, "{shape}: no exit from {p} along {d}");
        assert!(t >= saf - 1e-9, "{shape}: exit {t} below safety {saf} at {p}");
        for f in [0.25, 0.5, 0.75] {
            assert!(shape.contains(&(p + d * (t * f))), "{shape}: left early from {p} along {d}");
        }
        assert!(!shape.contains(&(p + d * (t + 1e-6))), "{shape}: still inside after exit {t} from {p} along {d}");
    }

    fn check_entry(shape: &Shape, p: &Point3, d: &Vector3) {
        let saf = shape.safety(p, false);
        let t = shape.distance_in(p, d);
        if t >= BIG {
            let reach = 2.0 * shape.bounding_box().half_extents().norm() + (p - shape.bounding_box().origin()).norm();
            for i in 1..=64 {
                let q = p + d * (reach * f64::from(i) / 64.0);
                assert!(!shape.contains(&q), "{shape}: missed entry from {p} along {d}");
            }
            return;
        }
        assert!(t >= saf - 1e-9, "{shape}: entry {t} below safety {saf} at {p}");
        for f in [0.25, 0.5, 0.75] {
            assert!(!shape.contains(&(p + d * (t * f))), "{shape}: entered before {t} from {p} along {d}");
        }
        assert!(shape.contains(&(p + d * (t + 1e-7))), "{shape}: not inside after entry {t} from {p} along {d}");
    }

    #[test]
    fn sampled_rays_are_consistent() {
        let mut rng = Lcg(0x5eed);
        for shape in samples() {
            let bbox = *shape.bounding_box();
            let (mut inside, mut outside) = (0, 0);
            for _ in 0..400 {
                let p = rng.point_near(&bbox);
                let d = rng.direction();
                if shape.contains(&p) {
                    if shape.safety(&p, true) > 1e-6 {
                        check_exit(&shape, &p, &d);
                        inside += 1;
                    }
                } else if shape.safety(&p, false) > 1e-6 {
                    check_entry(&shape, &p, &d);
                    outside += 1;
                }
            }
            assert!(inside > 10 && outside > 10, "{shape}: {inside} inside, {outside} outside samples");
        }
    }

    #[test]
    fn safety_never_negative_on_the_wrong_side() {
        let mut rng = Lcg(7);
        for shape in samples() {
            let bbox = *shape.bounding_box();
            for _ in 0..100 {
                let p = rng.point_near(&bbox);
                let inside = shape.contains(&p);
                assert!(shape.safety(&p, inside) >= 0.0);
                assert_eq!(shape.safety(&p, !inside), 0.0, "{shape} at {p}");
            }
        }
    }

    #[test]
    fn tube_scenario() {
        let tube: Shape = Tube::new(0.0, 5.0, 10.0).unwrap().into();
        assert_relative_eq!(tube.distance_out(&Point3::origin(), &Vector3::x()), 5.0, epsilon = 1e-12);
        assert_relative_eq!(tube.distance_in(&Point3::new(10.0, 0.0, 0.0), &-Vector3::x()), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn frustum_polycone_scenario() {
        let pcon: Shape = Polycone::new(0.0, 360.0, vec![Section::new(-5.0, 0.0, 3.0), Section::new(5.0, 0.0, 1.0)])
            .unwrap()
            .into();
        assert!(pcon.contains(&Point3::new(2.0, 0.0, -4.999)));
        assert!(!pcon.contains(&Point3::new(0.0, 0.0, 5.001)));
    }

    #[test]
    fn cube_scenario() {
        let arb: Shape = cube().into();
        assert!(arb.contains(&Point3::origin()));
        assert!(!arb.contains(&Point3::new(2.0, 0.0, 0.0)));
        assert_relative_eq!(arb.distance_out(&Point3::origin(), &Vector3::x()), 1.0, epsilon = 1e-12);
    }

    fn assert_same_answers(a: &Shape, b: &Shape, seed: u64, epsilon: f64) {
        let mut rng = Lcg(seed);
        let bbox = *b.bounding_box();
        for _ in 0..300 {
            let p = rng.point_near(&bbox);
            let d = rng.direction();
            let inside = b.contains(&p);
            if b.safety(&p, inside) < 1e-6 {
                continue;
            }
            assert_eq!(a.contains(&p), inside, "{a} vs {b} at {p}");
            if inside {
                assert_relative_eq!(a.distance_out(&p, &d), b.distance_out(&p, &d), epsilon = epsilon);
            } else {
                let (ta, tb) = (a.distance_in(&p, &d), b.distance_in(&p, &d));
                assert_eq!(ta >= BIG, tb >= BIG, "{a} vs {b} from {p} along {d}");
                if tb < BIG {
                    assert_relative_eq!(ta, tb, epsilon = epsilon);
                }
            }
        }
    }

    #[test]
    fn full_circle_segments_match_plain_solids() {
        let seg: Shape = TubeSeg::new(1.0, 3.0, 2.0, 0.0, 360.0).unwrap().into();
        let tube: Shape = Tube::new(1.0, 3.0, 2.0).unwrap().into();
        assert_same_answers(&seg, &tube, 11, 1e-12);

        let seg: Shape = ConeSeg::new(2.0, 0.5, 1.0, 1.0, 3.0, 45.0, 405.0).unwrap().into();
        let cone: Shape = Cone::new(2.0, 0.5, 1.0, 1.0, 3.0).unwrap().into();
        assert_same_answers(&seg, &cone, 12, 1e-12);
    }

    #[test]
    fn full_circle_square_polygon_matches_cube() {
        let pgon: Shape = Polygon::new(45.0, 360.0, 4, vec![Section::new(-1.0, 0.0, 1.0), Section::new(1.0, 0.0, 1.0)])
            .unwrap()
            .into();
        assert_same_answers(&pgon, &cube().into(), 13, 1e-9);
    }

    #[test]
    fn query_modes() {
        let tube: Shape = Tube::new(0.0, 5.0, 10.0).unwrap().into();
        let outside = Point3::new(10.0, 0.0, 0.0);
        let dir = -Vector3::x();

        let full = tube.dist_to_in(&outside, &dir, QueryMode::FullComputation, 0.0);
        assert_relative_eq!(full.distance, 5.0, epsilon = 1e-12);
        assert_eq!(full.safety, None);
        assert!(full.is_hit());

        let only = tube.dist_to_in(&outside, &dir, QueryMode::SafetyOnly, 100.0);
        assert_eq!(only.distance, BIG);
        assert_relative_eq!(only.safety.unwrap(), 5.0, epsilon = 1e-12);

        let rejected = tube.dist_to_in(&outside, &dir, QueryMode::RejectIfExceedsStep, 1.0);
        assert!(!rejected.is_hit());
        assert_relative_eq!(rejected.safety.unwrap(), 5.0, epsilon = 1e-12);

        // A bound equal to the step still computes the distance.
        let at_step = tube.dist_to_in(&outside, &dir, QueryMode::RejectIfExceedsStep, 5.0);
        assert_relative_eq!(at_step.distance, 5.0, epsilon = 1e-12);

        let out = tube.dist_to_out(&Point3::new(1.0, 0.0, 0.0), &Vector3::x(), QueryMode::RejectIfExceedsStep, 10.0);
        assert_relative_eq!(out.distance, 4.0, epsilon = 1e-12);
        assert_relative_eq!(out.safety.unwrap(), 4.0, epsilon = 1e-12);
        assert_eq!(QueryMode::default(), QueryMode::FullComputation);
    }

    #[test]
    fn shape_reports_kind_and_ranges() {
        let seg: Shape = TubeSeg::new(1.0, 3.0, 2.0, 10.0, 100.0).unwrap().into();
        assert_eq!(seg.kind(), "TubeSeg");
        assert_eq!(seg.axis_range(Axis::Radial), Some((1.0, 3.0)));
        assert_eq!(seg.axis_range(Axis::Phi), Some((10.0, 100.0)));
        assert_eq!(seg.axis_range(Axis::Z), Some((-2.0, 2.0)));
        assert!(seg.to_string().starts_with("TubeSeg"));

        let arb: Shape = cube().into();
        assert_eq!(arb.axis_range(Axis::Radial), None);
        assert!(arb.bounding_cylinder().is_none());
    }

    #[test]
    fn swapped_radii_are_reported() {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::new("geonav=debug"))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let tube = Tube::new(4.0, 1.0, 2.0).unwrap();
            assert_eq!((tube.rmin(), tube.rmax()), (1.0, 4.0));
        });
    }
}
