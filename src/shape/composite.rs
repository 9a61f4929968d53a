//! Boolean composition of placed shapes.
//!
//! A [`CompositeShape`] owns a list of placed components and a boolean
//! expression tree over their indices. Components are shared read-only, so
//! the same leaf can appear in several composites.

use std::fmt;
use std::sync::Arc;

use crate::error::{CompositeError, Result};
use crate::math::{orient_along, Isometry3, Point3, Vector3, BIG};

use super::{BoundingBox, Shape, Solid};

/// Step taken past a component surface before re-testing containment.
const PUSH: f64 = 1e-9;

/// Upper bound on the component crossings visited per ray and component.
const CROSSINGS_PER_COMPONENT: usize = 16;

/// A shape placed into the composite frame.
#[derive(Debug, Clone)]
pub struct Component {
    /// The solid, shareable between composites.
    pub shape: Arc<Shape>,
    /// Maps component-local coordinates into the composite frame.
    pub placement: Isometry3,
}

impl Component {
    #[must_use]
    pub fn new(shape: impl Into<Shape>, placement: Isometry3) -> Self {
        Self {
            shape: Arc::new(shape.into()),
            placement,
        }
    }

    /// A component at the composite origin.
    #[must_use]
    pub fn unplaced(shape: impl Into<Shape>) -> Self {
        Self::new(shape, Isometry3::identity())
    }

    fn local_point(&self, point: &Point3) -> Point3 {
        self.placement.inverse_transform_point(point)
    }

    fn local_dir(&self, dir: &Vector3) -> Vector3 {
        self.placement.inverse_transform_vector(dir)
    }

    fn contains(&self, point: &Point3) -> bool {
        self.shape.contains(&self.local_point(point))
    }

    /// Distance to the next crossing of this component's surface.
    fn next_crossing(&self, point: &Point3, dir: &Vector3) -> f64 {
        let p = self.local_point(point);
        let d = self.local_dir(dir);
        if self.shape.contains(&p) {
            self.shape.distance_out(&p, &d)
        } else {
            self.shape.distance_in(&p, &d)
        }
    }

    fn safety(&self, point: &Point3) -> f64 {
        let p = self.local_point(point);
        self.shape.safety(&p, self.shape.contains(&p))
    }

    fn bounding_box(&self) -> BoundingBox {
        self.shape.bounding_box().transformed(&self.placement)
    }
}

/// Boolean expression over component indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolNode {
    Leaf(usize),
    Union(Box<BoolNode>, Box<BoolNode>),
    Intersection(Box<BoolNode>, Box<BoolNode>),
    /// Left operand minus right operand.
    Subtraction(Box<BoolNode>, Box<BoolNode>),
}

impl BoolNode {
    #[must_use]
    pub fn union(a: Self, b: Self) -> Self {
        Self::Union(Box::new(a), Box::new(b))
    }

    #[must_use]
    pub fn intersection(a: Self, b: Self) -> Self {
        Self::Intersection(Box::new(a), Box::new(b))
    }

    #[must_use]
    pub fn subtraction(a: Self, b: Self) -> Self {
        Self::Subtraction(Box::new(a), Box::new(b))
    }

    fn check_indices(&self, len: usize) -> Result<()> {
        match self {
            Self::Leaf(index) if *index >= len => Err(CompositeError::ComponentIndex { index: *index, len }.into()),
            Self::Leaf(_) => Ok(()),
            Self::Union(a, b) | Self::Intersection(a, b) | Self::Subtraction(a, b) => {
                a.check_indices(len)?;
                b.check_indices(len)
            }
        }
    }

    fn evaluate(&self, leaf: &impl Fn(usize) -> bool) -> bool {
        match self {
            Self::Leaf(index) => leaf(*index),
            Self::Union(a, b) => a.evaluate(leaf) || b.evaluate(leaf),
            Self::Intersection(a, b) => a.evaluate(leaf) && b.evaluate(leaf),
            Self::Subtraction(a, b) => a.evaluate(leaf) && !b.evaluate(leaf),
        }
    }

    fn bounding_box(&self, components: &[Component]) -> BoundingBox {
        match self {
            Self::Leaf(index) => components
                .get(*index)
                .map(Component::bounding_box)
                .unwrap_or_default(),
            Self::Union(a, b) => a.bounding_box(components).merged(&b.bounding_box(components)),
            Self::Intersection(a, b) => a
                .bounding_box(components)
                .intersection(&b.bounding_box(components))
                .unwrap_or_default(),
            Self::Subtraction(a, _) => a.bounding_box(components),
        }
    }
}

impl fmt::Display for BoolNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(index) => write!(f, "{index}"),
            Self::Union(a, b) => write!(f, "({a} + {b})"),
            Self::Intersection(a, b) => write!(f, "({a} * {b})"),
            Self::Subtraction(a, b) => write!(f, "({a} - {b})"),
        }
    }
}

/// A solid defined by a boolean expression over placed components.
#[derive(Debug, Clone)]
pub struct CompositeShape {
    components: Vec<Component>,
    expr: BoolNode,
    bbox: BoundingBox,
}

impl CompositeShape {
    /// Creates a composite from its components and expression.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Empty`] without components and
    /// [`CompositeError::ComponentIndex`] when a leaf names a missing one.
    pub fn new(components: Vec<Component>, expr: BoolNode) -> Result<Self> {
        if components.is_empty() {
            return Err(CompositeError::Empty.into());
        }
        expr.check_indices(components.len())?;
        let bbox = expr.bounding_box(&components);
        Ok(Self {
            components,
            expr,
            bbox,
        })
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    #[must_use]
    pub fn expr(&self) -> &BoolNode {
        &self.expr
    }

    /// Distance along `dir` to the first point where membership flips.
    ///
    /// Walks successive component crossings and re-tests the composite just
    /// past each one. Returns [`BIG`] when membership never changes.
    #[must_use]
    pub fn dist_to_surf(&self, point: &Point3, dir: &Vector3) -> f64 {
        let start_inside = self.contains(point);
        let mut travelled = 0.0;
        for _ in 0..CROSSINGS_PER_COMPONENT * self.components.len() {
            let q = point + dir * travelled;
            let step = self
                .components
                .iter()
                .map(|c| c.next_crossing(&q, dir))
                .fold(BIG, f64::min);
            if step >= BIG {
                return BIG;
            }
            travelled += step;
            if self.contains(&(point + dir * (travelled + PUSH))) != start_inside {
                return travelled;
            }
            travelled += PUSH;
        }
        BIG
    }

    fn closest_component(&self, point: &Point3) -> Option<&Component> {
        self.components
            .iter()
            .map(|c| (c.safety(point), c))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }
}

impl Solid for CompositeShape {
    fn contains(&self, point: &Point3) -> bool {
        self.expr.evaluate(&|i| self.components.get(i).is_some_and(|c| c.contains(point)))
    }

    fn distance_in(&self, point: &Point3, dir: &Vector3) -> f64 {
        if self.bbox.misses(point, dir) {
            return BIG;
        }
        self.dist_to_surf(point, dir)
    }

    fn distance_out(&self, point: &Point3, dir: &Vector3) -> f64 {
        self.dist_to_surf(point, dir)
    }

    fn safety(&self, point: &Point3, inside: bool) -> f64 {
        if self.contains(point) != inside {
            return 0.0;
        }
        self.components
            .iter()
            .map(|c| c.safety(point))
            .fold(BIG, f64::min)
    }

    fn normal(&self, point: &Point3, dir: &Vector3) -> Vector3 {
        let Some(component) = self.closest_component(point) else {
            return orient_along(Vector3::z(), dir);
        };
        let local = component
            .shape
            .normal(&component.local_point(point), &component.local_dir(dir));
        orient_along(component.placement.rotation * local, dir)
    }

    fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    fn compute_bbox(&mut self) {
        self.bbox = self.expr.bounding_box(&self.components);
    }
}

impl fmt::Display for CompositeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composite {} [", self.expr)?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            let t = c.placement.translation.vector;
            write!(f, "{i}: {} at ({:.5}, {:.5}, {:.5})", c.shape, t.x, t.y, t.z)?;
        }
        write!(f, "]")
    }
}
