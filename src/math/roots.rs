//! Real roots of the linear and quadratic equations produced by ray/surface
//! intersection.

use super::TOLERANCE;

/// Real roots of an equation in the ray parameter, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roots {
    None,
    One(f64),
    Two(f64, f64),
}

impl Roots {
    /// Iterates over the roots in ascending order.
    pub fn iter(self) -> impl Iterator<Item = f64> {
        let (a, b) = match self {
            Roots::None => (None, None),
            Roots::One(t) => (Some(t), None),
            Roots::Two(t0, t1) => (Some(t0), Some(t1)),
        };
        a.into_iter().chain(b)
    }
}

/// Solves `a t^2 + 2 b t + c = 0`.
///
/// The half linear coefficient keeps the discriminant in the `b^2 - a c`
/// form used by every lateral-surface equation. When `a` vanishes the
/// equation degrades to the linear `2 b t + c = 0`. A tangent contact is
/// reported as a double root.
#[must_use]
pub fn quadratic_half(a: f64, b: f64, c: f64) -> Roots {
    if a.abs() < TOLERANCE {
        if b.abs() < TOLERANCE {
            return Roots::None;
        }
        return Roots::One(-0.5 * c / b);
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return Roots::None;
    }
    let sq = disc.sqrt();
    // q = -(b + sign(b) sqrt(disc)) avoids cancellation in the smaller root.
    let q = if b >= 0.0 { -(b + sq) } else { -b + sq };
    if q == 0.0 {
        return Roots::Two(0.0, 0.0);
    }
    let t0 = q / a;
    let t1 = c / q;
    if t0 <= t1 {
        Roots::Two(t0, t1)
    } else {
        Roots::Two(t1, t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_roots_sorted() {
        // t^2 - 5t + 6 = 0 -> 2, 3
        let roots: Vec<f64> = quadratic_half(1.0, -2.5, 6.0).iter().collect();
        assert_eq!(roots.len(), 2);
        assert!((roots[0] - 2.0).abs() < TOLERANCE);
        assert!((roots[1] - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn negative_leading_coefficient_still_sorted() {
        // -t^2 + 1 = 0 -> -1, 1
        match quadratic_half(-1.0, 0.0, 1.0) {
            Roots::Two(t0, t1) => {
                assert!((t0 + 1.0).abs() < TOLERANCE);
                assert!((t1 - 1.0).abs() < TOLERANCE);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn no_real_roots() {
        assert_eq!(quadratic_half(1.0, 0.0, 1.0), Roots::None);
    }

    #[test]
    fn linear_fallback() {
        // 2 * 2 t - 8 = 0 -> t = 2
        match quadratic_half(0.0, 2.0, -8.0) {
            Roots::One(t) => assert!((t - 2.0).abs() < TOLERANCE),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(quadratic_half(0.0, 0.0, 1.0), Roots::None);
    }

    #[test]
    fn tangent_is_double_root() {
        // (t - 1)^2 = 0
        match quadratic_half(1.0, -1.0, 1.0) {
            Roots::Two(t0, t1) => {
                assert!((t0 - 1.0).abs() < 1e-8);
                assert!((t1 - 1.0).abs() < 1e-8);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
