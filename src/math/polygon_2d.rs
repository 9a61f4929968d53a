use super::Point2;

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// 2D cross product of `(a - o)` and `(b - o)`.
#[inline]
#[must_use]
pub fn cross_2d(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Returns `true` if the closed polygon turns the same way at every vertex.
///
/// Repeated vertices and collinear runs are ignored.
#[must_use]
pub fn is_convex(points: &[Point2]) -> bool {
    let n = points.len();
    let mut sign = 0.0_f64;
    for i in 0..n {
        let turn = cross_2d(&points[i], &points[(i + 1) % n], &points[(i + 2) % n]);
        if turn == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Minimum distance from `p` to the segment `a`-`b`.
#[must_use]
pub fn segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-20 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Returns `true` if `p` lies exactly on the segment `a`-`b`.
fn on_segment(p: &Point2, a: &Point2, b: &Point2) -> bool {
    cross_2d(a, b, p) == 0.0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// Closed point-in-polygon test by a horizontal scan line through `p`.
///
/// The crossings of the line `y = p.y` with the polygon edges are sorted and
/// paired; `p` is inside when it falls between the members of a pair. Two
/// crossings cover the convex case, four the bow-tie outline of a twisted
/// quadrilateral. Points on an edge, horizontal ones included, are inside.
#[must_use]
pub fn scanline_contains<const N: usize>(polygon: &[Point2; N], p: &Point2) -> bool {
    let mut xs = [0.0_f64; N];
    let mut count = 0;
    for i in 0..N {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % N];
        if on_segment(p, a, b) {
            return true;
        }
        // Half-open in y so a vertex shared by two edges is counted once.
        if (a.y <= p.y && p.y < b.y) || (b.y <= p.y && p.y < a.y) {
            xs[count] = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            count += 1;
        }
    }
    let xs = &mut xs[..count];
    xs.sort_unstable_by(f64::total_cmp);
    xs.chunks_exact(2)
        .any(|pair| pair[0] <= p.x && p.x <= pair[1])
}

/// Distance from `p` to the closed polygon region; zero inside.
#[must_use]
pub fn region_distance<const N: usize>(polygon: &[Point2; N], p: &Point2) -> f64 {
    if scanline_contains(polygon, p) {
        return 0.0;
    }
    (0..N)
        .map(|i| segment_distance(p, &polygon[i], &polygon[(i + 1) % N]))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    fn square() -> [Point2; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn signed_area_orientation() {
        let sq = square();
        assert!((signed_area_2d(&sq) - 1.0).abs() < TOLERANCE);
        let mut cw = sq;
        cw.reverse();
        assert!((signed_area_2d(&cw) + 1.0).abs() < TOLERANCE);
        assert!(signed_area_2d(&sq[..2]).abs() < TOLERANCE);
    }

    #[test]
    fn convexity() {
        assert!(is_convex(&square()));
        let dart = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(0.0, 2.0),
            Point2::new(0.5, 1.0),
        ];
        assert!(!is_convex(&dart));
        let triangle = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(is_convex(&triangle));
    }

    #[test]
    fn scanline_inside_outside_and_edges() {
        let sq = square();
        assert!(scanline_contains(&sq, &Point2::new(0.5, 0.5)));
        assert!(!scanline_contains(&sq, &Point2::new(1.5, 0.5)));
        assert!(scanline_contains(&sq, &Point2::new(0.5, 0.0)));
        assert!(scanline_contains(&sq, &Point2::new(1.0, 1.0)));
        assert!(!scanline_contains(&sq, &Point2::new(2.0, 0.0)));
    }

    #[test]
    fn scanline_bow_tie() {
        // Self-crossing outline: two triangles meeting at (1, 1).
        let bow = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(scanline_contains(&bow, &Point2::new(0.2, 1.0)));
        assert!(scanline_contains(&bow, &Point2::new(1.8, 1.0)));
        assert!(!scanline_contains(&bow, &Point2::new(1.0, 0.3)));
    }

    #[test]
    fn distances() {
        let sq = square();
        let d = segment_distance(&Point2::new(0.5, 2.0), &sq[2], &sq[3]);
        assert!((d - 1.0).abs() < TOLERANCE);
        assert!(region_distance(&sq, &Point2::new(0.5, 0.5)).abs() < TOLERANCE);
        assert!((region_distance(&sq, &Point2::new(4.0, 5.0)) - 5.0).abs() < TOLERANCE);
    }
}
