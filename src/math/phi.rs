//! Azimuthal wedge limiting a revolution solid to less than a full circle.

use crate::error::{GeometryError, Result};

use super::{check_finite, Vector2, BIG, PATCH_TOLERANCE, TOLERANCE};

/// An azimuthal range `[phi1, phi1 + dphi]` in degrees.
///
/// `phi1` is normalized into `[0, 360)` and `dphi` lies in `(0, 360]`. A
/// range with `dphi == 360` is the full circle: every azimuthal test on it
/// passes and it contributes no boundary planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiRange {
    phi1: f64,
    dphi: f64,
    // Unit direction of the phi1 and phi2 half-planes.
    c1: f64,
    s1: f64,
    c2: f64,
    s2: f64,
    // Bisector direction and cosine of the half opening.
    cm: f64,
    sm: f64,
    cdfi: f64,
}

impl Default for PhiRange {
    fn default() -> Self {
        Self::full()
    }
}

impl PhiRange {
    /// The full circle.
    #[must_use]
    pub fn full() -> Self {
        Self::build(0.0, 360.0)
    }

    /// Creates a range from its two limits, in degrees.
    ///
    /// `phi2` is raised by whole turns until it exceeds `phi1`, so
    /// `(350, 10)` is the 20 degree wedge through zero and `(0, 360)` or
    /// `(30, 30)` is the full circle.
    ///
    /// # Errors
    ///
    /// Returns an error if either limit is not finite.
    pub fn from_limits(phi1: f64, phi2: f64) -> Result<Self> {
        check_finite("phi1", phi1)?;
        check_finite("phi2", phi2)?;
        let start = phi1.rem_euclid(360.0);
        let mut end = phi2 + (start - phi1);
        while end <= start {
            end += 360.0;
        }
        let mut dphi = end - start;
        if dphi > 360.0 {
            tracing::warn!(phi1, phi2, "azimuthal range wider than 360 degrees, using full circle");
            dphi = 360.0;
        }
        Ok(Self::build(start, dphi))
    }

    /// Creates a range from its start angle and opening, in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if `dphi` is not positive or either value is not finite.
    pub fn from_start(phi1: f64, dphi: f64) -> Result<Self> {
        check_finite("phi1", phi1)?;
        check_finite("dphi", dphi)?;
        if dphi <= 0.0 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "dphi",
                value: dphi,
                min: 0.0,
                max: 360.0,
            }
            .into());
        }
        let dphi = if dphi > 360.0 {
            tracing::warn!(dphi, "azimuthal opening above 360 degrees, using full circle");
            360.0
        } else {
            dphi
        };
        Ok(Self::build(phi1.rem_euclid(360.0), dphi))
    }

    fn build(phi1: f64, dphi: f64) -> Self {
        let dphi = if (dphi - 360.0).abs() < TOLERANCE { 360.0 } else { dphi };
        let (s1, c1) = phi1.to_radians().sin_cos();
        let (s2, c2) = (phi1 + dphi).to_radians().sin_cos();
        let (sm, cm) = (phi1 + 0.5 * dphi).to_radians().sin_cos();
        let cdfi = (0.5 * dphi).to_radians().cos();
        Self {
            phi1,
            dphi,
            c1,
            s1,
            c2,
            s2,
            cm,
            sm,
            cdfi,
        }
    }

    /// Start angle in degrees, in `[0, 360)`.
    #[must_use]
    pub fn phi1(&self) -> f64 {
        self.phi1
    }

    /// End angle in degrees, in `(phi1, phi1 + 360]`.
    #[must_use]
    pub fn phi2(&self) -> f64 {
        self.phi1 + self.dphi
    }

    /// Opening angle in degrees.
    #[must_use]
    pub fn dphi(&self) -> f64 {
        self.dphi
    }

    /// Returns `true` for the full circle.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.dphi >= 360.0
    }

    /// `Some(self)` unless this is the full circle.
    ///
    /// Solvers take the wedge as an option so that the full circle skips
    /// every azimuthal test.
    #[must_use]
    pub fn as_cut(&self) -> Option<&Self> {
        if self.is_full() {
            None
        } else {
            Some(self)
        }
    }

    /// Angle of `(x, y)` measured counter-clockwise from `phi1`, in `[0, 360)`.
    #[must_use]
    pub fn offset_of(&self, x: f64, y: f64) -> f64 {
        (y.atan2(x).to_degrees() - self.phi1).rem_euclid(360.0)
    }

    /// Exact membership of the azimuth of `(x, y)`; points on the axis pass.
    #[must_use]
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        if self.is_full() || (x == 0.0 && y == 0.0) {
            return true;
        }
        self.offset_of(x, y) <= self.dphi
    }

    /// Membership with a small angular slack, used to re-check computed hits.
    #[must_use]
    pub(crate) fn contains_xy_tol(&self, x: f64, y: f64) -> bool {
        if self.is_full() {
            return true;
        }
        let r = x.hypot(y);
        if r < PATCH_TOLERANCE {
            return true;
        }
        x * self.cm + y * self.sm >= r * self.cdfi - PATCH_TOLERANCE * r.max(1.0)
    }

    /// Inward normals of the phi1 and phi2 half-planes.
    fn inward_normals(&self) -> [(Vector2, Vector2); 2] {
        [
            (Vector2::new(self.c1, self.s1), Vector2::new(-self.s1, self.c1)),
            (Vector2::new(self.c2, self.s2), Vector2::new(self.s2, -self.c2)),
        ]
    }

    /// Crossings of the two half-planes by the projected ray; `entering`
    /// selects crossings into the wedge, otherwise out of it. Missing
    /// crossings are [`BIG`].
    fn crossings(&self, x: f64, y: f64, dx: f64, dy: f64, entering: bool) -> [f64; 2] {
        let mut out = [BIG; 2];
        if self.is_full() {
            return out;
        }
        for (slot, (u, n)) in out.iter_mut().zip(self.inward_normals()) {
            let un = dx * n.x + dy * n.y;
            if (entering && un <= 0.0) || (!entering && un >= 0.0) {
                continue;
            }
            let s = -(x * n.x + y * n.y) / un;
            if s < -PATCH_TOLERANCE {
                continue;
            }
            let s = s.max(0.0);
            let proj = (x + s * dx) * u.x + (y + s * dy) * u.y;
            let valid = if proj > PATCH_TOLERANCE {
                true
            } else if proj >= -PATCH_TOLERANCE {
                // Through the axis: the ray changes side only if its heading
                // disagrees with where it came from.
                self.contains_xy_tol(dx, dy) == entering
            } else {
                false
            };
            if valid {
                *slot = s;
            }
        }
        out
    }

    /// Distances along the projected ray at which it enters the wedge
    /// through one of its half-planes.
    #[must_use]
    pub fn entry_crossings(&self, x: f64, y: f64, dx: f64, dy: f64) -> [f64; 2] {
        self.crossings(x, y, dx, dy, true)
    }

    /// Distance along the projected ray to the first exit through a
    /// half-plane, or [`BIG`].
    #[must_use]
    pub fn exit_distance(&self, x: f64, y: f64, dx: f64, dy: f64) -> f64 {
        let [a, b] = self.crossings(x, y, dx, dy, false);
        a.min(b)
    }

    /// Distance from `(x, y)` to each half-plane.
    fn plane_distances(&self, x: f64, y: f64) -> [f64; 2] {
        let r = x.hypot(y);
        self.inward_normals().map(|(u, n)| {
            if x * u.x + y * u.y >= 0.0 {
                (x * n.x + y * n.y).abs()
            } else {
                r
            }
        })
    }

    /// Lower bound on the distance to the wedge planes from a point inside
    /// the wedge; [`BIG`] for the full circle and zero outside the wedge.
    #[must_use]
    pub fn safety_in(&self, x: f64, y: f64) -> f64 {
        if self.is_full() {
            return BIG;
        }
        if !self.contains_xy(x, y) {
            return 0.0;
        }
        let [a, b] = self.plane_distances(x, y);
        a.min(b)
    }

    /// Lower bound on the distance to reach the wedge from a point; zero when
    /// the point already lies inside it.
    #[must_use]
    pub fn safety_out(&self, x: f64, y: f64) -> f64 {
        if self.contains_xy(x, y) {
            return 0.0;
        }
        let [a, b] = self.plane_distances(x, y);
        a.min(b)
    }

    /// Closest half-plane to `(x, y)`: its distance and outward unit normal.
    #[must_use]
    pub fn closest_plane(&self, x: f64, y: f64) -> (f64, Vector2) {
        let [a, b] = self.plane_distances(x, y);
        let [(_, n1), (_, n2)] = self.inward_normals();
        if a <= b {
            (a, -n1)
        } else {
            (b, -n2)
        }
    }

    /// Extent in x and y of the annular sector `rmin <= r <= rmax` within
    /// this wedge, as `(xmin, xmax, ymin, ymax)`.
    #[must_use]
    pub fn xy_extent(&self, rmin: f64, rmax: f64) -> (f64, f64, f64, f64) {
        if self.is_full() {
            return (-rmax, rmax, -rmax, rmax);
        }
        let corners = [
            (rmin * self.c1, rmin * self.s1),
            (rmax * self.c1, rmax * self.s1),
            (rmin * self.c2, rmin * self.s2),
            (rmax * self.c2, rmax * self.s2),
        ];
        let mut xmin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;
        let mut ymin = f64::INFINITY;
        let mut ymax = f64::NEG_INFINITY;
        for (x, y) in corners {
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
        }
        for quadrant in 0..4 {
            let angle = 90.0 * f64::from(quadrant);
            if (angle - self.phi1).rem_euclid(360.0) <= self.dphi {
                match quadrant {
                    0 => xmax = rmax,
                    1 => ymax = rmax,
                    2 => xmin = -rmax,
                    _ => ymin = -rmax,
                }
            }
        }
        (xmin, xmax, ymin, ymax)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_normalized() {
        let w = PhiRange::from_limits(-30.0, 30.0).unwrap();
        assert!((w.phi1() - 330.0).abs() < TOLERANCE);
        assert!((w.dphi() - 60.0).abs() < TOLERANCE);

        let w = PhiRange::from_limits(350.0, 10.0).unwrap();
        assert!((w.dphi() - 20.0).abs() < TOLERANCE);

        assert!(PhiRange::from_limits(0.0, 360.0).unwrap().is_full());
        assert!(PhiRange::from_limits(45.0, 45.0).unwrap().is_full());
    }

    #[test]
    fn opening_must_be_positive() {
        assert!(PhiRange::from_start(0.0, 0.0).is_err());
        assert!(PhiRange::from_start(0.0, -10.0).is_err());
        assert!(PhiRange::from_start(0.0, 400.0).unwrap().is_full());
        assert!(PhiRange::from_start(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn membership_wraps_through_zero() {
        let w = PhiRange::from_limits(350.0, 10.0).unwrap();
        assert!(w.contains_xy(1.0, 0.0));
        assert!(w.contains_xy(1.0, -0.1));
        assert!(!w.contains_xy(0.0, 1.0));
        assert!(w.contains_xy(0.0, 0.0));
    }

    #[test]
    fn exit_through_upper_plane() {
        // Quarter wedge 0..90, point on the diagonal moving in -x.
        let w = PhiRange::from_start(0.0, 90.0).unwrap();
        let s = w.exit_distance(1.0, 1.0, -1.0, 0.0);
        assert!((s - 1.0).abs() < TOLERANCE, "s={s}");
    }

    #[test]
    fn entry_through_lower_plane() {
        // Quarter wedge 0..90, point below the x axis moving up.
        let w = PhiRange::from_start(0.0, 90.0).unwrap();
        let [a, b] = w.entry_crossings(2.0, -1.0, 0.0, 1.0);
        assert!((a - 1.0).abs() < TOLERANCE, "a={a}");
        assert!(b >= BIG);
    }

    #[test]
    fn opposite_half_line_is_not_a_face() {
        // Crossing the extension of the phi1 plane behind the axis.
        let w = PhiRange::from_start(0.0, 90.0).unwrap();
        let [a, b] = w.entry_crossings(-2.0, -1.0, 0.0, 1.0);
        assert!(a >= BIG && b >= BIG);
    }

    #[test]
    fn plane_safety() {
        let w = PhiRange::from_start(0.0, 90.0).unwrap();
        assert!((w.safety_in(3.0, 1.0) - 1.0).abs() < TOLERANCE);
        // Behind the axis the nearest point of a half-plane is the axis.
        assert!((w.safety_out(-3.0, -4.0) - 5.0).abs() < TOLERANCE);
        assert!(w.safety_out(1.0, 1.0).abs() < TOLERANCE);
        assert!(PhiRange::full().safety_in(1.0, 1.0) >= BIG);
    }

    #[test]
    fn extent_of_quarter_wedge() {
        let w = PhiRange::from_start(0.0, 90.0).unwrap();
        let (xmin, xmax, ymin, ymax) = w.xy_extent(1.0, 2.0);
        assert!(xmin.abs() < 1e-9);
        assert!((xmax - 2.0).abs() < TOLERANCE);
        assert!(ymin.abs() < TOLERANCE);
        assert!((ymax - 2.0).abs() < TOLERANCE);
    }
}
