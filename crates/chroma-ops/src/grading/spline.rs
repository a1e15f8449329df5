//! Quadratic B-spline fitting and evaluation for grading curves.
//!
//! Control points are fitted with one or two quadratic segments per
//! interval. Knot positions and per-segment polynomial coefficients are
//! precomputed so evaluation is a segment search plus a Horner step.

use super::curve::ControlPoint;

/// Slopes closer than this are merged during estimation.
const SLOPE_MERGE_TOL: f32 = 1e-6;

/// Smallest slope the end-point extrapolation will produce.
const MIN_END_SLOPE: f32 = 0.01;

/// Fitted spline: knot positions plus quadratic coefficients per segment.
///
/// Segment `i` covers `[knots[i], knots[i+1]]` and evaluates as
/// `(a*t + b)*t + c` with `t = x - knots[i]`. An empty spline stands for
/// the identity curve.
#[derive(Debug, Clone, Default)]
pub struct SplineData {
    /// Segment boundary positions.
    pub knots: Vec<f32>,
    /// Quadratic coefficient per segment.
    pub coefs_a: Vec<f32>,
    /// Linear coefficient per segment.
    pub coefs_b: Vec<f32>,
    /// Constant coefficient per segment.
    pub coefs_c: Vec<f32>,
}

impl SplineData {
    /// Number of fitted segments.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.coefs_a.len()
    }

    /// True for the identity placeholder.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }
}

/// Estimates control-point slopes from secants, weighted by segment
/// length, with extrapolated end slopes.
pub fn estimate_slopes(pts: &[ControlPoint]) -> Vec<f32> {
    let n = pts.len();
    if n < 2 {
        return vec![];
    }

    let mut secant_slope = Vec::with_capacity(n - 1);
    let mut secant_len = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        let del_x = pts[i + 1].x - pts[i].x;
        let del_y = pts[i + 1].y - pts[i].y;
        secant_slope.push(del_y / del_x);
        secant_len.push((del_x * del_x + del_y * del_y).sqrt());
    }

    if n == 2 {
        return vec![secant_slope[0], secant_slope[0]];
    }

    // Runs of equal secant slope share a combined length so the weighted
    // average below does not over-count collinear points.
    let mut i = 0;
    while i < n - 1 {
        let mut j = i;
        let mut dl = secant_len[i];
        while j < n - 2 && (secant_slope[j + 1] - secant_slope[j]).abs() < SLOPE_MERGE_TOL {
            dl += secant_len[j + 1];
            j += 1;
        }
        for k in i..=j {
            secant_len[k] = dl;
        }
        if j >= n - 3 {
            break;
        }
        i = j + 1;
    }

    let mut slopes = Vec::with_capacity(n);
    slopes.push(0.0);
    for k in 1..n - 1 {
        let s = (secant_len[k] * secant_slope[k] + secant_len[k - 1] * secant_slope[k - 1])
            / (secant_len[k] + secant_len[k - 1]);
        slopes.push(s);
    }
    slopes.push(MIN_END_SLOPE.max(0.5 * (3.0 * secant_slope[n - 2] - slopes[n - 2])));
    slopes[0] = MIN_END_SLOPE.max(0.5 * (3.0 * secant_slope[0] - slopes[1]));

    slopes
}

/// Fits a spline through the control points.
///
/// Non-zero `user_slopes` of matching length override estimation. A
/// slope-adjustment pass removes segments whose middle slope would go
/// negative, then refits once.
pub fn fit_spline(pts: &[ControlPoint], user_slopes: &[f32]) -> SplineData {
    let n = pts.len();
    if n < 2 {
        return SplineData::default();
    }

    let mut slopes = if user_slopes.len() == n && user_slopes.iter().any(|&s| s != 0.0) {
        user_slopes.to_vec()
    } else {
        estimate_slopes(pts)
    };

    let (data, splits) = fit_segments(pts, &slopes);
    if adjust_slopes(pts, &mut slopes, &splits) {
        fit_segments(pts, &slopes).0
    } else {
        data
    }
}

/// One fitting pass. Returns the spline plus the split position chosen
/// for each interval (`None` when a single quadratic sufficed).
fn fit_segments(pts: &[ControlPoint], slopes: &[f32]) -> (SplineData, Vec<Option<f32>>) {
    let n = pts.len();
    let mut data = SplineData::default();
    let mut splits = Vec::with_capacity(n - 1);

    data.knots.push(pts[0].x);

    for i in 0..n - 1 {
        let (x0, x1) = (pts[i].x, pts[i + 1].x);
        let (y0, y1) = (pts[i].y, pts[i + 1].y);
        let del_x = x1 - x0;
        let secant = (y1 - y0) / del_x;

        if (slopes[i] + slopes[i + 1] - 2.0 * secant).abs() < SLOPE_MERGE_TOL {
            // A single quadratic matches both end slopes.
            data.coefs_c.push(y0);
            data.coefs_b.push(slopes[i]);
            data.coefs_a.push(0.5 * (slopes[i + 1] - slopes[i]) / del_x);
            splits.push(None);
        } else {
            let ksi = split_point(pts, slopes, i);
            let s_bar =
                (2.0 * secant - slopes[i + 1]) + (slopes[i + 1] - slopes[i]) * (ksi - x0) / del_x;
            let eta = (s_bar - slopes[i]) / (ksi - x0);

            data.coefs_c.push(y0);
            data.coefs_b.push(slopes[i]);
            data.coefs_a.push(0.5 * eta);

            let t = ksi - x0;
            let y_at_ksi = y0 + slopes[i] * t + 0.5 * eta * t * t;
            data.coefs_c.push(y_at_ksi);
            data.coefs_b.push(s_bar);
            data.coefs_a.push(0.5 * (slopes[i + 1] - s_bar) / (x1 - ksi));

            data.knots.push(ksi);
            splits.push(Some(ksi));
        }

        data.knots.push(x1);
    }

    (data, splits)
}

/// Picks the interior knot for an interval that needs two segments.
fn split_point(pts: &[ControlPoint], slopes: &[f32], i: usize) -> f32 {
    let (x0, x1) = (pts[i].x, pts[i + 1].x);
    let del_x = x1 - x0;
    let secant = (pts[i + 1].y - pts[i].y) / del_x;

    let aa = slopes[i] - secant;
    let bb = slopes[i + 1] - secant;

    if aa * bb >= 0.0 {
        (x0 + x1) * 0.5
    } else if aa.abs() > bb.abs() {
        x1 + aa * del_x / (slopes[i + 1] - slopes[i])
    } else {
        x0 + bb * del_x / (slopes[i + 1] - slopes[i])
    }
}

/// Scales slopes down wherever a split interval's middle slope would be
/// negative, which would break monotonicity. Returns true when any
/// interval was touched.
fn adjust_slopes(pts: &[ControlPoint], slopes: &mut [f32], splits: &[Option<f32>]) -> bool {
    let mut adjusted = false;

    for (i, split) in splits.iter().enumerate() {
        let Some(ksi) = *split else { continue };
        let (x0, x1) = (pts[i].x, pts[i + 1].x);
        let (y0, y1) = (pts[i].y, pts[i + 1].y);

        let s_bar =
            (2.0 * (y1 - y0) - (ksi - x0) * slopes[i] - (x1 - ksi) * slopes[i + 1]) / (x1 - x0);
        if s_bar < 0.0 {
            let secant = (y1 - y0) / (x1 - x0);
            let blend = ((ksi - x0) * slopes[i] + (x1 - ksi) * slopes[i + 1]) / (x1 - x0);
            if blend != 0.0 {
                let aim = (0.01 * 0.5 * (slopes[i] + slopes[i + 1])).min(secant);
                let adjust = (2.0 * secant - aim) / blend;
                slopes[i] *= adjust;
                slopes[i + 1] *= adjust;
                adjusted = true;
            }
        }
    }

    adjusted
}

/// Evaluates the spline at `x`, extrapolating linearly past either end.
/// An empty spline returns `identity_x`.
pub fn eval_curve(spline: &SplineData, x: f32, identity_x: f32) -> f32 {
    if spline.is_empty() {
        return identity_x;
    }

    let num_knots = spline.knots.len();
    let num_segs = spline.num_segments();
    let kn_start = spline.knots[0];
    let kn_end = spline.knots[num_knots - 1];

    if x <= kn_start {
        return (x - kn_start) * spline.coefs_b[0] + spline.coefs_c[0];
    }
    if x >= kn_end {
        let a = spline.coefs_a[num_segs - 1];
        let b = spline.coefs_b[num_segs - 1];
        let c = spline.coefs_c[num_segs - 1];
        let t = kn_end - spline.knots[num_knots - 2];
        let slope = 2.0 * a * t + b;
        let offs = (a * t + b) * t + c;
        return (x - kn_end) * slope + offs;
    }

    let mut seg = 0;
    for i in 0..num_knots - 1 {
        if x < spline.knots[i + 1] {
            seg = i;
            break;
        }
    }

    let t = x - spline.knots[seg];
    (spline.coefs_a[seg] * t + spline.coefs_b[seg]) * t + spline.coefs_c[seg]
}

/// Inverts a monotonic spline: finds `x` such that `eval_curve(x) == y`.
/// An empty spline returns `y`.
pub fn eval_curve_rev(spline: &SplineData, y: f32) -> f32 {
    if spline.is_empty() {
        return y;
    }

    let num_knots = spline.knots.len();
    let num_segs = spline.num_segments();
    let kn_start = spline.knots[0];
    let kn_end = spline.knots[num_knots - 1];

    let kn_start_y = spline.coefs_c[0];
    let kn_end_y = {
        let a = spline.coefs_a[num_segs - 1];
        let b = spline.coefs_b[num_segs - 1];
        let c = spline.coefs_c[num_segs - 1];
        let t = kn_end - spline.knots[num_knots - 2];
        (a * t + b) * t + c
    };

    if y <= kn_start_y {
        let b = spline.coefs_b[0];
        if b.abs() < 1e-5 {
            return kn_start;
        }
        return (y - kn_start_y) / b + kn_start;
    }
    if y >= kn_end_y {
        let a = spline.coefs_a[num_segs - 1];
        let b = spline.coefs_b[num_segs - 1];
        let t = kn_end - spline.knots[num_knots - 2];
        let slope = 2.0 * a * t + b;
        if slope.abs() < 1e-5 {
            return kn_end;
        }
        return (y - kn_end_y) / slope + kn_end;
    }

    // Segment start values are the constant coefficients, monotone in y.
    let mut seg = 0;
    for i in 0..num_segs - 1 {
        if y < spline.coefs_c[i + 1] {
            seg = i;
            break;
        }
        seg = i + 1;
    }

    // Stable quadratic root of a*t^2 + b*t + (c - y) = 0.
    let a = spline.coefs_a[seg];
    let b = spline.coefs_b[seg];
    let c0 = spline.coefs_c[seg] - y;
    let discrim = (b * b - 4.0 * a * c0).sqrt();
    spline.knots[seg] + (-2.0 * c0) / (discrim + b)
}
