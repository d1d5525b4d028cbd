/// Fixed multiplier applied to summed linker contributions so they sit in the
/// same numeric range as contact scores.
pub const LINKER_SCORE_SCALE: f64 = 10.0;

/// Contact weight for a pair of points at squared distance `dist_sq`.
///
/// Full weight inside `clash`, zero beyond `contact`, and a smooth
/// `(1 - t²)²` fall-off in between. Non-increasing in distance.
#[inline]
pub fn contact_decay(dist_sq: f64, clash: f64, contact: f64) -> f64 {
    let dist = dist_sq.max(0.0).sqrt();
    if dist >= contact {
        return 0.0;
    }
    if dist <= clash || contact <= clash {
        return 1.0;
    }
    let t = (dist - clash) / (contact - clash);
    let s = 1.0 - t * t;
    s * s
}

/// Saturating map from a number of closing loops to a score contribution.
#[inline]
pub fn linker_count_score(count: usize) -> f64 {
    (count as f64).ln_1p()
}

#[inline]
pub fn harmonic(dist: f64, x0: f64, sd: f64) -> f64 {
    let z = (dist - x0) / sd;
    z * z
}

#[inline]
pub fn flat_harmonic(dist: f64, x0: f64, sd: f64, tolerance: f64) -> f64 {
    let excess = (dist - x0).abs() - tolerance;
    if excess <= 0.0 {
        return 0.0;
    }
    let z = excess / sd;
    z * z
}

/// Zero between `lower` and `upper`, quadratic outside, and linear once the
/// distance exceeds `upper` by more than `rswitch` standard deviations.
#[inline]
pub fn bounded(dist: f64, lower: f64, upper: f64, sd: f64, rswitch: f64) -> f64 {
    if dist > upper {
        let z = (dist - upper) / sd;
        if z > rswitch {
            2.0 * rswitch * z - rswitch * rswitch
        } else {
            z * z
        }
    } else if dist < lower {
        let z = (lower - dist) / sd;
        z * z
    } else {
        0.0
    }
}
