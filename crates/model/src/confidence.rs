/// Confidence score in `[0, 1]`.
pub type Confidence = f64;

/// Clamp a raw score into `[0, 1]`; NaN collapses to zero.
#[must_use]
pub fn clamp_confidence(raw: f64) -> Confidence {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}
