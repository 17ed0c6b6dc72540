use serde::{Deserialize, Serialize};

/// Qualitative bucket for a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    StrongPositive,
    ModeratePositive,
    WeakPositive,
    Neutral,
    WeakNegative,
    ModerateNegative,
    StrongNegative,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        if r >= 0.7 {
            CorrelationStrength::StrongPositive
        } else if r >= 0.4 {
            CorrelationStrength::ModeratePositive
        } else if r >= 0.1 {
            CorrelationStrength::WeakPositive
        } else if r > -0.1 {
            CorrelationStrength::Neutral
        } else if r > -0.4 {
            CorrelationStrength::WeakNegative
        } else if r > -0.7 {
            CorrelationStrength::ModerateNegative
        } else {
            CorrelationStrength::StrongNegative
        }
    }
}

/// Pearson product-moment correlation of two equal-length series.
///
/// Degenerate inputs (length mismatch, fewer than two samples, a constant
/// series, non-finite intermediate) yield 0 instead of an error.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    let r = cov / denom;
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Align two series on their most recent common samples.
pub(crate) fn common_tail<'a>(x: &'a [f64], y: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let len = x.len().min(y.len());
    (&x[x.len() - len..], &y[y.len() - len..])
}
