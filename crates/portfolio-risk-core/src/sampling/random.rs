use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::f64::consts::PI;

/// Source of uniform draws in [0, 1).
///
/// Every `rand::RngCore` is a `RandomSource`, so a seeded `StdRng` can be
/// passed anywhere an engine operation asks for randomness.
pub trait RandomSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of uniforms, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    pos: usize,
}

impl FixedSequence {
    /// Values are clamped into [0, 1). An empty list always yields 0.5.
    pub fn new(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, pos: 0 }
    }
}

impl RandomSource for FixedSequence {
    fn next_uniform(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.5;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }
}

/// Seeded generator when a seed is given, OS entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Box-Muller transform of two uniforms into two independent standard normals.
///
/// `u1` must lie in (0, 1]; `u2` in [0, 1).
pub fn box_muller(u1: f64, u2: f64) -> (f64, f64) {
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// One standard-normal draw. Zero uniforms are redrawn since ln(0) diverges.
pub fn standard_normal<R: RandomSource + ?Sized>(rng: &mut R) -> f64 {
    let mut u1 = rng.next_uniform();
    let mut guard = 0;
    while u1 <= 0.0 && guard < 16 {
        u1 = rng.next_uniform();
        guard += 1;
    }
    if u1 <= 0.0 {
        u1 = f64::MIN_POSITIVE;
    }
    let u2 = rng.next_uniform();
    box_muller(u1, u2).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_muller_unit_radius() {
        // u1 = e^-0.5 gives r = 1
        let (z0, z1) = box_muller((-0.5_f64).exp(), 0.0);
        assert!((z0 - 1.0).abs() < 1e-12);
        assert!(z1.abs() < 1e-12);
    }

    #[test]
    fn test_box_muller_quarter_turn() {
        let (z0, z1) = box_muller((-0.5_f64).exp(), 0.25);
        assert!(z0.abs() < 1e-12);
        assert!((z1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_box_muller_u1_one_is_zero() {
        let (z0, z1) = box_muller(1.0, 0.3);
        assert_eq!(z0, 0.0);
        assert_eq!(z1.abs(), 0.0);
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = rng_from_seed(Some(42));
        let n = 100_000;
        let draws: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.02, "mean={mean}");
        assert!((var - 1.0).abs() < 0.03, "var={var}");
    }

    #[test]
    fn test_standard_normal_skips_zero_uniform() {
        let mut seq = FixedSequence::new(vec![0.0, (-0.5_f64).exp(), 0.0]);
        let z = standard_normal(&mut seq);
        assert!((z - 1.0).abs() < 1e-12, "z={z}");
    }

    #[test]
    fn test_fixed_sequence_wraps() {
        let mut seq = FixedSequence::new(vec![0.1, 0.2]);
        assert_eq!(seq.next_uniform(), 0.1);
        assert_eq!(seq.next_uniform(), 0.2);
        assert_eq!(seq.next_uniform(), 0.1);
    }

    #[test]
    fn test_fixed_sequence_clamps_one() {
        let mut seq = FixedSequence::new(vec![1.0]);
        assert!(seq.next_uniform() < 1.0);
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let mut a = rng_from_seed(Some(7));
        let mut b = rng_from_seed(Some(7));
        for _ in 0..10 {
            assert_eq!(a.next_uniform(), b.next_uniform());
        }
    }
}
