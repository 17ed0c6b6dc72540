pub mod control;
#[cfg(feature = "sampling")]
pub mod random;
pub mod stats;

pub use control::SearchControl;
#[cfg(feature = "sampling")]
pub use random::{box_muller, rng_from_seed, standard_normal, FixedSequence, RandomSource};
