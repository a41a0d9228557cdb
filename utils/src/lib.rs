pub mod spin_lock;
pub mod zip;

/**
 * This crate provides various convenience functions and utilities shared by the simulation crates.
 */
pub use crate::spin_lock::*;
pub use crate::zip::*;

/// Generate a random vector of triplets.
///
/// The generator is seeded so the output is reproducible between runs.
pub fn random_vectors(n: usize) -> Vec<[f64; 3]> {
    use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::from_seed([3; 32]);
    let range = Uniform::new(-1.0, 1.0);
    (0..n)
        .map(move |_| [rng.sample(range), rng.sample(range), rng.sample(range)])
        .collect()
}
