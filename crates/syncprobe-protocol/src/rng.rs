//! Deterministic-when-seeded random streams.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Independent generator for one consumer (a pool builder, a session).
///
/// With a seed, every `stream` yields a reproducible, non-overlapping
/// sequence. Without one, the generator is seeded from OS entropy.
pub fn stream_rng(seed: Option<u64>, stream: u64) -> ChaCha8Rng {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(stream);
            rng
        }
        None => ChaCha8Rng::from_entropy(),
    }
}
