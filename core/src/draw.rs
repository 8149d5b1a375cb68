//! Uniform random selection without replacement.
//!
//! The draw samples `count` distinct positions of the pool with
//! `rand::seq::index::sample` (partial Fisher–Yates or Floyd's algorithm,
//! whichever is cheaper), so every size-`count` subset is equally likely,
//! no entrant can be chosen twice, and only the chosen ids are cloned. The
//! caller's pool is never mutated.

use crate::error::{LotteryError, Result};
use crate::types::EntrantId;
use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, PoisonError};

/// How a draw treats a request larger than the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Draw `min(count, |pool|)` entrants (lottery and replacement paths)
    Clamp,
    /// Fail with [`LotteryError::InsufficientPool`]
    Strict,
}

/// Draw `count` distinct entrants from `pool` using the given RNG.
///
/// `pool` holds distinct ids, as a waitlist does.
///
/// # Errors
///
/// Returns [`LotteryError::InsufficientPool`] in [`DrawMode::Strict`] when
/// `count` exceeds the pool size.
pub fn draw_with<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[EntrantId],
    count: usize,
    mode: DrawMode,
) -> Result<Vec<EntrantId>> {
    let available = pool.len();
    let amount = match mode {
        DrawMode::Strict if count > available => {
            return Err(LotteryError::InsufficientPool {
                requested: count,
                available,
            });
        }
        DrawMode::Strict => count,
        DrawMode::Clamp => count.min(available),
    };

    if amount == 0 {
        return Ok(Vec::new());
    }

    Ok(index::sample(rng, available, amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect())
}

/// Shared source of lottery randomness.
///
/// Wraps a `ChaCha8Rng` so that draws can be made reproducible with a seed
/// (audits, tests) while production engines seed from OS entropy.
#[derive(Debug)]
pub struct DrawEngine {
    rng: Mutex<ChaCha8Rng>,
}

impl DrawEngine {
    /// Engine seeded from operating-system entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Engine with a fixed seed; identical seeds and pools yield identical draws
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Draw `count` distinct entrants uniformly at random from `pool`.
    ///
    /// # Errors
    ///
    /// See [`draw_with`].
    pub fn draw(&self, pool: &[EntrantId], count: usize, mode: DrawMode) -> Result<Vec<EntrantId>> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        draw_with(&mut *rng, pool, count, mode)
    }

    /// A uniformly random ordering of the whole pool.
    #[must_use]
    pub fn shuffle(&self, pool: &[EntrantId]) -> Vec<EntrantId> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut order = pool.to_vec();
        order.shuffle(&mut *rng);
        order
    }
}

impl Default for DrawEngine {
    fn default() -> Self {
        Self::from_entropy()
    }
}
