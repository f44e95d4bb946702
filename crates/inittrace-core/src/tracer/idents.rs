//! Fresh identifier suppliers for cloned declarations
//!
//! A supplier is shared by every file of a run, possibly across worker
//! threads, so implementations synchronize internally and take `&self`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Alphabet of generated identifiers
pub const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Default identifier length
pub const DEFAULT_IDENT_LEN: usize = 10;

/// Source of names that are fresh enough not to collide within one run
pub trait IdentSupplier: Send + Sync {
    fn next_ident(&self) -> String;
}

/// Uniformly random letters from a generator seeded once
pub struct RandomIdents {
    rng: Mutex<StdRng>,
    len: usize,
}

impl RandomIdents {
    /// Seeded from OS entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy(), DEFAULT_IDENT_LEN)
    }

    /// Deterministic sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), DEFAULT_IDENT_LEN)
    }

    /// Seeded when a seed is given, from entropy otherwise
    pub fn from_seed(seed: Option<u64>, len: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::from_rng(rng, len)
    }

    pub fn with_len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    fn from_rng(rng: StdRng, len: usize) -> Self {
        Self {
            rng: Mutex::new(rng),
            len,
        }
    }
}

impl Default for RandomIdents {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentSupplier for RandomIdents {
    fn next_ident(&self) -> String {
        let mut rng = self.rng.lock();
        (0..self.len)
            .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
            .collect()
    }
}

/// Counter-based supplier: never repeats within `52^len` calls
pub struct SequentialIdents {
    next: AtomicU64,
    len: usize,
}

impl SequentialIdents {
    pub fn new(len: usize) -> Self {
        Self {
            next: AtomicU64::new(0),
            len,
        }
    }
}

impl Default for SequentialIdents {
    fn default() -> Self {
        Self::new(DEFAULT_IDENT_LEN)
    }
}

impl IdentSupplier for SequentialIdents {
    fn next_ident(&self) -> String {
        let mut n = self.next.fetch_add(1, Ordering::Relaxed);
        let base = LETTERS.len() as u64;
        let mut digits = vec![LETTERS[0]; self.len];
        for slot in digits.iter_mut().rev() {
            *slot = LETTERS[(n % base) as usize];
            n /= base;
        }
        // LETTERS is ASCII
        digits.into_iter().map(char::from).collect()
    }
}
