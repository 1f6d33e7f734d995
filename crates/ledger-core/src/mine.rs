use crate::{
    constants::NONCE_BATCH, finish_hash, merkle_root, pow::meets_difficulty, record_hasher,
    Block, Hash, LedgerError, Result,
};
use chrono::{SecondsFormat, Utc};
use rayon::prelude::*;
use sha2::Sha256;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;
use tracing::{info, warn};

/// Stop signal for an in-progress nonce search. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A block with everything fixed except its nonce and hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTemplate {
    pub index: u64,
    pub timestamp: String,
    pub data: Vec<String>,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
}

impl BlockTemplate {
    /// Takes ownership of `data`, stamps the current UTC time (RFC 3339) and
    /// computes the Merkle root.
    pub fn new(index: u64, prev_hash: impl Into<Hash>, data: Vec<String>) -> Self {
        let merkle_root = merkle_root(&data);
        Self {
            index,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            data,
            prev_hash: prev_hash.into(),
            merkle_root,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    fn hasher(&self) -> Sha256 {
        record_hasher(self.index, &self.timestamp, &self.data, &self.prev_hash)
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        finish_hash(&self.hasher(), nonce, &self.merkle_root)
    }

    /// Seal at `nonce` without any work check.
    pub fn seal(self, nonce: u64) -> Block {
        let hash = self.hash_with_nonce(nonce);
        self.into_block(nonce, hash)
    }

    fn into_block(self, nonce: u64, hash: Hash) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            data: self.data,
            prev_hash: self.prev_hash,
            hash,
            nonce,
            merkle_root: self.merkle_root,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MiningStats {
    /// Nonces up to and including the winning one.
    pub attempts: u64,
    pub elapsed_ms: u128,
    /// Hashes per second.
    pub hash_rate: f64,
}

/// Proof-of-work search: lowest nonce whose block hash starts with
/// `difficulty` `'0'` hex digits.
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    difficulty: u32,
    parallel: bool,
}

impl Miner {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            parallel: false,
        }
    }

    /// Spread each batch of nonces across the rayon pool. The winning nonce is
    /// the same one the sequential search finds.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mine(&self, template: BlockTemplate, cancel: &CancelToken) -> Result<(Block, MiningStats)> {
        let start = Instant::now();
        let base = template.hasher();

        let found = if self.parallel {
            search_parallel(&base, &template.merkle_root, self.difficulty, cancel)
        } else {
            search_sequential(&base, &template.merkle_root, self.difficulty, cancel)
        };
        let Some((nonce, hash)) = found else {
            warn!(index = template.index, "mining cancelled");
            return Err(LedgerError::Cancelled);
        };

        let elapsed = start.elapsed();
        let attempts = nonce.saturating_add(1);
        let secs = elapsed.as_secs_f64();
        let hash_rate = if secs > 0.0 {
            attempts as f64 / secs
        } else {
            attempts as f64
        };
        let stats = MiningStats {
            attempts,
            elapsed_ms: elapsed.as_millis(),
            hash_rate,
        };

        info!(
            "Mined block {} with nonce {} and hash {} ({} attempts, {}ms, {:.2} H/s)",
            template.index, nonce, hash, attempts, stats.elapsed_ms, hash_rate
        );
        Ok((template.into_block(nonce, hash), stats))
    }
}

fn search_sequential(
    base: &Sha256,
    merkle_root: &str,
    difficulty: u32,
    cancel: &CancelToken,
) -> Option<(u64, Hash)> {
    let mut nonce = 0u64;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        let hash = finish_hash(base, nonce, merkle_root);
        if meets_difficulty(&hash, difficulty) {
            return Some((nonce, hash));
        }
        nonce = nonce.wrapping_add(1);
    }
}

fn search_parallel(
    base: &Sha256,
    merkle_root: &str,
    difficulty: u32,
    cancel: &CancelToken,
) -> Option<(u64, Hash)> {
    let mut start = 0u64;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        let end = start.saturating_add(NONCE_BATCH);
        let found = (start..end)
            .into_par_iter()
            .find_first(|nonce| meets_difficulty(&finish_hash(base, *nonce, merkle_root), difficulty));
        if let Some(nonce) = found {
            return Some((nonce, finish_hash(base, nonce, merkle_root)));
        }
        start = if end == u64::MAX { 0 } else { end };
    }
}
