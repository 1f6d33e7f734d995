use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;
pub mod pool;
pub mod shared;

pub use chain::{genesis_block, Ledger, LedgerConfig, SearchHit};
pub use error::{LedgerError, Result};
pub use mine::{BlockTemplate, CancelToken, Miner, MiningStats};
pub use pool::TxPool;
pub use shared::{LedgerView, SharedLedger};

use constants::TX_DELIMITER;

/// Lowercase hex SHA-256 digest. Always `HASH_HEX_SIZE` characters, except the
/// empty string used as "no hash" (genesis prev hash, Merkle root of no data).
pub type Hash = String;

pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> Hash {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub data: Vec<String>,
    pub prev_hash: Hash,
    pub hash: Hash,
    pub nonce: u64,
    pub merkle_root: Hash,
}

impl Block {
    /// Recompute the fingerprint from the stored fields.
    pub fn compute_hash(&self) -> Hash {
        let base = record_hasher(self.index, &self.timestamp, &self.data, &self.prev_hash);
        finish_hash(&base, self.nonce, &self.merkle_root)
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }
}

/// Hash of the canonical block record
/// `index ++ timestamp ++ join(data, "|") ++ prev_hash ++ nonce ++ merkle_root`.
pub fn block_hash(
    index: u64,
    timestamp: &str,
    data: &[String],
    prev_hash: &str,
    nonce: u64,
    merkle_root: &str,
) -> Hash {
    finish_hash(&record_hasher(index, timestamp, data, prev_hash), nonce, merkle_root)
}

/// Hasher primed with the part of the record that does not change while mining.
pub(crate) fn record_hasher(index: u64, timestamp: &str, data: &[String], prev_hash: &str) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string());
    hasher.update(timestamp);
    for (i, tx) in data.iter().enumerate() {
        if i > 0 {
            hasher.update(TX_DELIMITER);
        }
        hasher.update(tx);
    }
    hasher.update(prev_hash);
    hasher
}

pub(crate) fn finish_hash(base: &Sha256, nonce: u64, merkle_root: &str) -> Hash {
    let digest = base
        .clone()
        .chain_update(nonce.to_string())
        .chain_update(merkle_root)
        .finalize();
    hex::encode(digest)
}

/// Merkle root over the hex fingerprints of `txs`. Parents hash the text
/// concatenation `left ++ right`; an unpaired node at the end of a layer is
/// paired with itself. No transactions gives the empty string.
pub fn merkle_root(txs: &[String]) -> Hash {
    if txs.is_empty() {
        return Hash::new();
    }
    let mut level: Vec<Hash> = txs.iter().map(sha256_hex).collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let (a, b) = if pair.len() == 2 {
                (&pair[0], &pair[1])
            } else {
                (&pair[0], &pair[0])
            };
            let mut hasher = Sha256::new();
            hasher.update(a);
            hasher.update(b);
            next.push(hex::encode(hasher.finalize()));
        }
        level = next;
    }
    level.swap_remove(0)
}

pub mod pow {
    /// Number of leading `'0'` hex digits.
    pub fn leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        leading_zero_digits(hash) >= difficulty as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    const TS: &str = "2024-01-01T00:00:00Z";

    fn txs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_block(nonce: u64) -> Block {
        let data = txs(&["alice->bob:5", "bob->carol:2"]);
        let merkle = merkle_root(&data);
        let mut block = Block {
            index: 1,
            timestamp: TS.to_string(),
            data,
            prev_hash: "00ab".to_string(),
            hash: String::new(),
            nonce,
            merkle_root: merkle,
        };
        block.hash = block.compute_hash();
        block
    }

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("a"),
            "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb"
        );
        assert_eq!(sha256_hex(b"").len(), HASH_HEX_SIZE);
    }

    #[test]
    fn sha256_hex_is_lowercase_fixed_width() {
        let h = sha256_hex("anything at all");
        assert_eq!(h.len(), HASH_HEX_SIZE);
        assert!(h.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn leading_zero_digits_examples() {
        assert_eq!(pow::leading_zero_digits("abc"), 0);
        assert_eq!(pow::leading_zero_digits("0abc"), 1);
        assert_eq!(pow::leading_zero_digits("000f0"), 3);
        assert_eq!(pow::leading_zero_digits(""), 0);
    }

    #[test]
    fn difficulty_zero_accepts_anything() {
        assert!(pow::meets_difficulty("ffff", 0));
        assert!(pow::meets_difficulty("00ff", 2));
        assert!(!pow::meets_difficulty("00ff", 3));
    }

    #[test]
    fn merkle_root_empty_txs() {
        assert_eq!(merkle_root(&[]), "");
    }

    #[test]
    fn merkle_root_single_tx_is_leaf_hash() {
        assert_eq!(merkle_root(&txs(&["21i-1579"])), sha256_hex("21i-1579"));
    }

    #[test]
    fn merkle_root_two_txs() {
        let expected = sha256_hex(format!("{}{}", sha256_hex("a"), sha256_hex("b")));
        assert_eq!(merkle_root(&txs(&["a", "b"])), expected);
        assert_eq!(
            expected,
            "62af5c3cb8da3e4f25061e829ebeea5c7513c54949115b1acc225930a90154da"
        );
    }

    #[test]
    fn merkle_root_odd_layer_duplicates_last() {
        let (a, b, c) = (sha256_hex("a"), sha256_hex("b"), sha256_hex("c"));
        let left = sha256_hex(format!("{a}{b}"));
        let right = sha256_hex(format!("{c}{c}"));
        let expected = sha256_hex(format!("{left}{right}"));
        let root = merkle_root(&txs(&["a", "b", "c"]));
        assert_eq!(root, expected);
        assert_eq!(
            root,
            "0bdf27bf7ec894ca7cadfe491ec1a3ece840f117989e8c5e9bd7086467bf6c38"
        );
        // promoting `c` unchanged would give a different root
        let promoted = sha256_hex(format!("{left}{c}"));
        assert_ne!(root, promoted);
    }

    #[test]
    fn merkle_root_is_order_and_content_sensitive() {
        let base = txs(&["tx-1", "tx-2", "tx-3", "tx-4", "tx-5"]);
        let root = merkle_root(&base);
        assert_eq!(root, merkle_root(&base));

        let mut reordered = base.clone();
        reordered.swap(1, 3);
        assert_ne!(root, merkle_root(&reordered));

        let mut edited = base.clone();
        edited[4] = "tx-6".to_string();
        assert_ne!(root, merkle_root(&edited));
    }

    #[test]
    fn merkle_root_one_thousand_txs() {
        let data: Vec<String> = (0..1000).map(|i| format!("user{i}->user{}", i + 1)).collect();
        let root = merkle_root(&data);
        assert_eq!(root.len(), HASH_HEX_SIZE);
        assert_ne!(root, merkle_root(&data[..999]));
    }

    #[test]
    fn block_hash_known_vector() {
        let block = sample_block(7);
        assert_eq!(
            block.hash,
            "c94578890feb847f3cf5306d6c9f47d46adf2c373384215be9dbcd1307f26017"
        );
    }

    #[test]
    fn block_hash_matches_free_function() {
        let block = sample_block(3);
        let direct = block_hash(
            block.index,
            &block.timestamp,
            &block.data,
            &block.prev_hash,
            block.nonce,
            &block.merkle_root,
        );
        assert_eq!(direct, block.hash);
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        assert_ne!(sample_block(0).hash, sample_block(1).hash);
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block(11);
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn block_serializes_with_camel_case_fields() {
        let block = sample_block(7);
        let value = serde_json::to_value(&block).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["index", "timestamp", "data", "prevHash", "hash", "nonce", "merkleRoot"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 7);
        assert_eq!(value["prevHash"], "00ab");
        assert_eq!(value["nonce"], 7);
    }
}
