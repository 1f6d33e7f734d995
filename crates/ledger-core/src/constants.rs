pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Joins transactions inside the block record that gets hashed.
pub const TX_DELIMITER: &str = "|";
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_LEDGER_NAME: &str = "ledger";
/// Nonces handed to rayon per round of the parallel search.
pub const NONCE_BATCH: u64 = 1 << 14;
