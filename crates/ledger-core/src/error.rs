use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no pending transactions to mine")]
    EmptyPool,

    #[error("mining cancelled")]
    Cancelled,

    #[error("chain tip moved while mining: expected prev hash {expected}, block carries {found}")]
    StaleTip { expected: String, found: String },

    #[error("pending pool no longer starts with the sealed transactions")]
    PoolDiverged,

    #[error("block {index} is invalid: {reason}")]
    InvalidBlock { index: u64, reason: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
