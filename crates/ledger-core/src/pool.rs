use tracing::debug;

/// Transactions admitted but not yet sealed, in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxPool {
    txs: Vec<String>,
}

impl TxPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tx` unless it is empty after trimming. Returns whether it was kept.
    pub fn add(&mut self, tx: impl Into<String>) -> bool {
        let tx = tx.into();
        if tx.trim().is_empty() {
            debug!("discarding blank transaction");
            return false;
        }
        self.txs.push(tx);
        true
    }

    /// Owned copy of the pool; later admissions never show up in it.
    pub fn snapshot(&self) -> Vec<String> {
        self.txs.clone()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.txs
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Drop `sealed` from the front of the pool. Leaves the pool untouched and
    /// returns false if the pool does not start with exactly those transactions.
    pub fn remove_sealed(&mut self, sealed: &[String]) -> bool {
        if !self.txs.starts_with(sealed) {
            return false;
        }
        self.txs.drain(..sealed.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_transactions_are_discarded() {
        let mut pool = TxPool::new();
        assert!(!pool.add(""));
        assert!(!pool.add("   "));
        assert!(!pool.add("\t\n "));
        assert!(pool.is_empty());
    }

    #[test]
    fn transaction_is_kept_verbatim() {
        let mut pool = TxPool::new();
        assert!(pool.add("roll-1"));
        assert!(pool.add("  padded  "));
        assert_eq!(pool.as_slice(), ["roll-1", "  padded  "]);
    }

    #[test]
    fn duplicates_are_kept_in_arrival_order() {
        let mut pool = TxPool::new();
        pool.add("x");
        pool.add("y");
        pool.add("x");
        assert_eq!(pool.as_slice(), ["x", "y", "x"]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn snapshot_does_not_alias_pool() {
        let mut pool = TxPool::new();
        pool.add("first");
        let snap = pool.snapshot();
        pool.add("second");
        assert_eq!(snap, ["first"]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn remove_sealed_keeps_later_arrivals() {
        let mut pool = TxPool::new();
        pool.add("a");
        pool.add("b");
        let snap = pool.snapshot();
        pool.add("c");
        assert!(pool.remove_sealed(&snap));
        assert_eq!(pool.as_slice(), ["c"]);
    }

    #[test]
    fn remove_sealed_rejects_foreign_prefix() {
        let mut pool = TxPool::new();
        pool.add("a");
        pool.add("b");
        assert!(!pool.remove_sealed(&["b".to_string()]));
        assert_eq!(pool.as_slice(), ["a", "b"]);
    }
}
