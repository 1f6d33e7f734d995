use crate::{
    chain::{Ledger, LedgerConfig, SearchHit},
    mine::CancelToken,
    Block, Result,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use tracing::debug;

/// Point-in-time copy of the ledger for readers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub name: String,
    pub blocks: Vec<Block>,
    pub pending_tx: Vec<String>,
    pub difficulty: u32,
}

struct Inner {
    state: Mutex<Ledger>,
    /// Held for the whole of `mine_pending` so only one search runs at a time.
    mining: Mutex<()>,
    searching: AtomicBool,
}

/// Thread-safe handle to a [`Ledger`].
///
/// The state lock is only held to admit a transaction, to snapshot the pool,
/// and to append the mined block; the nonce search runs without it so reads
/// and submissions are never blocked by mining.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Inner>,
}

struct SearchingFlag<'a>(&'a AtomicBool);

impl<'a> SearchingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SearchingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SharedLedger {
    pub fn new(config: LedgerConfig, cancel: &CancelToken) -> Result<Self> {
        Ok(Self::from_ledger(Ledger::new(config, cancel)?))
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ledger),
                mining: Mutex::new(()),
                searching: AtomicBool::new(false),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, Ledger> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the ledger under the state lock.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.state())
    }

    /// Admit a transaction; returns whether it was kept and the pool size after.
    pub fn add_transaction(&self, tx: impl Into<String>) -> (bool, usize) {
        let mut state = self.state();
        let added = state.add_transaction(tx);
        (added, state.pending().len())
    }

    /// Mine everything pending at call time. Concurrent callers queue up.
    /// Transactions that arrive during the search stay pending for the next call.
    pub fn mine_pending(&self, cancel: &CancelToken) -> Result<Block> {
        let _mining = self.inner.mining.lock().unwrap_or_else(PoisonError::into_inner);

        let (template, miner) = {
            let state = self.state();
            (state.prepare_block()?, state.miner())
        };
        debug!(index = template.index, txs = template.data.len(), "pool snapshot taken");

        let (block, _stats) = {
            let _flag = SearchingFlag::raise(&self.inner.searching);
            miner.mine(template, cancel)?
        };

        let mut state = self.state();
        Ok(state.commit_block(block)?.clone())
    }

    /// True while a nonce search is running.
    pub fn is_mining(&self) -> bool {
        self.inner.searching.load(Ordering::SeqCst)
    }

    pub fn view(&self) -> LedgerView {
        let state = self.state();
        LedgerView {
            name: state.name().to_string(),
            blocks: state.blocks().to_vec(),
            pending_tx: state.pending().to_vec(),
            difficulty: state.difficulty(),
        }
    }

    pub fn name(&self) -> String {
        self.state().name().to_string()
    }

    pub fn difficulty(&self) -> u32 {
        self.state().difficulty()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.state().blocks().to_vec()
    }

    pub fn pending(&self) -> Vec<String> {
        self.state().pending().to_vec()
    }

    pub fn tip(&self) -> Block {
        self.state().tip().clone()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.state().search(query)
    }

    pub fn verify(&self) -> Result<()> {
        self.state().verify()
    }
}
