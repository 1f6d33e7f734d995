use crate::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_LEDGER_NAME},
    merkle_root,
    mine::{BlockTemplate, CancelToken, Miner},
    pool::TxPool,
    Block, LedgerError, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub name: String,
    /// Leading `'0'` hex digits a mined block hash needs.
    pub difficulty: u32,
    /// Hold genesis to the difficulty too. Off by default: genesis is sealed at nonce 0.
    pub mine_genesis: bool,
    /// Use the rayon nonce search.
    pub parallel: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LEDGER_NAME.to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            mine_genesis: false,
            parallel: false,
        }
    }
}

impl LedgerConfig {
    pub fn new(name: impl Into<String>, difficulty: u32) -> Self {
        Self {
            name: name.into(),
            difficulty,
            ..Self::default()
        }
    }
}

/// A block whose transactions matched a search query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub block_index: u64,
    pub matches: Vec<String>,
    pub hash: String,
}

fn genesis_template(name: &str) -> BlockTemplate {
    BlockTemplate::new(0, "", vec![format!("Genesis: {name} Blockchain")])
}

/// Genesis block for `name`, sealed at nonce 0 without proof of work.
pub fn genesis_block(name: &str) -> Block {
    genesis_template(name).seal(0)
}

/// Single-owner ledger: sealed blocks, the pending pool and the difficulty.
/// Share it between threads through [`crate::SharedLedger`].
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    blocks: Vec<Block>,
    pending: TxPool,
}

impl Ledger {
    /// Build the ledger and append its genesis block.
    ///
    /// With `mine_genesis` the genesis search can be stopped through `cancel`;
    /// otherwise the token is never consulted.
    pub fn new(config: LedgerConfig, cancel: &CancelToken) -> Result<Self> {
        let genesis = if config.mine_genesis {
            let miner = Miner::new(config.difficulty).parallel(config.parallel);
            miner.mine(genesis_template(&config.name), cancel)?.0
        } else {
            genesis_block(&config.name)
        };
        info!(name = %config.name, difficulty = config.difficulty, hash = %genesis.hash, "genesis created");
        Ok(Self {
            config,
            blocks: vec![genesis],
            pending: TxPool::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[String] {
        self.pending.as_slice()
    }

    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("ledger always holds its genesis block")
    }

    pub fn miner(&self) -> Miner {
        Miner::new(self.config.difficulty).parallel(self.config.parallel)
    }

    /// Admit a transaction into the pending pool. Blank input is dropped.
    pub fn add_transaction(&mut self, tx: impl Into<String>) -> bool {
        let added = self.pending.add(tx);
        if added {
            debug!(pending = self.pending.len(), "transaction admitted");
        }
        added
    }

    /// Snapshot the pool into the next block to mine.
    pub fn prepare_block(&self) -> Result<BlockTemplate> {
        if self.pending.is_empty() {
            return Err(LedgerError::EmptyPool);
        }
        let tip = self.tip();
        Ok(BlockTemplate::new(
            tip.index + 1,
            tip.hash.clone(),
            self.pending.snapshot(),
        ))
    }

    /// Append a block mined from [`Ledger::prepare_block`] and drop its
    /// transactions from the pool. Nothing changes if either check fails.
    pub fn commit_block(&mut self, block: Block) -> Result<&Block> {
        let tip = self.tip();
        if block.prev_hash != tip.hash || block.index != tip.index + 1 {
            return Err(LedgerError::StaleTip {
                expected: tip.hash.clone(),
                found: block.prev_hash,
            });
        }
        if !self.pending.remove_sealed(&block.data) {
            return Err(LedgerError::PoolDiverged);
        }
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Seal every pending transaction into a new block.
    pub fn mine_pending(&mut self, cancel: &CancelToken) -> Result<Block> {
        let template = self.prepare_block()?;
        let (block, _stats) = self.miner().mine(template, cancel)?;
        self.commit_block(block).cloned()
    }

    /// Case-insensitive substring search over sealed transactions.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        let hits: Vec<SearchHit> = self
            .blocks
            .iter()
            .filter_map(|block| {
                let matches: Vec<String> = block
                    .data
                    .iter()
                    .filter(|tx| tx.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                (!matches.is_empty()).then(|| SearchHit {
                    block_index: block.index,
                    matches,
                    hash: block.hash.clone(),
                })
            })
            .collect();
        debug!(query, hits = hits.len(), "search");
        hits
    }

    /// Re-check linkage, hashes, Merkle roots and work over the whole chain.
    pub fn verify(&self) -> Result<()> {
        for (i, block) in self.blocks.iter().enumerate() {
            let fault = |reason: &str| LedgerError::InvalidBlock {
                index: block.index,
                reason: reason.to_string(),
            };
            if block.index != i as u64 {
                return Err(fault("index out of sequence"));
            }
            let expected_prev = if i == 0 { "" } else { self.blocks[i - 1].hash.as_str() };
            if block.prev_hash != expected_prev {
                return Err(fault("previous hash does not match predecessor"));
            }
            if block.merkle_root != merkle_root(&block.data) {
                return Err(fault("merkle root does not match data"));
            }
            if block.hash != block.compute_hash() {
                return Err(fault("stored hash does not match contents"));
            }
            let needs_work = i > 0 || self.config.mine_genesis;
            if needs_work && !block.meets_difficulty(self.config.difficulty) {
                return Err(fault("hash does not meet difficulty"));
            }
        }
        Ok(())
    }
}
