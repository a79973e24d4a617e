//! Consensus actor
//! 
//! Single owner of the chain state. Requests are handled strictly in the
//! order they are dequeued, so the block tree, the ledger and the head
//! never see concurrent writers. Mining runs on a blocking worker that
//! only receives owned inputs and reports back through a channel.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::config::NodeConfig;
use crate::consensus::{validate_block, Block};
use crate::mining::{MinedBlock, Miner};
use crate::storage::ChainState;
use crate::validation::Transaction;
use super::{ChainHandle, ChainRequest, ChainStatus, NodeError};

/// A locally mined block that may now be announced
#[derive(Debug, Clone)]
pub struct Release {
    pub block: Block,
    /// Time the miner spent on the block
    pub mining_time: Duration,
    /// How long the announce was held back after the commit
    pub delay: Duration,
}

/// Stream of released blocks, in release order
pub type ReleaseStream = mpsc::Receiver<Release>;

enum Event {
    Request(ChainRequest),
    Mined(MinedBlock),
}

/// The consensus actor
pub struct ConsensusActor {
    config: NodeConfig,
    state: ChainState,
    /// Publications waiting for the next mining task
    pending: Vec<Transaction>,
    /// Transactions of the running mining task; `Some` while mining
    in_flight: Option<Vec<Transaction>>,
    miner: Miner,
    requests: mpsc::Receiver<ChainRequest>,
    mined_tx: mpsc::Sender<MinedBlock>,
    mined_rx: mpsc::Receiver<MinedBlock>,
    releases: mpsc::Sender<Release>,
}

impl ConsensusActor {
    /// Build an actor and the handles used to talk to it
    pub fn new(config: NodeConfig) -> (Self, ChainHandle, ReleaseStream) {
        let (request_tx, requests) = mpsc::channel(config.channel_capacity);
        let (releases, release_rx) = mpsc::channel(config.channel_capacity);
        // A single task is in flight at a time
        let (mined_tx, mined_rx) = mpsc::channel(1);

        let actor = Self {
            config,
            state: ChainState::new(),
            pending: Vec::new(),
            in_flight: None,
            miner: Miner::new(),
            requests,
            mined_tx,
            mined_rx,
            releases,
        };
        (actor, ChainHandle::new(request_tx), release_rx)
    }

    /// Start the actor on the current runtime
    pub fn spawn(config: NodeConfig) -> (ChainHandle, ReleaseStream, JoinHandle<Result<(), NodeError>>) {
        let (actor, handle, releases) = Self::new(config);
        let task = tokio::spawn(actor.run());
        (handle, releases, task)
    }

    /// Process requests until every handle is dropped
    ///
    /// A chain invariant violation ends the loop with an error.
    pub async fn run(mut self) -> Result<(), NodeError> {
        info!(mode = ?self.config.mining_mode, "consensus actor started");
        self.maybe_mine();

        loop {
            let event = tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => Event::Request(request),
                    None => break,
                },
                Some(mined) = self.mined_rx.recv() => Event::Mined(mined),
            };
            match event {
                Event::Request(request) => self.handle_request(request)?,
                Event::Mined(mined) => self.handle_mined(mined)?,
            }
        }

        info!(head = %self.state.head().short(), "all handles dropped, consensus actor stopped");
        Ok(())
    }

    fn handle_request(&mut self, request: ChainRequest) -> Result<(), NodeError> {
        match request {
            ChainRequest::TryBlock { block, reply } => {
                let accepted = match validate_block(&block, self.state.store()) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(hash = %block.hash().short(), reason = %e, "block rejected");
                        false
                    }
                };
                let _ = reply.send(accepted);
            }
            ChainRequest::TryTxPublish { tx, reply } => {
                let free = self.is_name_free(&tx.file_name);
                if !free {
                    debug!(name = %tx.file_name, "name already bound or queued");
                }
                let _ = reply.send(free);
            }
            ChainRequest::AddBlock(block) => {
                self.commit_block(block)?;
                self.maybe_mine();
            }
            ChainRequest::AddTxPublish(tx) => {
                debug!(name = %tx.file_name, "name publication queued");
                self.pending.push(tx);
                self.maybe_mine();
            }
            ChainRequest::Resolve { name, reply } => {
                let _ = reply.send(self.state.ledger().resolve(&name));
            }
            ChainRequest::DumpChain { reply } => {
                let _ = reply.send(self.state.chain_to_string());
            }
            ChainRequest::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
        Ok(())
    }

    fn handle_mined(&mut self, mined: MinedBlock) -> Result<(), NodeError> {
        let MinedBlock { block, elapsed, .. } = mined;
        let selected = self.in_flight.take().unwrap_or_default();
        let delay = self.config.release_delay(block.extends_genesis(), elapsed);
        let release = Release {
            block: block.clone(),
            mining_time: elapsed,
            delay,
        };

        self.commit_block(block)?;

        // A block that lost a fork race leaves its names unbound
        for tx in selected {
            if self.is_name_free(&tx.file_name) {
                debug!(name = %tx.file_name, "requeueing publication from a block off the active chain");
                self.pending.push(tx);
            }
        }

        self.maybe_mine();
        self.schedule_release(release);
        Ok(())
    }

    fn commit_block(&mut self, block: Block) -> Result<(), NodeError> {
        if !block.is_valid() {
            warn!(hash = %block.hash().short(), "dropping block without valid proof of work");
            return Ok(());
        }

        let outcome = self.state.append_block(block).map_err(|e| {
            error!(error = %e, "chain state corrupted");
            e
        })?;

        if outcome.is_new {
            debug!(
                hash = %outcome.hash.short(),
                head = %self.state.head().short(),
                length = %self.state.head_length(),
                "block committed"
            );
            debug!("CHAIN {}", self.state.chain_to_string());
        }
        Ok(())
    }

    /// Not bound on the active chain, not pending, not being mined
    fn is_name_free(&self, name: &str) -> bool {
        let queued = self
            .pending
            .iter()
            .chain(self.in_flight.iter().flatten())
            .any(|tx| tx.file_name == name);
        !queued && !self.state.is_name_bound(name)
    }

    /// Start a mining task if none is running and the policy asks for one
    fn maybe_mine(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        let transactions: Vec<Transaction> = self
            .pending
            .iter()
            .filter(|tx| !self.state.is_name_bound(&tx.file_name))
            .cloned()
            .collect();
        if !self.config.mining_mode.should_mine(&transactions) {
            return;
        }

        self.pending.clear();
        self.in_flight = Some(transactions.clone());

        let prev_hash = self.state.head();
        let miner = self.miner;
        let done = self.mined_tx.clone();
        debug!(parent = %prev_hash.short(), transactions = transactions.len(), "mining task started");

        tokio::task::spawn_blocking(move || {
            let mined = miner.mine(transactions, prev_hash);
            let _ = done.blocking_send(mined);
        });
    }

    fn schedule_release(&self, release: Release) {
        let releases = self.releases.clone();
        tokio::spawn(async move {
            tokio::time::sleep(release.delay).await;
            let hash = release.block.hash();
            if releases.send(release).await.is_ok() {
                debug!(hash = %hash.short(), "block released for announcement");
            }
        });
    }

    fn status(&self) -> ChainStatus {
        let store = self.state.store();
        ChainStatus {
            head: self.state.head(),
            length: self.state.head_length(),
            blocks: store.block_count(),
            orphans: store.orphan_count(),
            names: self.state.ledger().len(),
            pending: self.pending.len(),
            mining: self.in_flight.is_some(),
        }
    }
}
