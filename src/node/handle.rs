//! Request handle for the consensus actor
//! 
//! Admission checks and queries carry a one-shot reply channel; commits are
//! fire-and-forget.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use crate::consensus::{Block, ChainLength};
use crate::crypto::Hash;
use crate::storage::ChainError;
use crate::validation::Transaction;

/// Errors surfaced by the node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Consensus actor is not running")]
    ChannelClosed,
    #[error("Consensus actor dropped the reply")]
    ReplyDropped,
    #[error("Chain invariant violated: {0}")]
    Chain(#[from] ChainError),
    #[error("Consensus actor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Snapshot of the actor's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
    pub head: Hash,
    pub length: ChainLength,
    /// Stored blocks (genesis excluded)
    pub blocks: usize,
    /// Missing parents still awaited
    pub orphans: usize,
    /// Names bound on the active chain
    pub names: usize,
    /// Transactions waiting for a mining task
    pub pending: usize,
    pub mining: bool,
}

/// Messages processed by the consensus actor, one at a time
#[derive(Debug)]
pub enum ChainRequest {
    /// Would this block be accepted?
    TryBlock {
        block: Block,
        reply: oneshot::Sender<bool>,
    },
    /// Would this name publication be accepted?
    TryTxPublish {
        tx: Transaction,
        reply: oneshot::Sender<bool>,
    },
    /// Commit a block
    AddBlock(Block),
    /// Queue a name publication for mining
    AddTxPublish(Transaction),
    /// Content hash bound to a name on the active chain
    Resolve {
        name: String,
        reply: oneshot::Sender<Option<Hash>>,
    },
    /// Diagnostic dump of the active chain
    DumpChain { reply: oneshot::Sender<String> },
    Status { reply: oneshot::Sender<ChainStatus> },
}

/// Cloneable handle to a running consensus actor
#[derive(Debug, Clone)]
pub struct ChainHandle {
    requests: mpsc::Sender<ChainRequest>,
}

impl ChainHandle {
    pub(crate) fn new(requests: mpsc::Sender<ChainRequest>) -> Self {
        Self { requests }
    }

    async fn send(&self, request: ChainRequest) -> Result<(), NodeError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| NodeError::ChannelClosed)
    }

    async fn ask<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ChainRequest,
    ) -> Result<T, NodeError> {
        let (reply, answer) = oneshot::channel();
        self.send(make(reply)).await?;
        answer.await.map_err(|_| NodeError::ReplyDropped)
    }

    /// True iff the block has valid proof of work and is not stored yet
    pub async fn try_block(&self, block: Block) -> Result<bool, NodeError> {
        self.ask(|reply| ChainRequest::TryBlock { block, reply }).await
    }

    /// Append a block to the chain
    pub async fn add_block(&self, block: Block) -> Result<(), NodeError> {
        self.send(ChainRequest::AddBlock(block)).await
    }

    /// True iff the name is neither bound nor queued
    pub async fn try_tx_publish(&self, tx: Transaction) -> Result<bool, NodeError> {
        self.ask(|reply| ChainRequest::TryTxPublish { tx, reply }).await
    }

    /// Queue a name publication for the next mining task
    pub async fn add_tx_publish(&self, tx: Transaction) -> Result<(), NodeError> {
        self.send(ChainRequest::AddTxPublish(tx)).await
    }

    /// Content hash bound to `name` on the active chain
    pub async fn resolve(&self, name: impl Into<String>) -> Result<Option<Hash>, NodeError> {
        let name = name.into();
        self.ask(|reply| ChainRequest::Resolve { name, reply }).await
    }

    pub async fn dump_chain(&self) -> Result<String, NodeError> {
        self.ask(|reply| ChainRequest::DumpChain { reply }).await
    }

    pub async fn status(&self) -> Result<ChainStatus, NodeError> {
        self.ask(|reply| ChainRequest::Status { reply }).await
    }
}
