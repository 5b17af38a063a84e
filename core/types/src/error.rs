use std::time::Duration;

use thiserror::Error;

use crate::{AmountError, BlockHeight, Commitment, CommitmentError};

/// Missing or invalid configuration. Fatal to initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config is missing {0}")]
    Missing(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure to retrieve a document from one source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("checkpoint not found at {0}")]
    NotFound(String),
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("no gateway configured for da network {0:?}")]
    UnknownNetwork(String),
}

/// A fetched document that cannot be turned into a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid checkpoint document: {0}")]
    Json(String),
    #[error("malformed commitment: {0}")]
    Commitment(#[from] CommitmentError),
    #[error("unsupported checkpoint version {0:?}")]
    UnsupportedVersion(String),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("checkpoint from committee {found:?} served by a source of {expected:?}")]
    CommitteeMismatch { expected: String, found: String },
}

impl From<AmountError> for ParseError {
    fn from(error: AmountError) -> Self {
        ParseError::InvalidField {
            field: "deltas",
            reason: error.to_string(),
        }
    }
}

/// Committees did not agree on a checkpoint this pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("no checkpoints were collected")]
    NoCheckpoints,
    #[error("conflicting commitments at height {height}: {commitments:?}")]
    Conflict {
        height: BlockHeight,
        commitments: Vec<Commitment>,
    },
    #[error("no height is backed by {required} committees")]
    InsufficientQuorum { required: usize },
}

/// The agreed checkpoint is below the configured floor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checkpoint height {height} is below the minimal checkpoint {minimal}")]
pub struct StaleConfigError {
    pub height: BlockHeight,
    pub minimal: BlockHeight,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error(transparent)]
    Stale(#[from] StaleConfigError),
}

/// The deltas of a checkpoint could not be applied. Nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexApplyError {
    #[error("checkpoint is for meta protocol {found:?}, index tracks {expected:?}")]
    MetaProtocolMismatch { expected: String, found: String },
    #[error("checkpoint height {height} is not newer than accepted height {accepted}")]
    NotNewer {
        height: BlockHeight,
        accepted: BlockHeight,
    },
    #[error("deltas produce commitment {computed}, checkpoint commits to {expected}")]
    CommitmentMismatch {
        expected: Commitment,
        computed: Commitment,
    },
    #[error("pkscript {pkscript} is associated with wallet {existing} and {found}")]
    WalletConflict {
        pkscript: String,
        existing: String,
        found: String,
    },
    #[error("deltas start at height {base}, index is at {accepted:?}")]
    BaseMismatch {
        base: BlockHeight,
        accepted: Option<BlockHeight>,
    },
    #[error("no document for the agreed checkpoint")]
    MissingDocument,
    #[error("committees agree on {agreed} at accepted height {height}, index holds {accepted}")]
    ConflictsWithAccepted {
        height: BlockHeight,
        accepted: Commitment,
        agreed: Commitment,
    },
    #[error("state tree error: {0}")]
    Tree(String),
}

/// Errors surfaced inline to callers of the query operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("not ready")]
    NotReady,
    #[error("no checkpoint has been accepted")]
    NoCheckpoint,
    #[error("checkpoint at height {accepted} is stale (live height {live}, tolerance {max_lag})")]
    Stale {
        accepted: BlockHeight,
        live: BlockHeight,
        max_lag: BlockHeight,
    },
    #[error("block height has not been observed")]
    BlockHeightUnknown,
    #[error("{0}")]
    Proof(String),
}

/// Misuse of the engine lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("config has not been set")]
    NotConfigured,
    #[error("config can only be set once")]
    AlreadyConfigured,
    #[error("engine is already running")]
    AlreadyRunning,
    #[error("engine is not running")]
    NotRunning,
    #[error("engine has been shut down")]
    ShutDown,
    #[error("failed to start the engine: {0}")]
    Startup(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
