use std::collections::BTreeSet;

use light_indexer_types::{
    normalize_tick,
    Amount,
    BalanceDelta,
    BlockHeight,
    Checkpoint,
    CommitteeSource,
    ParseError,
    VerificationConfig,
};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::SourcedCheckpoint;

/// A parsed checkpoint document from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointDocument {
    pub source: CommitteeSource,
    pub checkpoint: Checkpoint,
    /// Height of the state the deltas apply to. `None` means the deltas are a full snapshot.
    pub base_height: Option<BlockHeight>,
    pub deltas: Vec<BalanceDelta>,
}

impl CheckpointDocument {
    pub fn committee(&self) -> &str {
        self.source.committee()
    }

    pub fn sourced(&self) -> SourcedCheckpoint {
        SourcedCheckpoint {
            committee: self.committee().to_string(),
            checkpoint: self.checkpoint.clone(),
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    commitment: String,
    hash: String,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    height: BlockHeight,
    meta_protocol: String,
    version: String,
    name: String,
    #[serde(default)]
    url: String,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(default)]
    base_height: Option<BlockHeight>,
    #[serde(default)]
    deltas: Vec<RawDelta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDelta {
    tick: String,
    pkscript: String,
    #[serde(default)]
    wallet: Option<String>,
    available_balance: String,
    overall_balance: String,
}

/// Parses raw documents into [`CheckpointDocument`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    supported_versions: BTreeSet<u64>,
}

impl Normalizer {
    pub fn new(supported_versions: impl IntoIterator<Item = u64>) -> Self {
        Self {
            supported_versions: supported_versions.into_iter().collect(),
        }
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self::new(config.supported_versions.iter().copied())
    }

    /// Parse a document served by `source`. A malformed commitment is a hard failure.
    pub fn normalize(
        &self,
        source: &CommitteeSource,
        bytes: &[u8],
    ) -> Result<CheckpointDocument, ParseError> {
        let raw: RawDocument =
            serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))?;

        let commitment = raw.commitment.parse()?;
        self.check_version(&raw.version)?;
        require("hash", &raw.hash)?;
        require("metaProtocol", &raw.meta_protocol)?;
        if raw.name != source.committee() {
            return Err(ParseError::CommitteeMismatch {
                expected: source.committee().to_string(),
                found: raw.name,
            });
        }
        if let Some(base) = raw.base_height {
            if base >= raw.height {
                return Err(ParseError::InvalidField {
                    field: "baseHeight",
                    reason: format!("{base} is not below height {}", raw.height),
                });
            }
        }

        let deltas = raw
            .deltas
            .into_iter()
            .map(parse_delta)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CheckpointDocument {
            source: source.clone(),
            checkpoint: Checkpoint {
                commitment,
                hash: raw.hash,
                height: raw.height,
                meta_protocol: raw.meta_protocol,
                version: raw.version,
                name: raw.name,
                url: raw.url,
            },
            base_height: raw.base_height,
            deltas,
        })
    }

    /// Only the major component of versions like `v1`, `1.2` or `v0.1.0-rc.1` is checked.
    fn check_version(&self, version: &str) -> Result<(), ParseError> {
        let major = version
            .trim_start_matches(['v', 'V'])
            .split(['.', '-'])
            .next()
            .and_then(|major| major.parse::<u64>().ok());
        match major {
            Some(major) if self.supported_versions.contains(&major) => Ok(()),
            _ => Err(ParseError::UnsupportedVersion(version.to_string())),
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ParseError> {
    if value.is_empty() {
        return Err(ParseError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn parse_delta(raw: RawDelta) -> Result<BalanceDelta, ParseError> {
    require("tick", &raw.tick)?;
    require("pkscript", &raw.pkscript)?;
    let available_balance: Amount = raw.available_balance.parse()?;
    let overall_balance: Amount = raw.overall_balance.parse()?;
    if available_balance > overall_balance {
        return Err(ParseError::InvalidField {
            field: "deltas",
            reason: format!(
                "available balance {available_balance} exceeds overall balance {overall_balance} for {}",
                raw.pkscript
            ),
        });
    }
    Ok(BalanceDelta {
        tick: normalize_tick(&raw.tick),
        pkscript: raw.pkscript,
        wallet: raw.wallet.filter(|wallet| !wallet.is_empty()),
        available_balance,
        overall_balance,
    })
}
