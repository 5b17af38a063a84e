use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{BlockHeight, CommitteeSource, ConfigError, SourceDa, SourceS3};

/// Engine configuration. It is set once before the engine is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub verification: VerificationConfig,
    pub committee_indexers: CommitteeIndexers,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub syncronizer: SyncronizerConfig,
    /// JSON-lines file of sources that must not be trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_list_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationConfig {
    #[serde(rename = "bitcoinRPC")]
    pub bitcoin_rpc: String,
    pub meta_protocol: String,
    /// Checkpoints below this height are never accepted.
    pub minimal_checkpoint: BlockHeight,
    /// Number of distinct committees that must agree when not every committee reports the same
    /// height. Defaults to `min(2, committees)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_agreement: Option<usize>,
    /// Major schema versions accepted by the normalizer.
    #[serde(default = "default_supported_versions")]
    pub supported_versions: Vec<u64>,
}

fn default_supported_versions() -> Vec<u64> {
    vec![0, 1]
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            bitcoin_rpc: "http://127.0.0.1:8332".to_string(),
            meta_protocol: "brc-20".to_string(),
            minimal_checkpoint: 0,
            min_agreement: None,
            supported_versions: default_supported_versions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommitteeIndexers {
    #[serde(default)]
    pub s3: Vec<SourceS3>,
    #[serde(default)]
    pub da: Vec<SourceDa>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherConfig {
    /// Upper bound for fetching one document from one source.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Path-style endpoint used instead of the regional virtual-hosted S3 endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_endpoint: Option<Url>,
    /// HTTP gateway for each data availability network.
    #[serde(default)]
    pub da_gateways: BTreeMap<String, Url>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            s3_endpoint: None,
            da_gateways: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncronizerConfig {
    /// Delay between two sync passes.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub rpc_timeout: Duration,
    /// How many blocks the accepted checkpoint may trail the live height and still be verified.
    pub max_lag: BlockHeight,
}

impl Default for SyncronizerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(10),
            max_lag: 6,
        }
    }
}

impl Config {
    /// All configured sources, object storage first.
    pub fn sources(&self) -> Vec<CommitteeSource> {
        self.committee_indexers
            .s3
            .iter()
            .cloned()
            .map(CommitteeSource::from)
            .chain(
                self.committee_indexers
                    .da
                    .iter()
                    .cloned()
                    .map(CommitteeSource::from),
            )
            .collect()
    }

    /// The distinct committee names across all sources.
    pub fn committees(&self) -> BTreeSet<String> {
        self.sources()
            .iter()
            .map(|source| source.committee().to_string())
            .collect()
    }

    /// Minimum number of committees that must agree on a checkpoint.
    pub fn quorum(&self) -> usize {
        self.verification
            .min_agreement
            .unwrap_or_else(|| self.committees().len().min(2))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let verification = &self.verification;
        if verification.bitcoin_rpc.is_empty() {
            return Err(ConfigError::Missing("verification.bitcoinRPC"));
        }
        Url::parse(&verification.bitcoin_rpc).map_err(|e| {
            ConfigError::Invalid(format!(
                "bitcoinRPC {:?} is not a url: {e}",
                verification.bitcoin_rpc
            ))
        })?;
        if verification.meta_protocol.is_empty() {
            return Err(ConfigError::Missing("verification.metaProtocol"));
        }
        if verification.supported_versions.is_empty() {
            return Err(ConfigError::Missing("verification.supportedVersions"));
        }

        let sources = self.sources();
        if sources.is_empty() {
            return Err(ConfigError::Missing("committeeIndexers"));
        }
        for source in &sources {
            if source.committee().is_empty() {
                return Err(ConfigError::Invalid(format!("source {source} has no name")));
            }
            if let CommitteeSource::Da(da) = source {
                if !self.fetcher.da_gateways.contains_key(&da.network) {
                    return Err(ConfigError::Invalid(format!(
                        "no gateway configured for da network {:?}",
                        da.network
                    )));
                }
            }
        }

        let committees = self.committees().len();
        if let Some(min) = verification.min_agreement {
            if min == 0 || min > committees {
                return Err(ConfigError::Invalid(format!(
                    "minAgreement must be between 1 and {committees}, got {min}"
                )));
            }
        }

        if self.fetcher.timeout.is_zero()
            || self.syncronizer.interval.is_zero()
            || self.syncronizer.rpc_timeout.is_zero()
        {
            return Err(ConfigError::Invalid(
                "timeouts and intervals must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
