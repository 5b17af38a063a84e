use std::fmt;

use serde::{Deserialize, Serialize};

/// An object storage bucket that committee `name` publishes checkpoints to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceS3 {
    pub region: String,
    pub bucket: String,
    pub name: String,
}

/// A data availability namespace that committee `name` publishes checkpoints to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDa {
    pub network: String,
    #[serde(rename = "namespaceID")]
    pub namespace_id: String,
    pub name: String,
}

/// One fetchable origin of checkpoints. Sources that share a name belong to the same committee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommitteeSource {
    S3(SourceS3),
    Da(SourceDa),
}

impl CommitteeSource {
    /// The committee this source belongs to.
    pub fn committee(&self) -> &str {
        match self {
            CommitteeSource::S3(source) => &source.name,
            CommitteeSource::Da(source) => &source.name,
        }
    }
}

impl fmt::Display for CommitteeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitteeSource::S3(s) => write!(f, "s3://{}/{} ({})", s.region, s.bucket, s.name),
            CommitteeSource::Da(s) => {
                write!(f, "da://{}/{} ({})", s.network, s.namespace_id, s.name)
            },
        }
    }
}

impl From<SourceS3> for CommitteeSource {
    fn from(source: SourceS3) -> Self {
        CommitteeSource::S3(source)
    }
}

impl From<SourceDa> for CommitteeSource {
    fn from(source: SourceDa) -> Self {
        CommitteeSource::Da(source)
    }
}
