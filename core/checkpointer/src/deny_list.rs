use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use light_indexer_types::{BlockHeight, Commitment, CommitteeSource, SourceDa, SourceS3};
use serde::{Deserialize, Serialize};

use crate::CheckpointDocument;

/// Why a source was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub height: BlockHeight,
    pub hash: String,
    pub correct_commitment: Commitment,
    pub fraud_commitment: Commitment,
}

/// One line of the deny list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DenyEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_s3: Option<SourceS3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_da: Option<SourceDa>,
}

impl DenyEntry {
    pub fn new(source: CommitteeSource, evidence: Option<Evidence>) -> Self {
        match source {
            CommitteeSource::S3(s3) => Self {
                evidence,
                source_s3: Some(s3),
                source_da: None,
            },
            CommitteeSource::Da(da) => Self {
                evidence,
                source_s3: None,
                source_da: Some(da),
            },
        }
    }

    fn sources(&self) -> impl Iterator<Item = CommitteeSource> + '_ {
        self.source_s3
            .iter()
            .cloned()
            .map(CommitteeSource::S3)
            .chain(self.source_da.iter().cloned().map(CommitteeSource::Da))
    }
}

/// Sources that must not be fetched from, persisted as JSON lines.
#[derive(Debug, Default)]
pub struct DenyList {
    path: Option<PathBuf>,
    entries: Vec<DenyEntry>,
    denied: HashSet<CommitteeSource>,
}

impl DenyList {
    /// A list that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Read the deny list at `path`. A missing file is an empty list. Reading stops at the first
    /// line that does not parse.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut list = Self {
            path: Some(path.clone()),
            ..Default::default()
        };
        if !path.exists() {
            return Ok(list);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read deny list {}", path.display()))?;
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DenyEntry>(line) {
                Ok(entry) => list.insert(entry),
                Err(e) => {
                    tracing::warn!(
                        "stopped reading deny list {} at line {}: {e}",
                        path.display(),
                        line_no + 1
                    );
                    break;
                },
            }
        }
        Ok(list)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[DenyEntry] {
        &self.entries
    }

    pub fn is_denied(&self, source: &CommitteeSource) -> bool {
        self.denied.contains(source)
    }

    /// Record an entry, and persist it when the list is backed by a file.
    pub fn append(&mut self, entry: DenyEntry) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let mut line = serde_json::to_string(&entry)?;
            line.push('\n');
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(line.as_bytes()))
                .with_context(|| format!("failed to append to deny list {}", path.display()))?;
        }
        self.insert(entry);
        Ok(())
    }

    fn insert(&mut self, entry: DenyEntry) {
        self.denied.extend(entry.sources());
        self.entries.push(entry);
    }
}

/// Entries against the sources that contradict a quorum at `height`.
///
/// Evidence is only produced when exactly one commitment is reported by at least `quorum`
/// distinct committees; every source reporting anything else at that height is a culprit.
pub fn conflict_evidence(
    documents: &[CheckpointDocument],
    height: BlockHeight,
    quorum: usize,
) -> Vec<DenyEntry> {
    let at_height: Vec<&CheckpointDocument> = documents
        .iter()
        .filter(|doc| doc.checkpoint.height == height)
        .collect();

    let mut backers: BTreeMap<Commitment, BTreeSet<&str>> = BTreeMap::new();
    for doc in &at_height {
        backers
            .entry(doc.checkpoint.commitment)
            .or_default()
            .insert(doc.committee());
    }

    let mut backed = backers
        .iter()
        .filter(|(_, committees)| committees.len() >= quorum);
    let (Some((correct, _)), None) = (backed.next(), backed.next()) else {
        return Vec::new();
    };

    at_height
        .into_iter()
        .filter(|doc| doc.checkpoint.commitment != *correct)
        .map(|doc| {
            DenyEntry::new(
                doc.source.clone(),
                Some(Evidence {
                    height,
                    hash: doc.checkpoint.hash.clone(),
                    correct_commitment: *correct,
                    fraud_commitment: doc.checkpoint.commitment,
                }),
            )
        })
        .collect()
}
