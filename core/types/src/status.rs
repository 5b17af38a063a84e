use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the local balance index can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Started, but no sync pass has completed yet.
    #[default]
    Verifying,
    /// The index matches an accepted checkpoint that is recent enough.
    Verified,
    /// Consensus failed, the checkpoint is stale, or an integrity check failed.
    Unverified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verifying => "verifying",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Unverified => "unverified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
