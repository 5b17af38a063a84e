use light_indexer_balances::commitment_of;
use light_indexer_types::{
    Amount,
    BalanceDelta,
    BlockHeight,
    Checkpoint,
    CommitteeIndexers,
    Commitment,
    Config,
    SourceS3,
    VerificationConfig,
};
use serde_json::json;

pub const META_PROTOCOL: &str = "brc-20";
pub const WALLET: &str = "bc1qhuv3dhpnm0wktasd3v0kt6e4aqfqsd0uhfdu7d";

pub fn delta(
    tick: &str,
    pkscript: &str,
    wallet: Option<&str>,
    available: u64,
    overall: u64,
) -> BalanceDelta {
    BalanceDelta {
        tick: tick.to_string(),
        pkscript: pkscript.to_string(),
        wallet: wallet.map(str::to_string),
        available_balance: Amount::from(available),
        overall_balance: Amount::from(overall),
    }
}

/// A small `ordi` state used across tests.
pub fn ordi_state() -> Vec<BalanceDelta> {
    vec![
        delta("ordi", "0014aa", Some(WALLET), 100, 150),
        delta("ordi", "0014bb", Some(WALLET), 5, 5),
        delta("ordi", "0014cc", None, 1, 1),
    ]
}

pub fn s3_source(name: &str) -> SourceS3 {
    SourceS3 {
        region: "us-west-2".to_string(),
        bucket: format!("{name}-checkpoints"),
        name: name.to_string(),
    }
}

/// A config with one S3 source per committee.
pub fn test_config(committees: &[&str], bitcoin_rpc: &str) -> Config {
    Config {
        verification: VerificationConfig {
            bitcoin_rpc: bitcoin_rpc.to_string(),
            meta_protocol: META_PROTOCOL.to_string(),
            minimal_checkpoint: 0,
            ..Default::default()
        },
        committee_indexers: CommitteeIndexers {
            s3: committees.iter().map(|name| s3_source(name)).collect(),
            da: vec![],
        },
        ..Default::default()
    }
}

/// Builds checkpoint documents whose commitment matches their balance state.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    name: String,
    height: BlockHeight,
    hash: String,
    meta_protocol: String,
    version: String,
    base_height: Option<BlockHeight>,
    deltas: Vec<BalanceDelta>,
    state: Option<Vec<BalanceDelta>>,
    commitment: Option<Commitment>,
}

impl DocumentBuilder {
    pub fn new(name: &str, height: BlockHeight) -> Self {
        Self {
            name: name.to_string(),
            height,
            hash: block_hash(height),
            meta_protocol: META_PROTOCOL.to_string(),
            version: "v1".to_string(),
            base_height: None,
            deltas: Vec::new(),
            state: None,
            commitment: None,
        }
    }

    pub fn meta_protocol(mut self, meta_protocol: &str) -> Self {
        self.meta_protocol = meta_protocol.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Deltas of a full snapshot, unless [`Self::incremental`] is also used.
    pub fn deltas(mut self, deltas: Vec<BalanceDelta>) -> Self {
        self.deltas = deltas;
        self
    }

    /// Mark the deltas as changes on top of `base_height`. `state` is the complete state after
    /// the changes and determines the commitment.
    pub fn incremental(mut self, base_height: BlockHeight, state: Vec<BalanceDelta>) -> Self {
        self.base_height = Some(base_height);
        self.state = Some(state);
        self
    }

    /// Override the computed commitment.
    pub fn commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let commitment = self.commitment.unwrap_or_else(|| {
            commitment_of(self.state.as_ref().unwrap_or(&self.deltas))
                .expect("fixture state must be consistent")
        });
        Checkpoint {
            commitment,
            hash: self.hash.clone(),
            height: self.height,
            meta_protocol: self.meta_protocol.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
            url: format!("https://{}.example", self.name),
        }
    }

    pub fn json(&self) -> serde_json::Value {
        let mut value =
            serde_json::to_value(self.checkpoint()).expect("checkpoint serializes to json");
        value["deltas"] = json!(self.deltas);
        if let Some(base) = self.base_height {
            value["baseHeight"] = json!(base.to_string());
        }
        value
    }

    pub fn build(&self) -> Vec<u8> {
        serde_json::to_vec(&self.json()).expect("document serializes to json")
    }
}

pub fn block_hash(height: BlockHeight) -> String {
    format!("{height:064x}")
}
