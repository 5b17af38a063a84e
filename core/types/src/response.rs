use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A query result together with a proof against the accepted commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verified<T> {
    pub result: T,
    pub proof: String,
}

/// Inline result of a query: `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response<T> {
    Ok { result: T },
    Err { error: String },
}

/// Inline result of a proven query: `{"result": ..., "proof": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerifiableResponse<T> {
    Ok { result: T, proof: String },
    Err { error: String },
}

impl<T, E: Display> From<Result<T, E>> for Response<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(result) => Response::Ok { result },
            Err(e) => Response::Err {
                error: e.to_string(),
            },
        }
    }
}

impl<T, E: Display> From<Result<Verified<T>, E>> for VerifiableResponse<T> {
    fn from(result: Result<Verified<T>, E>) -> Self {
        match result {
            Ok(Verified { result, proof }) => VerifiableResponse::Ok { result, proof },
            Err(e) => VerifiableResponse::Err {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{Amount, BalanceOfPkScript, QueryError};

    #[test]
    fn test_not_ready_is_an_inline_error() {
        let response: VerifiableResponse<BalanceOfPkScript> =
            Err::<Verified<_>, _>(QueryError::NotReady).into();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"error": "not ready"})
        );
    }

    #[test]
    fn test_zero_balance_is_a_result() {
        let response: VerifiableResponse<BalanceOfPkScript> = Ok::<_, QueryError>(Verified {
            result: BalanceOfPkScript {
                available_balance: Amount::zero(),
                overall_balance: Amount::zero(),
            },
            proof: "cHJvb2Y=".to_string(),
        })
        .into();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "result": {"availableBalance": "0", "overallBalance": "0"},
                "proof": "cHJvb2Y="
            })
        );
    }

    #[test]
    fn test_plain_response() {
        let response: Response<u64> = Ok::<_, QueryError>(800000).into();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"result": 800000})
        );
        let response: Response<u64> = Err::<u64, _>(QueryError::BlockHeightUnknown).into();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"error": "block height has not been observed"})
        );
    }
}
