//! Source of chain reference points (recent block hashes) for transaction construction.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    value: BlockhashValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

/// Fetches the reference point a transfer is built against.
///
/// The `Synthetic` variant derives a fresh hash per call without touching the network, for dry
/// runs and tests.
#[derive(Debug)]
pub enum ChainClient {
    Rpc {
        url: String,
        client: reqwest::Client,
        request_id: AtomicU64,
    },
    Synthetic {
        seed: u64,
        counter: AtomicU64,
    },
}

impl ChainClient {
    pub fn rpc(url: impl Into<String>) -> Self {
        ChainClient::Rpc {
            url: url.into(),
            client: reqwest::Client::new(),
            request_id: AtomicU64::new(1),
        }
    }

    pub fn synthetic(seed: u64) -> Self {
        ChainClient::Synthetic {
            seed,
            counter: AtomicU64::new(0),
        }
    }

    /// Latest block hash, fetched fresh on every call.
    pub async fn latest_reference(&self) -> Result<String, ProviderError> {
        match self {
            ChainClient::Rpc {
                url,
                client,
                request_id,
            } => {
                let id = request_id.fetch_add(1, Ordering::Relaxed);
                let body = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "method": "getLatestBlockhash",
                    "params": [{ "commitment": "finalized" }],
                });
                let resp = client.post(url).json(&body).send().await?;
                let text = resp.text().await?;
                parse_latest_blockhash(&text)
            }
            ChainClient::Synthetic { seed, counter } => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                let mut hasher = Sha256::new();
                hasher.update(seed.to_le_bytes());
                hasher.update(n.to_le_bytes());
                Ok(hex::encode(hasher.finalize()))
            }
        }
    }
}

fn parse_latest_blockhash(text: &str) -> Result<String, ProviderError> {
    let resp: JsonRpcResponse<Value> = serde_json::from_str(text)
        .map_err(|e| ProviderError::Chain(format!("unparseable response: {e}")))?;

    if let Some(err) = resp.error {
        return Err(ProviderError::Chain(format!(
            "rpc error {}: {}",
            err.code, err.message
        )));
    }

    let result = resp
        .result
        .ok_or_else(|| ProviderError::Chain("null result from getLatestBlockhash".to_string()))?;
    let latest: LatestBlockhash = serde_json::from_value(result)
        .map_err(|e| ProviderError::Chain(format!("unexpected result shape: {e}")))?;
    Ok(latest.value.blockhash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_references_are_fresh() {
        let chain = ChainClient::synthetic(7);
        let a = chain.latest_reference().await.unwrap();
        let b = chain.latest_reference().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);

        let again = ChainClient::synthetic(7);
        assert_eq!(again.latest_reference().await.unwrap(), a);
    }

    #[test]
    fn parses_blockhash_result() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":42},"value":{"blockhash":"EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N","lastValidBlockHeight":3090}}}"#;
        assert_eq!(
            parse_latest_blockhash(text).unwrap(),
            "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N"
        );
    }

    #[test]
    fn surfaces_rpc_errors() {
        let text = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let err = parse_latest_blockhash(text).unwrap_err();
        assert!(err.to_string().contains("Method not found"));

        let null = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        assert!(matches!(
            parse_latest_blockhash(null),
            Err(ProviderError::Chain(_))
        ));
    }
}
