//! Adapter for custody providers reached through a REST signing gateway.
//!
//! Every gateway speaks the same small wallet protocol:
//!
//! ```text
//! POST {base}/v1/wallets                          {"label"}        -> {"id", "address"}
//! POST {base}/v1/wallets/{id}/sign-message        {"message"}      -> {"signature"}
//! POST {base}/v1/wallets/{id}/sign-transaction    {"transaction"}  -> {"signedTransaction"}
//! ```
//!
//! Credentials come from `<PREFIX>_API_URL` and `<PREFIX>_API_KEY`, with an optional
//! `<PREFIX>_ORGANIZATION_ID` forwarded as `X-Organization-Id`.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::ChainClient;
use crate::config::{Environment, Transfer};
use crate::error::{ConfigurationError, ProviderError};

use super::{
    Provider, ProviderContext, Session, SignedTransaction, Signature, UnsignedTransaction, Wallet,
};

#[derive(Debug, Clone)]
pub struct RemoteSignerProvider {
    name: String,
    env_prefix: String,
}

impl RemoteSignerProvider {
    pub fn new(name: impl Into<String>, env_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env_prefix: env_prefix.into(),
        }
    }

    fn var(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn credentials(&self, env: &Environment) -> Result<Credentials, ConfigurationError> {
        let base_url = env.require(&self.var("API_URL"))?;
        let api_key = env.require(&self.var("API_KEY"))?;
        let organization_id = env.get(&self.var("ORGANIZATION_ID"));
        let base_url = Url::parse(base_url).map_err(|e| invalid_url(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_url("not a base URL".to_string()));
        }
        Ok(Credentials {
            base_url,
            api_key: api_key.to_string(),
            organization_id: organization_id.map(str::to_string),
        })
    }
}

struct Credentials {
    base_url: Url,
    api_key: String,
    organization_id: Option<String>,
}

fn invalid_url(reason: String) -> ConfigurationError {
    ConfigurationError::Invalid {
        field: "api url",
        reason,
    }
}

fn header(field: &'static str, value: &str) -> Result<HeaderValue, ConfigurationError> {
    HeaderValue::from_str(value).map_err(|e| ConfigurationError::Invalid {
        field,
        reason: e.to_string(),
    })
}

#[async_trait]
impl Provider for RemoteSignerProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, ctx: &ProviderContext) -> Result<Box<dyn Session>, ProviderError> {
        let creds = self.credentials(&ctx.env)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header("api key", &format!("Bearer {}", creds.api_key))?,
        );
        if let Some(org) = &creds.organization_id {
            headers.insert("x-organization-id", header("organization id", org)?);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Box::new(RemoteSession {
            provider: self.name.clone(),
            base_url: creds.base_url,
            client,
            chain: Arc::clone(&ctx.chain),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedWallet {
    id: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct SignedMessage {
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedTx {
    signed_transaction: String,
}

struct RemoteSession {
    provider: String,
    base_url: Url,
    client: reqwest::Client,
    chain: Arc<ChainClient>,
}

impl RemoteSession {
    /// POST to `{base}/{segments...}`. Each segment is percent-encoded, so gateway-issued
    /// wallet ids cannot change the request path.
    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Value,
    ) -> Result<T, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| invalid_url("not a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        debug!(provider = %self.provider, %url, "gateway request");

        let resp = self.client.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("{e}; body: {text}")))
    }
}

#[async_trait]
impl Session for RemoteSession {
    async fn create_wallet(&self) -> Result<Wallet, ProviderError> {
        let label = format!("latency-bench-{}", chrono::Utc::now().timestamp_millis());
        let created: CreatedWallet = self
            .post(&["v1", "wallets"], json!({ "label": label }))
            .await?;
        Ok(Wallet {
            id: created.id,
            address: created.address,
            provider: self.provider.clone(),
        })
    }

    async fn sign_message(
        &self,
        wallet: &Wallet,
        message: &str,
    ) -> Result<Signature, ProviderError> {
        let signed: SignedMessage = self
            .post(
                &["v1", "wallets", wallet.id.as_str(), "sign-message"],
                json!({ "message": message }),
            )
            .await?;
        Ok(Signature(signed.signature))
    }

    async fn prepare_transfer(
        &self,
        wallet: &Wallet,
        transfer: &Transfer,
    ) -> Result<UnsignedTransaction, ProviderError> {
        let reference = self.chain.latest_reference().await?;
        UnsignedTransaction::build(wallet, transfer, reference)
    }

    async fn sign_transaction(
        &self,
        wallet: &Wallet,
        tx: &UnsignedTransaction,
    ) -> Result<SignedTransaction, ProviderError> {
        let signed: SignedTx = self
            .post(
                &["v1", "wallets", wallet.id.as_str(), "sign-transaction"],
                json!({ "transaction": BASE64.encode(&tx.message) }),
            )
            .await?;
        Ok(SignedTransaction(signed.signed_transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers a single HTTP request with `status` and `body`, returning the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn ctx(env: Environment) -> ProviderContext {
        ProviderContext {
            env,
            chain: Arc::new(ChainClient::synthetic(0)),
            seed: 0,
        }
    }

    #[tokio::test]
    async fn missing_credentials_are_a_configuration_error() {
        let provider = RemoteSignerProvider::new("Turnkey", "TURNKEY");
        let env = Environment::from_pairs([("TURNKEY_API_URL", "http://localhost")]);
        let err = provider.initialize(&ctx(env)).await.err().unwrap();
        assert!(matches!(
            err,
            ProviderError::Configuration(ConfigurationError::MissingVariable(ref v)) if v == "TURNKEY_API_KEY"
        ));
    }

    #[tokio::test]
    async fn creates_wallet_with_bearer_auth() {
        let (url, server) = serve_once("200 OK", r#"{"id":"w-42","address":"0xfeed"}"#).await;
        let env = Environment::from_pairs([
            ("PARA_API_URL", format!("{url}/")),
            ("PARA_API_KEY", "secret".to_string()),
            ("PARA_ORGANIZATION_ID", "org-1".to_string()),
        ]);
        let session = RemoteSignerProvider::new("Para", "PARA")
            .initialize(&ctx(env))
            .await
            .unwrap();

        let wallet = session.create_wallet().await.unwrap();
        assert_eq!(wallet.id, "w-42");
        assert_eq!(wallet.address, "0xfeed");
        assert_eq!(wallet.provider, "Para");

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /v1/wallets "));
        assert!(request.contains("authorization: bearer secret"));
        assert!(request.contains("x-organization-id: org-1"));
    }

    #[tokio::test]
    async fn rejected_requests_keep_status() {
        let (url, server) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#).await;
        let env = Environment::from_pairs([("PRIVY_API_URL", url), ("PRIVY_API_KEY", "k".into())]);
        let session = RemoteSignerProvider::new("Privy", "PRIVY")
            .initialize(&ctx(env))
            .await
            .unwrap();
        let wallet = Wallet {
            id: "w-1".to_string(),
            address: "0x1".to_string(),
            provider: "Privy".to_string(),
        };

        match session.sign_message(&wallet, "hi").await {
            Err(ProviderError::Rejected { status, message }) => {
                assert_eq!(status, 429);
                assert!(message.contains("slow down"));
            }
            other => panic!("expected rejection, got {:?}", other.map(|s| s.0)),
        }
        let request = server.await.unwrap();
        assert!(request.contains("/v1/wallets/w-1/sign-message"));
    }

    #[tokio::test]
    async fn wallet_ids_are_escaped_in_the_path() {
        let (url, server) = serve_once("200 OK", r#"{"signature":"0xabc"}"#).await;
        let env = Environment::from_pairs([
            ("PRIVY_API_URL", format!("{url}/gateway/")),
            ("PRIVY_API_KEY", "k".to_string()),
        ]);
        let session = RemoteSignerProvider::new("Privy", "PRIVY")
            .initialize(&ctx(env))
            .await
            .unwrap();
        let wallet = Wallet {
            id: "../admin?x=1".to_string(),
            address: "0x1".to_string(),
            provider: "Privy".to_string(),
        };

        let sig = session.sign_message(&wallet, "hi").await.unwrap();
        assert_eq!(sig.0, "0xabc");

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert_eq!(
            request_line,
            "POST /gateway/v1/wallets/..%2Fadmin%3Fx=1/sign-message HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn unparseable_api_url_is_a_configuration_error() {
        let env = Environment::from_pairs([("PARA_API_URL", "not a url"), ("PARA_API_KEY", "k")]);
        let err = RemoteSignerProvider::new("Para", "PARA")
            .initialize(&ctx(env))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ProviderError::Configuration(ConfigurationError::Invalid { field: "api url", .. })
        ));
    }

    #[tokio::test]
    async fn signs_transaction_payload_as_base64() {
        let (url, server) = serve_once("200 OK", r#"{"signedTransaction":"c2lnbmVk"}"#).await;
        let env = Environment::from_pairs([("PARA_API_URL", url), ("PARA_API_KEY", "k".into())]);
        let session = RemoteSignerProvider::new("Para", "PARA")
            .initialize(&ctx(env))
            .await
            .unwrap();
        let wallet = Wallet {
            id: "w-9".to_string(),
            address: "0x9".to_string(),
            provider: "Para".to_string(),
        };

        let tx = session
            .prepare_transfer(&wallet, &Transfer::default())
            .await
            .unwrap();
        let signed = session.sign_transaction(&wallet, &tx).await.unwrap();
        assert_eq!(signed.0, "c2lnbmVk");

        let request = server.await.unwrap();
        assert!(request.contains(&BASE64.encode(&tx.message)));
    }
}
