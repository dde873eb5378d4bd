//! Tendermint / CometBFT JSON-RPC broadcaster.

use crate::{AuditError, AuditSink, Event, EventsTx, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: BroadcastParams<'a>,
}

#[derive(Debug, Serialize)]
struct BroadcastParams<'a> {
    tx: &'a str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<BroadcastResult>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    check_tx: TxResult,
    #[serde(alias = "tx_result")]
    deliver_tx: TxResult,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    height: String,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
}

/// Broadcasts events to a consensus node with `broadcast_tx_commit`.
#[derive(Debug)]
pub struct TendermintClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl TendermintClient {
    /// Creates a client for the RPC endpoint at `endpoint`.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/');
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the RPC endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn broadcast(&self, tx: &[u8]) -> Result<BroadcastResult> {
        let encoded = STANDARD.encode(tx);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "broadcast_tx_commit",
            params: BroadcastParams { tx: &encoded },
        };

        let body = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()?
            .bytes()?;
        parse_response(&body)
    }
}

fn parse_response(body: &[u8]) -> Result<BroadcastResult> {
    let response: RpcResponse = serde_json::from_slice(body)?;

    if let Some(error) = response.error {
        let message = match error.data {
            Some(data) if !data.is_empty() => format!("{}: {}", error.message, data),
            _ => error.message,
        };
        return Err(AuditError::Rpc {
            code: error.code,
            message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| AuditError::Malformed("missing result".to_string()))?;

    if result.check_tx.code != 0 {
        return Err(AuditError::Rejected {
            stage: "check_tx",
            code: result.check_tx.code,
            log: result.check_tx.log,
        });
    }
    if result.deliver_tx.code != 0 {
        return Err(AuditError::Rejected {
            stage: "deliver_tx",
            code: result.deliver_tx.code,
            log: result.deliver_tx.log,
        });
    }
    Ok(result)
}

impl AuditSink for TendermintClient {
    fn record(&self, event: &Event) -> Result<()> {
        let tx = EventsTx::single(event.clone()).to_bytes()?;
        tracing::debug!(id = %event.id, kind = %event.kind, "Sending event transaction");

        let result = self.broadcast(&tx)?;
        tracing::info!(
            hash = %result.hash,
            height = %result.height,
            kind = %event.kind,
            "Event committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "broadcast_tx_commit",
            params: BroadcastParams { tx: "e30=" },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "broadcast_tx_commit",
                "params": {"tx": "e30="}
            })
        );
    }

    #[test]
    fn test_committed_response() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{
            "check_tx":{"code":0,"log":""},
            "deliver_tx":{"code":0,"log":""},
            "hash":"ABCD","height":"12"}}"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.hash, "ABCD");
        assert_eq!(result.height, "12");
    }

    #[test]
    fn test_tx_result_alias() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{
            "check_tx":{"code":0},"tx_result":{"code":5,"log":"bad event"},
            "hash":"ABCD","height":"12"}}"#;
        match parse_response(body) {
            Err(AuditError::Rejected { stage, code, log }) => {
                assert_eq!(stage, "deliver_tx");
                assert_eq!(code, 5);
                assert_eq!(log, "bad event");
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.hash)),
        }
    }

    #[test]
    fn test_check_tx_rejection() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{
            "check_tx":{"code":2,"log":"invalid"},"deliver_tx":{}}}"#;
        assert!(matches!(
            parse_response(body),
            Err(AuditError::Rejected {
                stage: "check_tx",
                ..
            })
        ));
    }

    #[test]
    fn test_rpc_error() {
        let body = br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error","data":"tx already exists in cache"}}"#;
        match parse_response(body) {
            Err(AuditError::Rpc { code, message }) => {
                assert_eq!(code, -32603);
                assert_eq!(message, "Internal error: tx already exists in cache");
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.hash)),
        }
    }

    #[test]
    fn test_empty_response_is_malformed() {
        assert!(matches!(
            parse_response(br#"{"jsonrpc":"2.0","id":1}"#),
            Err(AuditError::Malformed(_))
        ));
    }

    /// Serves `result` as the reply to every broadcast and records `event`.
    async fn record_against(result: serde_json::Value, event: Event) -> (MockServer, Result<()>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(
                json!({"jsonrpc": "2.0", "method": "broadcast_tx_commit"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let outcome = tokio::task::spawn_blocking(move || {
            let client = TendermintClient::new(&uri, Some(Duration::from_secs(5))).unwrap();
            client.record(&event)
        })
        .await
        .unwrap();
        (server, outcome)
    }

    #[tokio::test]
    async fn test_record_sends_base64_events_tx() {
        let event = Event::repository_initialized();
        let (server, outcome) = record_against(
            json!({"check_tx": {"code": 0}, "deliver_tx": {"code": 0}, "hash": "AB", "height": "3"}),
            event.clone(),
        )
        .await;
        outcome.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let tx = STANDARD
            .decode(body["params"]["tx"].as_str().unwrap())
            .unwrap();
        let decoded: EventsTx = serde_json::from_slice(&tx).unwrap();
        assert_eq!(decoded, EventsTx::single(event));
    }

    #[tokio::test]
    async fn test_record_fails_on_check_tx_rejection() {
        let (_server, outcome) = record_against(
            json!({"check_tx": {"code": 3, "log": "unknown event"}, "deliver_tx": {"code": 0}}),
            Event::repository_initialized(),
        )
        .await;
        assert!(matches!(
            outcome,
            Err(AuditError::Rejected { stage: "check_tx", code: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_record_fails_on_deliver_tx_rejection() {
        let (_server, outcome) = record_against(
            json!({"check_tx": {"code": 0}, "deliver_tx": {"code": 7, "log": "duplicate"}}),
            Event::repository_initialized(),
        )
        .await;
        assert!(matches!(
            outcome,
            Err(AuditError::Rejected { stage: "deliver_tx", code: 7, .. })
        ));
    }

    #[test]
    fn test_endpoint_normalization() {
        let client = TendermintClient::new("127.0.0.1:26657/", None).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:26657");
    }
}
