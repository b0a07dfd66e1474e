use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use polywatch::chain::{ChainSource, LogFilter, RpcClient};
use polywatch::errors::RpcError;
use polywatch::ingestion::ORDER_FILLED_TOPIC;

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn word(last: u8) -> String {
    format!("0x{}{:02x}", "00".repeat(31), last)
}

async fn fake_node(Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let result = match req["method"].as_str().unwrap_or_default() {
        "eth_chainId" => json!("0x89"),
        "eth_blockNumber" => json!("0x3d0900"),
        "eth_getLogs" => json!([
            {
                "address": "0x4BFB41D5B3570DEFD03C39A9A4D8DE6BD8B8982E",
                "topics": [format!("0x{}", hex::encode(ORDER_FILLED_TOPIC)), word(1), word(2), word(3)],
                "data": "0x",
                "transactionHash": "0xBEEF",
                "blockNumber": "0x3d08ff",
                "logIndex": "0x2",
                "removed": false
            },
            {
                "address": "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e",
                "topics": [],
                "data": "0x",
                "transactionHash": "0xdead",
                "blockNumber": "0x3d08fe",
                "logIndex": "0x0",
                "removed": true
            },
            {
                "address": "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e",
                "topics": [],
                "data": "0x00",
                "transactionHash": "0xcafe",
                "blockNumber": "0x3d08fe",
                "logIndex": "0x7",
                "removed": false
            }
        ]),
        "eth_getBlockByNumber" => json!({
            "number": "0x3d0900",
            "timestamp": "0x65539b80",
            "transactions": ["0xaa", "0xbb"]
        }),
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "method not found"}
            }))
        }
    };
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

#[tokio::test]
async fn test_rpc_client_against_node() {
    let base = spawn_server(Router::new().route("/", post(fake_node))).await;
    let client = RpcClient::new(base, Duration::from_secs(5)).unwrap();

    assert_eq!(client.chain_id().await.unwrap(), 137);
    assert_eq!(client.current_height().await.unwrap(), 4_000_000);

    let filter = LogFilter {
        addresses: vec![polywatch::config::CTF_EXCHANGE.to_string()],
        topic0: vec![ORDER_FILLED_TOPIC],
    };
    let logs = client.get_logs(3_999_998, 4_000_000, &filter).await.unwrap();

    // Removed log dropped; the rest ordered by (block, index).
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].tx_hash, "0xcafe");
    assert_eq!(logs[1].tx_hash, "0xbeef");
    assert_eq!(logs[1].log_index, 2);
    assert_eq!(logs[1].topics[0], ORDER_FILLED_TOPIC);
    assert_eq!(logs[1].address, polywatch::config::CTF_EXCHANGE);

    let block = client.get_block(4_000_000, false).await.unwrap();
    assert_eq!(block.number, 4_000_000);
    assert_eq!(block.timestamp.timestamp(), 0x6553_9b80);
    assert_eq!(block.transaction_hashes.len(), 2);
}

#[tokio::test]
async fn test_forbidden_endpoint_is_not_transient() {
    let router = Router::new().route("/", post(|| async { StatusCode::FORBIDDEN }));
    let base = spawn_server(router).await;
    let client = RpcClient::new(base, Duration::from_secs(5)).unwrap();

    let err = client.chain_id().await.unwrap_err();
    assert!(matches!(err, RpcError::Status(403)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transient() {
    // Nothing listens on port 1.
    let client = RpcClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = client.current_height().await.unwrap_err();
    assert!(err.is_transient());
}
