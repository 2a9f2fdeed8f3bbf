//! Exchange gateway client.
//!
//! Owns the TCP session to the order gateway: token handshake on connect, a
//! background task that decodes 64-byte response frames, ack routing for
//! order-id assignment, and a fill subscriber registry. Implements the
//! [`OrderTransport`](super::OrderTransport) capability the ladder manager
//! drives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};

use crate::gateway::wire::{self, GatewayFrame, FRAME_SIZE, MSG_ACK, MSG_FILL};
use crate::gateway::OrderTransport;
use crate::types::{Fill, OrderInfo, OrderLevel};

pub type FillCallback = Box<dyn Fn(Fill) + Send + Sync>;

/// State shared between the request side and the response-reader task.
struct Shared {
    /// client_id → waiting placer; resolved by the matching ack frame.
    pending_acks: StdMutex<HashMap<u64, oneshot::Sender<u64>>>,
    fill_subscribers: StdMutex<Vec<FillCallback>>,
    /// order_id → client_id, required by the cancel frame.
    order_clients: StdMutex<HashMap<u64, u64>>,
    /// order_id → symbol_id, required by the cancel frame.
    order_symbols: StdMutex<HashMap<u64, u32>>,
}

pub struct ExchangeClient {
    writer: Mutex<OwnedWriteHalf>,
    next_client_id: AtomicU64,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeClient").finish_non_exhaustive()
    }
}

impl ExchangeClient {
    /// Connect and perform the newline-terminated team-token handshake.
    /// An empty token is refused before touching the network.
    pub async fn connect(addr: &str, team_token: &str) -> Result<Self, String> {
        if team_token.is_empty() {
            return Err("team token is required (set DELTA_TOKEN)".to_string());
        }

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| format!("gateway connect {}: {}", addr, e))?;
        stream.set_nodelay(true).ok();
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(format!("{}\n", team_token).as_bytes())
            .await
            .map_err(|e| format!("gateway handshake: {}", e))?;

        let shared = Arc::new(Shared {
            pending_acks: StdMutex::new(HashMap::new()),
            fill_subscribers: StdMutex::new(Vec::new()),
            order_clients: StdMutex::new(HashMap::new()),
            order_symbols: StdMutex::new(HashMap::new()),
        });

        tokio::spawn(read_responses(reader, shared.clone()));
        eprintln!("[GW] Connected to gateway at {}", addr);

        Ok(Self {
            writer: Mutex::new(writer),
            next_client_id: AtomicU64::new(1),
            shared,
        })
    }

    /// Register a fill subscriber. Callbacks run on the reader task and must
    /// not block; a subscriber that cannot take a fill logs and is skipped.
    pub fn subscribe_fills(&self, callback: FillCallback) {
        self.shared.fill_subscribers.lock().unwrap().push(callback);
    }

    async fn send_frame(&self, frame: &GatewayFrame) -> Result<(), String> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame.encode())
            .await
            .map_err(|e| format!("gateway write: {}", e))
    }
}

#[async_trait]
impl OrderTransport for ExchangeClient {
    async fn place_order(&self, level: &OrderLevel) -> Result<OrderInfo, String> {
        let symbol_id = wire::symbol_id(level.symbol)
            .ok_or_else(|| format!("unknown symbol {}", level.symbol))?;
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let now_ms = chrono::Utc::now().timestamp_millis();

        let (ack_tx, ack_rx) = oneshot::channel();
        self.shared
            .pending_acks
            .lock()
            .unwrap()
            .insert(client_id, ack_tx);

        let frame = GatewayFrame::new_order(
            client_id,
            symbol_id,
            level.side,
            wire::price_to_ticks(level.price),
            level.size,
            now_ms,
        );
        if let Err(e) = self.send_frame(&frame).await {
            self.shared.pending_acks.lock().unwrap().remove(&client_id);
            return Err(e);
        }

        let order_id = ack_rx
            .await
            .map_err(|_| "gateway closed before ack".to_string())?;

        self.shared.order_clients.lock().unwrap().insert(order_id, client_id);
        self.shared.order_symbols.lock().unwrap().insert(order_id, symbol_id);

        Ok(OrderInfo {
            symbol: level.symbol,
            side: level.side,
            level_index: level.level_index,
            price: level.price,
            size: level.size,
            order_id,
            placed_ms: now_ms,
        })
    }

    async fn cancel_order(&self, info: &OrderInfo) -> Result<(), String> {
        let client_id = self
            .shared
            .order_clients
            .lock()
            .unwrap()
            .remove(&info.order_id)
            .unwrap_or(info.order_id);
        let symbol_id = self
            .shared
            .order_symbols
            .lock()
            .unwrap()
            .remove(&info.order_id)
            .or_else(|| wire::symbol_id(info.symbol))
            .unwrap_or(0);

        let frame = GatewayFrame::cancel(
            client_id,
            info.order_id,
            symbol_id,
            chrono::Utc::now().timestamp_millis(),
        );
        self.send_frame(&frame).await
    }
}

/// Reader task: decode response frames, resolve acks, dispatch fills.
/// Malformed frames are dropped. On disconnect, pending placers error out.
async fn read_responses(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    let mut buf = [0u8; FRAME_SIZE];
    loop {
        match reader.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                eprintln!("[GW] Gateway closed connection");
                break;
            }
            Err(e) => {
                eprintln!("[GW] Gateway read error: {}", e);
                break;
            }
        }

        let frame = match GatewayFrame::decode(&buf) {
            Some(f) => f,
            None => {
                eprintln!("[GW] Dropping undecodable response frame");
                continue;
            }
        };

        match frame.msg_type {
            MSG_ACK => {
                let waiter = shared.pending_acks.lock().unwrap().remove(&frame.client_id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(frame.order_id);
                    }
                    None => {
                        eprintln!("[GW] Ack for unknown client_id {}", frame.client_id);
                    }
                }
            }
            MSG_FILL => {
                if let Some(fill) = frame.as_fill() {
                    let subscribers = shared.fill_subscribers.lock().unwrap();
                    for callback in subscribers.iter() {
                        callback(fill);
                    }
                }
            }
            _ => {}
        }
    }
    // Fail any placer still waiting on an ack.
    shared.pending_acks.lock().unwrap().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Fake gateway: accepts one client, consumes the token line, acks every
    /// new order with sequential order ids, and records cancels. The queued
    /// response frames are flushed right after the first ack so subscribers
    /// registered before any order traffic are guaranteed to see them.
    async fn fake_gateway(
        listener: TcpListener,
        mut extra_responses: Vec<GatewayFrame>,
        cancel_tx: mpsc::UnboundedSender<GatewayFrame>,
    ) {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = tokio::io::BufReader::new(reader);

        let mut token = String::new();
        reader.read_line(&mut token).await.unwrap();
        assert!(!token.trim().is_empty());

        let mut next_order_id = 1000u64;
        let mut buf = [0u8; FRAME_SIZE];
        while reader.read_exact(&mut buf).await.is_ok() {
            let frame = GatewayFrame::decode(&buf).unwrap();
            match frame.msg_type {
                wire::MSG_NEW => {
                    let ack = GatewayFrame {
                        order_id: next_order_id,
                        msg_type: MSG_ACK,
                        ..frame
                    };
                    next_order_id += 1;
                    writer.write_all(&ack.encode()).await.unwrap();
                    for extra in extra_responses.drain(..) {
                        writer.write_all(&extra.encode()).await.unwrap();
                    }
                }
                wire::MSG_CANCEL => {
                    cancel_tx.send(frame).unwrap();
                }
                _ => {}
            }
        }
    }

    fn level(symbol: &'static str, side: Side, price: f64, size: i64) -> OrderLevel {
        OrderLevel {
            symbol,
            side,
            level_index: 0,
            price,
            size,
        }
    }

    /// Scenario: place two orders against a fake gateway, then cancel the first.
    /// Expected: sequential exchange order ids come back through the ack path,
    /// and the cancel frame carries the original client_id and symbol_id.
    #[tokio::test]
    async fn test_place_ack_and_cancel_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (cancel_tx, mut cancel_rx) = mpsc::unbounded_channel();
        tokio::spawn(fake_gateway(listener, vec![], cancel_tx));

        let client = ExchangeClient::connect(&addr, "test-token").await.unwrap();
        let first = client
            .place_order(&level("ETF", Side::Bid, 99.73, 400))
            .await
            .unwrap();
        let second = client
            .place_order(&level("XYZ", Side::Ask, 50.27, 600))
            .await
            .unwrap();
        assert_eq!(first.order_id, 1000);
        assert_eq!(second.order_id, 1001);

        client.cancel_order(&first).await.unwrap();
        let cancel = cancel_rx.recv().await.unwrap();
        assert_eq!(cancel.order_id, 1000);
        assert_eq!(cancel.client_id, 1);
        assert_eq!(cancel.symbol_id, wire::symbol_id("ETF").unwrap());
    }

    /// Scenario: after the first placed order, the gateway pushes one garbage
    /// fill frame (unknown symbol) and one valid fill frame.
    /// Expected: the registered subscriber receives exactly the decoded fill.
    #[tokio::test]
    async fn test_fill_dispatch_to_subscriber() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (cancel_tx, _cancel_rx) = mpsc::unbounded_channel();

        let fill_frame = GatewayFrame {
            client_id: 0,
            order_id: 77,
            symbol_id: wire::symbol_id("ABC").unwrap(),
            side: wire::WIRE_ASK,
            msg_type: MSG_FILL,
            price_ticks: 2_012,
            quantity: 25,
            ts_ms: 0,
        };
        let garbage = GatewayFrame {
            symbol_id: 99, // unknown symbol → dropped
            ..fill_frame
        };
        tokio::spawn(fake_gateway(listener, vec![garbage, fill_frame], cancel_tx));

        let client = ExchangeClient::connect(&addr, "test-token").await.unwrap();
        let (fill_tx, mut fill_rx) = mpsc::unbounded_channel();
        client.subscribe_fills(Box::new(move |fill| {
            if fill_tx.send(fill).is_err() {
                eprintln!("[GW] Fill subscriber gone, dropping fill");
            }
        }));

        client
            .place_order(&level("ABC", Side::Ask, 20.12, 25))
            .await
            .unwrap();

        let fill = fill_rx.recv().await.unwrap();
        assert_eq!(fill.symbol, "ABC");
        assert_eq!(fill.side, Side::Ask);
        assert_eq!(fill.size, 25);
        assert!((fill.price - 20.12).abs() < 1e-12);
        assert!(fill_rx.try_recv().is_err(), "garbage frame must not dispatch");
    }

    /// Scenario: construct a client with an empty team token.
    /// Expected: refused before any connection attempt.
    #[tokio::test]
    async fn test_empty_token_is_fatal() {
        let err = ExchangeClient::connect("127.0.0.1:1", "").await.unwrap_err();
        assert!(err.contains("token"), "unexpected error: {}", err);
    }
}
