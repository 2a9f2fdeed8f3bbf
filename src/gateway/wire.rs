//! Gateway wire protocol.
//!
//! Fixed 64-byte binary frames, little-endian. The same layout carries
//! new-order and cancel requests and the gateway's ack/fill responses.
//!
//! ```text
//! Offset  Size  Field
//! 0       8     client_id
//! 8       8     order_id (0 on new-order requests; assigned in the ack)
//! 16      4     symbol_id
//! 20      4     side (0 = bid, 1 = ask)
//! 24      4     msg_type (0 = new, 1 = cancel, 2 = fill, 3 = ack)
//! 28      4     padding
//! 32      8     price_ticks
//! 40      8     quantity
//! 48      8     ts_ms
//! 56      8     reserved
//! Total: 64 bytes
//! ```

use crate::config;
use crate::types::{Fill, Side};

pub const FRAME_SIZE: usize = 64;

// Field offsets. Encode/decode index through these, so moving or resizing a
// field without fixing the whole layout fails the asserts below.
const OFF_CLIENT_ID: usize = 0;
const OFF_ORDER_ID: usize = OFF_CLIENT_ID + 8;
const OFF_SYMBOL_ID: usize = OFF_ORDER_ID + 8;
const OFF_SIDE: usize = OFF_SYMBOL_ID + 4;
const OFF_MSG_TYPE: usize = OFF_SIDE + 4;
const OFF_PAD: usize = OFF_MSG_TYPE + 4;
const OFF_PRICE_TICKS: usize = OFF_PAD + 4;
const OFF_QUANTITY: usize = OFF_PRICE_TICKS + 8;
const OFF_TS_MS: usize = OFF_QUANTITY + 8;
const OFF_RESERVED: usize = OFF_TS_MS + 8;

// Verify the layout at compile time.
const _: () = assert!(FRAME_SIZE == 64);
const _: () = assert!(OFF_PRICE_TICKS == 32);
const _: () = assert!(OFF_RESERVED + 8 == FRAME_SIZE);

pub const MSG_NEW: u32 = 0;
pub const MSG_CANCEL: u32 = 1;
pub const MSG_FILL: u32 = 2;
pub const MSG_ACK: u32 = 3;

pub const WIRE_BID: u32 = 0;
pub const WIRE_ASK: u32 = 1;

/// Exchange symbol-id table.
pub fn symbol_id(symbol: &str) -> Option<u32> {
    match symbol {
        "XYZ" => Some(1),
        "ETF" => Some(2),
        "ABC" => Some(3),
        "DEF" => Some(4),
        _ => None,
    }
}

pub fn symbol_from_id(id: u32) -> Option<&'static str> {
    match id {
        1 => Some("XYZ"),
        2 => Some("ETF"),
        3 => Some("ABC"),
        4 => Some("DEF"),
        _ => None,
    }
}

/// Dollars to on-wire integer ticks (cents).
#[inline]
pub fn price_to_ticks(price: f64) -> i64 {
    (price * config::ORDER_PRICE_SCALE).round() as i64
}

#[inline]
pub fn ticks_to_price(ticks: i64) -> f64 {
    ticks as f64 / config::ORDER_PRICE_SCALE
}

/// One decoded (or to-be-encoded) gateway frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayFrame {
    pub client_id: u64,
    pub order_id: u64,
    pub symbol_id: u32,
    pub side: u32,
    pub msg_type: u32,
    pub price_ticks: i64,
    pub quantity: i64,
    pub ts_ms: i64,
}

impl GatewayFrame {
    pub fn new_order(client_id: u64, symbol_id: u32, side: Side, price_ticks: i64, quantity: i64, ts_ms: i64) -> Self {
        Self {
            client_id,
            order_id: 0,
            symbol_id,
            side: wire_side(side),
            msg_type: MSG_NEW,
            price_ticks,
            quantity,
            ts_ms,
        }
    }

    pub fn cancel(client_id: u64, order_id: u64, symbol_id: u32, ts_ms: i64) -> Self {
        Self {
            client_id,
            order_id,
            symbol_id,
            side: WIRE_BID,
            msg_type: MSG_CANCEL,
            price_ticks: 0,
            quantity: 0,
            ts_ms,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[OFF_CLIENT_ID..OFF_CLIENT_ID + 8].copy_from_slice(&self.client_id.to_le_bytes());
        buf[OFF_ORDER_ID..OFF_ORDER_ID + 8].copy_from_slice(&self.order_id.to_le_bytes());
        buf[OFF_SYMBOL_ID..OFF_SYMBOL_ID + 4].copy_from_slice(&self.symbol_id.to_le_bytes());
        buf[OFF_SIDE..OFF_SIDE + 4].copy_from_slice(&self.side.to_le_bytes());
        buf[OFF_MSG_TYPE..OFF_MSG_TYPE + 4].copy_from_slice(&self.msg_type.to_le_bytes());
        buf[OFF_PRICE_TICKS..OFF_PRICE_TICKS + 8].copy_from_slice(&self.price_ticks.to_le_bytes());
        buf[OFF_QUANTITY..OFF_QUANTITY + 8].copy_from_slice(&self.quantity.to_le_bytes());
        buf[OFF_TS_MS..OFF_TS_MS + 8].copy_from_slice(&self.ts_ms.to_le_bytes());
        buf
    }

    /// Decode a frame; None for short buffers or unknown message types.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != FRAME_SIZE {
            return None;
        }
        let msg_type = u32::from_le_bytes(buf[OFF_MSG_TYPE..OFF_MSG_TYPE + 4].try_into().ok()?);
        if msg_type > MSG_ACK {
            return None;
        }
        Some(Self {
            client_id: u64::from_le_bytes(buf[OFF_CLIENT_ID..OFF_CLIENT_ID + 8].try_into().ok()?),
            order_id: u64::from_le_bytes(buf[OFF_ORDER_ID..OFF_ORDER_ID + 8].try_into().ok()?),
            symbol_id: u32::from_le_bytes(buf[OFF_SYMBOL_ID..OFF_SYMBOL_ID + 4].try_into().ok()?),
            side: u32::from_le_bytes(buf[OFF_SIDE..OFF_SIDE + 4].try_into().ok()?),
            msg_type,
            price_ticks: i64::from_le_bytes(
                buf[OFF_PRICE_TICKS..OFF_PRICE_TICKS + 8].try_into().ok()?,
            ),
            quantity: i64::from_le_bytes(buf[OFF_QUANTITY..OFF_QUANTITY + 8].try_into().ok()?),
            ts_ms: i64::from_le_bytes(buf[OFF_TS_MS..OFF_TS_MS + 8].try_into().ok()?),
        })
    }

    /// Interpret a response frame as an execution, if it is one.
    /// Unknown symbols and non-positive quantities are dropped.
    pub fn as_fill(&self) -> Option<Fill> {
        if self.msg_type != MSG_FILL {
            return None;
        }
        let symbol = symbol_from_id(self.symbol_id)?;
        let size = self.quantity.abs();
        if size <= 0 {
            return None;
        }
        Some(Fill {
            symbol,
            side: side_from_wire(self.side)?,
            size,
            price: ticks_to_price(self.price_ticks),
        })
    }
}

#[inline]
pub fn wire_side(side: Side) -> u32 {
    match side {
        Side::Bid => WIRE_BID,
        Side::Ask => WIRE_ASK,
    }
}

#[inline]
pub fn side_from_wire(side: u32) -> Option<Side> {
    match side {
        WIRE_BID => Some(Side::Bid),
        WIRE_ASK => Some(Side::Ask),
        _ => None,
    }
}
