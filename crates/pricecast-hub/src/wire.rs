//! Server-sent event framing.
//!
//! One frame per update: `data: {json}\n\n`, where `price` is a decimal
//! string and `received_at` is RFC3339 UTC at second precision.

use chrono::SecondsFormat;
use pricecast_core::PriceUpdate;
use serde::Serialize;

use crate::error::SinkError;

#[derive(Serialize)]
struct WireUpdate {
    pair: String,
    price: String,
    received_at: String,
}

impl From<&PriceUpdate> for WireUpdate {
    fn from(update: &PriceUpdate) -> Self {
        Self {
            pair: update.pair().to_string(),
            price: update.price().to_string(),
            received_at: update
                .received_at()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Encode `update` as a complete SSE frame.
pub fn encode_frame(update: &PriceUpdate) -> Result<Vec<u8>, SinkError> {
    let json = serde_json::to_vec(&WireUpdate::from(update))
        .map_err(|e| SinkError::Encode(e.to_string()))?;

    let mut frame = Vec::with_capacity(json.len() + 8);
    frame.extend_from_slice(b"data: ");
    frame.extend_from_slice(&json);
    frame.extend_from_slice(b"\n\n");
    Ok(frame)
}
