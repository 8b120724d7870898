//! Payload resolution
//!
//! Optical codes in the roastery carry either a JSON record (printed by the
//! code generator) or a bare identifier from a supplier's barcode. Resolution
//! never rejects input, it only classifies it:
//!
//! - JSON object with a recognized field -> [`ResolvedRecord::Structured`]
//! - JSON object without one -> fallback tagged `unknown`
//! - anything else, including bare JSON scalars -> fallback tagged `barcode`
//!
//! Numbers keep their original text (`arbitrary_precision`), so ids beyond
//! 2^53, values outside the f64 range and trailing zeros survive resolution.

use crate::models::{FallbackKind, FallbackRecord, ResolvedRecord, StructuredRecord};
use serde_json::Value;

/// Classify decoded text. Total: never fails, never panics.
pub fn resolve(text: &str) -> ResolvedRecord {
    let kind = match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(fields)) => match StructuredRecord::from_object(fields) {
            Some(record) => {
                tracing::debug!(fields = record.fields().len(), "resolved structured record");
                return ResolvedRecord::Structured(record);
            }
            None => FallbackKind::Unknown,
        },
        Ok(_) | Err(_) => FallbackKind::Barcode,
    };

    tracing::debug!(?kind, "resolved fallback record");
    ResolvedRecord::Fallback(FallbackRecord {
        text: text.to_owned(),
        kind,
    })
}
