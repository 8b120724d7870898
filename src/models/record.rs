use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names that mark a decoded JSON object as a domain record
pub const RECOGNIZED_FIELDS: [&str; 3] = ["name", "batchNumber", "id"];

/// A decoded payload interpreted as a domain object
///
/// Every field of the original object is kept, recognized or not; the form
/// layer decides which ones it maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StructuredRecord {
    fields: Map<String, Value>,
}

impl StructuredRecord {
    /// Wrap a JSON object. Returns `None` unless it carries a recognized field.
    pub fn from_object(fields: Map<String, Value>) -> Option<Self> {
        let recognized = RECOGNIZED_FIELDS
            .iter()
            .any(|key| fields.get(*key).is_some_and(|v| !v.is_null()));
        recognized.then_some(Self { fields })
    }

    /// Record name, when it is a string
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Batch number, when it is a string
    pub fn batch_number(&self) -> Option<&str> {
        self.fields.get("batchNumber").and_then(Value::as_str)
    }

    /// Record id; numeric ids are returned as JSON numbers
    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id").filter(|v| !v.is_null())
    }

    /// Any field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields in key order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the record, returning its fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Canonical JSON payload (sorted keys, compact)
    pub fn to_payload(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// Coarse classification of a payload that is not a domain record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackKind {
    /// Valid JSON object without recognized fields
    Unknown,
    /// Not a JSON object; treated as a bare identifier
    Barcode,
}

impl FallbackKind {
    /// Wire name (`unknown` / `barcode`)
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackKind::Unknown => "unknown",
            FallbackKind::Barcode => "barcode",
        }
    }
}

/// A payload kept as raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRecord {
    /// Decoded text, unmodified
    pub text: String,
    /// Classification
    #[serde(rename = "type")]
    pub kind: FallbackKind,
}

/// Outcome of resolving decoded text, exactly one variant per resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedRecord {
    /// Interpreted as a domain object
    Structured(StructuredRecord),
    /// Kept as raw text
    Fallback(FallbackRecord),
}

impl ResolvedRecord {
    /// The structured record, if any
    pub fn as_structured(&self) -> Option<&StructuredRecord> {
        match self {
            ResolvedRecord::Structured(record) => Some(record),
            ResolvedRecord::Fallback(_) => None,
        }
    }

    /// The fallback record, if any
    pub fn as_fallback(&self) -> Option<&FallbackRecord> {
        match self {
            ResolvedRecord::Structured(_) => None,
            ResolvedRecord::Fallback(record) => Some(record),
        }
    }

    /// Key a caller can look an existing record up by.
    ///
    /// Structured records prefer the batch number, then the id, then the
    /// name. Fallback records use their raw text.
    pub fn lookup_key(&self) -> Option<String> {
        match self {
            ResolvedRecord::Structured(record) => record
                .batch_number()
                .map(str::to_owned)
                .or_else(|| {
                    record.id().map(|id| match id {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .or_else(|| record.name().map(str::to_owned)),
            ResolvedRecord::Fallback(record) => Some(record.text.clone()),
        }
    }
}
