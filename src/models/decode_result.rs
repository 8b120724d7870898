use serde::{Deserialize, Serialize};

/// Format tag reported by the built-in QR decoder
pub const QR_CODE_FORMAT: &str = "QR_CODE";

/// One successfully decoded optical code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    /// Decoded payload text
    pub text: String,
    /// Symbology the payload was read from (`QR_CODE`, `EAN_13`, ...)
    pub format: String,
}

impl DecodeResult {
    /// Create a result for any symbology
    pub fn new(text: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: format.into(),
        }
    }

    /// Create a QR code result
    pub fn qr(text: impl Into<String>) -> Self {
        Self::new(text, QR_CODE_FORMAT)
    }
}
