//! Code generation and export
//!
//! [`CodeGenerator`] serializes a record to canonical JSON (object keys
//! sorted), hands it to a [`CodeEncoder`] and wraps the returned image in an
//! [`ImageHandle`]. Encoding is delegated; the default encoder calls an HTTP
//! QR image service.

pub mod encoder;
pub mod handle;

pub use encoder::{CodeEncoder, EncodedImage, EncoderError, HttpCodeEncoder};
pub use handle::{ExportError, HtmlFilePrintTarget, ImageHandle, PrintDocument, PrintTarget};

use crate::config::ScanConfig;
use crate::error::{DecodeError, ErrorCode};
use serde::Serialize;
use tracing::{debug, warn};

/// Failures of [`CodeGenerator::generate`]
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The record could not be serialized
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The encoder failed; not retried
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

impl From<GenerateError> for DecodeError {
    fn from(err: GenerateError) -> Self {
        DecodeError::new(ErrorCode::Unknown, err.to_string())
    }
}

/// Canonical JSON text of `record`: compact, object keys sorted at every level
pub fn canonical_payload<T: Serialize + ?Sized>(record: &T) -> Result<String, serde_json::Error> {
    // serde_json::Map is a BTreeMap without `preserve_order`, so going
    // through Value sorts keys.
    let value = serde_json::to_value(record)?;
    serde_json::to_string(&value)
}

/// Produces optical code images for records
#[derive(Debug, Clone)]
pub struct CodeGenerator<E> {
    encoder: E,
    size: u32,
}

impl CodeGenerator<HttpCodeEncoder> {
    /// HTTP generator using `encoder_url` and `code_size` from `config`
    pub fn from_config(config: &ScanConfig) -> Result<Self, EncoderError> {
        Ok(Self::new(
            HttpCodeEncoder::new(&config.encoder_url)?,
            config.code_size,
        ))
    }
}

impl<E: CodeEncoder> CodeGenerator<E> {
    /// Generator producing `size` x `size` images through `encoder`
    pub fn new(encoder: E, size: u32) -> Self {
        Self { encoder, size }
    }

    /// Image edge length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Encode `record` as a code image
    pub async fn generate<T: Serialize + ?Sized>(
        &self,
        record: &T,
    ) -> Result<ImageHandle, GenerateError> {
        let payload = canonical_payload(record)?;
        debug!(bytes = payload.len(), size = self.size, "generating code");

        let image = self
            .encoder
            .encode(&payload, self.size)
            .await
            .inspect_err(|err| warn!("code generation failed: {}", err))?;
        Ok(ImageHandle::new(
            payload,
            image.bytes,
            image.content_type,
            self.size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl CodeEncoder for Recording {
        async fn encode(&self, payload: &str, size: u32) -> Result<EncodedImage, EncoderError> {
            self.calls.lock().unwrap().push((payload.to_owned(), size));
            Ok(EncodedImage {
                bytes: payload.as_bytes().to_vec(),
                content_type: "image/png".into(),
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl CodeEncoder for Failing {
        async fn encode(&self, _: &str, _: u32) -> Result<EncodedImage, EncoderError> {
            Err(EncoderError::Status(500))
        }
    }

    #[test]
    fn canonical_payload_sorts_keys() {
        let record = json!({"name": "Kenya AA", "batchNumber": "B-12", "meta": {"z": 1, "a": 2}});
        assert_eq!(
            canonical_payload(&record).unwrap(),
            r#"{"batchNumber":"B-12","meta":{"a":2,"z":1},"name":"Kenya AA"}"#
        );
    }

    #[tokio::test]
    async fn generate_passes_payload_and_size() {
        let generator = CodeGenerator::new(Recording::default(), 240);
        let handle = generator.generate(&json!({"id": 7})).await.unwrap();

        assert_eq!(handle.payload(), r#"{"id":7}"#);
        assert_eq!(handle.size(), 240);
        assert_eq!(
            *generator.encoder.calls.lock().unwrap(),
            [(r#"{"id":7}"#.to_owned(), 240)]
        );
    }

    #[tokio::test]
    async fn handle_is_reused_without_regenerating() {
        let generator = CodeGenerator::new(Recording::default(), 200);
        let handle = generator.generate(&json!({"id": 1})).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let _ = handle.display();
        handle.download(dir.path(), "one").await.unwrap();
        handle.download(dir.path(), "two").await.unwrap();
        assert_eq!(generator.encoder.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn encoder_failure_is_surfaced() {
        let generator = CodeGenerator::new(Failing, 200);
        let err = generator.generate(&json!({"id": 1})).await.unwrap_err();
        assert!(matches!(err, GenerateError::Encoder(EncoderError::Status(500))));
        assert!(DecodeError::from(err).is(ErrorCode::Unknown));
    }

    #[test]
    fn from_config_rejects_bad_url() {
        let config = ScanConfig {
            encoder_url: "::nope::".into(),
            ..ScanConfig::default()
        };
        assert!(CodeGenerator::from_config(&config).is_err());
    }
}
