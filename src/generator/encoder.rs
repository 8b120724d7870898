//! Image encoders for generated codes

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Encoded image returned by a [`CodeEncoder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
}

/// Failures of an encoder call
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The request never completed
    #[error("encoder request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint URL could not be parsed
    #[error("invalid encoder endpoint: {0}")]
    InvalidEndpoint(String),

    /// The service answered with a non-success status
    #[error("encoder returned HTTP {0}")]
    Status(u16),

    /// The service answered with no image data
    #[error("encoder returned an empty image")]
    EmptyImage,
}

/// Turns a text payload into an optical code image
#[async_trait]
pub trait CodeEncoder: Send + Sync {
    /// Encode `payload` as a `size` x `size` pixel image
    async fn encode(&self, payload: &str, size: u32) -> Result<EncodedImage, EncoderError>;
}

#[async_trait]
impl<E: CodeEncoder + ?Sized> CodeEncoder for std::sync::Arc<E> {
    async fn encode(&self, payload: &str, size: u32) -> Result<EncodedImage, EncoderError> {
        (**self).encode(payload, size).await
    }
}

/// Encoder backed by a QR image service (`GET endpoint?size=NxN&data=...`)
#[derive(Debug, Clone)]
pub struct HttpCodeEncoder {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCodeEncoder {
    /// Encoder for the service at `endpoint`
    pub fn new(endpoint: &str) -> Result<Self, EncoderError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| EncoderError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Request URL for one payload
    pub fn request_url(&self, payload: &str, size: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("size", &format!("{size}x{size}"))
            .append_pair("data", payload);
        url
    }
}

#[async_trait]
impl CodeEncoder for HttpCodeEncoder {
    async fn encode(&self, payload: &str, size: u32) -> Result<EncodedImage, EncoderError> {
        let url = self.request_url(payload, size);
        debug!(host = ?url.host_str(), size, "requesting code image");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EncoderError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_owned())
            .unwrap_or_else(|| "image/png".to_owned());
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(EncoderError::EmptyImage);
        }

        Ok(EncodedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one HTTP response and report the request line
    async fn one_shot_server(
        status: &'static str,
        content_type: &'static str,
        body: &'static [u8],
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&request);
            let line = text.lines().next().unwrap_or_default().to_owned();
            let _ = tx.send(line);

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (format!("http://{addr}/v1/create-qr-code/"), rx)
    }

    #[test]
    fn request_url_encodes_payload() {
        let encoder = HttpCodeEncoder::new("https://codes.example/v1/create/").unwrap();
        let url = encoder.request_url(r#"{"id":7,"name":"Kenya AA"}"#, 150);
        assert_eq!(url.path(), "/v1/create/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("size".into(), "150x150".into()));
        assert_eq!(pairs[1], ("data".into(), r#"{"id":7,"name":"Kenya AA"}"#.into()));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        assert!(matches!(
            HttpCodeEncoder::new("not a url"),
            Err(EncoderError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn fetches_image_from_service() {
        let (endpoint, request) = one_shot_server("200 OK", "image/png", b"\x89PNGfake").await;
        let encoder = HttpCodeEncoder::new(&endpoint).unwrap();

        let image = encoder.encode("B-12", 200).await.unwrap();
        assert_eq!(image.bytes, b"\x89PNGfake");
        assert_eq!(image.content_type, "image/png");

        let line = request.await.unwrap();
        assert!(line.starts_with("GET /v1/create-qr-code/?"));
        assert!(line.contains("size=200x200"));
        assert!(line.contains("data=B-12"));
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let (endpoint, _request) =
            one_shot_server("503 Service Unavailable", "text/plain", b"busy").await;
        let encoder = HttpCodeEncoder::new(&endpoint).unwrap();
        let err = encoder.encode("x", 200).await.unwrap_err();
        assert!(matches!(err, EncoderError::Status(503)));
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let (endpoint, _request) = one_shot_server("200 OK", "image/png", b"").await;
        let encoder = HttpCodeEncoder::new(&endpoint).unwrap();
        let err = encoder.encode("x", 200).await.unwrap_err();
        assert!(matches!(err, EncoderError::EmptyImage));
    }
}
