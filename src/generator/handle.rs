//! Generated image handle and its export actions

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DEFAULT_FILE_STEM: &str = "qr-code";

/// Failures of an export action
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing the image or document failed
    #[error("export failed: {0}")]
    Io(#[from] io::Error),

    /// The print target refused the document
    #[error("print failed: {0}")]
    Print(String),
}

#[derive(Debug)]
struct HandleInner {
    payload: String,
    bytes: Vec<u8>,
    content_type: String,
    size: u32,
}

/// Immutable generated code image
///
/// Cheap to clone. Display, download and print all read the same bytes.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    inner: Arc<HandleInner>,
}

impl ImageHandle {
    pub(crate) fn new(payload: String, bytes: Vec<u8>, content_type: String, size: u32) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                payload,
                bytes,
                content_type,
                size,
            }),
        }
    }

    /// Canonical JSON text encoded in the image
    pub fn payload(&self) -> &str {
        &self.inner.payload
    }

    /// Raw image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    /// MIME type of the image
    pub fn content_type(&self) -> &str {
        &self.inner.content_type
    }

    /// Requested edge length in pixels
    pub fn size(&self) -> u32 {
        self.inner.size
    }

    /// `data:` URI suitable for an `<img src>`
    pub fn display(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.inner.content_type,
            STANDARD.encode(&self.inner.bytes)
        )
    }

    /// File extension matching the content type
    pub fn extension(&self) -> &'static str {
        match self.inner.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            "image/bmp" => "bmp",
            _ => "png",
        }
    }

    /// Write the image into `dir` and return the written path.
    ///
    /// `suggested_name` is reduced to a safe file stem; the extension comes
    /// from the content type.
    pub async fn download(&self, dir: &Path, suggested_name: &str) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "{}.{}",
            sanitize_file_stem(suggested_name),
            self.extension()
        ));
        tokio::fs::write(&path, &self.inner.bytes).await?;
        info!(path = %path.display(), bytes = self.inner.bytes.len(), "code image saved");
        Ok(path)
    }

    /// Printable HTML page holding the image under `title`
    pub fn print_document(&self, title: &str) -> PrintDocument {
        let title = escape_html(title);
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <style>body{{text-align:center;font-family:sans-serif}}img{{width:{size}px;height:{size}px}}</style>\n\
             </head>\n<body onload=\"window.print()\">\n<h1>{title}</h1>\n<img src=\"{src}\" alt=\"{title}\">\n</body>\n</html>\n",
            size = self.inner.size,
            src = self.display(),
        );
        PrintDocument { title, html }
    }

    /// Render a printable page and hand it to `target`
    pub async fn print<T>(&self, target: &mut T, title: &str) -> Result<(), ExportError>
    where
        T: PrintTarget + ?Sized,
    {
        let document = self.print_document(title);
        target.print(&document).await
    }
}

/// HTML page handed to a [`PrintTarget`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDocument {
    /// HTML-escaped page title
    pub title: String,
    /// Complete HTML document
    pub html: String,
}

/// Destination for printable documents
#[async_trait]
pub trait PrintTarget: Send {
    /// Accept one document
    async fn print(&mut self, document: &PrintDocument) -> Result<(), ExportError>;
}

/// Writes printable documents to an HTML file for the OS to open and print
#[derive(Debug, Clone)]
pub struct HtmlFilePrintTarget {
    path: PathBuf,
}

impl HtmlFilePrintTarget {
    /// Write documents to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PrintTarget for HtmlFilePrintTarget {
    async fn print(&mut self, document: &PrintDocument) -> Result<(), ExportError> {
        tokio::fs::write(&self.path, document.html.as_bytes()).await?;
        info!(path = %self.path.display(), "printable page written");
        Ok(())
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem = Path::new(name.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        DEFAULT_FILE_STEM.to_owned()
    } else {
        cleaned.to_owned()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
