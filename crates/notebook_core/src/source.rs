use std::fmt;
use std::path::Path;

use url::Url;

/// A user-supplied source to be processed.
#[derive(Clone, PartialEq, Eq)]
pub enum SourcePayload {
    File { name: String, bytes: Vec<u8> },
    Url(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("pasted text is empty")]
    EmptyText,
    #[error("file is empty")]
    EmptyFile,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl SourcePayload {
    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SourceError> {
        if bytes.is_empty() {
            return Err(SourceError::EmptyFile);
        }
        Ok(SourcePayload::File {
            name: name.into(),
            bytes,
        })
    }

    /// Trims and validates a web address; only http(s) is accepted.
    pub fn url(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        let parsed = Url::parse(trimmed).map_err(|err| SourceError::InvalidUrl(err.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(SourcePayload::Url(trimmed.to_string())),
            other => Err(SourceError::InvalidUrl(format!("unsupported scheme {other}"))),
        }
    }

    pub fn text(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SourceError::EmptyText);
        }
        Ok(SourcePayload::Text(trimmed.to_string()))
    }

    pub fn document_name(&self) -> String {
        match self {
            SourcePayload::File { name, .. } => name.clone(),
            SourcePayload::Url(_) => "Website Content".to_string(),
            SourcePayload::Text(_) => "Pasted Text".to_string(),
        }
    }

    /// Short type label, e.g. `PDF` for `report.pdf`.
    pub fn document_type(&self) -> String {
        match self {
            SourcePayload::File { name, .. } => Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| !ext.is_empty())
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| "Document".to_string()),
            SourcePayload::Url(_) => "Website".to_string(),
            SourcePayload::Text(_) => "Text".to_string(),
        }
    }
}

// File bytes are elided to keep logs and assertion output readable.
impl fmt::Debug for SourcePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePayload::File { name, bytes } => f
                .debug_struct("File")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            SourcePayload::Url(url) => f.debug_tuple("Url").field(url).finish(),
            SourcePayload::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
        }
    }
}
