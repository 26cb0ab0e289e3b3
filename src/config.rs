//! Configuration types for document extraction.
//!
//! Every knob lives in [`ExtractionConfig`], built through
//! [`ExtractionConfigBuilder`]. The API key is part of the config but is
//! supplied per run and never persisted; the `Debug` impl redacts it so a
//! config can be logged safely.

use crate::error::DocExtractError;
use crate::profiles::{DocumentProfile, DocumentType};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for a single extraction run.
///
/// # Example
/// ```rust
/// use edgequake_docextract::{DocumentType, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .document_type(DocumentType::Invoice)
///     .api_key("sk-test")
///     .max_tokens(2048)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Chat-completions URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model identifier sent in the request body. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Bearer credential for the endpoint. Required by [`crate::extract`].
    pub api_key: Option<String>,

    /// Output-length ceiling sent as `max_tokens`. Default: 4096.
    pub max_tokens: usize,

    /// Per-request timeout in seconds. Default: None (transport default).
    pub api_timeout_secs: Option<u64>,

    /// PDF rendering resolution. Range: 72–400. Default: 72 (one pixel per point).
    pub dpi: u32,

    /// Cap on the longest edge of a rendered page, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// JPEG quality for rendered PDF pages (1–100). Default: 90.
    pub jpeg_quality: u8,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Document type whose built-in profile drives the instruction. Default: Purchase Order.
    pub document_type: DocumentType,

    /// Custom profile. Takes precedence over `document_type` when set.
    pub profile: Option<DocumentProfile>,

    /// Row layout used when flattening the result. Default: [`RowLayout::SingleRow`].
    pub layout: RowLayout,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: 4096,
            api_timeout_secs: None,
            dpi: 72,
            max_rendered_pixels: 2000,
            jpeg_quality: 90,
            password: None,
            document_type: DocumentType::default(),
            profile: None,
            layout: RowLayout::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("document_type", &self.document_type)
            .field("profile", &self.profile.as_ref().map(|p| &p.label))
            .field("layout", &self.layout)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The profile in effect: the custom one if set, else the built-in one.
    pub fn effective_profile(&self) -> DocumentProfile {
        self.profile
            .clone()
            .unwrap_or_else(|| self.document_type.profile())
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn document_type(mut self, t: DocumentType) -> Self {
        self.config.document_type = t;
        self
    }

    pub fn profile(mut self, profile: DocumentProfile) -> Self {
        self.config.profile = Some(profile);
        self
    }

    pub fn layout(mut self, layout: RowLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, DocExtractError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(DocExtractError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(DocExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(DocExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if let RowLayout::Explode { key } = &c.layout {
            if key.trim().is_empty() {
                return Err(DocExtractError::InvalidConfig(
                    "explode key must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the extracted JSON is laid out as table rows.
///
/// | Layout | Result |
/// |--------|--------|
/// | `SingleRow` | whole object is one row; list entries become `items.0.x`, `items.1.x` columns |
/// | `Explode { key }` | one row per entry of the array at `key`, parent fields repeated |
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowLayout {
    #[default]
    SingleRow,
    Explode { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_contract() {
        let c = ExtractionConfig::default();
        assert_eq!(c.endpoint, "https://api.openai.com/v1/chat/completions");
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.dpi, 72);
        assert!(c.api_timeout_secs.is_none());
        assert_eq!(c.layout, RowLayout::SingleRow);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = ExtractionConfig::builder()
            .api_key("sk-very-secret")
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn builder_clamps() {
        let c = ExtractionConfig::builder()
            .dpi(10)
            .jpeg_quality(0)
            .max_rendered_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        let err = ExtractionConfig::builder().endpoint("ftp://x").build();
        assert!(matches!(err, Err(DocExtractError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        assert!(ExtractionConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn custom_profile_wins() {
        let mut p = DocumentType::Invoice.profile();
        p.label = "Custom".into();
        let c = ExtractionConfig::builder()
            .document_type(DocumentType::Payslip)
            .profile(p)
            .build()
            .unwrap();
        assert_eq!(c.effective_profile().label, "Custom");
    }
}
