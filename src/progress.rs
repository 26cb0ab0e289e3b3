//! Progress-callback trait for extraction stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to be told
//! when each pipeline stage starts and finishes. The CLI uses it to drive a
//! spinner; a host application can forward the events wherever it likes.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docextract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl ExtractionProgressCallback for Log {
//!     fn on_pages_encoded(&self, pages: usize, payload_bytes: usize) {
//!         eprintln!("{pages} page(s), {payload_bytes} bytes of base64");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it moves through its stages.
///
/// All methods default to no-ops so implementors only override what they
/// need. Implementations must be `Send + Sync`; `on_render_start` is
/// invoked from the blocking render thread, every other method from the
/// calling task.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Input accepted; `filename` is the declared name, `is_pdf` its kind.
    fn on_input_accepted(&self, filename: &str, is_pdf: bool) {
        let _ = (filename, is_pdf);
    }

    /// Rendering of a PDF is about to start.
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// All payloads are ready.
    ///
    /// * `pages`         — number of image payloads
    /// * `payload_bytes` — total base64 length across payloads
    fn on_pages_encoded(&self, pages: usize, payload_bytes: usize) {
        let _ = (pages, payload_bytes);
    }

    /// The extraction request is about to be sent.
    fn on_request_start(&self, model: &str) {
        let _ = model;
    }

    /// The API answered successfully and the reply parsed.
    fn on_request_complete(&self, duration_ms: u64) {
        let _ = duration_ms;
    }

    /// The run halted with an error.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
