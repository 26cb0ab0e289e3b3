//! Pipeline stages for document extraction.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ reply
//! (file)   (pdfium,   (base64)   (POST)  (JSON)
//!           PDF only)
//! ```
//!
//! 1. [`input`]  — extension check, read bytes, scoped temp file for PDFs
//! 2. [`render`] — rasterise every PDF page; runs in `spawn_blocking`
//! 3. [`encode`] — base64 payloads (raw bytes for images, JPEG for pages)
//! 4. [`llm`]    — one chat-completions request, no retry
//! 5. [`reply`]  — locate and parse the JSON value in the completion text

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod reply;
