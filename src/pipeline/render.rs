//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! pdfium keeps thread-local state and is not safe to drive from an async
//! context, so [`render_pdf`] moves the work onto `spawn_blocking`.
//!
//! At the default 72 DPI one PDF point maps to one pixel. `max_rendered_pixels`
//! still caps the longest edge so an oversized page cannot exhaust memory.

use crate::config::ExtractionConfig;
use crate::error::DocExtractError;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable pointing at a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH` (file or directory), the current
/// directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, DocExtractError> {
    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            let path = PathBuf::from(&p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            return Pdfium::bind_to_library(&lib)
                .map(Pdfium::new)
                .map_err(|e| {
                    DocExtractError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
                });
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| DocExtractError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Rasterise all pages of the PDF at `pdf_path`.
///
/// pdfium is bound and the document loaded once. `on_render_start` of the
/// configured progress callback fires with the page count before the first
/// page is rendered. A document without pages is reported as corrupt.
///
/// # Returns
/// Images ordered by page number, starting at page 0; the page count is
/// their length.
pub async fn render_pdf(
    pdf_path: &Path,
    filename: &str,
    config: &ExtractionConfig,
) -> Result<Vec<DynamicImage>, DocExtractError> {
    let path = pdf_path.to_path_buf();
    let name = filename.to_string();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let progress = config.progress_callback.clone();

    tokio::task::spawn_blocking(move || {
        render_pdf_blocking(&path, &name, dpi, max_pixels, password.as_deref(), progress)
    })
    .await
    .map_err(|e| DocExtractError::Internal(format!("Render task panicked: {}", e)))?
}

/// Count pages without rendering.
pub async fn page_count(
    pdf_path: &Path,
    filename: &str,
    password: Option<&str>,
) -> Result<usize, DocExtractError> {
    let path = pdf_path.to_path_buf();
    let name = filename.to_string();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, &name, pwd.as_deref())?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| DocExtractError::Internal(format!("Page-count task panicked: {}", e)))?
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    filename: &str,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, DocExtractError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                DocExtractError::WrongPassword {
                    filename: filename.to_string(),
                }
            } else {
                DocExtractError::PasswordRequired {
                    filename: filename.to_string(),
                }
            }
        } else {
            DocExtractError::CorruptPdf {
                filename: filename.to_string(),
                detail: err_str,
            }
        }
    })
}

/// Blocking implementation of page rendering.
fn render_pdf_blocking(
    pdf_path: &Path,
    filename: &str,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    progress: Option<ProgressCallback>,
) -> Result<Vec<DynamicImage>, DocExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, filename, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if total_pages == 0 {
        return Err(DocExtractError::CorruptPdf {
            filename: filename.to_string(),
            detail: "document has no pages".into(),
        });
    }
    if let Some(ref cb) = progress {
        cb.on_render_start(total_pages);
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocExtractError::RasterisationFailed {
                page: idx,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx, image.width(), image.height());
        images.push(image);
    }

    Ok(images)
}
