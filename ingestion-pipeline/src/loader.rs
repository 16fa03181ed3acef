use std::path::Path;

use common::{error::AppError, types::source_document::SourceDocument};
use tracing::debug;

/// Page separator recognized in plain-text sources.
const FORM_FEED: char = '\u{0c}';

/// Reads a source file into an ordered sequence of page documents.
///
/// PDF sources are split along their physical pages; plain-text sources are
/// split on form feeds, with a file containing none treated as a single
/// page. Page order is preserved because downstream chunk numbering and
/// overlap stitching depend on it. No side effects beyond file reads.
pub async fn load_source(path: impl AsRef<Path>) -> Result<Vec<SourceDocument>, AppError> {
    let path = path.as_ref();

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::SourceNotFound(path.display().to_string()));
    }

    let source_id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let is_pdf = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let pages = if is_pdf {
        load_pdf_pages(path).await?
    } else {
        load_text_pages(path).await?
    };

    if pages.iter().all(|page| page.trim().is_empty()) {
        return Err(AppError::SourceParse(format!(
            "{} contains no extractable text",
            path.display()
        )));
    }

    debug!(
        source = %path.display(),
        pages = pages.len(),
        "loaded source document"
    );

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page_index, content)| SourceDocument::new(content, source_id.clone(), page_index))
        .collect())
}

/// Extracts the text layer of every PDF page, keeping the work off the
/// async executor.
async fn load_pdf_pages(path: &Path) -> Result<Vec<String>, AppError> {
    let pdf_bytes = tokio::fs::read(path).await?;

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&pdf_bytes)
    })
    .await?
    .map_err(|err| AppError::SourceParse(format!("failed to extract text from PDF: {err}")))?;

    Ok(pages)
}

async fn load_text_pages(path: &Path) -> Result<Vec<String>, AppError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::InvalidData {
            AppError::SourceParse(format!("{} is not valid UTF-8 text", path.display()))
        } else {
            AppError::Io(err)
        }
    })?;

    Ok(content.split(FORM_FEED).map(str::to_owned).collect())
}
