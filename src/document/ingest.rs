use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, info};

use super::{PageUnit, UploadedDocument};
use crate::providers::traits::DocumentLoader;

/// Writes the upload to a fresh temporary file, runs the loader over it and
/// removes the file again whether or not loading succeeded.
pub async fn ingest_document(
    document: &UploadedDocument,
    loader: &dyn DocumentLoader,
) -> Result<Vec<PageUnit>> {
    let mut tmp_file = tempfile::Builder::new()
        .prefix("docqa-")
        .suffix(".pdf")
        .tempfile()
        .context("Failed to create temporary file")?;

    // An early return here drops `tmp_file`, which unlinks it.
    tmp_file
        .write_all(document.bytes())
        .context("Failed to write uploaded document to disk")?;
    tmp_file
        .flush()
        .context("Failed to write uploaded document to disk")?;

    debug!(
        "Wrote {} bytes of '{}' to {}",
        document.len(),
        document.file_name(),
        tmp_file.path().display()
    );

    let loaded = loader
        .load_and_split(tmp_file.path(), document.file_name())
        .await;

    let removed = tmp_file
        .close()
        .context("Failed to remove temporary document file");

    let pages = loaded?;
    removed?;

    info!(
        "Loaded {} page units from '{}'",
        pages.len(),
        document.file_name()
    );
    Ok(pages)
}
