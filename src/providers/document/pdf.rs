use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

use crate::document::{PageUnit, RecursiveCharacterSplitter};
use crate::providers::traits::DocumentLoader;

/// Loads a PDF page by page with `pdf-extract` and splits each page's text.
#[derive(Debug, Clone, Default)]
pub struct PdfLoader {
    splitter: RecursiveCharacterSplitter,
}

impl PdfLoader {
    pub fn new(splitter: RecursiveCharacterSplitter) -> Self {
        Self { splitter }
    }

    /// Splits already-extracted page texts into units. Page numbers are
    /// zero-based and refer to the page the text came from.
    pub fn split_pages(&self, pages: &[String], source: &str) -> Vec<PageUnit> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(page, text)| {
                self.splitter
                    .split_text(text)
                    .into_iter()
                    .map(move |chunk| PageUnit::new(chunk, source, page as u32))
            })
            .collect()
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load_and_split(&self, path: &Path, source: &str) -> Result<Vec<PageUnit>> {
        let owned: PathBuf = path.to_path_buf();

        // pdf-extract is synchronous and panics on some malformed files; the
        // blocking task turns a panic into a JoinError.
        let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
            .await
            .map_err(|e| anyhow!("PDF parser crashed: {}", e))?
            .map_err(|e| anyhow!("Failed to read PDF: {}", e))?;

        debug!("Extracted {} pages from {}", pages.len(), path.display());

        Ok(self.split_pages(&pages, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_pages_keeps_page_numbers() {
        let loader = PdfLoader::default();
        let pages = vec![
            "Refunds are issued within 30 days.".to_string(),
            "   ".to_string(),
            "Shipping takes 5 business days.".to_string(),
        ];

        let units = loader.split_pages(&pages, "policy.pdf");

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].metadata.page, 0);
        assert_eq!(units[1].metadata.page, 2);
        assert!(units.iter().all(|u| u.metadata.source == "policy.pdf"));
    }

    #[test]
    fn test_long_page_is_split_into_several_units() {
        let loader = PdfLoader::new(RecursiveCharacterSplitter::new(100, 20));
        let pages = vec!["lorem ipsum ".repeat(50)];

        let units = loader.split_pages(&pages, "long.pdf");

        assert!(units.len() > 1);
        assert!(units.iter().all(|u| u.metadata.page == 0));
    }

    #[tokio::test]
    async fn test_malformed_pdf_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a pdf").unwrap();

        let result = PdfLoader::default().load_and_split(file.path(), "bad.pdf").await;

        assert!(result.is_err());
    }
}
