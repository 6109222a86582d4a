use anyhow::{Result, Context};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait DocumentHandler: Send + Sync {
    async fn extract_text(&self, source: &Path) -> Result<String>;
}

pub struct PdfHandler;

#[async_trait]
impl DocumentHandler for PdfHandler {
    /// Extract the concatenated text of all pages, in page order, trimmed.
    async fn extract_text(&self, source: &Path) -> Result<String> {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read PDF file: {}", source.display()))?;

        let text = pdf_extract::extract_text_from_mem(&bytes)
            .with_context(|| format!("Failed to extract text from PDF: {}", source.display()))?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let err = PdfHandler
            .extract_text(Path::new("no_such_file.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no_such_file.pdf"));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.pdf");
        std::fs::write(&path, b"not a pdf document").unwrap();

        assert!(PdfHandler.extract_text(&path).await.is_err());
    }
}
