use crate::document::Document;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// A temporary on-disk copy of the selected document for external viewers.
/// The file is removed when the handle is released or dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    pub fn create(doc: &Document) -> Result<Self> {
        let suffix = Path::new(doc.name())
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("legalease-preview-")
            .suffix(&suffix)
            .tempfile()
            .with_context(|| "creating preview file")?;
        file.write_all(&doc.bytes())
            .with_context(|| "writing preview file")?;
        file.flush().with_context(|| "flushing preview file")?;
        debug!("preview created {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn release(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .with_context(|| format!("removing preview file: {}", path.display()))?;
        debug!("preview released {}", path.display());
        Ok(())
    }
}
