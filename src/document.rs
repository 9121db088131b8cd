use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// An uploaded contract. Immutable once constructed; clones share the bytes.
#[derive(Clone)]
pub struct Document {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl Document {
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn load(cfg: &Config, path: &Path) -> Result<Self> {
        validate_input(cfg, path)?;

        let size = std::fs::metadata(path)
            .with_context(|| format!("stat input: {}", path.display()))?
            .len();
        if size > cfg.limits.max_upload_bytes {
            return Err(anyhow!(
                "input exceeds max_upload_bytes ({} > {}): {}",
                size,
                cfg.limits.max_upload_bytes,
                path.display()
            ));
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("reading input: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        Ok(Self::from_bytes(name, media_type_for(path), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// SHA-256 of the content, lowercase hex.
    pub fn fingerprint(&self) -> String {
        let mut h = Sha256::new();
        h.update(&self.bytes);
        format!("{:x}", h.finalize())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("byte_size", &self.bytes.len())
            .finish()
    }
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.is_file() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            if !cfg
                .limits
                .accepted_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&ext))
            {
                return Err(anyhow!(
                    "unsupported file type .{ext} (accepted: {}): {}",
                    cfg.limits.accepted_extensions.join(", "),
                    input.display()
                ));
            }
        }
        None => warn!("input has no extension; sending as-is: {}", input.display()),
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
