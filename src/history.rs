use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}

/// Prior Q&A exchanges, most recent first. Entries are only ever added at the
/// front or dropped all at once.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    marker: Option<PathBuf>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger backed by a session marker file, loaded if it already exists.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading history: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing history: {}", path.display()))?
        } else {
            VecDeque::new()
        };
        Ok(Self {
            entries,
            marker: Some(path.to_path_buf()),
        })
    }

    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push_front(HistoryEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn marker(&self) -> Option<&Path> {
        self.marker.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.marker else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.entries)?)
            .with_context(|| format!("writing history: {}", path.display()))
    }

    /// Empties the ledger and removes its marker file.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if let Some(path) = &self.marker {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("history marker removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("removing history: {}", path.display()));
                }
            }
        }
        Ok(())
    }
}
