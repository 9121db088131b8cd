use crate::{
    config::Config,
    distribution::RiskDistribution,
    document::Document,
    highlight::PageHighlights,
    history::{HistoryEntry, HistoryLedger},
    session::{AnalysisTask, Session, SessionState},
};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: AnalysisTask,
    pub generated: String,
    pub document: Option<DocumentInfo>,
    pub status: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<CitationPreview>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<PageHighlights>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub media_type: String,
    pub byte_size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub buckets: Vec<Bucket>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub level: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationPreview {
    pub chunk: u64,
    pub preview: String,
}

impl From<&Document> for DocumentInfo {
    fn from(doc: &Document) -> Self {
        Self {
            name: doc.name().to_string(),
            media_type: doc.media_type().to_string(),
            byte_size: doc.byte_size(),
            sha256: doc.fingerprint(),
        }
    }
}

impl From<RiskDistribution> for DistributionReport {
    fn from(d: RiskDistribution) -> Self {
        Self {
            buckets: d
                .buckets()
                .into_iter()
                .map(|(level, count)| Bucket {
                    level: level.to_string(),
                    count,
                })
                .collect(),
            total: d.total(),
        }
    }
}

impl TaskReport {
    pub fn build(
        cfg: &Config,
        session: &Session,
        task: AnalysisTask,
        highlights: Vec<PageHighlights>,
        history: Option<&HistoryLedger>,
    ) -> Self {
        let status = session.state(task).clone();
        let result = status.result();

        let distribution = result
            .and_then(|r| r.as_risks())
            .map(|r| RiskDistribution::from_items(&r.items).into());

        let citations = result
            .and_then(|r| r.as_answer())
            .map(|a| {
                a.citations
                    .iter()
                    .map(|c| CitationPreview {
                        chunk: c.chunk,
                        preview: truncate_preview(&c.snippet, cfg.output.citation_preview_chars),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            task,
            generated: now_rfc3339(),
            document: session.document().map(DocumentInfo::from),
            status,
            distribution,
            citations,
            highlights,
            history: history
                .map(|h| h.entries().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// First `max_chars` characters followed by `...`.
pub fn truncate_preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_counts_chars_not_bytes() {
        assert_eq!(truncate_preview("équipe", 3), "équ...");
        assert_eq!(truncate_preview("ab", 10), "ab...");
    }
}
