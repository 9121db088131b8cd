use crate::config::Config;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// A piece of a text run, either plain or marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub marked: bool,
}

/// Matcher output for one run. Joining the fragments of a `Split` run gives
/// back the original text exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RunHighlight {
    Unchanged(String),
    Split(Vec<Fragment>),
}

impl RunHighlight {
    pub fn is_marked(&self) -> bool {
        matches!(self, RunHighlight::Split(_))
    }

    pub fn text(&self) -> String {
        match self {
            RunHighlight::Unchanged(s) => s.clone(),
            RunHighlight::Split(parts) => parts.iter().map(|p| p.text.as_str()).collect(),
        }
    }
}

/// Byte range of a match inside a run, with the candidate term it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub page: usize,
    pub run: usize,
    pub start: usize,
    pub end: usize,
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHighlights {
    pub page: usize,
    pub runs: Vec<RunHighlight>,
    pub spans: Vec<HighlightSpan>,
}

/// Terms shorter than this never anchor a highlight, whatever the config says.
pub const MIN_TERM_CHARS: usize = 3;
/// Upper bound on terms in one pattern, whatever the config says.
pub const MAX_TERMS: usize = 20;

/// Trims, drops blanks and short anchors, then keeps the first `max_terms`.
/// Terms are otherwise used verbatim.
pub fn candidate_terms<I, S>(cfg: &Config, terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let min_chars = cfg.highlight.min_term_chars.max(MIN_TERM_CHARS);
    let max_terms = cfg.highlight.max_terms.min(MAX_TERMS);
    terms
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| t.chars().count() >= min_chars)
        .take(max_terms)
        .collect()
}

/// Case-insensitive literal matcher over a bounded set of terms.
#[derive(Debug, Clone)]
pub struct HighlightMatcher {
    terms: Vec<String>,
    pattern: Option<Regex>,
}

impl HighlightMatcher {
    /// Leaves every run unchanged.
    pub fn identity() -> Self {
        Self {
            terms: Vec::new(),
            pattern: None,
        }
    }

    pub fn new<I, S>(cfg: &Config, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = candidate_terms(cfg, terms);
        if terms.is_empty() {
            return Ok(Self::identity());
        }
        // One capture group per term so a match can name its term.
        let alternation = terms
            .iter()
            .map(|t| format!("({})", regex::escape(t)))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .size_limit(cfg.highlight.regex_size_limit)
            .build()
            .with_context(|| format!("building highlight pattern over {} terms", terms.len()))?;
        Ok(Self {
            terms,
            pattern: Some(pattern),
        })
    }

    /// Like [`new`](Self::new), but a pattern that cannot be built degrades
    /// to [`identity`](Self::identity) with a warning.
    pub fn or_identity<I, S>(cfg: &Config, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(cfg, terms).unwrap_or_else(|err| {
            warn!("highlighting disabled: {err:#}");
            Self::identity()
        })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_noop(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn split_run(&self, run: &str) -> RunHighlight {
        let Some(re) = &self.pattern else {
            return RunHighlight::Unchanged(run.to_string());
        };

        let mut fragments = Vec::new();
        let mut last = 0;
        for m in re.find_iter(run) {
            if m.start() > last {
                fragments.push(Fragment {
                    text: run[last..m.start()].to_string(),
                    marked: false,
                });
            }
            fragments.push(Fragment {
                text: m.as_str().to_string(),
                marked: true,
            });
            last = m.end();
        }

        if fragments.is_empty() {
            return RunHighlight::Unchanged(run.to_string());
        }
        if last < run.len() {
            fragments.push(Fragment {
                text: run[last..].to_string(),
                marked: false,
            });
        }
        RunHighlight::Split(fragments)
    }

    pub fn spans(&self, page: usize, run_index: usize, run: &str) -> Vec<HighlightSpan> {
        let Some(re) = &self.pattern else {
            return Vec::new();
        };
        re.captures_iter(run)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let term = (1..caps.len()).find(|i| caps.get(*i).is_some())?;
                Some(HighlightSpan {
                    page,
                    run: run_index,
                    start: whole.start(),
                    end: whole.end(),
                    term: self.terms[term - 1].clone(),
                })
            })
            .collect()
    }

    /// Runs every page through the matcher. Pages are numbered from 1.
    pub fn highlight_pages<S: AsRef<str>>(&self, pages: &[Vec<S>]) -> Vec<PageHighlights> {
        pages
            .iter()
            .enumerate()
            .map(|(i, runs)| {
                let page = i + 1;
                let spans = runs
                    .iter()
                    .enumerate()
                    .flat_map(|(r, run)| self.spans(page, r, run.as_ref()))
                    .collect();
                PageHighlights {
                    page,
                    runs: runs.iter().map(|run| self.split_run(run.as_ref())).collect(),
                    spans,
                }
            })
            .collect()
    }
}

/// Reads rendered text runs: a JSON array of pages, each an array of strings.
pub fn load_pages(path: &Path) -> Result<Vec<Vec<String>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading text runs: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing text runs (expected [[string]]): {}", path.display()))
}
