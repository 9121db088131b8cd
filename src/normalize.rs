use crate::{error::NormalizationError, session::AnalysisTask};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Summary(SummaryResult),
    Risks(RiskResult),
    Answer(AnswerResult),
}

impl AnalysisResult {
    pub fn task(&self) -> AnalysisTask {
        match self {
            AnalysisResult::Summary(_) => AnalysisTask::Summarize,
            AnalysisResult::Risks(_) => AnalysisTask::RiskAnalysis,
            AnalysisResult::Answer(_) => AnalysisTask::QuestionAnswering,
        }
    }

    pub fn as_summary(&self) -> Option<&SummaryResult> {
        match self {
            AnalysisResult::Summary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_risks(&self) -> Option<&RiskResult> {
        match self {
            AnalysisResult::Risks(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_answer(&self) -> Option<&AnswerResult> {
        match self {
            AnalysisResult::Answer(a) => Some(a),
            _ => None,
        }
    }

    /// Fragments of source text this result points back to, in result order.
    pub fn source_fragments(&self) -> Vec<&str> {
        match self {
            AnalysisResult::Summary(_) => Vec::new(),
            AnalysisResult::Risks(r) => r.items.iter().map(|i| i.clause.as_str()).collect(),
            AnalysisResult::Answer(a) => a.citations.iter().map(|c| c.snippet.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResult {
    pub items: Vec<RiskItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub clause: String,
    pub level: RiskLevel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub chunk: u64,
    pub snippet: String,
}

/// Risk levels the service is documented to return. Anything else is kept
/// verbatim in `Other` for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Other(String),
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        if t.eq_ignore_ascii_case("LOW") {
            RiskLevel::Low
        } else if t.eq_ignore_ascii_case("MEDIUM") {
            RiskLevel::Medium
        } else if t.eq_ignore_ascii_case("HIGH") {
            RiskLevel::High
        } else {
            RiskLevel::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Other(s) => s,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RiskLevel {
    fn from(s: String) -> Self {
        RiskLevel::parse(&s)
    }
}

impl From<RiskLevel> for String {
    fn from(level: RiskLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Turns a raw success payload into the result shape for `task`.
///
/// Only a non-object payload or a top-level field of the wrong kind is an
/// error. Missing text becomes `""`, missing lists become empty, and list
/// entries are kept one-for-one in service order.
pub fn normalize(task: AnalysisTask, payload: &Value) -> Result<AnalysisResult, NormalizationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| NormalizationError::NotAnObject {
            task,
            found: json_kind(payload),
        })?;

    match task {
        AnalysisTask::Summarize => Ok(AnalysisResult::Summary(SummaryResult {
            text: text_field(task, obj, "summary")?,
        })),
        AnalysisTask::RiskAnalysis => {
            let items = list_field(task, obj, "risks")?
                .iter()
                .map(risk_item)
                .collect();
            Ok(AnalysisResult::Risks(RiskResult { items }))
        }
        AnalysisTask::QuestionAnswering => {
            let text = text_field(task, obj, "answer")?;
            let citations = list_field(task, obj, "citations")?
                .iter()
                .map(citation)
                .collect();
            Ok(AnalysisResult::Answer(AnswerResult { text, citations }))
        }
    }
}

fn text_field(
    task: AnalysisTask,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<String, NormalizationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(NormalizationError::FieldType {
            task,
            field,
            found: json_kind(other),
        }),
    }
}

const NO_ITEMS: &[Value] = &[];

fn list_field<'a>(
    task: AnalysisTask,
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a [Value], NormalizationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(NO_ITEMS),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(NormalizationError::FieldType {
            task,
            field,
            found: json_kind(other),
        }),
    }
}

fn risk_item(v: &Value) -> RiskItem {
    match v {
        Value::Object(o) => RiskItem {
            clause: loose_text(o.get("clause")),
            level: RiskLevel::parse(&loose_text(o.get("risk_level"))),
            reason: loose_text(o.get("reason")),
        },
        other => RiskItem {
            clause: loose_text(Some(other)),
            level: RiskLevel::Other(String::new()),
            reason: String::new(),
        },
    }
}

fn citation(v: &Value) -> Citation {
    match v {
        Value::Object(o) => Citation {
            chunk: o.get("chunk").and_then(Value::as_u64).unwrap_or(0),
            snippet: loose_text(o.get("snippet")),
        },
        other => Citation {
            chunk: 0,
            snippet: loose_text(Some(other)),
        },
    }
}

fn loose_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
