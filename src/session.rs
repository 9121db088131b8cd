use crate::{
    document::Document,
    error::{ErrorInfo, TransportError, ValidationError},
    normalize::{self, AnalysisResult},
    progress::UploadProgress,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTask {
    Summarize,
    RiskAnalysis,
    QuestionAnswering,
}

impl AnalysisTask {
    pub const ALL: [AnalysisTask; 3] = [
        AnalysisTask::Summarize,
        AnalysisTask::RiskAnalysis,
        AnalysisTask::QuestionAnswering,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            AnalysisTask::Summarize => "/summarize",
            AnalysisTask::RiskAnalysis => "/risks",
            AnalysisTask::QuestionAnswering => "/qa",
        }
    }

    pub fn requires_question(self) -> bool {
        matches!(self, AnalysisTask::QuestionAnswering)
    }

    fn index(self) -> usize {
        match self {
            AnalysisTask::Summarize => 0,
            AnalysisTask::RiskAnalysis => 1,
            AnalysisTask::QuestionAnswering => 2,
        }
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisTask::Summarize => "summarize",
            AnalysisTask::RiskAnalysis => "risk analysis",
            AnalysisTask::QuestionAnswering => "question answering",
        })
    }
}

/// One submission, handed to the transport exactly once.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub task: AnalysisTask,
    pub epoch: u64,
    pub document: Document,
    pub question: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Submitting {
        progress: u8,
    },
    AwaitingResponse,
    Completed {
        result: AnalysisResult,
    },
    Failed {
        error: ErrorInfo,
    },
}

impl SessionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionState::Submitting { .. } | SessionState::AwaitingResponse
        )
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SessionState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            SessionState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Inputs to [`Session::apply`]. Every event carries the epoch of the
/// submission it belongs to.
#[derive(Debug, Clone)]
pub enum Event {
    Progress {
        task: AnalysisTask,
        epoch: u64,
        loaded: u64,
        total: Option<u64>,
    },
    BodySent {
        task: AnalysisTask,
        epoch: u64,
    },
    Response {
        task: AnalysisTask,
        epoch: u64,
        outcome: Result<serde_json::Value, TransportError>,
    },
}

impl Event {
    pub fn task(&self) -> AnalysisTask {
        match self {
            Event::Progress { task, .. }
            | Event::BodySent { task, .. }
            | Event::Response { task, .. } => *task,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Event::Progress { epoch, .. }
            | Event::BodySent { epoch, .. }
            | Event::Response { epoch, .. } => *epoch,
        }
    }
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The event belongs to an abandoned or superseded submission.
    Stale,
    /// Current submission, but nothing to change in the present state.
    Ignored,
    Progress(u8),
    AwaitingResponse,
    Completed {
        task: AnalysisTask,
        question: Option<String>,
    },
    Failed {
        task: AnalysisTask,
    },
}

#[derive(Debug, Default)]
struct TaskSlot {
    state: SessionState,
    epoch: u64,
    progress: UploadProgress,
    question: Option<String>,
}

impl TaskSlot {
    fn invalidate(&mut self) {
        self.epoch += 1;
        self.state = SessionState::Idle;
        self.progress.reset();
        self.question = None;
    }
}

/// Per-task lifecycle: Idle, Submitting, AwaitingResponse, Completed, Failed.
///
/// Tasks never share state. Each submit or reset bumps the task's epoch, and
/// any event tagged with an older epoch is discarded.
#[derive(Debug, Default)]
pub struct Session {
    document: Option<Document>,
    slots: [TaskSlot; 3],
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Replacing or clearing the document resets every task.
    pub fn select_document(&mut self, document: Option<Document>) {
        debug!(?document, "select document");
        self.document = document;
        for slot in &mut self.slots {
            slot.invalidate();
        }
    }

    pub fn state(&self, task: AnalysisTask) -> &SessionState {
        &self.slots[task.index()].state
    }

    pub fn epoch(&self, task: AnalysisTask) -> u64 {
        self.slots[task.index()].epoch
    }

    pub fn validate(&self, task: AnalysisTask, question: Option<&str>) -> Result<(), ValidationError> {
        if self.document.is_none() {
            return Err(ValidationError::NoDocument);
        }
        if task.requires_question() && question.is_none_or(|q| q.trim().is_empty()) {
            return Err(ValidationError::EmptyQuestion);
        }
        if self.state(task).is_in_flight() {
            return Err(ValidationError::InFlight(task));
        }
        Ok(())
    }

    /// Starts a new submission. On a validation error nothing changes.
    pub fn submit(
        &mut self,
        task: AnalysisTask,
        question: Option<&str>,
    ) -> Result<AnalysisRequest, ValidationError> {
        self.validate(task, question)?;
        let document = self.document.clone().ok_or(ValidationError::NoDocument)?;
        let question = question
            .filter(|_| task.requires_question())
            .map(str::to_string);

        let slot = &mut self.slots[task.index()];
        slot.invalidate();
        slot.state = SessionState::Submitting { progress: 0 };
        slot.question = question.clone();
        info!("{task} submitted epoch={} document={}", slot.epoch, document.name());

        Ok(AnalysisRequest {
            task,
            epoch: slot.epoch,
            document,
            question,
        })
    }

    /// Abandons whatever the task was doing and returns it to Idle.
    pub fn reset(&mut self, task: AnalysisTask) {
        let slot = &mut self.slots[task.index()];
        slot.invalidate();
        debug!("{task} reset epoch={}", slot.epoch);
    }

    pub fn apply(&mut self, event: Event) -> Transition {
        let task = event.task();
        let slot = &mut self.slots[task.index()];
        if event.epoch() != slot.epoch {
            debug!(
                "{task} discarding stale event epoch={} current={}",
                event.epoch(),
                slot.epoch
            );
            return Transition::Stale;
        }

        match event {
            Event::Progress { loaded, total, .. } => {
                if !matches!(slot.state, SessionState::Submitting { .. }) {
                    return Transition::Ignored;
                }
                match slot.progress.observe(loaded, total) {
                    None => Transition::Ignored,
                    Some(100) => {
                        slot.state = SessionState::AwaitingResponse;
                        Transition::AwaitingResponse
                    }
                    Some(pct) => {
                        slot.state = SessionState::Submitting { progress: pct };
                        Transition::Progress(pct)
                    }
                }
            }
            Event::BodySent { .. } => {
                if !matches!(slot.state, SessionState::Submitting { .. }) {
                    return Transition::Ignored;
                }
                slot.state = SessionState::AwaitingResponse;
                Transition::AwaitingResponse
            }
            Event::Response { outcome, .. } => {
                if !slot.state.is_in_flight() {
                    return Transition::Ignored;
                }
                let normalized = match outcome {
                    Ok(payload) => {
                        normalize::normalize(task, &payload).map_err(|e| ErrorInfo::from(&e))
                    }
                    Err(e) => Err(ErrorInfo::from(&e)),
                };
                let question = slot.question.take();
                match normalized {
                    Ok(result) => {
                        info!("{task} completed epoch={}", slot.epoch);
                        slot.state = SessionState::Completed { result };
                        Transition::Completed { task, question }
                    }
                    Err(error) => {
                        warn!("{task} failed epoch={}: {}", slot.epoch, error.message);
                        slot.state = SessionState::Failed { error };
                        Transition::Failed { task }
                    }
                }
            }
        }
    }
}
