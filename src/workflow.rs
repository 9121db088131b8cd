use crate::{
    config::Config,
    document::Document,
    error::{TransportError, ValidationError},
    highlight::{HighlightMatcher, PageHighlights},
    history::HistoryLedger,
    preview::PreviewHandle,
    session::{AnalysisTask, Event, Session, SessionState, Transition},
    transport::{ProgressSink, Transport},
};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default extra time allowed past the transport timeout before giving up locally.
pub const WAIT_GRACE: Duration = Duration::from_secs(5);

/// Drives a [`Session`] against a [`Transport`].
///
/// Requests run on worker threads that only post events; the workbench owner
/// applies them in arrival order, so all state changes happen on one thread.
pub struct Workbench<T: Transport + 'static> {
    cfg: Config,
    transport: Arc<T>,
    session: Session,
    history: HistoryLedger,
    preview: Option<PreviewHandle>,
    wait_grace: Duration,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl<T: Transport + 'static> Workbench<T> {
    pub fn new(cfg: &Config, transport: T, history: HistoryLedger) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            cfg: cfg.clone(),
            transport: Arc::new(transport),
            session: Session::new(),
            history,
            preview: None,
            wait_grace: WAIT_GRACE,
            tx,
            rx,
        }
    }

    pub fn with_wait_grace(mut self, grace: Duration) -> Self {
        self.wait_grace = grace;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self, task: AnalysisTask) -> &SessionState {
        self.session.state(task)
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryLedger {
        &mut self.history
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Selects, replaces or clears the document. All task state is reset and
    /// any open preview is released.
    pub fn select_document(&mut self, document: Option<Document>) -> Result<()> {
        self.close_preview()?;
        self.session.select_document(document);
        Ok(())
    }

    pub fn open_preview(&mut self) -> Result<Option<&Path>> {
        let Some(doc) = self.session.document() else {
            return Ok(None);
        };
        if self.preview.is_none() {
            self.preview = Some(PreviewHandle::create(doc)?);
        }
        Ok(self.preview.as_ref().map(PreviewHandle::path))
    }

    pub fn close_preview(&mut self) -> Result<()> {
        match self.preview.take() {
            Some(handle) => handle.release(),
            None => Ok(()),
        }
    }

    /// Validates and dispatches a request, returning its epoch.
    pub fn submit(
        &mut self,
        task: AnalysisTask,
        question: Option<&str>,
    ) -> Result<u64, ValidationError> {
        let req = self.session.submit(task, question)?;
        let epoch = req.epoch;
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();

        std::thread::spawn(move || {
            let sink = ProgressSink::new(tx.clone(), req.task, req.epoch);
            let outcome = transport.send(&req, sink);
            let _ = tx.send(Event::Response {
                task: req.task,
                epoch: req.epoch,
                outcome,
            });
        });

        Ok(epoch)
    }

    pub fn reset(&mut self, task: AnalysisTask) {
        self.session.reset(task);
    }

    pub fn apply(&mut self, event: Event) -> Transition {
        let transition = self.session.apply(event);
        match &transition {
            Transition::Progress(pct) => info!("Uploading: {pct}%"),
            Transition::AwaitingResponse => info!("Uploaded; awaiting analysis"),
            Transition::Completed {
                task: AnalysisTask::QuestionAnswering,
                question: Some(question),
            } => {
                let answer = self
                    .session
                    .state(AnalysisTask::QuestionAnswering)
                    .result()
                    .and_then(|r| r.as_answer())
                    .map(|a| a.text.clone())
                    .unwrap_or_default();
                self.history.append(question.clone(), answer);
                debug!("history entries={}", self.history.len());
            }
            _ => {}
        }
        transition
    }

    /// Applies every event already queued without blocking.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Blocks for the next event and applies it.
    pub fn next_event(&mut self) -> Option<Transition> {
        let event = self.rx.recv().ok()?;
        Some(self.apply(event))
    }

    /// Processes events until `task` leaves flight. If the transport has a
    /// timeout and nothing arrives within it (plus grace), the task fails
    /// with a timeout error; the late response is then discarded as stale.
    pub fn wait(&mut self, task: AnalysisTask) -> &SessionState {
        let limit = self.transport.timeout();
        let deadline = limit.map(|t| Instant::now() + t + self.wait_grace);

        while self.session.state(task).is_in_flight() {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.rx.recv_timeout(remaining)
                }
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(event) => {
                    self.apply(event);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("{task} gave up waiting for a response");
                    let epoch = self.session.epoch(task);
                    self.apply(Event::Response {
                        task,
                        epoch,
                        outcome: Err(TransportError::Timeout(limit.unwrap_or_default())),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.session.state(task)
    }

    pub fn run(
        &mut self,
        task: AnalysisTask,
        question: Option<&str>,
    ) -> Result<&SessionState, ValidationError> {
        self.submit(task, question)?;
        Ok(self.wait(task))
    }

    /// Asks each question in order, stopping at the first failed answer.
    /// The history ledger is saved before returning, also when a question is
    /// rejected, so answers already received are never lost.
    pub fn ask_all<Q: AsRef<str>>(&mut self, questions: &[Q]) -> Result<&SessionState> {
        let task = AnalysisTask::QuestionAnswering;
        let mut rejected = None;
        for question in questions {
            match self.run(task, Some(question.as_ref())) {
                Ok(state) if state.error().is_some() => break,
                Ok(_) => {}
                Err(err) => {
                    rejected = Some(err);
                    break;
                }
            }
        }
        self.history.save().with_context(|| "saving question history")?;
        match rejected {
            Some(err) => Err(err.into()),
            None => Ok(self.session.state(task)),
        }
    }

    /// Highlights for the current result of `task` over rendered pages.
    /// Tasks without a result, and summaries, leave every run unchanged, as
    /// does a pattern too large to build.
    pub fn highlights<S: AsRef<str>>(
        &self,
        task: AnalysisTask,
        pages: &[Vec<S>],
    ) -> Vec<PageHighlights> {
        if pages.is_empty() {
            return Vec::new();
        }
        let fragments = self
            .session
            .state(task)
            .result()
            .map(|r| r.source_fragments())
            .unwrap_or_default();
        HighlightMatcher::or_identity(&self.cfg, fragments).highlight_pages(pages)
    }
}
