pub mod http;

use crate::{
    error::TransportError,
    session::{AnalysisRequest, AnalysisTask, Event},
};
use std::sync::mpsc::Sender;
use std::time::Duration;

pub use http::{HttpTransport, decode_response, error_message};

/// Binding to the remote analysis service.
pub trait Transport: Send + Sync {
    /// Upper bound on a single request, if the transport enforces one.
    fn timeout(&self) -> Option<Duration>;
    fn health(&self) -> Result<serde_json::Value, TransportError>;
    /// Sends one request and returns the raw success payload. Upload progress
    /// and the body-sent signal go to `progress` while the call is running.
    fn send(
        &self,
        req: &AnalysisRequest,
        progress: ProgressSink,
    ) -> Result<serde_json::Value, TransportError>;
}

/// Posts transfer events for one submission back to the session owner.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Sender<Event>,
    task: AnalysisTask,
    epoch: u64,
}

impl ProgressSink {
    pub fn new(tx: Sender<Event>, task: AnalysisTask, epoch: u64) -> Self {
        Self { tx, task, epoch }
    }

    pub fn bytes(&self, loaded: u64, total: Option<u64>) {
        // A closed receiver means the owner is gone; nothing left to notify.
        let _ = self.tx.send(Event::Progress {
            task: self.task,
            epoch: self.epoch,
            loaded,
            total,
        });
    }

    pub fn body_sent(&self) {
        let _ = self.tx.send(Event::BodySent {
            task: self.task,
            epoch: self.epoch,
        });
    }
}
