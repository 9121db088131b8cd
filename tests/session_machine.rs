use legalease::{
    document::Document,
    error::{ErrorKind, TransportError, ValidationError},
    session::{AnalysisTask, Event, Session, SessionState, Transition},
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn doc() -> Document {
    Document::from_bytes("contract.pdf", "application/pdf", b"%PDF-1.4 test".to_vec())
}

fn session_with_doc() -> Session {
    let mut s = Session::new();
    s.select_document(Some(doc()));
    s
}

fn response(task: AnalysisTask, epoch: u64, payload: serde_json::Value) -> Event {
    Event::Response {
        task,
        epoch,
        outcome: Ok(payload),
    }
}

#[test]
fn submit_requires_document_and_question() {
    let mut s = Session::new();
    assert_eq!(
        s.submit(AnalysisTask::Summarize, None).unwrap_err(),
        ValidationError::NoDocument
    );
    assert_eq!(s.state(AnalysisTask::Summarize), &SessionState::Idle);

    s.select_document(Some(doc()));
    assert_eq!(
        s.submit(AnalysisTask::QuestionAnswering, Some("   ")).unwrap_err(),
        ValidationError::EmptyQuestion
    );
    assert_eq!(
        s.submit(AnalysisTask::QuestionAnswering, None).unwrap_err(),
        ValidationError::EmptyQuestion
    );
    assert_eq!(s.state(AnalysisTask::QuestionAnswering), &SessionState::Idle);
}

#[test]
fn question_only_travels_with_qa() {
    let mut s = session_with_doc();
    let req = s.submit(AnalysisTask::Summarize, Some("ignored")).unwrap();
    assert_eq!(req.question, None);
    let req = s.submit(AnalysisTask::QuestionAnswering, Some("Who pays?")).unwrap();
    assert_eq!(req.question.as_deref(), Some("Who pays?"));
}

#[test]
fn summarize_success() {
    let mut s = session_with_doc();
    let req = s.submit(AnalysisTask::Summarize, None).unwrap();
    assert_eq!(s.state(AnalysisTask::Summarize), &SessionState::Submitting { progress: 0 });

    let t = s.apply(response(
        AnalysisTask::Summarize,
        req.epoch,
        json!({"summary": "Party A must pay within 30 days."}),
    ));
    assert!(matches!(t, Transition::Completed { task: AnalysisTask::Summarize, .. }));
    let result = s.state(AnalysisTask::Summarize).result().unwrap();
    assert_eq!(result.as_summary().unwrap().text, "Party A must pay within 30 days.");
}

#[test]
fn progress_is_monotonic_and_reaches_awaiting() {
    let mut s = session_with_doc();
    let task = AnalysisTask::RiskAnalysis;
    let epoch = s.submit(task, None).unwrap().epoch;
    let progress = |loaded, total| Event::Progress { task, epoch, loaded, total };

    assert_eq!(s.apply(progress(40, Some(100))), Transition::Progress(40));
    assert_eq!(s.apply(progress(10, Some(100))), Transition::Progress(40));
    assert_eq!(s.apply(progress(70, None)), Transition::Ignored);
    assert_eq!(s.state(task), &SessionState::Submitting { progress: 40 });
    assert_eq!(s.apply(progress(100, Some(100))), Transition::AwaitingResponse);
    assert_eq!(s.state(task), &SessionState::AwaitingResponse);
    // Late progress for a request that already finished uploading.
    assert_eq!(s.apply(progress(100, Some(100))), Transition::Ignored);
    assert_eq!(s.apply(Event::BodySent { task, epoch }), Transition::Ignored);
}

#[test]
fn body_sent_moves_to_awaiting() {
    let mut s = session_with_doc();
    let task = AnalysisTask::Summarize;
    let epoch = s.submit(task, None).unwrap().epoch;
    assert_eq!(s.apply(Event::BodySent { task, epoch }), Transition::AwaitingResponse);
}

#[test]
fn transport_failure_keeps_message() {
    let mut s = session_with_doc();
    let task = AnalysisTask::Summarize;
    let epoch = s.submit(task, None).unwrap().epoch;
    let t = s.apply(Event::Response {
        task,
        epoch,
        outcome: Err(TransportError::Status {
            status: 500,
            message: "internal error".into(),
        }),
    });
    assert_eq!(t, Transition::Failed { task });
    let err = s.state(task).error().unwrap();
    assert_eq!(err.message, "internal error");
    assert_eq!(err.kind, ErrorKind::Transport);

    // Other tasks are untouched, and the error stays until the next submit.
    assert_eq!(s.state(AnalysisTask::RiskAnalysis), &SessionState::Idle);
    s.submit(task, None).unwrap();
    assert_eq!(s.state(task), &SessionState::Submitting { progress: 0 });
}

#[test]
fn malformed_payload_fails_as_normalization() {
    let mut s = session_with_doc();
    let task = AnalysisTask::QuestionAnswering;
    let epoch = s.submit(task, Some("q?")).unwrap().epoch;
    s.apply(response(task, epoch, json!("just a string")));
    assert_eq!(s.state(task).error().unwrap().kind, ErrorKind::Normalization);
}

#[test]
fn reset_discards_late_response() {
    let mut s = session_with_doc();
    let task = AnalysisTask::RiskAnalysis;
    let epoch = s.submit(task, None).unwrap().epoch;
    s.reset(task);
    assert_eq!(s.epoch(task), epoch + 1);

    let t = s.apply(response(task, epoch, json!({"risks": []})));
    assert_eq!(t, Transition::Stale);
    assert_eq!(s.state(task), &SessionState::Idle);
}

#[test]
fn resubmit_discards_previous_result_and_stale_events() {
    let mut s = session_with_doc();
    let task = AnalysisTask::Summarize;
    let first = s.submit(task, None).unwrap().epoch;
    s.apply(response(task, first, json!({"summary": "one"})));
    let second = s.submit(task, None).unwrap().epoch;
    assert!(second > first);
    assert!(s.state(task).result().is_none());

    assert_eq!(
        s.apply(Event::Progress { task, epoch: first, loaded: 5, total: Some(10) }),
        Transition::Stale
    );
    s.apply(response(task, second, json!({"summary": "two"})));
    assert_eq!(s.state(task).result().unwrap().as_summary().unwrap().text, "two");
}

#[test]
fn in_flight_task_cannot_resubmit() {
    let mut s = session_with_doc();
    s.submit(AnalysisTask::Summarize, None).unwrap();
    assert_eq!(
        s.submit(AnalysisTask::Summarize, None).unwrap_err(),
        ValidationError::InFlight(AnalysisTask::Summarize)
    );
    // Independent tasks can run side by side.
    assert!(s.submit(AnalysisTask::RiskAnalysis, None).is_ok());
}

#[test]
fn replacing_document_resets_every_task() {
    let mut s = session_with_doc();
    let epoch = s.submit(AnalysisTask::Summarize, None).unwrap().epoch;
    s.apply(response(AnalysisTask::Summarize, epoch, json!({"summary": "x"})));
    s.submit(AnalysisTask::RiskAnalysis, None).unwrap();

    s.select_document(Some(doc()));
    for task in AnalysisTask::ALL {
        assert_eq!(s.state(task), &SessionState::Idle);
    }
}
