use legalease::{
    config::Config,
    document::Document,
    history::HistoryLedger,
    session::AnalysisTask,
    transport::{HttpTransport, Transport},
    workflow::Workbench,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// Serves one canned response and hands back the raw request it received.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://{addr}"), handle)
}

fn read_request(stream: &mut impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let have = buf.len() - (end + 4);
            let done = match body_len {
                Some(n) => have >= n,
                None if head.starts_with("get ") => true,
                None => buf.ends_with(b"--\r\n") || buf.ends_with(b"0\r\n\r\n"),
            };
            if done {
                return buf;
            }
        }
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn config_for(base: &str) -> Config {
    let mut cfg = Config::default();
    cfg.service.base_url = base.to_string();
    cfg.service.timeout_seconds = 10;
    cfg
}

#[test]
fn health_returns_payload() {
    let (base, server) = serve_once("200 OK", r#"{"status":"ok"}"#);
    let transport = HttpTransport::new(&config_for(&base)).unwrap();
    let v = transport.health().unwrap();
    assert_eq!(v["status"], "ok");
    let request = server.join().unwrap();
    assert!(request.starts_with("GET /health "));
}

#[test]
fn server_error_detail_becomes_failed_state() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"detail":"internal error"}"#);
    let cfg = config_for(&base);
    let mut wb = Workbench::new(&cfg, HttpTransport::new(&cfg).unwrap(), HistoryLedger::new());
    wb.select_document(Some(Document::from_bytes(
        "contract.pdf",
        "application/pdf",
        b"%PDF-1.4 tiny".to_vec(),
    )))
    .unwrap();

    let state = wb.run(AnalysisTask::Summarize, None).unwrap();
    assert_eq!(state.error().unwrap().message, "internal error");

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /summarize "));
    assert!(request.contains("filename=\"contract.pdf\""));
}

#[test]
fn question_is_sent_as_form_field() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"answer":"Net 30.","citations":[{"chunk":1,"snippet":"net thirty"}]}"#,
    );
    let cfg = config_for(&base);
    let mut wb = Workbench::new(&cfg, HttpTransport::new(&cfg).unwrap(), HistoryLedger::new());
    wb.select_document(Some(Document::from_bytes(
        "contract.pdf",
        "application/pdf",
        vec![b'x'; 64 * 1024],
    )))
    .unwrap();

    let state = wb.run(AnalysisTask::QuestionAnswering, Some("When is payment due?")).unwrap();
    let answer = state.result().unwrap().as_answer().unwrap();
    assert_eq!(answer.text, "Net 30.");
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(wb.history().len(), 1);

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /qa "));
    assert!(request.contains("name=\"question\""));
    assert!(request.contains("When is payment due?"));
}
