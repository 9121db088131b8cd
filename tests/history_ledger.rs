use legalease::history::HistoryLedger;

#[test]
fn marker_file_roundtrip_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session").join("qa-history.json");

    let mut ledger = HistoryLedger::open(&path).unwrap();
    assert!(ledger.is_empty());
    ledger.append("q1", "a1");
    ledger.append("q2", "a2");
    ledger.save().unwrap();

    let reopened = HistoryLedger::open(&path).unwrap();
    let qs: Vec<&str> = reopened.entries().map(|e| e.question.as_str()).collect();
    assert_eq!(qs, vec!["q2", "q1"]);

    let mut reopened = reopened;
    reopened.clear().unwrap();
    assert!(reopened.is_empty());
    assert!(!path.exists());
    // Clearing twice is fine.
    reopened.clear().unwrap();
}

#[test]
fn in_memory_ledger_has_no_marker() {
    let mut ledger = HistoryLedger::new();
    ledger.append("q", "a");
    assert!(ledger.marker().is_none());
    ledger.save().unwrap();
    ledger.clear().unwrap();
    assert_eq!(ledger.len(), 0);
}
