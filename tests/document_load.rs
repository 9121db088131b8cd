use legalease::{config::Config, document::Document};

#[test]
fn loads_pdf_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Contract.PDF");
    std::fs::write(&path, b"%PDF-1.7 body").unwrap();

    let doc = Document::load(&Config::default(), &path).unwrap();
    assert_eq!(doc.name(), "Contract.PDF");
    assert_eq!(doc.media_type(), "application/pdf");
    assert_eq!(doc.byte_size(), 13);
}

#[test]
fn rejects_wrong_extension_oversize_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::default();

    let docx = dir.path().join("contract.docx");
    std::fs::write(&docx, b"PK").unwrap();
    assert!(Document::load(&cfg, &docx).is_err());

    let mut small = Config::default();
    small.limits.max_upload_bytes = 4;
    let big = dir.path().join("big.pdf");
    std::fs::write(&big, b"0123456789").unwrap();
    let err = Document::load(&small, &big).unwrap_err();
    assert!(err.to_string().contains("max_upload_bytes"));

    assert!(Document::load(&cfg, &dir.path().join("missing.pdf")).is_err());
}
