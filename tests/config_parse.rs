use legalease::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../legalease.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.highlight.min_term_chars, 3);
    assert_eq!(cfg.highlight.max_terms, 20);
    assert_eq!(cfg.highlight.regex_size_limit, 64 * 1024 * 1024);
    assert!(!cfg.service.base_url.is_empty());
}

#[test]
fn partial_config_keeps_defaults() {
    let cfg: Config = toml::from_str("[service]\nbase_url = \"http://svc:9000\"\n").expect("parse TOML");
    assert_eq!(cfg.service.base_url, "http://svc:9000");
    assert_eq!(cfg.service.timeout_seconds, 120);
    assert_eq!(cfg.limits.accepted_extensions, vec!["pdf".to_string()]);
}

#[test]
fn base_url_override_ignores_blank() {
    let mut cfg = Config::default();
    cfg.apply_base_url("   ");
    assert_eq!(cfg.service.base_url, "http://localhost:8000");
    cfg.apply_base_url(" https://api.example ");
    assert_eq!(cfg.service.base_url, "https://api.example");
}
