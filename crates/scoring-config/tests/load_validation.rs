//! Load and validation tests for scoring-config.

use std::io::Write as _;

use scoring_config::ScoringConfig;

#[test]
fn loads_and_validates_a_minimal_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
        bind = "127.0.0.1:8080"

        [rule_source]
        kind = "file_tree"
        root = "rules"

        [ledger]
        path = "ledger.sqlite3"
        "#
    )
    .expect("write config");

    let config = ScoringConfig::load(file.path()).expect("load config");
    assert!(config.validate().is_ok());
}

#[test]
fn rejects_a_config_file_that_does_not_exist() {
    let result = ScoringConfig::load(std::path::Path::new("/nonexistent/scoring.toml"));
    assert!(result.is_err());
}
