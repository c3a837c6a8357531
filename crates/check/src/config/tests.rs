use std::io::Write;

use super::*;

#[test]
fn empty_document_uses_defaults() {
	let config = CheckConfig::from_toml_str("").unwrap();
	assert_eq!(config, CheckConfig::default());
	assert!(config.queue_enabled());
}

#[test]
fn parses_nested_ai_table() {
	let config = CheckConfig::from_toml_str(
		r#"
use_queue = false
text_level_windows = [1, 3]
whole_document_slot = false

[ai]
enabled = true
timeout_ms = 250
"#,
	)
	.unwrap();
	assert_eq!(config.text_level_windows, vec![1, 3]);
	assert!(!config.whole_document_slot);
	assert!(!config.queue_enabled());
	assert!(config.ai.enabled);
	assert_eq!(config.ai.timeout(), Duration::from_millis(250));
	assert_eq!(config.ai.max_pending, AiConfig::default().max_pending);
}

#[test]
fn test_mode_disables_queue() {
	let config = CheckConfig::from_toml_str("test_mode = true").unwrap();
	assert!(config.use_queue);
	assert!(!config.queue_enabled());
}

#[test]
fn rejects_zero_and_negative_windows() {
	for input in ["text_level_windows = [0]", "text_level_windows = [2, -1]"] {
		let err = CheckConfig::from_toml_str(input).unwrap_err();
		assert!(matches!(err, Error::Config(_)), "{input}: {err}");
	}
}

#[test]
fn rejects_duplicate_windows() {
	let err = CheckConfig::from_toml_str("text_level_windows = [2, 2]").unwrap_err();
	assert!(err.to_string().contains("twice"), "{err}");
}

#[test]
fn rejects_unknown_fields() {
	let err = CheckConfig::from_toml_str("use_queu = true").unwrap_err();
	assert!(matches!(err, Error::ConfigParse(_)), "{err}");
}

#[test]
fn load_reads_file() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	writeln!(file, "suggestion_cache_size = 8").unwrap();
	let config = CheckConfig::load(file.path()).unwrap();
	assert_eq!(config.suggestion_cache_size, 8);
}

#[test]
fn load_reports_missing_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("missing.toml");
	match CheckConfig::load(&path) {
		Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
		other => panic!("expected I/O error, got {other:?}"),
	}
}
