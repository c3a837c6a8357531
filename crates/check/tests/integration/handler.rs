use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use galley_check::{CheckConfig, CheckRequest, Documents, EngineRegistry, Error, LinguisticEngine, NoRepaint, TEXT_QUEUE};
use galley_primitives::{FlatParagraph, LogicalParagraph};
use galley_worker::TaskClass;
use pretty_assertions::assert_eq;

use crate::common::{Recorder, TestEngine, WAIT, check_all, open, queued, rule_ids};

fn engines(engine: &Arc<TestEngine>) -> EngineRegistry {
	EngineRegistry::new().with_engine("en", engine.clone())
}

#[test]
fn handler_follows_toml_configuration() {
	galley_check::logging::init();
	let config = CheckConfig::from_toml_str("use_queue = true\ntext_level_windows = [1, 3]\n").unwrap();
	let documents = Documents::new(config, engines(&Arc::new(TestEngine::default())), Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["one"]);

	assert_eq!(checker.slots().len(), 5);
	let status = documents.worker_status();
	assert_eq!(status.len(), 1);
	assert_eq!(status[0].name, TEXT_QUEUE);
	assert_eq!(status[0].class, TaskClass::Background);
}

#[test]
fn invalid_configuration_is_rejected() {
	let config = CheckConfig {
		text_level_windows: vec![2, 2],
		..CheckConfig::default()
	};
	let err = Documents::new(config, EngineRegistry::new(), Arc::new(NoRepaint)).unwrap_err();
	assert!(matches!(err, Error::Config(_)), "{err}");
}

#[test]
fn test_mode_checks_synchronously() {
	let engine = Arc::new(TestEngine::default());
	let config = CheckConfig {
		test_mode: true,
		..queued(1)
	};
	let documents = Documents::new(config, engines(&engine), Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["a dup", "b dup"]);

	assert!(documents.worker_status().is_empty());
	let result = checker.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&result.errors), vec![(2, "DUP")]);
}

#[test]
fn disabled_rule_disappears_from_every_document() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = Documents::new(queued(1), engines(&engine), repaint.clone()).unwrap();
	let (_a_doc, a) = open(&documents, &["a bad"]);
	let (_b_doc, b) = open(&documents, &["b", "b bad"]);
	check_all(&a, 1);
	check_all(&b, 2);
	assert!(documents.wait_idle(WAIT));

	documents.disable_rule(None, "BAD");
	assert!(documents.shared().is_disabled("en", "BAD"));
	assert_eq!(repaint.repainted(a.id()), vec![FlatParagraph(0)]);
	assert_eq!(repaint.repainted(b.id()), vec![FlatParagraph(1)]);
	assert!(b.check(&CheckRequest::new(LogicalParagraph::text(1), 0)).errors.is_empty());

	documents.enable_rule(None, "BAD");
	let result = b.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&result.errors), vec![(2, "BAD")]);
}

#[test]
fn switching_checking_off_discards_results() {
	let engine = Arc::new(TestEngine::default());
	let documents = Documents::new(queued(1), engines(&engine), Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["so bad"]);
	check_all(&checker, 1);
	assert!(documents.wait_idle(WAIT));

	documents.set_enabled(false);
	assert!(!documents.is_enabled());
	assert_eq!(checker.stats().cached_entries, 0);
	assert!(checker.check(&CheckRequest::new(LogicalParagraph::text(0), 0)).errors.is_empty());

	documents.set_enabled(true);
	let result = checker.check(&CheckRequest::new(LogicalParagraph::text(0), 0));
	assert_eq!(rule_ids(&result.errors), vec![(3, "BAD")]);
	assert!(documents.wait_idle(WAIT));
}

#[test]
fn language_change_rebuilds_the_engine() {
	let built = Arc::new(AtomicUsize::new(0));
	let registry = {
		let built = Arc::clone(&built);
		EngineRegistry::new().with("en", move |_| {
			built.fetch_add(1, Ordering::SeqCst);
			Ok(Arc::new(TestEngine::default()) as Arc<dyn LinguisticEngine>)
		})
	};
	let config = CheckConfig {
		text_level_windows: Vec::new(),
		whole_document_slot: false,
		..CheckConfig::default()
	};
	let documents = Documents::new(config, registry, Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["bad"]);
	let request = CheckRequest::new(LogicalParagraph::text(0), 0);

	checker.check(&request);
	checker.check(&request);
	assert_eq!(built.load(Ordering::SeqCst), 1);

	documents.language_changed(checker.id());
	assert_eq!(checker.stats().cached_entries, 0);
	assert_eq!(rule_ids(&checker.check(&request).errors), vec![(0, "BAD")]);
	assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn shutdown_stops_workers_and_disposes_documents() {
	let documents = Documents::new(queued(1), engines(&Arc::new(TestEngine::default())), Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["one", "two"]);
	check_all(&checker, 2);

	documents.shutdown();
	assert!(checker.is_disposed());
	assert!(documents.ids().is_empty());
	assert!(documents.worker_status().is_empty());
}
