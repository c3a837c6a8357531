use std::sync::Arc;
use std::time::Duration;

use galley_check::{CheckRequest, Documents, EngineRegistry, TEXT_QUEUE};
use galley_primitives::{FlatParagraph, LogicalParagraph};
use pretty_assertions::assert_eq;

use crate::common::{Recorder, TestEngine, WAIT, check_all, open, queued, rule_ids};

fn handler(engine: &Arc<TestEngine>, repaint: &Arc<Recorder>, window: i32) -> Arc<Documents> {
	Documents::new(queued(window), EngineRegistry::new().with_engine("en", engine.clone()), repaint.clone()).unwrap()
}

#[test]
fn editing_a_paragraph_rechecks_its_window_only() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 2);
	let texts: Vec<String> = (0..10).map(|i| if i == 4 { "p4 dup".to_string() } else { format!("para {i}") }).collect();
	let (doc, checker) = open(&documents, &texts);

	check_all(&checker, 10);
	assert!(documents.wait_idle(WAIT));
	assert_eq!(checker.stats().cached_entries, 20);
	engine.take_windows();
	repaint.take();

	doc.set_text(5, "p5 dup");
	checker.paragraph_changed(FlatParagraph(5));
	assert!(documents.wait_idle(WAIT));

	assert_eq!(engine.take_windows(), vec!["para 3\np4 dup\np5 dup\npara 6\npara 7".to_string()]);
	assert_eq!(repaint.repainted(checker.id()), vec![FlatParagraph(5)]);
	let (_, _, window) = checker.slots().text_level().next().unwrap();
	for flat in (3..8).map(FlatParagraph) {
		assert!(window.contains(flat), "no window entry for {flat}");
	}
	assert_eq!(window.get(FlatParagraph(4)).map(|e| e.errors().len()), Some(0));
	assert_eq!(window.get(FlatParagraph(5)).map(|e| e.errors().len()), Some(1));
	let result = checker.check(&CheckRequest::new(LogicalParagraph::text(5), 0));
	assert_eq!(rule_ids(&result.errors), vec![(3, "DUP")]);
	assert_eq!(checker.stats().cached_entries, 20);
}

#[test]
fn queued_results_arrive_through_repaint() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 1);
	let (_doc, checker) = open(&documents, &["one dup", "two dup"]);

	let first = checker.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert!(first.errors.is_empty());
	assert!(repaint.wait_for(checker.id(), WAIT));
	assert_eq!(repaint.repainted(checker.id()), vec![FlatParagraph(1)]);

	let again = checker.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&again.errors), vec![(4, "DUP")]);
}

#[test]
fn interactive_request_checks_text_level_rules_now() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 1);
	let (_doc, checker) = open(&documents, &["a dup", "b dup"]);

	let result = checker.check(&CheckRequest::new(LogicalParagraph::text(1), 0).interactive());
	assert_eq!(rule_ids(&result.errors), vec![(2, "DUP")]);
	assert_eq!(engine.take_windows().len(), 1);
	assert!(documents.wait_idle(WAIT));
	assert!(engine.take_windows().is_empty());
}

#[test]
fn closing_a_document_drops_its_work() {
	let engine = Arc::new(TestEngine::slow(Duration::from_millis(20)));
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 1);
	let (_a_doc, a) = open(&documents, &["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"]);
	let (_b_doc, b) = open(&documents, &["b0 dup", "b1 dup", "b2"]);

	check_all(&a, 8);
	check_all(&b, 3);
	assert!(documents.close(a.id()));
	assert!(!documents.close(a.id()));
	assert!(documents.wait_idle(WAIT));

	assert!(a.is_disposed());
	assert!(documents.get(a.id()).is_none());
	assert_eq!(documents.ids(), vec![b.id()]);
	assert_eq!(b.stats().cached_entries, 6);
	assert!(a.check(&CheckRequest::new(LogicalParagraph::text(0), 0)).errors.is_empty());
	let result = b.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&result.errors), vec![(3, "DUP")]);
}

#[test]
fn worker_survives_a_panicking_engine() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 1);
	let (_p_doc, p) = open(&documents, &["PANIC", "p1"]);
	let (_q_doc, q) = open(&documents, &["q dup", "q dup"]);

	check_all(&p, 2);
	check_all(&q, 2);
	assert!(documents.wait_idle(WAIT));

	let result = q.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&result.errors), vec![(2, "DUP")]);
	let status = documents.worker_status();
	assert_eq!(status.len(), 1);
	assert_eq!(status[0].name, TEXT_QUEUE);
	assert!(status[0].processed >= 2);
	assert_eq!(status[0].last_error.as_deref(), Some("engine crashed"));
}

#[test]
fn recheck_after_reset_all_leaves_unchanged_paragraphs_alone() {
	let engine = Arc::new(TestEngine::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(&engine, &repaint, 1);
	let (_doc, checker) = open(&documents, &["x dup", "y dup"]);

	check_all(&checker, 2);
	assert!(documents.wait_idle(WAIT));
	assert_eq!(repaint.repainted(checker.id()), vec![FlatParagraph(1)]);
	repaint.take();

	documents.reset_all();
	assert_eq!(checker.stats().cached_entries, 0);
	checker.check(&CheckRequest::new(LogicalParagraph::text(0), 0));
	assert!(documents.wait_idle(WAIT));
	assert!(repaint.repainted(checker.id()).is_empty());

	let result = checker.check(&CheckRequest::new(LogicalParagraph::text(1), 0));
	assert_eq!(rule_ids(&result.errors), vec![(2, "DUP")]);
	assert!(repaint.repainted(checker.id()).is_empty());
}
