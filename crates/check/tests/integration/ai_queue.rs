use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use galley_check::{AI_QUEUE, AiBackend, AiConfig, CheckConfig, CheckRequest, Documents, EngineRegistry, Locale, NoRepaint, Result, RuleMatch, TEXT_QUEUE};
use galley_primitives::{ErrorKind, FlatParagraph, LogicalParagraph};
use pretty_assertions::assert_eq;

use crate::common::{Recorder, TestEngine, WAIT, open, queued, rule_ids};

/// Flags every "ai"; texts containing "slow" take a minute.
#[derive(Default)]
struct FakeAi {
	calls: AtomicUsize,
}

#[async_trait]
impl AiBackend for FakeAi {
	async fn check(&self, text: &str, _locale: &Locale) -> Result<Vec<RuleMatch>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if text.contains("slow") {
			tokio::time::sleep(Duration::from_secs(60)).await;
		}
		Ok(text
			.match_indices("ai")
			.map(|(at, _)| {
				let at = text[..at].chars().count();
				RuleMatch::new(at, at + 2, "AI_STYLE", ErrorKind::Grammar).with_suggestions(["AI"])
			})
			.collect())
	}
}

fn ai_config(timeout_ms: u64) -> CheckConfig {
	CheckConfig {
		ai: AiConfig {
			enabled: true,
			timeout_ms,
			..AiConfig::default()
		},
		..queued(1)
	}
}

fn handler(config: CheckConfig, backend: &Arc<FakeAi>, repaint: Arc<Recorder>) -> Arc<Documents> {
	let engines = EngineRegistry::new().with_engine("en", Arc::new(TestEngine::default()));
	Documents::with_ai(config, engines, repaint, backend.clone()).unwrap()
}

#[test]
fn ai_findings_are_cached_and_repainted() {
	let backend = Arc::new(FakeAi::default());
	let repaint = Arc::new(Recorder::default());
	let documents = handler(ai_config(5_000), &backend, repaint.clone());
	let (_doc, checker) = open(&documents, &["let ai help"]);
	let request = CheckRequest::new(LogicalParagraph::text(0), 0);

	assert!(checker.check(&request).errors.is_empty());
	assert!(documents.wait_idle(WAIT));
	assert_eq!(repaint.repainted(checker.id()), vec![FlatParagraph(0)]);

	let result = checker.check(&request);
	assert_eq!(rule_ids(&result.errors), vec![(4, "AI_STYLE")]);
	assert_eq!(result.errors[0].suggestions, vec!["AI".to_string()]);
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

	let mut names: Vec<_> = documents.worker_status().into_iter().map(|r| r.name).collect();
	names.sort();
	assert_eq!(names, vec![AI_QUEUE.to_string(), TEXT_QUEUE.to_string()]);
}

#[test]
fn slow_backend_times_out_with_an_empty_result() {
	let backend = Arc::new(FakeAi::default());
	let documents = handler(ai_config(50), &backend, Arc::new(Recorder::default()));
	let (_doc, checker) = open(&documents, &["slow ai"]);

	checker.check(&CheckRequest::new(LogicalParagraph::text(0), 0));
	assert!(documents.wait_idle(WAIT));

	let (_, cache) = checker.slots().ai().unwrap();
	assert!(cache.contains(FlatParagraph(0)));
	assert_eq!(cache.error_count(), 0);
}

#[test]
fn closing_a_document_cancels_the_backend_call() {
	let backend = Arc::new(FakeAi::default());
	let documents = handler(ai_config(120_000), &backend, Arc::new(Recorder::default()));
	let (_doc, checker) = open(&documents, &["slow ai"]);

	checker.check(&CheckRequest::new(LogicalParagraph::text(0), 0));
	let deadline = Instant::now() + WAIT;
	while backend.calls.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
		std::thread::sleep(Duration::from_millis(5));
	}
	assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

	let started = Instant::now();
	documents.close(checker.id());
	assert!(documents.wait_idle(WAIT));
	assert!(started.elapsed() < WAIT);
	assert!(!checker.slots().ai().unwrap().1.contains(FlatParagraph(0)));
}

#[test]
fn ai_needs_a_backend() {
	let documents = Documents::new(ai_config(1_000), EngineRegistry::new(), Arc::new(NoRepaint)).unwrap();
	let (_doc, checker) = open(&documents, &["let ai help"]);

	assert!(!documents.config().ai.enabled);
	assert!(checker.slots().ai().is_none());
	assert_eq!(documents.worker_status().len(), 1);
}
