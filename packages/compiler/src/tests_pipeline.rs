use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;

use crate::engine::Engine;
use crate::error::{CompileError, CompileResult};
use crate::orchestrate::{CompileProvider, Orchestrator, ProviderResponse};
use crate::repair::{FixGenerator, FixStream, RepairPipeline, RepairSession, RepairState};
use crate::session::{AttemptStatus, SourceDocument};

/// Primary provider replaying a scripted sequence of replies, one per
/// compile attempt.
struct SeqProvider {
    replies: Arc<Mutex<VecDeque<ProviderResponse>>>,
}

impl SeqProvider {
    fn new(replies: Vec<ProviderResponse>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
        }
    }
}

#[async_trait]
impl CompileProvider for SeqProvider {
    fn name(&self) -> &str {
        "seq"
    }

    async fn submit(&self, _source: &str, _engine: Engine) -> CompileResult<ProviderResponse> {
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .expect("scripted provider ran out of replies");
        Ok(reply)
    }
}

/// Secondary provider that always reports a server error.
struct DownProvider;

#[async_trait]
impl CompileProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn submit(&self, _source: &str, _engine: Engine) -> CompileResult<ProviderResponse> {
        Ok(ProviderResponse {
            status: 503,
            content_type: "text/plain".to_string(),
            body: b"secondary down".to_vec(),
        })
    }
}

fn pdf_reply(bytes: &[u8]) -> ProviderResponse {
    ProviderResponse {
        status: 200,
        content_type: "application/pdf".to_string(),
        body: bytes.to_vec(),
    }
}

fn failed_reply(log: &str) -> ProviderResponse {
    ProviderResponse {
        status: 500,
        content_type: "application/json".to_string(),
        body: log.as_bytes().to_vec(),
    }
}

/// Generator replaying scripted corrected sources, counting calls.
struct SeqGenerator {
    fixes: Mutex<VecDeque<String>>,
    calls: Arc<AtomicUsize>,
}

impl SeqGenerator {
    fn new(fixes: Vec<&str>, calls: Arc<AtomicUsize>) -> Self {
        Self {
            fixes: Mutex::new(fixes.into_iter().map(String::from).collect()),
            calls,
        }
    }
}

#[async_trait]
impl FixGenerator for SeqGenerator {
    async fn request_fix(&self, _source: &str, _error_log: &str) -> CompileResult<FixStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fix = self
            .fixes
            .lock()
            .expect("fixes lock")
            .pop_front()
            .expect("scripted generator ran out of fixes");
        // Deliver the fix in two chunks to exercise stream assembly
        let mid = fix.len() / 2;
        let chunks = vec![Ok(fix[..mid].to_string()), Ok(fix[mid..].to_string())];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Generator whose stream breaks after the first chunk.
struct BrokenStreamGenerator {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl FixGenerator for BrokenStreamGenerator {
    async fn request_fix(&self, _source: &str, _error_log: &str) -> CompileResult<FixStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<CompileResult<String>> = vec![
            Ok("\\documentclass".to_string()),
            Err(CompileError::StreamRead("connection reset".to_string())),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

fn pipeline(
    replies: Vec<ProviderResponse>,
    fixes: Vec<&str>,
    calls: Arc<AtomicUsize>,
) -> RepairPipeline<SeqGenerator> {
    let orchestrator = Orchestrator::new(Box::new(SeqProvider::new(replies)), Box::new(DownProvider));
    RepairPipeline::new(orchestrator, SeqGenerator::new(fixes, calls))
}

#[tokio::test]
async fn test_clean_compile_never_calls_generator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(vec![pdf_reply(b"%PDF-1.5")], vec![], calls.clone());
    let doc = SourceDocument::new("\\documentclass{article}\\begin{document}hi\\end{document}", Engine::Pdflatex);
    let mut session = RepairSession::new(2);

    let artifact = pipeline.compile_with_repair(&doc, &mut session).await.unwrap();

    assert_eq!(artifact.bytes, b"%PDF-1.5");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.state(), RepairState::Succeeded);
    assert_eq!(session.attempts().len(), 1);
    assert_eq!(session.attempts()[0].status, AttemptStatus::Success);
}

#[tokio::test]
async fn test_repair_recovers_failed_compile() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(
        vec![failed_reply("! Undefined control sequence"), pdf_reply(b"%PDF-1.5")],
        vec!["\\documentclass{article}\\begin{document}fixed\\end{document}"],
        calls.clone(),
    );
    let doc = SourceDocument::new("\\documentclass{article}\\begin{document}\\brokn\\end{document}", Engine::Pdflatex);
    let mut session = RepairSession::new(2);

    let artifact = pipeline.compile_with_repair(&doc, &mut session).await.unwrap();

    assert_eq!(artifact.bytes, b"%PDF-1.5");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.attempts().len(), 2);
    assert_eq!(session.attempts()[0].status, AttemptStatus::Failed);
    assert_eq!(session.attempts()[1].status, AttemptStatus::Success);
    // The second attempt compiled the corrected source
    assert!(session.attempts()[1].source_snapshot.contains("fixed"));
}

#[tokio::test]
async fn test_repair_bound_halts_loop() {
    // Budget of one repair: attempt 0 fails, one fix is requested,
    // attempt 1 fails, and the loop halts without a second fix request.
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(
        vec![failed_reply("first error"), failed_reply("second error")],
        vec!["\\documentclass{article}\\begin{document}still bad\\end{document}"],
        calls.clone(),
    );
    let doc = SourceDocument::new("broken", Engine::Pdflatex);
    let mut session = RepairSession::new(1);

    let err = pipeline
        .compile_with_repair(&doc, &mut session)
        .await
        .unwrap_err();

    match err {
        CompileError::RepairExhausted { attempts, log } => {
            assert_eq!(attempts, 1);
            // The surfaced log is the most recent attempt's
            assert!(log.contains("second error"));
            assert!(!log.contains("first error"));
        }
        other => panic!("expected RepairExhausted, got {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.attempts().len(), 2);
    assert_eq!(session.state(), RepairState::Failed);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_zero_budget_surfaces_provider_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(vec![failed_reply("! Missing $")], vec![], calls.clone());
    let doc = SourceDocument::new("broken", Engine::Pdflatex);
    let mut session = RepairSession::new(0);

    let err = pipeline
        .compile_with_repair(&doc, &mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, CompileError::BothProvidersFailed { .. }));
    assert!(err.log().contains("! Missing $"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_broken_fix_stream_fails_session() {
    let calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = Orchestrator::new(
        Box::new(SeqProvider::new(vec![failed_reply("err")])),
        Box::new(DownProvider),
    );
    let pipeline = RepairPipeline::new(orchestrator, BrokenStreamGenerator { calls: calls.clone() });
    let doc = SourceDocument::new("broken", Engine::Pdflatex);
    let mut session = RepairSession::new(3);

    let err = pipeline
        .compile_with_repair(&doc, &mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, CompileError::StreamRead(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), RepairState::Failed);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_exhausted_session_rearms_after_edit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline(
        vec![failed_reply("err"), failed_reply("err"), pdf_reply(b"%PDF")],
        vec!["nope"],
        calls.clone(),
    );
    let mut doc = SourceDocument::new("broken", Engine::Pdflatex);
    let mut session = RepairSession::new(1);

    pipeline
        .compile_with_repair(&doc, &mut session)
        .await
        .unwrap_err();

    // Same revision: the exhausted session refuses another automatic run
    assert!(session.begin(&doc).is_err());

    // A manual edit bumps the revision and re-arms the session
    doc.set_text("\\documentclass{article}\\begin{document}ok\\end{document}");
    let artifact = pipeline.compile_with_repair(&doc, &mut session).await.unwrap();
    assert_eq!(artifact.bytes, b"%PDF");
}
