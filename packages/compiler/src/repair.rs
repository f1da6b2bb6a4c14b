//! Bounded, error-driven repair loop.
//!
//! When remote compilation fails, the failing source and its error log go
//! to an external generation collaborator, the corrected text is streamed
//! back, re-normalized and re-submitted. The loop is bounded by
//! `max_repair_attempts`; after exhaustion the session stays `Failed` and
//! only a manual edit (a new document revision) re-arms it.
//!
//! States and legal transitions:
//! ```text
//! Idle → Compiling
//! Compiling → Succeeded | Failed | Idle (stale delivery)
//! Failed → Repairing | Idle
//! Repairing → Compiling | Failed | Idle (stale delivery)
//! Succeeded → Idle
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{CompileError, CompileResult};
use crate::normalize::normalize;
use crate::orchestrate::Orchestrator;
use crate::session::{Artifact, CompileAttempt, SourceDocument};

/// Ordered chunk stream from the generation collaborator. Ends at stream
/// close; a mid-stream error fails the attempt that consumed it.
pub type FixStream = Pin<Box<dyn Stream<Item = CompileResult<String>> + Send>>;

/// External generation collaborator that proposes corrected source for a
/// failing document.
#[async_trait]
pub trait FixGenerator: Send + Sync {
    async fn request_fix(&self, source: &str, error_log: &str) -> CompileResult<FixStream>;
}

/// HTTP generation endpoint streaming corrected source as text chunks.
pub struct HttpFixGenerator {
    url: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

impl HttpFixGenerator {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FixGenerator for HttpFixGenerator {
    async fn request_fix(&self, source: &str, error_log: &str) -> CompileResult<FixStream> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "source": source, "errorLog": error_log }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CompileError::Transport {
                provider: "fix-generator".to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let log = response.text().await.unwrap_or_default();
            return Err(CompileError::ProviderHttp {
                provider: "fix-generator".to_string(),
                status,
                log,
            });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| CompileError::StreamRead(e.to_string()))
        });
        Ok(Box::pin(stream))
    }
}

/// Repair loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairState {
    Idle,
    Compiling,
    Repairing,
    Succeeded,
    Failed,
}

/// Legal transitions between repair states. Stale deliveries reset any
/// in-flight or terminal state back to `Idle`.
pub fn is_legal_transition(from: RepairState, to: RepairState) -> bool {
    use RepairState::*;

    if to == Idle && from != Idle {
        return true;
    }

    matches!(
        (from, to),
        (Idle, Compiling)
            | (Compiling, Succeeded)
            | (Compiling, Failed)
            | (Failed, Repairing)
            | (Repairing, Compiling)
            | (Repairing, Failed)
    )
}

/// A recorded state transition, kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RepairState,
    pub to: RepairState,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One compile-and-repair session for a document.
///
/// Owns the attempt history, the busy flag (at most one outstanding
/// request), the session id and captured document revision for staleness
/// checks, and the current artifact. Installing a new artifact drops the
/// superseded one.
pub struct RepairSession {
    id: u64,
    revision: u64,
    busy: bool,
    state: RepairState,
    max_repair_attempts: u32,
    attempts: Vec<CompileAttempt>,
    transitions: Vec<TransitionRecord>,
    artifact: Option<Artifact>,
}

impl RepairSession {
    pub fn new(max_repair_attempts: u32) -> Self {
        Self {
            id: 0,
            revision: 0,
            busy: false,
            state: RepairState::Idle,
            max_repair_attempts,
            attempts: Vec::new(),
            transitions: Vec::new(),
            artifact: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn max_repair_attempts(&self) -> u32 {
        self.max_repair_attempts
    }

    pub fn attempts(&self) -> &[CompileAttempt] {
        &self.attempts
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// The most recent error log, if the last attempt failed.
    pub fn latest_log(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| a.error_log())
    }

    /// Start a new compile-or-repair run for the document.
    ///
    /// Rejects when a request is already outstanding, and when the session
    /// exhausted its repair budget for this exact revision: after terminal
    /// failure only a manual edit re-arms automatic repair.
    pub fn begin(&mut self, doc: &SourceDocument) -> CompileResult<()> {
        if self.busy {
            return Err(CompileError::SessionBusy);
        }
        if self.state == RepairState::Failed
            && self.revision == doc.revision()
            && !self.attempts.is_empty()
            && self.attempts.len() as u32 > self.max_repair_attempts
        {
            return Err(CompileError::RepairExhausted {
                attempts: self.max_repair_attempts,
                log: self.latest_log().unwrap_or_default().to_string(),
            });
        }

        if self.state != RepairState::Idle {
            self.advance(RepairState::Idle, Some("new run".to_string()));
        }
        self.id += 1;
        self.revision = doc.revision();
        self.busy = true;
        self.attempts.clear();
        self.advance(RepairState::Compiling, None);
        Ok(())
    }

    pub fn push_attempt(&mut self, attempt: CompileAttempt) {
        self.attempts.push(attempt);
    }

    /// Compile attempt failed: `Compiling → Failed`.
    pub fn mark_failed(&mut self, reason: &CompileError) {
        self.advance(RepairState::Failed, Some(reason.to_string()));
    }

    /// Explicit repair trigger: `Failed → Repairing`.
    pub fn start_repair(&mut self) {
        self.advance(RepairState::Repairing, None);
    }

    /// Corrected source received: `Repairing → Compiling`.
    pub fn resume_compiling(&mut self) {
        self.advance(RepairState::Compiling, None);
    }

    /// Deliver a successful result. A result for a superseded document
    /// revision is discarded rather than applied and the machine returns
    /// to `Idle`; otherwise the artifact replaces (and drops) any previous
    /// one.
    pub fn complete_success(&mut self, artifact: Artifact, current_revision: u64) -> bool {
        self.busy = false;
        if current_revision != self.revision {
            info!(
                session = self.id,
                "discarding stale compile result (document edited)"
            );
            self.advance(RepairState::Idle, Some("stale result".to_string()));
            return false;
        }
        self.advance(RepairState::Succeeded, None);
        self.artifact = Some(artifact);
        true
    }

    /// Deliver a terminal failure. Stale deliveries reset to `Idle`.
    pub fn complete_failure(&mut self, current_revision: u64) {
        self.busy = false;
        if current_revision != self.revision {
            self.advance(RepairState::Idle, Some("stale result".to_string()));
        }
        // Otherwise the machine is already in Failed.
    }

    fn advance(&mut self, to: RepairState, reason: Option<String>) {
        if !is_legal_transition(self.state, to) {
            warn!(from = ?self.state, ?to, "ignoring illegal repair transition");
            return;
        }
        debug!(from = ?self.state, ?to, "repair transition");
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            attempt: self.attempts.len() as u32,
            reason,
        });
        self.state = to;
    }
}

/// Compile pipeline with bounded automatic repair.
///
/// Attempt 0 is the user-triggered compile; attempts `1..=max` are
/// repairs. The result is always delivered to the caller; whether it is
/// *applied* to the session depends on the staleness check.
pub struct RepairPipeline<G: FixGenerator> {
    orchestrator: Orchestrator,
    generator: G,
}

impl<G: FixGenerator> RepairPipeline<G> {
    pub fn new(orchestrator: Orchestrator, generator: G) -> Self {
        Self {
            orchestrator,
            generator,
        }
    }

    pub async fn compile_with_repair(
        &self,
        doc: &SourceDocument,
        session: &mut RepairSession,
    ) -> CompileResult<Artifact> {
        session.begin(doc)?;
        let engine = doc.engine();
        let max = session.max_repair_attempts();
        let mut normalized = normalize(doc.raw_text(), engine);
        let mut attempt_index: u32 = 0;

        loop {
            let mut attempt =
                CompileAttempt::pending(normalized.text.clone(), engine, attempt_index);

            match self.orchestrator.compile(&normalized, engine).await {
                Ok(artifact) => {
                    attempt.succeed(artifact.clone());
                    session.push_attempt(attempt);
                    session.complete_success(artifact.clone(), doc.revision());
                    return Ok(artifact);
                }
                Err(err) => {
                    let log = err.log();
                    attempt.fail(log.clone());
                    session.push_attempt(attempt);
                    session.mark_failed(&err);

                    if attempt_index >= max {
                        session.complete_failure(doc.revision());
                        return Err(if attempt_index == 0 {
                            err
                        } else {
                            CompileError::RepairExhausted {
                                attempts: attempt_index,
                                log,
                            }
                        });
                    }

                    session.start_repair();
                    info!(attempt = attempt_index, "requesting corrected source");
                    match self.collect_fix(&normalized.text, &log).await {
                        Ok(corrected) => {
                            normalized = normalize(&corrected, engine);
                            attempt_index += 1;
                            session.resume_compiling();
                        }
                        Err(stream_err) => {
                            // The repair attempt itself failed; terminal.
                            session.mark_failed(&stream_err);
                            session.complete_failure(doc.revision());
                            return Err(stream_err);
                        }
                    }
                }
            }
        }
    }

    /// Consume the generator's chunk stream into a complete buffer.
    async fn collect_fix(&self, source: &str, error_log: &str) -> CompileResult<String> {
        let mut stream = self.generator.request_fix(source, error_log).await?;
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            buffer.push_str(&chunk?);
        }
        debug!(bytes = buffer.len(), "fix stream complete");
        Ok(buffer)
    }
}
