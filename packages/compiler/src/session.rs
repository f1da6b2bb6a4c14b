use serde::{Deserialize, Serialize};

use crate::engine::Engine;

/// The editable source document owned by an editing session.
///
/// Every mutation bumps `revision`; in-flight compile results captured
/// under an older revision are discarded on arrival instead of applied.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    raw_text: String,
    engine: Engine,
    revision: u64,
}

impl SourceDocument {
    pub fn new(raw_text: impl Into<String>, engine: Engine) -> Self {
        Self {
            raw_text: raw_text.into(),
            engine,
            revision: 0,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.raw_text = text.into();
        self.revision += 1;
    }

    pub fn set_engine(&mut self, engine: Engine) {
        if self.engine != engine {
            self.engine = engine;
            self.revision += 1;
        }
    }
}

/// Compiled output bytes with their declared content type.
///
/// A session owns at most one artifact; installing a new one drops the
/// previous one so superseded output never outlives its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    Success,
    Failed,
}

/// Outcome of a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Artifact(Artifact),
    ErrorLog(String),
}

/// One compile attempt: the user-triggered one or a repair iteration.
#[derive(Debug, Clone)]
pub struct CompileAttempt {
    pub source_snapshot: String,
    pub engine: Engine,
    pub attempt_index: u32,
    pub status: AttemptStatus,
    pub outcome: Option<AttemptOutcome>,
}

impl CompileAttempt {
    pub fn pending(source_snapshot: impl Into<String>, engine: Engine, attempt_index: u32) -> Self {
        Self {
            source_snapshot: source_snapshot.into(),
            engine,
            attempt_index,
            status: AttemptStatus::Pending,
            outcome: None,
        }
    }

    pub fn succeed(&mut self, artifact: Artifact) {
        self.status = AttemptStatus::Success;
        self.outcome = Some(AttemptOutcome::Artifact(artifact));
    }

    pub fn fail(&mut self, log: impl Into<String>) {
        self.status = AttemptStatus::Failed;
        self.outcome = Some(AttemptOutcome::ErrorLog(log.into()));
    }

    pub fn error_log(&self) -> Option<&str> {
        match &self.outcome {
            Some(AttemptOutcome::ErrorLog(log)) => Some(log),
            _ => None,
        }
    }
}
