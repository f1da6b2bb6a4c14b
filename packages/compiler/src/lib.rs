//! Remote compilation of normalized source into binary artifacts.
//!
//! The pipeline normalizes raw source ([`normalize`]), submits it to a
//! primary compile provider with secondary fallback ([`Orchestrator`]),
//! and on failure drives a bounded AI-assisted repair loop
//! ([`RepairPipeline`]) that streams corrected source from a
//! [`FixGenerator`] and re-submits it.

pub mod engine;
pub mod error;
pub mod normalize;
pub mod orchestrate;
pub mod repair;
pub mod session;

pub use engine::Engine;
pub use error::{CompileError, CompileResult};
pub use normalize::{has_envelope, normalize, NormalizedSource};
pub use orchestrate::{
    is_artifact_response, CompileProvider, HttpCompileProvider, Orchestrator, ProviderResponse,
};
pub use repair::{
    is_legal_transition, FixGenerator, FixStream, HttpFixGenerator, RepairPipeline, RepairSession,
    RepairState,
};
pub use session::{Artifact, AttemptStatus, CompileAttempt, SourceDocument};

#[cfg(test)]
mod tests_pipeline;
