use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Failure taxonomy for remote compilation and repair.
///
/// Every terminal failure carries a human-readable log; nothing fails
/// silently.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// Non-success HTTP status from a provider.
    #[error("Provider '{provider}' failed with HTTP {status}: {log}")]
    ProviderHttp {
        provider: String,
        status: u16,
        log: String,
    },

    /// Success status but the body is not a compiled artifact.
    #[error("Provider '{provider}' returned a non-artifact body ({content_type}): {log}")]
    ProviderFormat {
        provider: String,
        content_type: String,
        log: String,
    },

    /// Connection-level failure (includes timeouts).
    #[error("Request to provider '{provider}' failed: {message}")]
    Transport { provider: String, message: String },

    /// Primary and secondary both failed; both logs aggregated.
    #[error("Both providers failed.\n--- primary ---\n{primary_log}\n--- secondary ---\n{secondary_log}")]
    BothProvidersFailed {
        primary_log: String,
        secondary_log: String,
    },

    /// Generation stream interrupted mid-read; fails that attempt.
    #[error("Fix stream interrupted: {0}")]
    StreamRead(String),

    /// The automatic repair bound was reached; carries the most recent log.
    #[error("Repair attempts exhausted after {attempts} attempt(s); last compile log:\n{log}")]
    RepairExhausted { attempts: u32, log: String },

    /// A compile-or-repair request is already outstanding for this session.
    #[error("A compile request is already in flight for this session")]
    SessionBusy,
}

impl CompileError {
    /// The log text to feed the repair loop or surface to the user.
    pub fn log(&self) -> String {
        match self {
            CompileError::ProviderHttp { log, .. }
            | CompileError::ProviderFormat { log, .. } => log.clone(),
            CompileError::BothProvidersFailed {
                primary_log,
                secondary_log,
            } => format!(
                "primary: {}\nsecondary: {}",
                primary_log, secondary_log
            ),
            CompileError::RepairExhausted { log, .. } => log.clone(),
            other => other.to_string(),
        }
    }
}
