use dbdump_core::Error as CoreError;
use dbdump_plan::Phase;
use thiserror::Error;

/// Errors surfaced by a restore.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Raised before the target transaction was opened.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The target rejected a statement; the transaction was rolled back.
    #[error("restore failed during {phase} at `{statement}`: {message}")]
    Execution {
        phase: Phase,
        statement: String,
        message: String,
    },
}

impl RestoreError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            RestoreError::Execution { phase, .. } => Some(*phase),
            RestoreError::Core(_) => None,
        }
    }
}
