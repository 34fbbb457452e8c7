use pvstate_types::Transition;
use pvstate_xml::XmlError;

/// Fatal migration failures. The host element is never modified when one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("invalid root: no <{expected}> element found under <{found}>")]
    InvalidRoot { expected: String, found: String },

    #[error("could not parse state text: {0}")]
    Parse(#[source] XmlError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] XmlError),

    #[error("migration {transition} ({key}) failed: {source:#}")]
    StepFailed {
        key: String,
        transition: Transition,
        #[source]
        source: anyhow::Error,
    },
}

impl MigrationError {
    /// 2 when a step failed, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::StepFailed { .. } => 2,
            MigrationError::InvalidRoot { .. }
            | MigrationError::Parse(_)
            | MigrationError::Serialization(_) => 1,
        }
    }
}
