//! Common result and error types for the Weft placement core.

/// The standard result type for fallible core operations.
///
/// `Err` indicates an unrecoverable inconsistency between the device
/// database and the netlist (or a bug in the core) and aborts the run.
/// Expected placement outcomes — a binding being illegal, a cluster link
/// being refused — are never errors; they are `Ok` verdicts or
/// diagnostics.
pub type WeftResult<T> = Result<T, InternalError>;

/// A fatal internal inconsistency, e.g. a driver cell bound to a bel with
/// no physical source wire (device database and cell library disagree).
///
/// There is no recovery path: the placement run must stop with no partial
/// result.
#[derive(Debug, thiserror::Error)]
#[error("internal placement error: {message}")]
pub struct InternalError {
    /// Description of the inconsistency.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("no source wire for net n0");
        assert_eq!(
            format!("{err}"),
            "internal placement error: no source wire for net n0"
        );
    }

    #[test]
    fn ok_path() {
        let r: WeftResult<bool> = Ok(true);
        assert!(r.is_ok());
    }

    #[test]
    fn err_path() {
        let r: WeftResult<bool> = Err(InternalError::new("mismatch"));
        assert_eq!(r.err().unwrap().message, "mismatch");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
