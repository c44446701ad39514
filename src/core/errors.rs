use thiserror::Error;

use super::Loc;

/// Every failure the crate reports to its caller.
///
/// Each error carries a human readable `description` of what went wrong and a
/// piece of `advice` describing how the user might fix it.
#[derive(Debug, Error)]
pub enum LoxError {
    /// A problem with the script the user provided (syntax, static analysis).
    #[error("{description}\n  Advice: {advice}")]
    User { description: String, advice: String },

    /// A failure raised while executing a script.
    #[error("[{loc}] {description}\n  Advice: {advice}")]
    Runtime {
        loc: Loc,
        description: String,
        advice: String,
    },

    /// A failure of the environment or of the interpreter itself.
    #[error("{description}\n  Advice: {advice}")]
    System {
        description: String,
        advice: String,
        #[source]
        internal: Option<std::io::Error>,
    },
}

impl LoxError {
    pub fn description(&self) -> &str {
        match self {
            LoxError::User { description, .. }
            | LoxError::Runtime { description, .. }
            | LoxError::System { description, .. } => description,
        }
    }

    pub fn advice(&self) -> &str {
        match self {
            LoxError::User { advice, .. }
            | LoxError::Runtime { advice, .. }
            | LoxError::System { advice, .. } => advice,
        }
    }

    pub fn location(&self) -> Option<Loc> {
        match self {
            LoxError::Runtime { loc, .. } => Some(*loc),
            _ => None,
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. })
    }
}

pub fn user<D: Into<String>, A: Into<String>>(description: D, advice: A) -> LoxError {
    LoxError::User {
        description: description.into(),
        advice: advice.into(),
    }
}

pub fn runtime<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> LoxError {
    LoxError::Runtime {
        loc,
        description: description.into(),
        advice: advice.into(),
    }
}

pub fn system<D: Into<String>, A: Into<String>>(description: D, advice: A) -> LoxError {
    LoxError::System {
        description: description.into(),
        advice: advice.into(),
        internal: None,
    }
}

pub fn system_with_internal<D: Into<String>, A: Into<String>>(
    description: D,
    advice: A,
    internal: std::io::Error,
) -> LoxError {
    LoxError::System {
        description: description.into(),
        advice: advice.into(),
        internal: Some(internal),
    }
}

impl From<std::io::Error> for LoxError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => system_with_internal(
                "We could not find the file you provided.",
                "Make sure that the file exists and that you have permissions to access it.",
                e,
            ),
            std::io::ErrorKind::PermissionDenied => system_with_internal(
                "You do not have permissions to access the file you provided.",
                "Make sure that you have permissions to access the file.",
                e,
            ),
            kind => system_with_internal(
                format!("We were unable to open the file you provided due to a {} error.", kind),
                "Check the internal error message and try searching for a solution online.",
                e,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_render_their_location() {
        let err = runtime(Loc::new(3, 7), "Cannot divide by zero.", "Check the divisor first.");

        assert!(err.is_runtime());
        assert_eq!(err.location(), Some(Loc::new(3, 7)));
        assert_eq!(
            err.to_string(),
            "[line 3, column 7] Cannot divide by zero.\n  Advice: Check the divisor first."
        );
    }

    #[test]
    fn io_errors_become_system_errors() {
        let err: LoxError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();

        assert!(!err.is_runtime());
        assert_eq!(err.description(), "We could not find the file you provided.");
        assert!(std::error::Error::source(&err).is_some());
    }
}
