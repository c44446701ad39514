use std::fmt::Display;

use crate::{errors, Loc, LoxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the program from being executed.
    Error,
    /// Reported to the user, but the program still runs.
    Warning,
}

/// A problem found by static analysis before the program is executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    loc: Loc,
    description: String,
    advice: String,
}

impl Diagnostic {
    pub fn error<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> Self {
        Self { severity: Severity::Error, loc, description: description.into(), advice: advice.into() }
    }

    pub fn warning<D: Into<String>, A: Into<String>>(loc: Loc, description: D, advice: A) -> Self {
        Self { severity: Severity::Warning, loc, description: description.into(), advice: advice.into() }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn location(&self) -> Loc {
        self.loc
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn advice(&self) -> &str {
        &self.advice
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };

        write!(f, "{}: {}\n  Advice: {}", label, self.description, self.advice)
    }
}

impl From<Diagnostic> for LoxError {
    fn from(diagnostic: Diagnostic) -> Self {
        errors::user(diagnostic.description, diagnostic.advice)
    }
}
