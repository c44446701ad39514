use std::fmt;

/// The place in a script that a token, diagnostic or runtime error refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Loc {
    /// Produced by the interpreter itself (native functions, synthetic names).
    #[default]
    Native,
    Line { line: usize, column: usize },
}

impl Loc {
    pub fn new(line: usize, column: usize) -> Self {
        Loc::Line { line, column }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Loc::Native => None,
            Loc::Line { line, .. } => Some(*line),
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            Loc::Native => None,
            Loc::Line { column, .. } => Some(*column),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Loc::Native => write!(f, "native code"),
            Loc::Line { line, column } => write!(f, "line {}, column {}", line, column),
        }
    }
}
