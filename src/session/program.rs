use crate::location::FileName;
use crate::session::language::Program;
use std::fmt::{self, Display};

#[derive(Debug)]
pub struct LoadError {
    pub file: FileName,
    pub error: serde_json::Error,
}

impl LoadError {
    pub fn to_report(&self) -> miette::Report {
        miette::miette!(
            code = "load-error",
            help = "the program must be a statement tree in the JSON interchange format",
            "{}",
            self
        )
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file,
            self.error.line(),
            self.error.column(),
            self.error
        )
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Program {
    /// Reads a program handed over by the parser. `file` is used when the
    /// document does not name its source file.
    pub fn from_json(source: &str, file: FileName) -> Result<Self, LoadError> {
        let mut program: Program = serde_json::from_str(source).map_err(|error| LoadError {
            file: file.clone(),
            error,
        })?;
        if program.file == FileName::UNKNOWN {
            program.file = file;
        }
        Ok(program)
    }

    pub fn to_json(&self) -> String {
        // only fails for non-string map keys, which the tree does not contain
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
