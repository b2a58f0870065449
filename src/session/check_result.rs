use crate::location::{FileName, Spanning};
use crate::session::language::{ExecutionMode, Program};
use crate::session::program::LoadError;
use crate::session::typing::{Checker, CorrelationError, TypingResult};
use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct CheckConfig {
    /// Overrides the execution mode declared by the program.
    pub execution: Option<ExecutionMode>,
    /// Remaining stack below which checking moves to a fresh segment.
    pub stack_red_zone: usize,
    pub stack_size: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            execution: None,
            stack_red_zone: 32 * 1024,
            stack_size: 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: FileName,
    pub line: Option<u32>,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(error: &CorrelationError, fallback_file: &FileName) -> Self {
        let span = error.span();
        Self {
            file: span.file().unwrap_or_else(|| fallback_file.clone()),
            line: span.line(),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CorrelationError>,
    pub diagnostics: Vec<Diagnostic>,
    /// The typing of every definition, by name.
    pub typings: IndexMap<ArcStr, TypingResult>,
    /// `init` followed by `main`, when `main` exists.
    pub session: Option<TypingResult>,
}

impl CheckResult {
    pub fn from_program(program: &Program, config: &CheckConfig) -> Self {
        let mut checker = Checker::new(program, config);
        checker.check_definitions();
        let session = checker.verify_main();
        let (errors, typings) = checker.into_parts();

        let diagnostics = errors
            .iter()
            .map(|error| Diagnostic::from_error(error, &program.file))
            .collect();
        let valid = errors.is_empty();
        tracing::info!(
            "{}: {} ({} error(s))",
            program.file,
            if valid { "valid" } else { "invalid" },
            errors.len()
        );

        Self {
            valid,
            errors,
            diagnostics,
            typings,
            session,
        }
    }

    pub fn from_json(
        source: &str,
        file: FileName,
        config: &CheckConfig,
    ) -> Result<Self, LoadError> {
        let program = Program::from_json(source, file)?;
        Ok(Self::from_program(&program, config))
    }

    pub fn reports(&self) -> impl Iterator<Item = miette::Report> + '_ {
        self.errors.iter().map(CorrelationError::to_report)
    }
}
