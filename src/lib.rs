//! Static checking of session correlation for service programs.
//!
//! Given the statement tree of every procedure, the checker proves that the
//! correlation variables routing messages to sessions are initialised exactly
//! once, before they are needed, on every path a session can take.

pub mod location;
pub mod session;

mod test;

pub use session::check_result::{CheckConfig, CheckResult, Diagnostic};
pub use session::language::{ExecutionMode, Program};
pub use session::typing::{CorrelationError, TypingResult};

/// Checks a whole program.
pub fn check(program: &Program, config: &CheckConfig) -> CheckResult {
    CheckResult::from_program(program, config)
}
