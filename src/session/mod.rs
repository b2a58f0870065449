pub mod check_result;
pub mod correlation;
pub mod language;
pub mod path;
pub mod program;
pub mod typing;
