pub mod error;
pub use error::{BranchKind, CorrelationError, ReceiveKind};

pub mod result;
pub use result::TypingResult;

pub mod checking;
pub mod context;
pub use context::Checker;
pub mod verdict;
