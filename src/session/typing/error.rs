use crate::location::{Span, Spanning};
use crate::session::path::VariablePath;
use arcstr::ArcStr;
use std::fmt::{self, Display};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Choice,
    IfThenElse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveKind {
    Input,
    SolicitResponse,
}

#[derive(Clone, Debug)]
pub enum CorrelationError {
    MainNotFound(Span),
    DefinitionNotFound(Span, ArcStr),
    DefinitionCycle(Span, Vec<ArcStr>),
    DefinedMoreThanOnce(Span, VariablePath),
    InitializedInInit(Span, VariablePath),
    NotInitialized(Span, VariablePath),
    VariableNotInitialized(Span, VariablePath),
    NotInitializedInEveryBranch(Span, VariablePath, BranchKind),
    FreshnessDiffersAcrossBranches(Span, VariablePath),
    StarterUsedInSession(Span, ArcStr),
    InitializedInLoop(Span, VariablePath),
    NoCorrelationSet(Span, ArcStr),
    ReceiveOnCorrelation(Span, VariablePath, ReceiveKind),
    InvalidInitializer(Span, VariablePath),
    MayBeUndefined(Span, VariablePath, VariablePath),
    NoFreshValue(Span, ArcStr),
    OperationInManySets(Span, ArcStr, ArcStr, ArcStr),
    CorrelationSetAlreadyDeclared(Span, Span, ArcStr),
}

impl Spanning for CorrelationError {
    fn span(&self) -> Span {
        match self {
            Self::MainNotFound(span)
            | Self::DefinitionNotFound(span, ..)
            | Self::DefinitionCycle(span, ..)
            | Self::DefinedMoreThanOnce(span, ..)
            | Self::InitializedInInit(span, ..)
            | Self::NotInitialized(span, ..)
            | Self::VariableNotInitialized(span, ..)
            | Self::NotInitializedInEveryBranch(span, ..)
            | Self::FreshnessDiffersAcrossBranches(span, ..)
            | Self::StarterUsedInSession(span, ..)
            | Self::InitializedInLoop(span, ..)
            | Self::NoCorrelationSet(span, ..)
            | Self::ReceiveOnCorrelation(span, ..)
            | Self::InvalidInitializer(span, ..)
            | Self::MayBeUndefined(span, ..)
            | Self::NoFreshValue(span, ..)
            | Self::OperationInManySets(span, ..)
            | Self::CorrelationSetAlreadyDeclared(span, ..) => span.clone(),
        }
    }
}

impl CorrelationError {
    pub fn with_span(mut self, new_span: Span) -> Self {
        match &mut self {
            Self::MainNotFound(span)
            | Self::DefinitionNotFound(span, ..)
            | Self::DefinitionCycle(span, ..)
            | Self::DefinedMoreThanOnce(span, ..)
            | Self::InitializedInInit(span, ..)
            | Self::NotInitialized(span, ..)
            | Self::VariableNotInitialized(span, ..)
            | Self::NotInitializedInEveryBranch(span, ..)
            | Self::FreshnessDiffersAcrossBranches(span, ..)
            | Self::StarterUsedInSession(span, ..)
            | Self::InitializedInLoop(span, ..)
            | Self::NoCorrelationSet(span, ..)
            | Self::ReceiveOnCorrelation(span, ..)
            | Self::InvalidInitializer(span, ..)
            | Self::MayBeUndefined(span, ..)
            | Self::NoFreshValue(span, ..)
            | Self::OperationInManySets(span, ..)
            | Self::CorrelationSetAlreadyDeclared(span, ..) => *span = new_span,
        }
        self
    }

    /// Short stable identifier, used as the miette diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MainNotFound(..) | Self::DefinitionNotFound(..) => "missing-definition",
            Self::DefinitionCycle(..) => "definition-cycle",
            Self::DefinedMoreThanOnce(..) | Self::InitializedInInit(..) => "double-definition",
            Self::NotInitialized(..) | Self::VariableNotInitialized(..) => "uninitialized-use",
            Self::NotInitializedInEveryBranch(..) | Self::FreshnessDiffersAcrossBranches(..) => {
                "branch-inconsistency"
            }
            Self::StarterUsedInSession(..) => "starter-conflict",
            Self::InitializedInLoop(..) => "loop-definition",
            Self::NoCorrelationSet(..) | Self::OperationInManySets(..) => "unroutable-operation",
            Self::ReceiveOnCorrelation(..) => "receive-on-correlation",
            Self::InvalidInitializer(..) | Self::MayBeUndefined(..) => "invalid-initializer",
            Self::NoFreshValue(..) => "no-fresh-value",
            Self::CorrelationSetAlreadyDeclared(..) => "duplicate-correlation-set",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::NoFreshValue(..) => {
                Some("assign one of its variables a fresh value (`new`) when the session starts")
            }
            Self::InvalidInitializer(..) => {
                Some("use a constant, an increment of itself, a defined variable or a fresh value")
            }
            Self::InitializedInLoop(..) => Some("move the initialisation before the loop"),
            Self::NoCorrelationSet(..) => {
                Some("add an alias for this operation to a correlation set")
            }
            _ => None,
        }
    }

    pub fn to_report(&self) -> miette::Report {
        let message = format!("{}: {}", self.span(), self);
        match self.help() {
            Some(help) => miette::miette!(code = self.code(), help = help, "{}", message),
            None => miette::miette!(code = self.code(), "{}", message),
        }
    }
}

impl Display for CorrelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainNotFound(_) => write!(f, "Can not find the main entry point."),
            Self::DefinitionNotFound(_, name) => write!(f, "Can not find definition `{}`.", name),
            Self::DefinitionCycle(_, names) => {
                write!(f, "There is a definition cycle:\n\n  ")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{}", name)?;
                }
                write!(f, "\n\nDefinitions can not call themselves.")
            }
            Self::DefinedMoreThanOnce(_, path) => write!(
                f,
                "Correlation variable `{}` can not be defined more than one time.",
                path
            ),
            Self::InitializedInInit(_, path) => write!(
                f,
                "Correlation variable `{}` can not be initialised in the init procedure.",
                path
            ),
            Self::NotInitialized(_, path) => write!(
                f,
                "Correlation path `{}` is not initialised before usage.",
                path
            ),
            Self::VariableNotInitialized(_, path) => write!(
                f,
                "Variable `{}` is not initialised before using it to initialise a correlation variable.",
                path
            ),
            Self::NotInitializedInEveryBranch(_, path, BranchKind::Choice) => write!(
                f,
                "Correlation variable `{}` must be initialised in every branch.",
                path
            ),
            Self::NotInitializedInEveryBranch(_, path, BranchKind::IfThenElse) => write!(
                f,
                "Correlation variable `{}` must be initialised in every if-then-else branch.",
                path
            ),
            Self::FreshnessDiffersAcrossBranches(_, path) => write!(
                f,
                "Correlation variable `{}` is initialised with a fresh value in some branches but not in others.",
                path
            ),
            Self::StarterUsedInSession(_, operation) => write!(
                f,
                "Operation `{}` can not be used both as a starter and in the body of another session branch.",
                operation
            ),
            Self::InitializedInLoop(_, path) => write!(
                f,
                "Initialising correlation variables in loops is forbidden (`{}`).",
                path
            ),
            Self::NoCorrelationSet(_, operation) => write!(
                f,
                "No correlation set defined for operation `{}`.",
                operation
            ),
            Self::ReceiveOnCorrelation(_, path, ReceiveKind::Input) => write!(
                f,
                "Input operations can not receive on correlation variable `{}`.",
                path
            ),
            Self::ReceiveOnCorrelation(_, path, ReceiveKind::SolicitResponse) => write!(
                f,
                "Solicit-response statements can not receive on correlation variable `{}`.",
                path
            ),
            Self::InvalidInitializer(_, path) => write!(
                f,
                "Correlation variable `{}` must either be initialised with a fresh value, a variable, a constant or an increment of itself.",
                path
            ),
            Self::MayBeUndefined(_, source, target) => write!(
                f,
                "Variable `{}` may be undefined before being used for defining correlation variable `{}`.",
                source, target
            ),
            Self::NoFreshValue(_, set) => write!(
                f,
                "Every correlation set must have at least one fresh value, but `{}` has none.",
                set
            ),
            Self::OperationInManySets(_, operation, first, second) => write!(
                f,
                "Operation `{}` is correlated by more than one correlation set (`{}` and `{}`).",
                operation, first, second
            ),
            Self::CorrelationSetAlreadyDeclared(_, previous, name) => write!(
                f,
                "Correlation set `{}` is already declared at {}.",
                name, previous
            ),
        }
    }
}
