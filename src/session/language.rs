use super::path::VariablePath;
use crate::location::{FileName, Span, Spanning};
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One process, no sessions: inputs need no correlation.
    Single,
    Sequential,
    #[default]
    Concurrent,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    #[serde(default = "unknown_file")]
    pub file: FileName,
    #[serde(default)]
    pub execution: ExecutionMode,
    #[serde(default)]
    pub correlation_sets: Vec<CorrelationSet>,
    pub definitions: Vec<Definition>,
}

fn unknown_file() -> FileName {
    FileName::UNKNOWN
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub span: Span,
    pub name: ArcStr,
    pub body: Statement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrelationSet {
    #[serde(default)]
    pub span: Span,
    pub name: ArcStr,
    pub variables: Vec<CorrelationVariable>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrelationVariable {
    /// Path under the correlation root, e.g. `sid` for `csets.sid`.
    pub path: VariablePath,
    #[serde(default)]
    pub aliases: Vec<CorrelationAlias>,
}

/// Where an operation's message carries the value of a correlation variable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrelationAlias {
    pub operation: ArcStr,
    pub path: VariablePath,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Sequence {
        #[serde(default)]
        span: Span,
        children: Vec<Statement>,
    },
    Parallel {
        #[serde(default)]
        span: Span,
        children: Vec<Statement>,
    },
    Choice {
        #[serde(default)]
        span: Span,
        branches: Vec<ChoiceBranch>,
    },
    If {
        #[serde(default)]
        span: Span,
        arms: Vec<IfArm>,
        #[serde(default, rename = "else")]
        otherwise: Option<Box<Statement>>,
    },
    While {
        #[serde(default)]
        span: Span,
        condition: Expression,
        body: Box<Statement>,
    },
    For {
        #[serde(default)]
        span: Span,
        init: Box<Statement>,
        condition: Expression,
        step: Box<Statement>,
        body: Box<Statement>,
    },
    ForEach {
        #[serde(default)]
        span: Span,
        key: VariablePath,
        target: VariablePath,
        body: Box<Statement>,
    },
    Scope {
        #[serde(default)]
        span: Span,
        name: ArcStr,
        body: Box<Statement>,
    },
    Synchronized {
        #[serde(default)]
        span: Span,
        id: ArcStr,
        body: Box<Statement>,
    },
    Call {
        #[serde(default)]
        span: Span,
        name: ArcStr,
    },
    OneWay {
        #[serde(default)]
        span: Span,
        operation: ArcStr,
        #[serde(default)]
        receive: Option<VariablePath>,
    },
    RequestResponse {
        #[serde(default)]
        span: Span,
        operation: ArcStr,
        #[serde(default)]
        receive: Option<VariablePath>,
        #[serde(default)]
        reply: Option<Expression>,
        body: Box<Statement>,
    },
    SolicitResponse {
        #[serde(default)]
        span: Span,
        operation: ArcStr,
        port: ArcStr,
        #[serde(default)]
        send: Option<Expression>,
        #[serde(default)]
        receive: Option<VariablePath>,
    },
    Notification {
        #[serde(default)]
        span: Span,
        operation: ArcStr,
        port: ArcStr,
        #[serde(default)]
        send: Option<Expression>,
    },
    Assign {
        #[serde(default)]
        span: Span,
        target: VariablePath,
        value: Expression,
    },
    CompoundAssign {
        #[serde(default)]
        span: Span,
        target: VariablePath,
        operator: CompoundOperator,
        value: Expression,
    },
    Update {
        #[serde(default)]
        span: Span,
        path: VariablePath,
        operator: UpdateOperator,
    },
    Pointer {
        #[serde(default)]
        span: Span,
        left: VariablePath,
        right: VariablePath,
    },
    DeepCopy {
        #[serde(default)]
        span: Span,
        left: VariablePath,
        right: VariablePath,
    },
    Undef {
        #[serde(default)]
        span: Span,
        path: VariablePath,
    },
    Nothing {
        #[serde(default)]
        span: Span,
    },
    Throw {
        #[serde(default)]
        span: Span,
        fault: ArcStr,
    },
    Exit {
        #[serde(default)]
        span: Span,
    },
    Install {
        #[serde(default)]
        span: Span,
        handlers: Vec<FaultHandler>,
    },
    Compensate {
        #[serde(default)]
        span: Span,
        scope: ArcStr,
    },
    Spawn {
        #[serde(default)]
        span: Span,
        index: VariablePath,
        upper_bound: Expression,
        body: Box<Statement>,
    },
    LinkIn {
        #[serde(default)]
        span: Span,
        link: ArcStr,
    },
    LinkOut {
        #[serde(default)]
        span: Span,
        link: ArcStr,
    },
    Run {
        #[serde(default)]
        span: Span,
        code: Expression,
    },
    CurrentHandler {
        #[serde(default)]
        span: Span,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChoiceBranch {
    /// The input statement guarding the branch.
    pub guard: Statement,
    pub body: Statement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IfArm {
    pub condition: Expression,
    pub body: Statement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaultHandler {
    pub fault: ArcStr,
    pub body: Statement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperator {
    PreIncrement,
    PostIncrement,
    PreDecrement,
    PostDecrement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Int {
        value: i64,
    },
    Real {
        value: f64,
    },
    String {
        value: String,
    },
    Bool {
        value: bool,
    },
    Variable {
        path: VariablePath,
    },
    /// A generator of session-unique values.
    Fresh,
    Update {
        path: VariablePath,
        operator: UpdateOperator,
    },
    Sum {
        operands: Vec<Expression>,
    },
    Product {
        operands: Vec<Expression>,
    },
    Compare {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And {
        operands: Vec<Expression>,
    },
    Or {
        operands: Vec<Expression>,
    },
    Not {
        operand: Box<Expression>,
    },
    VectorSize {
        path: VariablePath,
    },
    IsType {
        path: VariablePath,
    },
    Cast {
        operand: Box<Expression>,
    },
    InstallFixed {
        path: VariablePath,
    },
}

/// How an assignment's right-hand side initialises its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Initializer<'a> {
    Constant,
    /// An increment or decrement of the given path.
    Update(&'a VariablePath),
    Copy(&'a VariablePath),
    Fresh,
    Other,
}

impl Expression {
    pub fn initializer(&self) -> Initializer<'_> {
        match self {
            Self::Int { .. } | Self::Real { .. } | Self::String { .. } | Self::Bool { .. } => {
                Initializer::Constant
            }
            Self::Update { path, .. } => Initializer::Update(path),
            Self::Variable { path } => Initializer::Copy(path),
            Self::Fresh => Initializer::Fresh,
            Self::Sum { .. }
            | Self::Product { .. }
            | Self::Compare { .. }
            | Self::And { .. }
            | Self::Or { .. }
            | Self::Not { .. }
            | Self::VectorSize { .. }
            | Self::IsType { .. }
            | Self::Cast { .. }
            | Self::InstallFixed { .. } => Initializer::Other,
        }
    }
}

impl Spanning for Statement {
    fn span(&self) -> Span {
        match self {
            Self::Sequence { span, .. }
            | Self::Parallel { span, .. }
            | Self::Choice { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::For { span, .. }
            | Self::ForEach { span, .. }
            | Self::Scope { span, .. }
            | Self::Synchronized { span, .. }
            | Self::Call { span, .. }
            | Self::OneWay { span, .. }
            | Self::RequestResponse { span, .. }
            | Self::SolicitResponse { span, .. }
            | Self::Notification { span, .. }
            | Self::Assign { span, .. }
            | Self::CompoundAssign { span, .. }
            | Self::Update { span, .. }
            | Self::Pointer { span, .. }
            | Self::DeepCopy { span, .. }
            | Self::Undef { span, .. }
            | Self::Nothing { span }
            | Self::Throw { span, .. }
            | Self::Exit { span }
            | Self::Install { span, .. }
            | Self::Compensate { span, .. }
            | Self::Spawn { span, .. }
            | Self::LinkIn { span, .. }
            | Self::LinkOut { span, .. }
            | Self::Run { span, .. }
            | Self::CurrentHandler { span } => span.clone(),
        }
    }
}
