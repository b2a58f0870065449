use super::error::CorrelationError;
use super::result::TypingResult;
use crate::location::{Span, Spanning};
use crate::session::check_result::CheckConfig;
use crate::session::correlation::CorrelationInfo;
use crate::session::language::{Definition, ExecutionMode, Program};
use arcstr::ArcStr;
use indexmap::{IndexMap, IndexSet};

pub const INIT: &str = "init";
pub const MAIN: &str = "main";

/// State of one checking run. A fresh `Checker` is built for every program.
pub struct Checker<'a> {
    pub(super) program: &'a Program,
    pub(super) config: &'a CheckConfig,
    pub(super) execution: ExecutionMode,
    pub(super) correlation: CorrelationInfo,
    pub(super) unchecked_definitions: IndexMap<ArcStr, &'a Definition>,
    pub(super) typings: IndexMap<ArcStr, TypingResult>,
    pub(super) current_deps: IndexSet<ArcStr>,
    pub(super) inside_init: bool,
    pub(super) errors: Vec<CorrelationError>,
}

impl<'a> Checker<'a> {
    pub fn new(program: &'a Program, config: &'a CheckConfig) -> Self {
        let (correlation, index_errors) = CorrelationInfo::index(&program.correlation_sets);
        let mut unchecked_definitions = IndexMap::new();
        for definition in &program.definitions {
            unchecked_definitions
                .entry(definition.name.clone())
                .or_insert(definition);
        }

        let mut checker = Self {
            program,
            config,
            execution: config.execution.unwrap_or(program.execution),
            correlation,
            unchecked_definitions,
            typings: IndexMap::new(),
            current_deps: IndexSet::new(),
            inside_init: false,
            errors: Vec::new(),
        };
        checker.report_all(index_errors);
        checker
    }

    pub(super) fn report(&mut self, error: CorrelationError) {
        tracing::error!("{}: {}", error.span(), error);
        self.errors.push(error);
    }

    pub(super) fn report_all(&mut self, errors: Vec<CorrelationError>) {
        for error in errors {
            self.report(error);
        }
    }

    /// Checks `init` first, so `main` can start from its effects, then every
    /// other definition, and `main` last.
    pub fn check_definitions(&mut self) {
        if self.unchecked_definitions.contains_key(INIT) {
            self.check_definition(&Span::None, &ArcStr::from(INIT));
        }
        let names: Vec<ArcStr> = self
            .unchecked_definitions
            .keys()
            .filter(|name| name.as_str() != MAIN)
            .cloned()
            .collect();
        for name in names {
            self.check_definition(&Span::None, &name);
        }
        if self.unchecked_definitions.contains_key(MAIN) {
            self.check_definition(&Span::None, &ArcStr::from(MAIN));
        }
    }

    /// The typing of a definition, checking it first if needed.
    pub fn check_definition(&mut self, span: &Span, name: &ArcStr) -> TypingResult {
        if let Some(typing) = self.typings.get(name) {
            return typing.clone();
        }

        let Some(definition) = self.unchecked_definitions.get(name).copied() else {
            self.report(CorrelationError::DefinitionNotFound(span.clone(), name.clone()));
            return TypingResult::new();
        };

        if !self.current_deps.insert(name.clone()) {
            let cycle = self
                .current_deps
                .iter()
                .cloned()
                .skip_while(|dep| dep != name)
                .chain(std::iter::once(name.clone()))
                .collect();
            self.report(CorrelationError::DefinitionCycle(span.clone(), cycle));
            return TypingResult::new();
        }

        tracing::debug!("checking definition `{}`", name);

        let is_main = name.as_str() == MAIN;
        let is_init = name.as_str() == INIT;
        let entry = if is_main && self.unchecked_definitions.contains_key(INIT) {
            self.check_definition(&definition.span, &ArcStr::from(INIT))
                .provisions()
        } else {
            TypingResult::new()
        };

        let outer_inside_init = std::mem::replace(&mut self.inside_init, is_init);
        let mut starter = is_main && self.execution != ExecutionMode::Single;
        let typing = self.check(&definition.body, &entry, &mut starter);
        self.inside_init = outer_inside_init;

        if is_init {
            for provided in typing.provided_correlation.iter() {
                self.report(CorrelationError::InitializedInInit(
                    provided.path.span().or(&definition.span),
                    provided.path.clone(),
                ));
            }
        }

        self.current_deps.shift_remove(name);
        self.typings.insert(name.clone(), typing.clone());
        typing
    }

    pub fn into_parts(self) -> (Vec<CorrelationError>, IndexMap<ArcStr, TypingResult>) {
        (self.errors, self.typings)
    }
}
