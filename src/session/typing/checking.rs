use super::context::Checker;
use super::error::{BranchKind, CorrelationError, ReceiveKind};
use super::result::TypingResult;
use crate::location::{Span, Spanning};
use crate::session::language::{ExecutionMode, Expression, Initializer, Statement};
use crate::session::path::VariablePath;
use arcstr::ArcStr;

impl Checker<'_> {
    /// Checks `statement` against `entry`, the paths defined before it runs.
    ///
    /// `starter` is true until the first input of the session has been seen.
    pub fn check(
        &mut self,
        statement: &Statement,
        entry: &TypingResult,
        starter: &mut bool,
    ) -> TypingResult {
        let (red_zone, stack_size) = (self.config.stack_red_zone, self.config.stack_size);
        stacker::maybe_grow(red_zone, stack_size, || {
            self.check_statement(statement, entry, starter)
        })
    }

    fn check_statement(
        &mut self,
        statement: &Statement,
        entry: &TypingResult,
        starter: &mut bool,
    ) -> TypingResult {
        match statement {
            Statement::Sequence { children, .. } => self.check_sequence(children, entry, starter),

            Statement::Parallel { children, .. } => {
                let mut result = TypingResult::new();
                let mut errors = Vec::new();
                for child in children {
                    let branch = self.check(child, entry, starter);
                    result.parallel(branch, &mut errors);
                }
                self.report_all(errors);
                result
            }

            Statement::Choice { span, branches } => {
                let session_start = *starter;
                let mut results = Vec::with_capacity(branches.len());
                for branch in branches {
                    let mut branch_starter = session_start;
                    results.push(self.check_sequence(
                        [&branch.guard, &branch.body],
                        entry,
                        &mut branch_starter,
                    ));
                }
                *starter = false;
                let mut errors = Vec::new();
                let merged = TypingResult::choice(
                    span,
                    results,
                    BranchKind::Choice,
                    session_start,
                    &mut errors,
                );
                self.report_all(errors);
                merged
            }

            Statement::If {
                span,
                arms,
                otherwise,
            } => {
                let mut results = Vec::with_capacity(arms.len() + 1);
                for arm in arms {
                    results.push(self.check(&arm.body, entry, starter));
                }
                results.push(match otherwise {
                    Some(body) => self.check(body, entry, starter),
                    None => TypingResult::new(),
                });
                let mut errors = Vec::new();
                let merged = TypingResult::choice(
                    span,
                    results,
                    BranchKind::IfThenElse,
                    false,
                    &mut errors,
                );
                self.report_all(errors);
                merged
            }

            Statement::While { span, body, .. }
            | Statement::ForEach { span, body, .. }
            | Statement::Spawn { span, body, .. } => {
                let body = self.check(body, entry, starter);
                self.repeat(span, body)
            }

            Statement::For {
                span,
                init,
                step,
                body,
                ..
            } => {
                let mut running = entry.provisions();
                let mut result = TypingResult::new();
                let mut errors = Vec::new();

                let init = self.check(init, &running, starter);
                result.then(init, &mut running, &mut errors);

                let iteration = self.check_sequence([&**body, &**step], &running, starter);
                let iteration = self.repeat(span, iteration);
                result.then(iteration, &mut running, &mut errors);

                self.report_all(errors);
                result
            }

            Statement::Scope { body, .. } | Statement::Synchronized { body, .. } => {
                self.check(body, entry, starter)
            }

            Statement::Call { span, name } => self.check_definition(span, name),

            Statement::OneWay {
                span,
                operation,
                receive,
            } => self.check_input(span, operation, receive.as_ref(), starter),

            Statement::RequestResponse {
                span,
                operation,
                receive,
                body,
                ..
            } => {
                let mut running = entry.provisions();
                let mut result = TypingResult::new();
                let mut errors = Vec::new();

                let input = self.check_input(span, operation, receive.as_ref(), starter);
                result.then(input, &mut running, &mut errors);
                let body = self.check(body, &running, starter);
                result.then(body, &mut running, &mut errors);

                self.report_all(errors);
                result
            }

            Statement::SolicitResponse { span, receive, .. } => {
                if let Some(path) = receive.as_ref().filter(|path| path.is_correlation()) {
                    self.report(CorrelationError::ReceiveOnCorrelation(
                        path.span().or(span),
                        path.clone(),
                        ReceiveKind::SolicitResponse,
                    ));
                }
                TypingResult::new()
            }

            Statement::Assign {
                span,
                target,
                value,
            } => self.check_assignment(span, target, value, entry),

            Statement::Pointer { span, left, right }
            | Statement::DeepCopy { span, left, right } => {
                let mut result = TypingResult::new();
                result.invalidate(located(right, span));
                result.invalidate(located(left, span));
                result
            }

            Statement::Undef { span, path } => {
                let mut result = TypingResult::new();
                result.invalidate(located(path, span));
                result
            }

            Statement::Notification { .. }
            | Statement::CompoundAssign { .. }
            | Statement::Update { .. }
            | Statement::Nothing { .. }
            | Statement::Throw { .. }
            | Statement::Exit { .. }
            | Statement::Install { .. }
            | Statement::Compensate { .. }
            | Statement::LinkIn { .. }
            | Statement::LinkOut { .. }
            | Statement::Run { .. }
            | Statement::CurrentHandler { .. } => TypingResult::new(),
        }
    }

    fn check_sequence<'s>(
        &mut self,
        children: impl IntoIterator<Item = &'s Statement>,
        entry: &TypingResult,
        starter: &mut bool,
    ) -> TypingResult {
        let mut running = entry.provisions();
        let mut result = TypingResult::new();
        let mut errors = Vec::new();
        for child in children {
            let next = self.check(child, &running, starter);
            result.then(next, &mut running, &mut errors);
        }
        self.report_all(errors);
        result
    }

    fn repeat(&mut self, span: &Span, body: TypingResult) -> TypingResult {
        let mut errors = Vec::new();
        let result = body.repeat(span, &mut errors);
        self.report_all(errors);
        result
    }

    fn check_input(
        &mut self,
        span: &Span,
        operation: &ArcStr,
        receive: Option<&VariablePath>,
        starter: &mut bool,
    ) -> TypingResult {
        let mut result = TypingResult::new();
        if self.execution == ExecutionMode::Single {
            return result;
        }

        if let Some(path) = receive.filter(|path| path.is_correlation()) {
            self.report(CorrelationError::ReceiveOnCorrelation(
                path.span().or(span),
                path.clone(),
                ReceiveKind::Input,
            ));
        }

        let correlation_paths: Option<Vec<VariablePath>> =
            self.correlation.set_for(operation).map(|set| {
                set.variables
                    .iter()
                    .map(|variable| variable.correlation_path(span.clone()))
                    .collect()
            });

        let routable = correlation_paths
            .as_ref()
            .is_some_and(|paths| !paths.is_empty());
        if !*starter && !self.inside_init && !routable {
            self.report(CorrelationError::NoCorrelationSet(
                span.clone(),
                operation.clone(),
            ));
        }

        for path in correlation_paths.into_iter().flatten() {
            if *starter {
                result.provide(path, true);
            } else {
                result.need(path);
            }
        }

        result.register_input(operation.clone(), *starter);
        *starter = false;
        result
    }

    fn check_assignment(
        &mut self,
        span: &Span,
        target: &VariablePath,
        value: &Expression,
        entry: &TypingResult,
    ) -> TypingResult {
        let mut result = TypingResult::new();
        if !target.is_static() {
            return result;
        }
        let target = located(target, span);

        match value.initializer() {
            Initializer::Constant => result.provide(target, false),
            Initializer::Update(updated) => {
                if target.is_correlation() && *updated != target {
                    self.report(CorrelationError::InvalidInitializer(span.clone(), target));
                } else {
                    result.provide(target, false);
                }
            }
            Initializer::Fresh => result.provide(target, true),
            Initializer::Copy(source) if source.is_static() => {
                if entry.is_defined(source) {
                    result.provide(target, false);
                } else if target.is_correlation() {
                    // resolved by whatever runs before this definition, or reported for main
                    result.need(located(source, span));
                    result.provide(target, false);
                }
            }
            Initializer::Copy(source) => {
                if target.is_correlation() {
                    self.report(CorrelationError::MayBeUndefined(
                        span.clone(),
                        source.clone(),
                        target,
                    ));
                }
            }
            Initializer::Other => {
                if target.is_correlation() {
                    self.report(CorrelationError::InvalidInitializer(span.clone(), target));
                }
            }
        }
        result
    }
}

fn located(path: &VariablePath, span: &Span) -> VariablePath {
    path.with_span(path.span().or(span))
}
