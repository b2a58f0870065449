use super::error::{BranchKind, CorrelationError};
use crate::location::{Span, Spanning};
use crate::session::path::{PathSet, ProvidedPath, VariablePath};
use arcstr::ArcStr;
use indexmap::IndexSet;

/// What a statement needs before it runs and what it guarantees afterwards.
#[derive(Clone, Debug, Default)]
pub struct TypingResult {
    pub needed_correlation: PathSet<VariablePath>,
    pub needed_data: PathSet<VariablePath>,
    pub provided_correlation: PathSet<ProvidedPath>,
    pub provided_data: PathSet<VariablePath>,
    pub invalidated_data: PathSet<VariablePath>,
    /// Input operations reached while not starting a session.
    pub session_operations: IndexSet<ArcStr>,
    pub starting_operation: Option<ArcStr>,
}

impl TypingResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the provided paths of `self`, as the entry of a following statement.
    pub fn provisions(&self) -> Self {
        Self {
            provided_correlation: self.provided_correlation.clone(),
            provided_data: self.provided_data.clone(),
            ..Self::default()
        }
    }

    pub fn need(&mut self, path: VariablePath) {
        let set = if path.is_correlation() {
            &mut self.needed_correlation
        } else {
            &mut self.needed_data
        };
        if !set.contains(&path) {
            set.insert(path);
        }
    }

    pub fn need_all(&mut self, other: &TypingResult) {
        for path in other.needed_correlation.paths().chain(other.needed_data.paths()) {
            self.need(path.clone());
        }
    }

    pub fn provide(&mut self, path: VariablePath, fresh: bool) {
        if path.is_correlation() {
            self.provided_correlation.insert(ProvidedPath { path, fresh });
        } else if !self.provided_data.contains(&path) {
            self.provided_data.insert(path);
        }
    }

    /// Correlation paths are never invalidated.
    pub fn invalidate(&mut self, path: VariablePath) {
        if path.is_correlation() {
            return;
        }
        self.provided_data.remove(&path);
        if !self.invalidated_data.contains(&path) {
            self.invalidated_data.insert(path);
        }
    }

    pub fn is_defined(&self, path: &VariablePath) -> bool {
        self.provided_data.contains(path) || self.provided_correlation.contains(path)
    }

    pub fn register_input(&mut self, operation: ArcStr, starter: bool) {
        if starter {
            self.starting_operation = Some(operation);
        } else {
            self.session_operations.insert(operation);
        }
    }

    pub fn register_operations(&mut self, other: &TypingResult) {
        if self.starting_operation.is_none() {
            self.starting_operation = other.starting_operation.clone();
        }
        self.session_operations
            .extend(other.session_operations.iter().cloned());
    }

    /// Appends `next` to a sequence whose result so far is `self`.
    ///
    /// `running` holds everything defined before `next`: the sequence's entry
    /// plus what earlier statements provided. It is updated with `next`'s
    /// effects so it can serve as the entry of the following statement.
    pub fn then(
        &mut self,
        next: TypingResult,
        running: &mut TypingResult,
        errors: &mut Vec<CorrelationError>,
    ) {
        self.register_operations(&next);

        for path in next.needed_correlation {
            if !running.provided_correlation.contains(&path) {
                self.need(path);
            }
        }
        for path in next.needed_data {
            if !running.provided_data.contains(&path) {
                self.need(path);
            }
        }

        for provided in next.provided_correlation {
            if self.provided_correlation.contains(&provided.path) {
                errors.push(CorrelationError::DefinedMoreThanOnce(
                    provided.path.span(),
                    provided.path,
                ));
                continue;
            }
            running.provided_correlation.insert(provided.clone());
            self.provided_correlation.insert(provided);
        }

        for path in next.provided_data {
            self.invalidated_data.remove(&path);
            running.provide(path.clone(), false);
            self.provide(path, false);
        }

        for path in next.invalidated_data {
            running.invalidate(path.clone());
            self.invalidate(path);
        }
    }

    /// Merges a branch running concurrently with the branches already in `self`.
    pub fn parallel(&mut self, next: TypingResult, errors: &mut Vec<CorrelationError>) {
        self.register_operations(&next);
        self.need_all(&next);

        for provided in next.provided_correlation {
            if self.provided_correlation.contains(&provided.path) {
                errors.push(CorrelationError::DefinedMoreThanOnce(
                    provided.path.span(),
                    provided.path,
                ));
                continue;
            }
            self.provided_correlation.insert(provided);
        }

        self.provided_data.union(&next.provided_data);

        for path in next.invalidated_data {
            self.invalidate(path);
        }
    }

    /// Merges alternative branches, of which exactly one runs.
    ///
    /// Data paths survive only when every branch provides them. Correlation
    /// paths must be provided by every branch, unless the branches start
    /// sessions, in which case each starter may define its own keys.
    pub fn choice(
        span: &Span,
        branches: Vec<TypingResult>,
        kind: BranchKind,
        session_start: bool,
        errors: &mut Vec<CorrelationError>,
    ) -> TypingResult {
        let mut merged = TypingResult::new();
        let Some(first) = branches.first() else {
            return merged;
        };

        for branch in &branches {
            merged.need_all(branch);
            merged.register_operations(branch);
            for path in branch.invalidated_data.paths() {
                merged.invalidate(path.clone());
            }
        }

        merged.provided_data = first.provided_data.clone();
        merged
            .provided_data
            .retain(|path| branches.iter().all(|branch| branch.provided_data.contains(path)));

        for branch in &branches {
            for provided in branch.provided_correlation.iter() {
                match merged.provided_correlation.find_equivalent_mut(&provided.path) {
                    Some(existing) if session_start => existing.fresh |= provided.fresh,
                    Some(existing) => existing.fresh &= provided.fresh,
                    None => {
                        merged.provided_correlation.insert(provided.clone());
                    }
                }
            }
        }

        if session_start {
            for (i, top) in branches.iter().enumerate() {
                let Some(operation) = &top.starting_operation else {
                    continue;
                };
                let conflicting = branches
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && other.session_operations.contains(operation));
                if conflicting {
                    errors.push(CorrelationError::StarterUsedInSession(
                        span.clone(),
                        operation.clone(),
                    ));
                }
            }
            return merged;
        }

        for provided in merged.provided_correlation.iter() {
            let mut freshness = IndexSet::new();
            for branch in &branches {
                match branch.provided_correlation.find_equivalent(&provided.path) {
                    Some(stored) => {
                        freshness.insert(stored.fresh);
                    }
                    None => errors.push(CorrelationError::NotInitializedInEveryBranch(
                        provided.path.span().or(span),
                        provided.path.clone(),
                        kind,
                    )),
                }
            }
            if freshness.len() > 1 {
                errors.push(CorrelationError::FreshnessDiffersAcrossBranches(
                    provided.path.span().or(span),
                    provided.path.clone(),
                ));
            }
        }

        merged
    }

    /// Closes a body that may run any number of times, zero included.
    pub fn repeat(mut self, span: &Span, errors: &mut Vec<CorrelationError>) -> Self {
        if let Some(provided) = self.provided_correlation.iter().next() {
            errors.push(CorrelationError::InitializedInLoop(
                span.clone(),
                provided.path.clone(),
            ));
        }
        self.provided_data.clear();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> VariablePath {
        text.parse().unwrap()
    }

    fn providing(paths: &[(&str, bool)]) -> TypingResult {
        let mut result = TypingResult::new();
        for (text, fresh) in paths {
            result.provide(path(text), *fresh);
        }
        result
    }

    fn needing(paths: &[&str]) -> TypingResult {
        let mut result = TypingResult::new();
        for text in paths {
            result.need(path(text));
        }
        result
    }

    fn sequence(steps: Vec<TypingResult>, errors: &mut Vec<CorrelationError>) -> TypingResult {
        let mut running = TypingResult::new();
        let mut result = TypingResult::new();
        for step in steps {
            result.then(step, &mut running, errors);
        }
        result
    }

    #[test]
    fn sequencing_is_order_sensitive() {
        let mut errors = vec![];
        let forward = sequence(
            vec![providing(&[("csets.sid", true)]), needing(&["csets.sid"])],
            &mut errors,
        );
        assert!(forward.needed_correlation.is_empty());
        assert!(forward.provided_correlation.contains(&path("csets.sid")));

        let backward = sequence(
            vec![needing(&["csets.sid"]), providing(&[("csets.sid", true)])],
            &mut errors,
        );
        assert!(backward.needed_correlation.contains(&path("csets.sid")));
        assert!(errors.is_empty());
    }

    #[test]
    fn sequence_reports_double_correlation_definitions() {
        let mut errors = vec![];
        sequence(
            vec![
                providing(&[("csets.sid", true)]),
                providing(&[("csets.sid", false)]),
            ],
            &mut errors,
        );
        assert!(matches!(
            errors.as_slice(),
            [CorrelationError::DefinedMoreThanOnce(_, p)] if *p == path("csets.sid")
        ));
    }

    #[test]
    fn sequence_invalidation_removes_provided_data() {
        let mut errors = vec![];
        let mut undef = TypingResult::new();
        undef.invalidate(path("x"));
        let result = sequence(
            vec![providing(&[("x", false)]), undef, needing(&["x"])],
            &mut errors,
        );
        assert!(!result.provided_data.contains(&path("x")));
        assert!(result.invalidated_data.contains(&path("x")));
        assert!(result.needed_data.contains(&path("x")));
    }

    #[test]
    fn redefining_clears_invalidation() {
        let mut errors = vec![];
        let mut undef = TypingResult::new();
        undef.invalidate(path("x"));
        let result = sequence(vec![undef, providing(&[("x", false)])], &mut errors);
        assert!(result.provided_data.contains(&path("x")));
        assert!(result.invalidated_data.is_empty());
    }

    #[test]
    fn parallel_branches_cannot_share_correlation_paths() {
        let mut errors = vec![];
        let mut result = providing(&[("csets.sid", true), ("x", false)]);
        result.parallel(providing(&[("csets.sid", true), ("x", false)]), &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(result.provided_data.contains(&path("x")));
    }

    #[test]
    fn parallel_unions_needs_without_seeing_siblings() {
        let mut errors = vec![];
        let mut result = providing(&[("csets.sid", true)]);
        result.parallel(needing(&["csets.sid"]), &mut errors);
        assert!(result.needed_correlation.contains(&path("csets.sid")));
        assert!(errors.is_empty());
    }

    #[test]
    fn choice_weakens_data_provided_by_some_branches() {
        let mut errors = vec![];
        let merged = TypingResult::choice(
            &Span::None,
            vec![providing(&[("d", false), ("e", false)]), providing(&[("e", false)])],
            BranchKind::IfThenElse,
            false,
            &mut errors,
        );
        assert!(!merged.provided_data.contains(&path("d")));
        assert!(!merged.needed_data.contains(&path("d")));
        assert!(merged.provided_data.contains(&path("e")));
        assert!(errors.is_empty());
    }

    #[test]
    fn choice_requires_correlation_in_every_branch() {
        let mut errors = vec![];
        TypingResult::choice(
            &Span::None,
            vec![
                providing(&[("csets.sid", false)]),
                TypingResult::new(),
                providing(&[("csets.sid", false)]),
            ],
            BranchKind::Choice,
            false,
            &mut errors,
        );
        assert!(matches!(
            errors.as_slice(),
            [CorrelationError::NotInitializedInEveryBranch(_, _, BranchKind::Choice)]
        ));
    }

    #[test]
    fn choice_requires_matching_freshness() {
        let mut errors = vec![];
        let merged = TypingResult::choice(
            &Span::None,
            vec![providing(&[("csets.sid", true)]), providing(&[("csets.sid", false)])],
            BranchKind::IfThenElse,
            false,
            &mut errors,
        );
        assert!(matches!(
            errors.as_slice(),
            [CorrelationError::FreshnessDiffersAcrossBranches(..)]
        ));
        let stored = merged.provided_correlation.find_equivalent(&path("csets.sid"));
        assert!(!stored.unwrap().fresh);
    }

    #[test]
    fn session_start_choice_merges_freshness_of_any_branch() {
        let mut errors = vec![];
        let merged = TypingResult::choice(
            &Span::None,
            vec![
                providing(&[("csets.sid", false)]),
                providing(&[("csets.sid", true)]),
                TypingResult::new(),
            ],
            BranchKind::Choice,
            true,
            &mut errors,
        );
        assert!(errors.is_empty());
        let stored = merged.provided_correlation.find_equivalent(&path("csets.sid"));
        assert!(stored.unwrap().fresh);
    }

    #[test]
    fn starter_cannot_continue_another_branch() {
        let mut login = TypingResult::new();
        login.register_input("login".into(), true);
        let mut other = TypingResult::new();
        other.register_input("browse".into(), true);
        other.register_input("login".into(), false);

        let mut errors = vec![];
        TypingResult::choice(
            &Span::None,
            vec![login.clone(), other],
            BranchKind::Choice,
            true,
            &mut errors,
        );
        assert!(matches!(
            errors.as_slice(),
            [CorrelationError::StarterUsedInSession(_, op)] if op == "login"
        ));

        let mut clean = TypingResult::new();
        clean.register_input("browse".into(), true);
        let mut errors = vec![];
        TypingResult::choice(
            &Span::None,
            vec![login, clean],
            BranchKind::Choice,
            true,
            &mut errors,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn loops_reject_correlation_and_forget_data() {
        let mut errors = vec![];
        let mut body = providing(&[("csets.sid", true), ("x", false)]);
        body.need(path("y"));
        let result = body.repeat(&Span::None, &mut errors);
        assert!(matches!(errors.as_slice(), [CorrelationError::InitializedInLoop(..)]));
        assert!(result.provided_data.is_empty());
        assert!(result.needed_data.contains(&path("y")));
    }
}
