use super::context::{Checker, INIT, MAIN};
use super::error::CorrelationError;
use super::result::TypingResult;
use crate::location::{Span, Spanning};
use crate::session::language::CorrelationSet;

impl Checker<'_> {
    /// Whole-program checks on `main`, run after every definition is typed.
    ///
    /// Returns the typing of a session: `init` followed by `main`.
    pub fn verify_main(&mut self) -> Option<TypingResult> {
        let Some(main) = self.typings.get(MAIN).cloned() else {
            let span = Span::at_line(self.program.file.clone(), 1);
            self.report(CorrelationError::MainNotFound(span));
            return None;
        };

        let session = match self.typings.get(INIT).cloned() {
            Some(init) => {
                let mut running = init.provisions();
                let mut session = init;
                let mut errors = Vec::new();
                session.then(main, &mut running, &mut errors);
                self.report_all(errors);
                session
            }
            None => main,
        };

        for path in session.needed_correlation.paths() {
            self.report(CorrelationError::NotInitialized(path.span(), path.clone()));
        }
        for path in session.needed_data.paths() {
            self.report(CorrelationError::VariableNotInitialized(
                path.span(),
                path.clone(),
            ));
        }

        let sets: Vec<CorrelationSet> = self.correlation.sets().cloned().collect();
        for set in &sets {
            if !has_fresh_value(set, &session) {
                self.report(CorrelationError::NoFreshValue(
                    set.span.clone(),
                    set.name.clone(),
                ));
            }
        }

        Some(session)
    }
}

/// A set none of whose variables is ever provided is unused and passes.
fn has_fresh_value(set: &CorrelationSet, session: &TypingResult) -> bool {
    let mut used = false;
    for variable in &set.variables {
        let path = variable.correlation_path(Span::None);
        if let Some(provided) = session.provided_correlation.find_equivalent(&path) {
            if provided.fresh {
                return true;
            }
            used = true;
        }
    }
    !used
}
