use super::language::{CorrelationSet, CorrelationVariable};
use super::path::VariablePath;
use super::typing::CorrelationError;
use crate::location::{Span, Spanning};
use arcstr::ArcStr;
use indexmap::IndexMap;

impl CorrelationVariable {
    pub fn correlation_path(&self, span: Span) -> VariablePath {
        VariablePath::correlation(span, &self.path)
    }
}

/// The declared correlation sets, and which set routes each operation.
#[derive(Clone, Debug, Default)]
pub struct CorrelationInfo {
    sets: IndexMap<ArcStr, CorrelationSet>,
    operations: IndexMap<ArcStr, ArcStr>,
}

impl CorrelationInfo {
    /// Builds the operation index from the aliases of every correlation
    /// variable. An operation aliased by two sets keeps the first one.
    pub fn index(sets: &[CorrelationSet]) -> (Self, Vec<CorrelationError>) {
        let mut info = Self::default();
        let mut errors = Vec::new();

        for set in sets {
            if let Some(previous) = info.sets.get(&set.name) {
                errors.push(CorrelationError::CorrelationSetAlreadyDeclared(
                    set.span.clone(),
                    previous.span.clone(),
                    set.name.clone(),
                ));
                continue;
            }
            info.sets.insert(set.name.clone(), set.clone());

            for variable in &set.variables {
                for alias in &variable.aliases {
                    if let Err(error) = info.map_operation(&alias.operation, &set.name) {
                        errors.push(error.with_span(alias.path.span().or(&set.span)));
                    }
                }
            }
        }

        (info, errors)
    }

    pub fn map_operation(
        &mut self,
        operation: &ArcStr,
        set: &ArcStr,
    ) -> Result<(), CorrelationError> {
        match self.operations.get(operation) {
            Some(existing) if existing != set => Err(CorrelationError::OperationInManySets(
                Span::None,
                operation.clone(),
                existing.clone(),
                set.clone(),
            )),
            Some(_) => Ok(()),
            None => {
                self.operations.insert(operation.clone(), set.clone());
                Ok(())
            }
        }
    }

    pub fn set_for(&self, operation: &str) -> Option<&CorrelationSet> {
        self.operations
            .get(operation)
            .and_then(|name| self.sets.get(name))
    }

    pub fn sets(&self) -> impl Iterator<Item = &CorrelationSet> {
        self.sets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::language::CorrelationAlias;

    fn set(name: &str, variables: Vec<(&str, Vec<&str>)>) -> CorrelationSet {
        CorrelationSet {
            span: Span::at_line("shop.ol", 2),
            name: name.into(),
            variables: variables
                .into_iter()
                .map(|(path, operations)| CorrelationVariable {
                    path: path.parse().unwrap(),
                    aliases: operations
                        .into_iter()
                        .map(|operation| CorrelationAlias {
                            operation: operation.into(),
                            path: path.parse().unwrap(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn operations_are_indexed_through_aliases() {
        let (info, errors) = CorrelationInfo::index(&[
            set("session", vec![("sid", vec!["checkout", "logout"])]),
            set("cart", vec![("cart", vec!["addItem"]), ("owner", vec!["addItem"])]),
        ]);
        assert!(errors.is_empty());
        assert_eq!(info.set_for("logout").unwrap().name, "session");
        assert_eq!(info.set_for("addItem").unwrap().name, "cart");
        assert!(info.set_for("login").is_none());
        assert_eq!(info.set_for("checkout").unwrap().name, "session");
    }

    #[test]
    fn an_operation_in_two_sets_is_reported() {
        let (info, errors) = CorrelationInfo::index(&[
            set("a", vec![("x", vec!["op"])]),
            set("b", vec![("y", vec!["op"])]),
        ]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            CorrelationError::OperationInManySets(_, op, first, second)
                if op == "op" && first == "a" && second == "b"
        ));
        assert_eq!(errors[0].span().line(), Some(2));
        assert_eq!(info.set_for("op").unwrap().name, "a");
    }

    #[test]
    fn correlation_path_is_rooted() {
        let set = set("s", vec![("user.key", vec![])]);
        let path = set.variables[0].correlation_path(Span::None);
        assert!(path.is_correlation());
        assert_eq!(path.to_string(), "csets.user.key");
    }

    #[test]
    fn duplicate_set_names_are_reported() {
        let (info, errors) = CorrelationInfo::index(&[
            set("s", vec![("x", vec!["a"])]),
            set("s", vec![("y", vec!["b"])]),
        ]);
        assert_eq!(errors.len(), 1);
        assert!(info.set_for("b").is_none());
    }
}
