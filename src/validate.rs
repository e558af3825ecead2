//! Structural validation of operation documents.
//!
//! Compilation maps one operation to one RPC, and the proto response must be
//! mechanically reversible into the GraphQL shape the operation asked for.
//! That forces two preconditions, checked in order (first violation wins):
//!
//! 1. exactly one named operation per document (the RPC takes its name from
//!    it), and
//! 2. no alias on any root-level field (the response message field names
//!    must equal the root field names). Nested aliases are fine; they are
//!    re-applied client-side when the response is mapped back.

use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    VariableDefinition,
};
use indexmap::IndexMap;

use crate::error::{CompileError, ValidationError};
use crate::ir::RpcKind;

/// The single operation of a document, plus its fragment definitions,
/// ready for compilation.
#[derive(Debug)]
pub struct ValidatedOperation<'a> {
    pub name: String,
    pub kind: RpcKind,
    pub variables: &'a [VariableDefinition<'a, String>],
    pub selection_set: &'a SelectionSet<'a, String>,
    pub fragments: Vec<&'a FragmentDefinition<'a, String>>,
}

pub fn validate<'a>(
    document: &'a Document<'a, String>,
) -> Result<ValidatedOperation<'a>, CompileError> {
    let mut operations = Vec::new();
    let mut fragments = Vec::new();
    for definition in &document.definitions {
        match definition {
            Definition::Operation(operation) => operations.push(operation),
            Definition::Fragment(fragment) => fragments.push(fragment),
        }
    }

    if operations.len() > 1 {
        let names = operations
            .iter()
            .map(|operation| {
                operation_parts(operation)
                    .0
                    .cloned()
                    .unwrap_or_else(|| "(anonymous)".to_string())
            })
            .collect();
        return Err(ValidationError::MultipleOperations { names }.into());
    }

    let Some(&operation) = operations.first() else {
        return Err(ValidationError::NoNamedOperations.into());
    };
    let (name, kind, variables, selection_set) = operation_parts(operation);
    let Some(name) = name else {
        // an anonymous operation cannot name an RPC
        return Err(ValidationError::NoNamedOperations.into());
    };

    let by_name: IndexMap<&str, &FragmentDefinition<'a, String>> = fragments
        .iter()
        .map(|fragment| (fragment.name.as_str(), *fragment))
        .collect();
    check_root_aliases(selection_set, &by_name, &mut Vec::new())?;

    Ok(ValidatedOperation {
        name: name.clone(),
        kind,
        variables,
        selection_set,
        fragments,
    })
}

fn operation_parts<'b, 'a>(
    operation: &'b OperationDefinition<'a, String>,
) -> (
    Option<&'b String>,
    RpcKind,
    &'b [VariableDefinition<'a, String>],
    &'b SelectionSet<'a, String>,
) {
    match operation {
        OperationDefinition::SelectionSet(set) => (None, RpcKind::Query, &[], set),
        OperationDefinition::Query(query) => (
            query.name.as_ref(),
            RpcKind::Query,
            &query.variable_definitions,
            &query.selection_set,
        ),
        OperationDefinition::Mutation(mutation) => (
            mutation.name.as_ref(),
            RpcKind::Mutation,
            &mutation.variable_definitions,
            &mutation.selection_set,
        ),
        OperationDefinition::Subscription(subscription) => (
            subscription.name.as_ref(),
            RpcKind::Subscription,
            &subscription.variable_definitions,
            &subscription.selection_set,
        ),
    }
}

/// Root-level fields reached through fragment spreads or inline fragments
/// count as root-level; `visited` guards against spread cycles (the cycle
/// itself is reported later, during inlining).
fn check_root_aliases<'a>(
    set: &'a SelectionSet<'a, String>,
    fragments: &IndexMap<&str, &'a FragmentDefinition<'a, String>>,
    visited: &mut Vec<&'a str>,
) -> Result<(), CompileError> {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    return Err(ValidationError::RootFieldAlias {
                        alias: alias.clone(),
                        field: field.name.clone(),
                    }
                    .into());
                }
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                if visited.iter().any(|seen| *seen == name) {
                    continue;
                }
                if let Some(fragment) = fragments.get(name) {
                    visited.push(name);
                    check_root_aliases(&fragment.selection_set, fragments, visited)?;
                }
            }
            Selection::InlineFragment(inline) => {
                check_root_aliases(&inline.selection_set, fragments, visited)?;
            }
        }
    }
    Ok(())
}
