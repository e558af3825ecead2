//! Conversion between GraphQL type reference nodes and the IR triple.
//!
//! GraphQL wraps a named type in up to two wrapper kinds (NonNull, List);
//! the IR flattens that to `{name, list, required}`. One simplification is
//! deliberate: the nullability of elements *inside* a list is not tracked,
//! so `[T]`, `[T!]` and the list element of `[T!]!` all reduce to the same
//! triple. Any shape that cannot be represented this way (a list inside a
//! list, for instance) is rejected rather than silently truncated.

use graphql_parser::query::Type as AstType;

use crate::error::CompileError;
use crate::ir;

/// Reduce a type reference node to the IR triple.
///
/// `owner` and `field` name the declaration being processed; they only feed
/// error context.
pub fn type_from_node<'a>(
    node: &AstType<'a, String>,
    owner: &str,
    field: &str,
) -> Result<ir::Type, CompileError> {
    let mut node = node;
    let mut required = false;
    if let AstType::NonNullType(inner) = node {
        required = true;
        node = inner;
    }

    let mut list = false;
    if let AstType::ListType(inner) = node {
        list = true;
        node = inner;
        // element nullability is not represented; peel and move on
        if let AstType::NonNullType(element) = node {
            node = element;
        }
    }

    match node {
        AstType::NamedType(name) => Ok(ir::Type {
            name: name.clone(),
            required,
            list,
        }),
        unsupported => Err(CompileError::UnmappableType {
            owner: owner.to_string(),
            field: field.to_string(),
            rendered: render_node(unsupported),
        }),
    }
}

/// Inverse of `type_from_node`: render the triple back as GraphQL syntax.
///
/// Because element nullability is not tracked, `[T!]!` renders as `[T]!` —
/// the same equivalence class the forward mapping put it in.
pub fn render_type(ty: &ir::Type) -> String {
    let mut out = if ty.list {
        format!("[{}]", ty.name)
    } else {
        ty.name.clone()
    };
    if ty.required {
        out.push('!');
    }
    out
}

/// Render an AST type node for error messages.
pub fn render_node<'a>(node: &AstType<'a, String>) -> String {
    match node {
        AstType::NamedType(name) => name.clone(),
        AstType::ListType(inner) => format!("[{}]", render_node(inner)),
        AstType::NonNullType(inner) => format!("{}!", render_node(inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_type(source: &str) -> AstType<'static, String> {
        // piggyback on the schema parser: declare a field of the type under test
        let sdl = format!("type T {{ f: {source} }}");
        let doc = graphql_parser::parse_schema::<String>(Box::leak(sdl.into_boxed_str()))
            .expect("fixture SDL must parse");
        for definition in doc.definitions {
            if let graphql_parser::schema::Definition::TypeDefinition(
                graphql_parser::schema::TypeDefinition::Object(object),
            ) = definition
            {
                return object.fields.into_iter().next().unwrap().field_type;
            }
        }
        unreachable!("fixture SDL had no object type");
    }

    #[test]
    fn named_type_maps_to_bare_triple() {
        let ty = type_from_node(&parse_type("String"), "T", "f").unwrap();
        assert_eq!(
            ty,
            ir::Type {
                name: "String".into(),
                required: false,
                list: false,
            }
        );
    }

    #[test]
    fn wrappers_set_required_and_list() {
        let ty = type_from_node(&parse_type("[String]!"), "T", "f").unwrap();
        assert!(ty.required && ty.list);
        assert_eq!(ty.name, "String");

        let ty = type_from_node(&parse_type("String!"), "T", "f").unwrap();
        assert!(ty.required && !ty.list);
    }

    #[test]
    fn inner_non_null_collapses_into_the_list() {
        let inner = type_from_node(&parse_type("[String!]!"), "T", "f").unwrap();
        let outer = type_from_node(&parse_type("[String]!"), "T", "f").unwrap();
        assert_eq!(inner, outer);
    }

    #[test]
    fn round_trip_reproduces_wrapper_structure() {
        for source in ["String", "String!", "[String]", "[String]!"] {
            let ty = type_from_node(&parse_type(source), "T", "f").unwrap();
            assert_eq!(render_type(&ty), source);
        }
        // [String!]! lands in the [String]! equivalence class
        let ty = type_from_node(&parse_type("[String!]!"), "T", "f").unwrap();
        assert_eq!(render_type(&ty), "[String]!");
    }

    #[test]
    fn nested_lists_are_rejected() {
        let err = type_from_node(&parse_type("[[String]]"), "T", "f").unwrap_err();
        match err {
            CompileError::UnmappableType { owner, field, rendered } => {
                assert_eq!(owner, "T");
                assert_eq!(field, "f");
                assert_eq!(rendered, "[String]");
            }
            other => panic!("expected UnmappableType, got {other:?}"),
        }
    }
}
