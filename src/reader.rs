//! SDL reader: walks GraphQL schema definitions and produces the IR
//! `Service`.
//!
//! Object types named `Query`/`Mutation`/`Subscription` contribute one RPC
//! per field; every other object type and input-object type becomes a
//! message. Definition kinds with no proto mapping (scalars, interfaces,
//! unions, enums, directives, type extensions) are collected as diagnostics
//! instead of silently disappearing; the caller chooses their severity.
//!
//! Determinism: fields, arguments and RPCs are kept in source declaration
//! order, so the same SDL text always produces the same IR.

use graphql_parser::schema::{
    Definition, Document, Field as SchemaField, InputObjectType, ObjectType, TypeDefinition,
    TypeExtension,
};
use graphql_parser::Pos;
use indexmap::IndexMap;

use crate::error::{CompileError, Diagnostic, ParseContext, UnsupportedKind};
use crate::ir::{self, Rpc, RpcKind, Service, ServiceBuilder};
use crate::type_map::type_from_node;

/// Output of the SDL pass: the service IR plus soft diagnostics.
#[derive(Debug, Clone)]
pub struct SdlIntermediate {
    pub service: Service,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse SDL text and lower it to the intermediate `Service`.
pub fn into_intermediate(service_name: &str, sdl: &str) -> Result<SdlIntermediate, CompileError> {
    let document = parse_sdl(sdl)?;
    let (service, diagnostics) = lower_document(service_name, &document)?;
    Ok(SdlIntermediate {
        service,
        diagnostics,
    })
}

pub(crate) fn parse_sdl(sdl: &str) -> Result<Document<'_, String>, CompileError> {
    graphql_parser::parse_schema::<String>(sdl)
        .map_err(|error| CompileError::parse(ParseContext::Sdl, error))
}

pub(crate) fn lower_document<'a>(
    service_name: &str,
    document: &'a Document<'a, String>,
) -> Result<(Service, Vec<Diagnostic>), CompileError> {
    let diagnostics = document_diagnostics(document);
    let mut builder = ServiceBuilder::new(service_name);

    for definition in &document.definitions {
        let Definition::TypeDefinition(type_definition) = definition else {
            // everything else is covered by the diagnostics pass
            continue;
        };
        match type_definition {
            TypeDefinition::Object(object) => match root_kind(&object.name) {
                Some(kind) => {
                    for field in &object.fields {
                        builder.add_rpc(rpc_from_field(kind, field)?);
                    }
                }
                None => builder.add_message(object_message(object)?)?,
            },
            TypeDefinition::InputObject(input) => {
                builder.add_message(input_message(input)?)?;
            }
            TypeDefinition::Scalar(_)
            | TypeDefinition::Interface(_)
            | TypeDefinition::Union(_)
            | TypeDefinition::Enum(_) => {}
        }
    }

    Ok((builder.build()?, diagnostics))
}

/// Definitions with no proto mapping, in source order. Shared by both
/// compilation modes so unsupported constructs never vanish silently.
pub(crate) fn document_diagnostics<'a>(document: &Document<'a, String>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for definition in &document.definitions {
        match definition {
            // schema { query: ... } carries no type data of its own
            Definition::SchemaDefinition(_) => {}
            Definition::TypeDefinition(type_definition) => match type_definition {
                TypeDefinition::Object(_) | TypeDefinition::InputObject(_) => {}
                TypeDefinition::Scalar(scalar) => {
                    diagnostics.push(unsupported(
                        UnsupportedKind::Scalar,
                        &scalar.name,
                        scalar.position,
                    ));
                }
                TypeDefinition::Interface(interface) => {
                    diagnostics.push(unsupported(
                        UnsupportedKind::Interface,
                        &interface.name,
                        interface.position,
                    ));
                }
                TypeDefinition::Union(union) => {
                    diagnostics.push(unsupported(
                        UnsupportedKind::Union,
                        &union.name,
                        union.position,
                    ));
                }
                TypeDefinition::Enum(enumeration) => {
                    diagnostics.push(unsupported(
                        UnsupportedKind::Enum,
                        &enumeration.name,
                        enumeration.position,
                    ));
                }
            },
            Definition::TypeExtension(extension) => {
                let (name, position) = extension_name(extension);
                diagnostics.push(unsupported(UnsupportedKind::TypeExtension, name, position));
            }
            Definition::DirectiveDefinition(directive) => {
                diagnostics.push(unsupported(
                    UnsupportedKind::Directive,
                    &directive.name,
                    directive.position,
                ));
            }
        }
    }
    diagnostics
}

fn root_kind(name: &str) -> Option<RpcKind> {
    match name {
        "Query" => Some(RpcKind::Query),
        "Mutation" => Some(RpcKind::Mutation),
        "Subscription" => Some(RpcKind::Subscription),
        _ => None,
    }
}

fn rpc_from_field<'a>(
    kind: RpcKind,
    field: &SchemaField<'a, String>,
) -> Result<Rpc, CompileError> {
    let ty = type_from_node(&field.field_type, kind.root_type_name(), &field.name)?;
    let mut arguments = Vec::with_capacity(field.arguments.len());
    for argument in &field.arguments {
        let argument_ty = type_from_node(&argument.value_type, &field.name, &argument.name)?;
        arguments.push(ir::Field::new(argument.name.clone(), argument_ty));
    }
    Ok(Rpc {
        name: field.name.clone(),
        kind,
        ty,
        arguments,
    })
}

/// Object type → message, fields 1:1 in declaration order. Arguments on
/// non-root fields have no message representation and are dropped.
pub(crate) fn object_message<'a>(
    object: &ObjectType<'a, String>,
) -> Result<ir::Message, CompileError> {
    let mut message = ir::Message::new(object.name.clone());
    for field in &object.fields {
        let ty = type_from_node(&field.field_type, &object.name, &field.name)?;
        message.fields.push(ir::Field::new(field.name.clone(), ty));
    }
    Ok(message)
}

pub(crate) fn input_message<'a>(
    input: &InputObjectType<'a, String>,
) -> Result<ir::Message, CompileError> {
    let mut message = ir::Message::new(input.name.clone());
    for field in &input.fields {
        let ty = type_from_node(&field.value_type, &input.name, &field.name)?;
        message.fields.push(ir::Field::new(field.name.clone(), ty));
    }
    Ok(message)
}

fn extension_name<'b, 'a>(extension: &'b TypeExtension<'a, String>) -> (&'b str, Pos) {
    match extension {
        TypeExtension::Scalar(e) => (&e.name, e.position),
        TypeExtension::Object(e) => (&e.name, e.position),
        TypeExtension::Interface(e) => (&e.name, e.position),
        TypeExtension::Union(e) => (&e.name, e.position),
        TypeExtension::Enum(e) => (&e.name, e.position),
        TypeExtension::InputObject(e) => (&e.name, e.position),
    }
}

fn unsupported(kind: UnsupportedKind, name: &str, position: Pos) -> Diagnostic {
    Diagnostic {
        kind,
        name: name.to_string(),
        line: position.line,
        column: position.column,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA INDEX
// ————————————————————————————————————————————————————————————————————————————

/// Name → definition lookup over a parsed schema document, shared by the
/// operation compiler for selection resolution.
pub(crate) struct SchemaIndex<'a> {
    types: IndexMap<&'a str, TypeEntry<'a>>,
}

pub(crate) enum TypeEntry<'a> {
    Object(&'a ObjectType<'a, String>),
    InputObject(&'a InputObjectType<'a, String>),
    Scalar,
    Interface,
    Union,
    Enum,
}

const BUILTIN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

impl<'a> SchemaIndex<'a> {
    pub fn build(document: &'a Document<'a, String>) -> Self {
        let mut types = IndexMap::new();
        for definition in &document.definitions {
            let Definition::TypeDefinition(type_definition) = definition else {
                continue;
            };
            let (name, entry) = match type_definition {
                TypeDefinition::Object(object) => {
                    (object.name.as_str(), TypeEntry::Object(object))
                }
                TypeDefinition::InputObject(input) => {
                    (input.name.as_str(), TypeEntry::InputObject(input))
                }
                TypeDefinition::Scalar(scalar) => (scalar.name.as_str(), TypeEntry::Scalar),
                TypeDefinition::Interface(interface) => {
                    (interface.name.as_str(), TypeEntry::Interface)
                }
                TypeDefinition::Union(union) => (union.name.as_str(), TypeEntry::Union),
                TypeDefinition::Enum(enumeration) => {
                    (enumeration.name.as_str(), TypeEntry::Enum)
                }
            };
            types.insert(name, entry);
        }
        SchemaIndex { types }
    }

    pub fn entry(&self, name: &str) -> Option<&TypeEntry<'a>> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&'a ObjectType<'a, String>> {
        match self.types.get(name) {
            Some(TypeEntry::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn root(&self, kind: RpcKind) -> Option<&'a ObjectType<'a, String>> {
        self.object(kind.root_type_name())
    }

    pub fn is_builtin_scalar(name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;

    const USER_SDL: &str = "
        type Query {
            user(id: ID!): User
        }

        type User {
            id: ID!
            name: String
        }
    ";

    #[test]
    fn root_fields_become_rpcs() {
        let out = into_intermediate("UserService", USER_SDL).unwrap();
        assert_eq!(out.service.rpcs.len(), 1);

        let rpc = &out.service.rpcs[0];
        assert_eq!(rpc.name, "user");
        assert_eq!(rpc.kind, RpcKind::Query);
        assert_eq!(
            rpc.ty,
            Type {
                name: "User".into(),
                required: false,
                list: false,
            }
        );
        assert_eq!(rpc.arguments.len(), 1);
        assert_eq!(rpc.arguments[0].name, "id");
        assert!(rpc.arguments[0].ty.required);
        assert_eq!(rpc.arguments[0].ty.name, "ID");
    }

    #[test]
    fn object_types_become_messages_in_declaration_order() {
        let out = into_intermediate("UserService", USER_SDL).unwrap();
        let user = &out.service.messages["User"];
        let names: Vec<&str> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name"]);
        assert!(user.fields[0].ty.required);
        assert!(!user.fields[1].ty.required);
    }

    #[test]
    fn input_object_types_become_messages() {
        let sdl = "
            type Query { ping: String }
            input CreateUserInput {
                name: String!
                tags: [String]
            }
        ";
        let out = into_intermediate("S", sdl).unwrap();
        let input = &out.service.messages["CreateUserInput"];
        assert_eq!(input.fields.len(), 2);
        assert!(input.fields[1].ty.list);
    }

    #[test]
    fn mutation_and_subscription_fields_get_their_kind() {
        let sdl = "
            type Query { ping: String }
            type Mutation { createUser(name: String!): ID }
            type Subscription { userAdded: ID }
        ";
        let out = into_intermediate("S", sdl).unwrap();
        let kinds: Vec<RpcKind> = out.service.rpcs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [RpcKind::Query, RpcKind::Mutation, RpcKind::Subscription]
        );
    }

    #[test]
    fn unsupported_definitions_are_diagnosed_not_dropped() {
        let sdl = "
            type Query { ping: String }
            scalar DateTime
            interface Node { id: ID! }
            union Pet = Dog | Cat
            enum Role { ADMIN USER }
            directive @cached on FIELD_DEFINITION
            type Dog { id: ID! }
            type Cat { id: ID! }
        ";
        let out = into_intermediate("S", sdl).unwrap();
        let kinds: Vec<UnsupportedKind> = out.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [
                UnsupportedKind::Scalar,
                UnsupportedKind::Interface,
                UnsupportedKind::Union,
                UnsupportedKind::Enum,
                UnsupportedKind::Directive,
            ]
        );
        assert_eq!(out.diagnostics[0].name, "DateTime");
        // the convertible definitions still landed
        assert!(out.service.messages.contains_key("Dog"));
        assert!(out.service.messages.contains_key("Cat"));
    }

    #[test]
    fn duplicate_type_names_collide() {
        let sdl = "
            type Query { ping: String }
            type User { id: ID! }
            type User { name: String }
        ";
        let err = into_intermediate("S", sdl).unwrap_err();
        assert!(matches!(err, CompileError::NameCollision { .. }));
    }

    #[test]
    fn nested_list_in_sdl_is_a_compile_error() {
        let sdl = "
            type Query { ping: String }
            type Matrix { cells: [[Int]] }
        ";
        let err = into_intermediate("S", sdl).unwrap_err();
        assert!(matches!(err, CompileError::UnmappableType { .. }));
    }

    #[test]
    fn reader_is_deterministic() {
        let a = into_intermediate("S", USER_SDL).unwrap();
        let b = into_intermediate("S", USER_SDL).unwrap();
        assert_eq!(a.service, b.service);
    }

    #[test]
    fn malformed_sdl_is_a_parse_error() {
        let err = into_intermediate("S", "type Query {").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse {
                context: ParseContext::Sdl,
                ..
            }
        ));
    }
}
