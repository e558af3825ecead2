//! Operation compiler: one validated operation document + the schema it is
//! written against → a synthesized request/response message pair, one RPC,
//! and the emitted proto text.
//!
//! The pipeline is: validate (see `validate`), inline fragment spreads as a
//! structural substitution pass, resolve the fragment-free selection tree
//! against the schema, synthesize messages, emit. Inlining runs before
//! resolution so the recursive field walk never carries fragment state.

use graphql_parser::query::{
    Document, Field as QueryField, FragmentDefinition, Selection, SelectionSet, TypeCondition,
};
use graphql_parser::schema::ObjectType;
use indexmap::IndexMap;

use crate::emit::{emit, EmitOptions};
use crate::error::{CompileError, Diagnostic, ParseContext};
use crate::ir::{self, Rpc, ServiceBuilder};
use crate::ledger::FieldLedger;
use crate::naming::{pascal_case, request_message_name, response_message_name};
use crate::reader::{self, SchemaIndex, TypeEntry};
use crate::type_map::type_from_node;
use crate::validate::validate;
use crate::CompileOptions;

#[derive(Debug, Clone)]
pub struct OperationCompilation {
    pub proto: String,
    /// The RPC (and operation) name; the caller uses it to route responses
    /// back to the operation.
    pub rpc_name: String,
    pub lock: FieldLedger,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile the single operation in `operation_text` against `schema_text`.
pub fn compile_operations_to_proto(
    operation_text: &str,
    schema_text: &str,
    options: CompileOptions,
) -> Result<OperationCompilation, CompileError> {
    let schema_document = reader::parse_sdl(schema_text)?;
    let index = SchemaIndex::build(&schema_document);
    let diagnostics = reader::document_diagnostics(&schema_document);

    let operation_document = parse_operations(operation_text)?;
    let validated = validate(&operation_document)?;
    let rpc_name = validated.name.clone();

    let fragments = fragment_map(&validated.fragments)?;
    let root = index
        .root(validated.kind)
        .ok_or(CompileError::MissingRootType(validated.kind))?;

    let inlined = inline_selection_set(
        validated.selection_set,
        &fragments,
        &mut Vec::new(),
        None,
    )?;
    let resolved = resolve_fields(&inlined, root, &index)?;

    let mut request_fields = Vec::with_capacity(validated.variables.len());
    for variable in validated.variables {
        let ty = type_from_node(&variable.var_type, &rpc_name, &variable.name)?;
        request_fields.push(ir::Field::new(variable.name.clone(), ty));
    }

    let request_name = request_message_name(&rpc_name);
    let response_name = response_message_name(&rpc_name);

    let mut request = ir::Message::new(request_name);
    request.fields = request_fields.clone();
    let response = message_from_resolved(response_name.clone(), &resolved);

    let mut builder = ServiceBuilder::new(options.service_name.clone());
    builder.add_message(request)?;
    builder.add_message(response)?;
    collect_referenced_messages(&mut builder, &index, &request_fields)?;
    builder.add_rpc(Rpc {
        name: rpc_name.clone(),
        kind: validated.kind,
        ty: ir::Type {
            name: response_name,
            required: true,
            list: false,
        },
        arguments: request_fields,
    });
    let service = builder.build()?;

    let mut ledger = options.lock.unwrap_or_default();
    let proto = emit(
        &service,
        &mut ledger,
        &EmitOptions {
            package: options.package,
        },
    );

    Ok(OperationCompilation {
        proto,
        rpc_name,
        lock: ledger,
        diagnostics,
    })
}

fn parse_operations(text: &str) -> Result<Document<'_, String>, CompileError> {
    graphql_parser::parse_query::<String>(text)
        .map_err(|error| CompileError::parse(ParseContext::Operation, error))
}

fn fragment_map<'a>(
    fragments: &[&'a FragmentDefinition<'a, String>],
) -> Result<IndexMap<&'a str, &'a FragmentDefinition<'a, String>>, CompileError> {
    let mut map = IndexMap::new();
    for &fragment in fragments {
        if map.insert(fragment.name.as_str(), fragment).is_some() {
            return Err(CompileError::DuplicateFragment(fragment.name.clone()));
        }
    }
    Ok(map)
}

// ————————————————————————————————————————————————————————————————————————————
// FRAGMENT INLINING (structural substitution, no schema access)
// ————————————————————————————————————————————————————————————————————————————

/// A field with every fragment spread around or below it substituted away.
struct InlinedField<'a> {
    node: &'a QueryField<'a, String>,
    /// Fragment name and type condition this field was spliced through, if
    /// any. Checked against the enclosing type during resolution.
    via: Option<SpreadOrigin<'a>>,
    children: Vec<InlinedField<'a>>,
}

struct SpreadOrigin<'a> {
    fragment: &'a str,
    condition: &'a str,
}

fn inline_selection_set<'a>(
    set: &'a SelectionSet<'a, String>,
    fragments: &IndexMap<&'a str, &'a FragmentDefinition<'a, String>>,
    stack: &mut Vec<&'a str>,
    via: Option<&SpreadOrigin<'a>>,
) -> Result<Vec<InlinedField<'a>>, CompileError> {
    let mut out = Vec::new();
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                let children =
                    inline_selection_set(&field.selection_set, fragments, stack, None)?;
                out.push(InlinedField {
                    node: field,
                    via: via.map(|origin| SpreadOrigin {
                        fragment: origin.fragment,
                        condition: origin.condition,
                    }),
                    children,
                });
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                let fragment = fragments
                    .get(name)
                    .copied()
                    .ok_or_else(|| CompileError::UnknownFragment(name.to_string()))?;
                if stack.iter().any(|seen| *seen == name) {
                    let mut cycle: Vec<&str> = stack.clone();
                    cycle.push(name);
                    return Err(CompileError::CircularFragment(cycle.join(" -> ")));
                }
                let TypeCondition::On(condition) = &fragment.type_condition;
                let origin = SpreadOrigin {
                    fragment: name,
                    condition,
                };
                stack.push(name);
                let spliced =
                    inline_selection_set(&fragment.selection_set, fragments, stack, Some(&origin))?;
                stack.pop();
                out.extend(spliced);
            }
            Selection::InlineFragment(inline) => {
                let origin = inline.type_condition.as_ref().map(|condition| {
                    let TypeCondition::On(name) = condition;
                    SpreadOrigin {
                        fragment: "",
                        condition: name,
                    }
                });
                let spliced = inline_selection_set(
                    &inline.selection_set,
                    fragments,
                    stack,
                    origin.as_ref().or(via),
                )?;
                out.extend(spliced);
            }
        }
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// SELECTION RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

/// A selection field with its schema type resolved.
struct ResolvedField {
    name: String,
    ty: ir::Type,
    children: Vec<ResolvedField>,
}

fn resolve_fields<'a>(
    inlined: &[InlinedField<'a>],
    parent: &'a ObjectType<'a, String>,
    index: &SchemaIndex<'a>,
) -> Result<Vec<ResolvedField>, CompileError> {
    let mut resolved: IndexMap<String, ResolvedField> = IndexMap::new();
    for item in inlined {
        if let Some(origin) = &item.via {
            if origin.condition != parent.name {
                let name = if origin.fragment.is_empty() {
                    format!("... on {}", origin.condition)
                } else {
                    origin.fragment.to_string()
                };
                return Err(CompileError::FragmentTypeMismatch {
                    name,
                    parent: parent.name.clone(),
                });
            }
        }

        let field_name = item.node.name.as_str();
        if resolved.contains_key(field_name) {
            // the same field selected twice (often via overlapping
            // fragments) collapses into one proto field
            continue;
        }

        let definition = parent
            .fields
            .iter()
            .find(|field| field.name == field_name)
            .ok_or_else(|| CompileError::UnknownField {
                parent: parent.name.clone(),
                field: field_name.to_string(),
            })?;
        let ty = type_from_node(&definition.field_type, &parent.name, field_name)?;

        let children = match index.entry(&ty.name) {
            Some(TypeEntry::Object(child)) => {
                if item.children.is_empty() {
                    return Err(CompileError::MissingSubselection {
                        field: field_name.to_string(),
                        ty: ty.name.clone(),
                    });
                }
                resolve_fields(&item.children, child, index)?
            }
            _ => {
                if !item.children.is_empty() {
                    return Err(CompileError::UnexpectedSubselection {
                        field: field_name.to_string(),
                        ty: ty.name.clone(),
                    });
                }
                Vec::new()
            }
        };

        resolved.insert(
            field_name.to_string(),
            ResolvedField {
                name: field_name.to_string(),
                ty,
                children,
            },
        );
    }
    Ok(resolved.into_values().collect())
}

// ————————————————————————————————————————————————————————————————————————————
// MESSAGE SYNTHESIS
// ————————————————————————————————————————————————————————————————————————————

/// Selection tree → message. Sub-object selections become messages nested
/// inside the parent, named after the field.
fn message_from_resolved(name: String, fields: &[ResolvedField]) -> ir::Message {
    let mut message = ir::Message::new(name);
    for resolved in fields {
        if resolved.children.is_empty() {
            message
                .fields
                .push(ir::Field::new(resolved.name.clone(), resolved.ty.clone()));
        } else {
            let nested_name = pascal_case(&resolved.name);
            let nested = message_from_resolved(nested_name.clone(), &resolved.children);
            message.nested.push(nested);
            let mut field = ir::Field::placeholder(resolved.name.clone());
            field.resolve(ir::Type {
                name: nested_name,
                required: resolved.ty.required,
                list: resolved.ty.list,
            });
            message.fields.push(field);
        }
    }
    message
}

/// Pull schema messages the request fields reference (input objects, plus
/// anything those reference in turn) into the service.
fn collect_referenced_messages<'a>(
    builder: &mut ServiceBuilder,
    index: &SchemaIndex<'a>,
    seeds: &[ir::Field],
) -> Result<(), CompileError> {
    let mut queue: Vec<String> = seeds.iter().map(|field| field.ty.name.clone()).collect();
    while let Some(name) = queue.pop() {
        if SchemaIndex::is_builtin_scalar(&name) || builder.has_message(&name) {
            continue;
        }
        let message = match index.entry(&name) {
            Some(TypeEntry::InputObject(input)) => reader::input_message(input)?,
            Some(TypeEntry::Object(object)) => reader::object_message(object)?,
            // scalars, enums and friends are diagnosed at the document level
            _ => continue,
        };
        for field in &message.fields {
            queue.push(field.ty.name.clone());
        }
        builder.add_message(message)?;
    }
    Ok(())
}
