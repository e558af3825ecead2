//! Proto IDL emitter: serializes an IR `Service` to proto3 text.
//!
//! Two shapes of RPC exist in the IR. Operation-compiled RPCs already carry
//! their request/response messages (named `<Rpc>Request`/`<Rpc>Response`);
//! SDL-derived RPCs carry only an argument list and a return type, so the
//! emitter synthesizes the pair, deriving the method name as
//! `<Kind><PascalCase(field)>` to keep equally named Query and Mutation
//! fields apart.
//!
//! Field numbers always come from the ledger, never from positions, so an
//! additive schema edit keeps every existing number and a removed field
//! leaves its number behind as `reserved`.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ir::{Field, Message, Rpc, RpcKind, Service, Type};
use crate::ledger::FieldLedger;
use crate::naming::{pascal_case, proto_field_name, request_message_name, response_message_name};

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub package: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            package: "service.v1".to_string(),
        }
    }
}

static SCALAR_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ID", "string"),
        ("String", "string"),
        ("Int", "int32"),
        ("Float", "double"),
        ("Boolean", "bool"),
    ])
});

/// Wrapper types let an unset optional scalar be told apart from its zero
/// value, matching GraphQL null semantics.
static SCALAR_WRAPPER_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ID", "google.protobuf.StringValue"),
        ("String", "google.protobuf.StringValue"),
        ("Int", "google.protobuf.Int32Value"),
        ("Float", "google.protobuf.DoubleValue"),
        ("Boolean", "google.protobuf.BoolValue"),
    ])
});

pub fn emit(service: &Service, ledger: &mut FieldLedger, options: &EmitOptions) -> String {
    let mut uses_wrappers = false;
    let mut blocks: Vec<String> = Vec::new();

    let plans: Vec<RpcPlan> = service
        .rpcs
        .iter()
        .map(|rpc| plan_rpc(service, rpc))
        .collect();
    let sdl_mode = plans.iter().any(|plan| plan.synthesize);

    let mut service_block = String::new();
    if sdl_mode {
        service_block.push_str(&format!("// Service definition for {}\n", service.name));
    }
    service_block.push_str(&format!("service {} {{\n", service.name));
    for (plan, rpc) in plans.iter().zip(&service.rpcs) {
        let stream = if rpc.kind == RpcKind::Subscription {
            "stream "
        } else {
            ""
        };
        service_block.push_str(&format!(
            "  rpc {}({}) returns ({}{}) {{}}\n",
            plan.method, plan.request, stream, plan.response
        ));
    }
    service_block.push_str("}\n");
    blocks.push(service_block);

    for (plan, rpc) in plans.iter().zip(&service.rpcs) {
        if !plan.synthesize {
            continue;
        }
        let mut block = String::new();
        block.push_str(&format!("// Request message for {} operation.\n", rpc.name));
        let request = synthesized_request(plan, rpc);
        emit_message(
            &mut block,
            &request,
            &plan.request,
            0,
            ledger,
            &mut uses_wrappers,
        );
        block.push_str(&format!(
            "// Response message for {} operation.\n",
            rpc.name
        ));
        let response = synthesized_response(plan, rpc);
        emit_message(
            &mut block,
            &response,
            &plan.response,
            0,
            ledger,
            &mut uses_wrappers,
        );
        blocks.push(block);
    }

    for message in service.messages.values() {
        let mut block = String::new();
        emit_message(
            &mut block,
            message,
            &message.name,
            0,
            ledger,
            &mut uses_wrappers,
        );
        blocks.push(block);
    }

    let mut out = String::new();
    out.push_str("syntax = \"proto3\";\n");
    out.push_str(&format!("package {};\n", options.package));
    if uses_wrappers {
        out.push_str("\nimport \"google/protobuf/wrappers.proto\";\n");
    }
    for block in blocks {
        out.push('\n');
        out.push_str(&block);
    }
    out
}

struct RpcPlan {
    method: String,
    request: String,
    response: String,
    /// True when the request/response pair does not exist in the IR and
    /// must be synthesized from the RPC's arguments and return type.
    synthesize: bool,
}

fn plan_rpc(service: &Service, rpc: &Rpc) -> RpcPlan {
    let direct_request = request_message_name(&rpc.name);
    if service.messages.contains_key(&direct_request) {
        return RpcPlan {
            method: rpc.name.clone(),
            request: direct_request,
            response: response_message_name(&rpc.name),
            synthesize: false,
        };
    }
    let method = format!("{}{}", rpc.kind.root_type_name(), pascal_case(&rpc.name));
    RpcPlan {
        request: request_message_name(&method),
        response: response_message_name(&method),
        method,
        synthesize: true,
    }
}

fn synthesized_request(plan: &RpcPlan, rpc: &Rpc) -> Message {
    let mut message = Message::new(plan.request.clone());
    message.fields = rpc.arguments.clone();
    message
}

fn synthesized_response(plan: &RpcPlan, rpc: &Rpc) -> Message {
    let mut message = Message::new(plan.response.clone());
    message
        .fields
        .push(Field::new(rpc.name.clone(), rpc.ty.clone()));
    message
}

fn emit_message(
    out: &mut String,
    message: &Message,
    path: &str,
    depth: usize,
    ledger: &mut FieldLedger,
    uses_wrappers: &mut bool,
) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{indent}message {} {{\n", message.name));

    for nested in &message.nested {
        let nested_path = format!("{path}.{}", nested.name);
        emit_message(out, nested, &nested_path, depth + 1, ledger, uses_wrappers);
    }

    let mut numbered: Vec<(u32, String, &Field)> = Vec::with_capacity(message.fields.len());
    for field in &message.fields {
        let proto_name = proto_field_name(&field.name);
        let number = ledger.number(path, &proto_name);
        numbered.push((number, proto_name, field));
    }
    numbered.sort_by_key(|(number, _, _)| *number);

    let live: Vec<String> = numbered.iter().map(|(_, name, _)| name.clone()).collect();
    let reserved = ledger.reserved_numbers(path, &live);
    if !reserved.is_empty() {
        let list = reserved
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{indent}  reserved {list};\n"));
    }

    for (number, proto_name, field) in numbered {
        let rendered = render_field_type(&field.ty, uses_wrappers);
        let repeated = if field.ty.list { "repeated " } else { "" };
        out.push_str(&format!(
            "{indent}  {repeated}{rendered} {proto_name} = {number};\n"
        ));
    }
    out.push_str(&format!("{indent}}}\n"));
}

fn render_field_type(ty: &Type, uses_wrappers: &mut bool) -> String {
    match SCALAR_TYPES.get(ty.name.as_str()) {
        // repeated scalar elements use the plain type; only a singular
        // optional scalar needs the wrapper
        Some(scalar) if ty.list || ty.required => (*scalar).to_string(),
        Some(_) => {
            *uses_wrappers = true;
            SCALAR_WRAPPER_TYPES[ty.name.as_str()].to_string()
        }
        None => ty.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::into_intermediate;

    fn emit_sdl(sdl: &str, ledger: &mut FieldLedger) -> String {
        let out = into_intermediate("DefaultService", sdl).unwrap();
        emit(&out.service, ledger, &EmitOptions::default())
    }

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
    fn sdl_service_emits_kind_prefixed_methods() {
        let proto = emit_sdl(USER_SDL, &mut FieldLedger::new());
        let expected = "\
syntax = \"proto3\";
package service.v1;

import \"google/protobuf/wrappers.proto\";

// Service definition for DefaultService
service DefaultService {
  rpc QueryUser(QueryUserRequest) returns (QueryUserResponse) {}
}

// Request message for user operation.
message QueryUserRequest {
  string id = 1;
}
// Response message for user operation.
message QueryUserResponse {
  User user = 1;
}

message User {
  string id = 1;
  google.protobuf.StringValue name = 2;
}
";
        assert_eq!(proto, expected);
    }

    #[test]
    fn wrapper_import_is_omitted_when_unused() {
        let sdl = "
            type Query { user(id: ID!): User! }
            type User { id: ID! }
        ";
        let proto = emit_sdl(sdl, &mut FieldLedger::new());
        assert!(!proto.contains("google/protobuf/wrappers.proto"));
        assert!(!proto.contains("google.protobuf."));
    }

    #[test]
    fn lists_emit_repeated_fields() {
        let sdl = "
            type Query { users: [User!]! }
            type User { id: ID! tags: [String] }
        ";
        let proto = emit_sdl(sdl, &mut FieldLedger::new());
        assert!(proto.contains("repeated string tags = 2;"));
        assert!(proto.contains("repeated User users = 1;"));
    }

    #[test]
    fn subscriptions_emit_server_streaming_responses() {
        let sdl = "
            type Query { ping: String }
            type Subscription { messageAdded: Message }
            type Message { id: ID! }
        ";
        let proto = emit_sdl(sdl, &mut FieldLedger::new());
        assert!(proto.contains(
            "rpc SubscriptionMessageAdded(SubscriptionMessageAddedRequest) \
             returns (stream SubscriptionMessageAddedResponse) {}"
        ));
    }

    #[test]
    fn field_numbers_survive_reordering_through_the_ledger() {
        let before = "
            type Query { user: User }
            type User { id: ID! name: String! email: String! }
        ";
        let after = "
            type Query { user: User }
            type User { email: String! id: ID! name: String! }
        ";
        let mut ledger = FieldLedger::new();
        let first = emit_sdl(before, &mut ledger);
        let second = emit_sdl(after, &mut ledger);

        for line in ["string id = 1;", "string name = 2;", "string email = 3;"] {
            assert!(first.contains(line), "missing in first: {line}");
            assert!(second.contains(line), "missing in second: {line}");
        }
    }

    #[test]
    fn removed_fields_leave_reserved_numbers() {
        let before = "
            type Query { user: User }
            type User { id: ID! name: String! email: String! }
        ";
        let after = "
            type Query { user: User }
            type User { id: ID! email: String! }
        ";
        let mut ledger = FieldLedger::new();
        emit_sdl(before, &mut ledger);
        let second = emit_sdl(after, &mut ledger);

        assert!(second.contains("  reserved 2;\n"));
        assert!(second.contains("string email = 3;"));
        assert!(!second.contains("name"));
    }

    #[test]
    fn appended_fields_get_trailing_numbers() {
        let before = "
            type Query { user: User }
            type User { id: ID! }
        ";
        let after = "
            type Query { user: User }
            type User { age: Int! id: ID! }
        ";
        let mut ledger = FieldLedger::new();
        emit_sdl(before, &mut ledger);
        let second = emit_sdl(after, &mut ledger);

        // "age" is new; it must not steal number 1 even though it is
        // declared first now
        assert!(second.contains("string id = 1;"));
        assert!(second.contains("int32 age = 2;"));
    }

    #[test]
    fn emission_is_deterministic() {
        let a = emit_sdl(USER_SDL, &mut FieldLedger::new());
        let b = emit_sdl(USER_SDL, &mut FieldLedger::new());
        assert_eq!(a, b);
    }
}
