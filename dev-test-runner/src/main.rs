//! End-to-end harness: compile realistic schema/operation samples and check
//! the emitted proto against coarse structural patterns. Run with
//! `cargo run -p dev-test-runner`.

use gql_proto::{compile_graphql_to_proto, compile_operations_to_proto, CompileOptions, FieldLedger};
use once_cell::sync::Lazy;
use regex::Regex;

const STOREFRONT_SCHEMA: &str = r#"
type Query {
    product(id: ID!): Product
    products(category: String): [Product!]!
}

type Mutation {
    createOrder(input: CreateOrderInput!): Order
}

type Subscription {
    orderUpdated(orderId: ID!): Order
}

type Product {
    id: ID!
    title: String!
    price: Float!
    tags: [String]
    vendor: Vendor
}

type Vendor {
    id: ID!
    name: String!
}

type Order {
    id: ID!
    total: Float!
    status: String
}

input CreateOrderInput {
    productId: ID!
    quantity: Int!
    note: String
}
"#;

static RPC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^  rpc [A-Z]\w*\([A-Z]\w*Request\) returns \((stream )?[A-Z]\w*Response\) \{\}$").unwrap());
static FIELD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s+(repeated )?[\w.]+ [a-z_]+ = \d+;$").unwrap());

fn main() {
    let mut failures = 0usize;

    let mut check = |label: &str, ok: bool| {
        if ok {
            eprintln!("ok   {label}");
        } else {
            eprintln!("FAIL {label}");
            failures += 1;
        }
    };

    // --- SDL mode ---
    let sdl = compile_graphql_to_proto(STOREFRONT_SCHEMA, CompileOptions::default())
        .expect("storefront schema should compile");
    check("sdl: every rpc line is well formed", {
        let count = RPC_LINE.find_iter(&sdl.proto).count();
        count == 4
    });
    check("sdl: field lines parse", FIELD_LINE.is_match(&sdl.proto));
    check(
        "sdl: subscription streams",
        sdl.proto.contains("returns (stream SubscriptionOrderUpdatedResponse)"),
    );
    check("sdl: no diagnostics", sdl.diagnostics.is_empty());

    // determinism: same input, same bytes
    let again = compile_graphql_to_proto(STOREFRONT_SCHEMA, CompileOptions::default()).unwrap();
    check("sdl: deterministic output", sdl.proto == again.proto);

    // the ledger round-trips through JSON (the same path the CLI uses)
    let json = serde_json::to_string_pretty(&sdl.lock).unwrap();
    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let restored: FieldLedger =
        serde_path_to_error::deserialize(&mut deserializer).expect("ledger JSON round-trip");
    let relocked = compile_graphql_to_proto(
        STOREFRONT_SCHEMA,
        CompileOptions {
            lock: Some(restored),
            ..CompileOptions::default()
        },
    )
    .unwrap();
    check("sdl: ledger round-trip is stable", relocked.proto == sdl.proto);

    // --- operation mode ---
    let operation = r#"
        fragment ProductCard on Product {
            id
            title
            price
        }

        query GetProduct($id: ID!) {
            product(id: $id) {
                ...ProductCard
                vendor {
                    name
                }
            }
        }
    "#;
    let compiled = compile_operations_to_proto(operation, STOREFRONT_SCHEMA, CompileOptions::default())
        .expect("operation should compile");
    check("op: rpc named after the operation", compiled.rpc_name == "GetProduct");
    check(
        "op: request carries the variable",
        compiled.proto.contains("message GetProductRequest {\n  string id = 1;\n}"),
    );
    check(
        "op: fragment fields are inlined",
        compiled.proto.contains("price = 3;"),
    );
    check(
        "op: nested selection nests a message",
        compiled.proto.contains("message Vendor {"),
    );

    let mutation = r#"
        mutation CreateOrder($input: CreateOrderInput!) {
            createOrder(input: $input) {
                id
                status
            }
        }
    "#;
    let compiled = compile_operations_to_proto(mutation, STOREFRONT_SCHEMA, CompileOptions::default())
        .expect("mutation should compile");
    check(
        "op: input object message is pulled in",
        compiled.proto.contains("message CreateOrderInput {"),
    );

    if failures == 0 {
        eprintln!("all checks passed");
    } else {
        eprintln!("{failures} check(s) failed");
        std::process::exit(1);
    }
}
