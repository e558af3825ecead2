//! Compile GraphQL service descriptions into Protobuf/gRPC definitions.
//!
//! Two entry points, both pure and deterministic:
//!
//! - [`compile_graphql_to_proto`]: SDL text → a proto service with one RPC
//!   per root-type field and one message per object/input type.
//! - [`compile_operations_to_proto`]: a single client operation + the schema
//!   it is written against → a request/response message pair and one RPC,
//!   with fragment spreads inlined.
//!
//! Data flow: text → `reader` → `ir::Service` → `emit` → proto text. The
//! operation path runs `validate` first, whose rules exist so a proto
//! response can be mapped back to the GraphQL shape unambiguously.
//!
//! Compilation performs no I/O and mutates no shared state; concurrent
//! calls need no coordination. Field numbers are carried across
//! compilations by a [`FieldLedger`] the caller persists.

pub mod cli;
pub mod emit;
pub mod error;
pub mod ir;
pub mod ledger;
pub mod naming;
pub mod operation;
pub mod reader;
pub mod type_map;
pub mod validate;

pub use emit::EmitOptions;
pub use error::{CompileError, Diagnostic, UnsupportedKind, ValidationError};
pub use ledger::FieldLedger;
pub use operation::{compile_operations_to_proto, OperationCompilation};
pub use reader::{into_intermediate, SdlIntermediate};
pub use validate::validate;

/// Options shared by both compilation modes.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub service_name: String,
    pub package: String,
    /// Field-number ledger from a previous compilation; omit for a fresh
    /// numbering.
    pub lock: Option<FieldLedger>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            service_name: "DefaultService".to_string(),
            package: "service.v1".to_string(),
            lock: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SdlCompilation {
    pub proto: String,
    pub lock: FieldLedger,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile an SDL document into a proto service definition.
pub fn compile_graphql_to_proto(
    sdl: &str,
    options: CompileOptions,
) -> Result<SdlCompilation, CompileError> {
    let intermediate = reader::into_intermediate(&options.service_name, sdl)?;
    let mut ledger = options.lock.unwrap_or_default();
    let proto = emit::emit(
        &intermediate.service,
        &mut ledger,
        &EmitOptions {
            package: options.package,
        },
    );
    Ok(SdlCompilation {
        proto,
        lock: ledger,
        diagnostics: intermediate.diagnostics,
    })
}
