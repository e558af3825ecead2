// Strongly-typed IR for proto emission. No GraphQL AST types here.

use indexmap::IndexMap;

use crate::error::CompileError;

/// A GraphQL type reference reduced to its outer wrappers.
///
/// `list` and `required` describe the outer List and NonNull wrappers only;
/// element nullability inside a list is not tracked (see `type_map`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub name: String,
    pub required: bool,
    pub list: bool,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type {
            name: name.into(),
            required: false,
            list: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// False while the field is a placeholder whose type is still being
    /// synthesized; `ServiceBuilder::build` rejects unresolved fields.
    pub resolved: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
            resolved: true,
        }
    }

    /// A placeholder for a field whose type is produced later in the pass.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            ty: Type::named(""),
            resolved: false,
        }
    }

    pub fn resolve(&mut self, ty: Type) {
        self.ty = ty;
        self.resolved = true;
    }
}

/// Field order is source declaration order; proto field numbers derive from
/// it through the ledger, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: String,
    pub fields: Vec<Field>,
    /// Messages declared lexically inside this one (selection-shaped
    /// response messages); empty for schema-derived messages.
    pub nested: Vec<Message>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Message {
            name: name.into(),
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcKind {
    Query,
    Mutation,
    Subscription,
}

impl RpcKind {
    /// The root type name in SDL, also used as the method-name prefix.
    pub fn root_type_name(self) -> &'static str {
        match self {
            RpcKind::Query => "Query",
            RpcKind::Mutation => "Mutation",
            RpcKind::Subscription => "Subscription",
        }
    }
}

impl std::fmt::Display for RpcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RpcKind::Query => "query",
            RpcKind::Mutation => "mutation",
            RpcKind::Subscription => "subscription",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    pub name: String,
    pub kind: RpcKind,
    /// The RPC's result type: the field's return type in SDL mode, or a
    /// reference to the synthesized response message in operation mode.
    pub ty: Type,
    pub arguments: Vec<Field>,
}

/// Immutable output of a build pass, consumed only by the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    /// Keyed by message name; insertion order is emission order.
    pub messages: IndexMap<String, Message>,
    pub rpcs: Vec<Rpc>,
}

/// Accumulates messages and RPCs while walking definitions, then freezes
/// them into a `Service`.
#[derive(Debug, Clone)]
pub struct ServiceBuilder {
    name: String,
    messages: IndexMap<String, Message>,
    rpcs: Vec<Rpc>,
}

impl ServiceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ServiceBuilder {
            name: name.into(),
            messages: IndexMap::new(),
            rpcs: Vec::new(),
        }
    }

    /// Message names are unique within a service; a second registration
    /// under the same name is an error, never a silent overwrite.
    pub fn add_message(&mut self, message: Message) -> Result<(), CompileError> {
        if self.messages.contains_key(&message.name) {
            return Err(CompileError::NameCollision {
                service: self.name.clone(),
                name: message.name,
            });
        }
        self.messages.insert(message.name.clone(), message);
        Ok(())
    }

    pub fn has_message(&self, name: &str) -> bool {
        self.messages.contains_key(name)
    }

    pub fn add_rpc(&mut self, rpc: Rpc) {
        self.rpcs.push(rpc);
    }

    pub fn build(self) -> Result<Service, CompileError> {
        for message in self.messages.values() {
            check_resolved(message)?;
        }
        for rpc in &self.rpcs {
            for argument in &rpc.arguments {
                if !argument.resolved {
                    return Err(CompileError::UnresolvedField {
                        message: rpc.name.clone(),
                        field: argument.name.clone(),
                    });
                }
            }
        }
        Ok(Service {
            name: self.name,
            messages: self.messages,
            rpcs: self.rpcs,
        })
    }
}

fn check_resolved(message: &Message) -> Result<(), CompileError> {
    for field in &message.fields {
        if !field.resolved {
            return Err(CompileError::UnresolvedField {
                message: message.name.clone(),
                field: field.name.clone(),
            });
        }
    }
    for nested in &message.nested {
        check_resolved(nested)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_name_collision_is_an_error() {
        let mut builder = ServiceBuilder::new("ProductService");
        builder.add_message(Message::new("Product")).unwrap();
        let err = builder.add_message(Message::new("Product")).unwrap_err();
        assert_eq!(
            err,
            CompileError::NameCollision {
                service: "ProductService".into(),
                name: "Product".into(),
            }
        );
    }

    #[test]
    fn build_rejects_unresolved_placeholders() {
        let mut builder = ServiceBuilder::new("S");
        let mut message = Message::new("Response");
        message.fields.push(Field::placeholder("pending"));
        builder.add_message(message).unwrap();
        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedField {
                message: "Response".into(),
                field: "pending".into(),
            }
        );
    }

    #[test]
    fn build_checks_nested_messages_too() {
        let mut inner = Message::new("Inner");
        inner.fields.push(Field::placeholder("x"));
        let mut outer = Message::new("Outer");
        outer.nested.push(inner);

        let mut builder = ServiceBuilder::new("S");
        builder.add_message(outer).unwrap();
        assert!(builder.build().is_err());
    }

    #[test]
    fn resolved_placeholder_passes_build() {
        let mut field = Field::placeholder("user");
        field.resolve(Type::named("User"));

        let mut message = Message::new("Response");
        message.fields.push(field);

        let mut builder = ServiceBuilder::new("S");
        builder.add_message(message).unwrap();
        let service = builder.build().unwrap();
        assert_eq!(service.messages["Response"].fields[0].ty.name, "User");
    }
}
