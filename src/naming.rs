//! Naming conventions for emitted proto identifiers.
//!
//! GraphQL field and argument names are camelCase; proto fields are
//! snake_case and message/method names are PascalCase. The conversions are
//! mechanical so a proto response can be mapped back to the GraphQL names
//! that produced it.

/// GraphQL field/argument name → proto field name.
pub fn proto_field_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '_' || c == ' ' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let boundary = match chars.get(i.wrapping_sub(1)) {
                _ if i == 0 => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // run of capitals: break before the last one ("URLValue" -> url_value)
                Some(p) if p.is_uppercase() => chars.get(i + 1).is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// GraphQL field name → proto message/method name segment.
pub fn pascal_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn request_message_name(method: &str) -> String {
    format!("{method}Request")
}

pub fn response_message_name(method: &str) -> String {
    format!("{method}Response")
}
