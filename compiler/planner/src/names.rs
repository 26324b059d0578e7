//! Type and method name derivation

/// Strips the interface marker from `IOrderService`-style names.
///
/// Only a leading `I` followed by another uppercase letter counts, so
/// `Inventory` stays as it is.
fn strip_interface_marker(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('I'), Some(next)) if next.is_uppercase() => &name[1..],
        _ => name,
    }
}

/// Derives the client wrapper type name from an interface name.
///
/// `IOrderService` becomes `OrderServiceClient`, `IOrderProxy` becomes
/// `OrderClient`, and a name already ending in `Client` is kept.
pub fn derive_client_name(interface_name: &str) -> String {
    let base = strip_interface_marker(interface_name);
    let base = base.strip_suffix("Proxy").filter(|b| !b.is_empty()).unwrap_or(base);
    if base.ends_with("Client") {
        base.to_string()
    } else {
        format!("{}Client", base)
    }
}

/// Derives the thin proxy type name from an interface name.
pub fn derive_proxy_name(interface_name: &str) -> String {
    format!("{}Proxy", strip_interface_marker(interface_name))
}

/// Name of the method emitted for an operation, with the `Async` suffix for
/// asynchronous variants.
pub fn method_name(operation: &str, asynchronous: bool) -> String {
    if asynchronous && !operation.ends_with("Async") {
        format!("{}Async", operation)
    } else {
        operation.to_string()
    }
}
