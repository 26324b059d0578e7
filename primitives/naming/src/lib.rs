#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Scoped name table: collision-free identifiers for generated code.
//!
//! Generated members must never collide with names that already exist in the
//! surrounding code: operation names on a service, parameter names inside a
//! method, members allocated earlier. A [`NameTable`] hands out names that
//! are unique across the current scope and every enclosing scope, comparing
//! case-insensitively throughout.
//!
//! Asking for the same name twice returns the same answer, so call sites can
//! ask for `"proxy"` wherever they need it instead of threading the result
//! around.
//!
//! # Example
//! ```
//! use naming::NameTable;
//!
//! let mut table = NameTable::new(["GetOrder", "CloseProxy"]);
//! assert_eq!(table.allocate("CloseProxy"), "CloseProxy_0");
//! assert_eq!(table.allocate("GetProxy"), "GetProxy");
//!
//! {
//!     let mut method = table.enter_scope(["proxy"]);
//!     assert_eq!(method.allocate("proxy"), "proxy_0");
//!     assert_eq!(method.allocate("closeproxy"), "CloseProxy_0");
//! }
//!
//! assert_eq!(table.allocate("proxy"), "proxy");
//! ```

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

/// Folds a name for case-insensitive comparison.
fn fold(name: &str) -> String { name.to_lowercase() }

/// One naming context: what it allocated and what it reserved.
#[derive(Debug, Default)]
struct Scope {
    /// Folded requested name → allocated name.
    allocated: HashMap<String, String>,
    /// Folded names unavailable in this scope and its descendants.
    reserved: HashSet<String>,
}

impl Scope {
    fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allocated: HashMap::new(),
            reserved: names.into_iter().map(|n| fold(n.as_ref())).collect(),
        }
    }
}

/// A stack of naming scopes.
///
/// The root scope lives as long as the table. Child scopes are pushed with
/// [`enter_scope`](Self::enter_scope) and popped when the returned guard is
/// dropped; a child can add reservations but never remove one it inherits.
#[derive(Debug)]
pub struct NameTable {
    scopes: Vec<Scope>,
}

impl NameTable {
    /// Creates a table whose root scope starts out with `reserved`.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { scopes: vec![Scope::with_reserved(reserved)] }
    }

    /// Returns the unique name allocated for `desired`.
    ///
    /// A name already allocated for `desired` in this scope or an enclosing
    /// one is returned again. Otherwise `desired`, `desired_0`, `desired_1`,
    /// ... are probed in order and the first one not reserved anywhere in
    /// scope is reserved, recorded and returned.
    pub fn allocate(&mut self, desired: &str) -> String {
        let key = fold(desired);
        if let Some(existing) = self.lookup_folded(&key) {
            return existing.to_string();
        }

        let unique = self.unique_name(desired);
        let scope = self.current_mut();
        scope.reserved.insert(fold(&unique));
        scope.allocated.insert(key, unique.clone());
        unique
    }

    /// Marks `name` unavailable in the current scope without allocating it.
    pub fn reserve(&mut self, name: &str) { self.current_mut().reserved.insert(fold(name)); }

    /// Pushes a child scope that additionally reserves `reserved`.
    ///
    /// The scope is popped when the returned guard is dropped.
    pub fn enter_scope<I, S>(&mut self, reserved: I) -> ScopeGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scopes.push(Scope::with_reserved(reserved));
        ScopeGuard { table: self }
    }

    /// Returns `true` if `name` is reserved in the current scope or any
    /// enclosing scope.
    pub fn is_reserved(&self, name: &str) -> bool {
        let key = fold(name);
        self.scopes.iter().any(|scope| scope.reserved.contains(&key))
    }

    /// Returns the name previously allocated for `desired`, if any.
    pub fn lookup(&self, desired: &str) -> Option<&str> { self.lookup_folded(&fold(desired)) }

    /// Number of child scopes currently entered; 0 at the root.
    pub fn depth(&self) -> usize { self.scopes.len() - 1 }

    fn lookup_folded(&self, key: &str) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| scope.allocated.get(key)).map(String::as_str)
    }

    fn unique_name(&self, desired: &str) -> String {
        let mut candidate = desired.to_string();
        let mut suffix = 0usize;
        while self.is_reserved(&candidate) {
            candidate = format!("{}_{}", desired, suffix);
            suffix += 1;
        }
        candidate
    }

    fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

impl Default for NameTable {
    fn default() -> Self { Self::new(std::iter::empty::<&str>()) }
}

/// Keeps a child scope entered; dropping it returns to the parent scope.
///
/// Dereferences to the [`NameTable`], so allocations made through the guard
/// land in the child scope.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    table: &'a mut NameTable,
}

impl Deref for ScopeGuard<'_> {
    type Target = NameTable;

    fn deref(&self) -> &NameTable { self.table }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut NameTable { self.table }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) { self.table.exit_scope(); }
}
