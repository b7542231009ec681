//! Operation catalog: the routing-time registry of access declarations.
//!
//! Anonymous access is declared here per operation or per group when routes
//! are registered. Lookups by the transport layers are plain hash lookups;
//! operations that were never registered resolve as protected.

use std::collections::HashMap;
use std::sync::Arc;

use super::operation::{Access, OperationDescriptor};

// ---------------------------------------------------------------------------
// GroupEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GroupEntry {
    access: Access,
    operations: HashMap<String, (Access, Arc<OperationDescriptor>)>,
}

impl GroupEntry {
    fn describe(&self, group: &str, name: &str, access: Access) -> Arc<OperationDescriptor> {
        let allow_anonymous = self.access == Access::Anonymous || access == Access::Anonymous;
        Arc::new(OperationDescriptor {
            group: group.into(),
            name: name.into(),
            allow_anonymous,
        })
    }
}

// ---------------------------------------------------------------------------
// OperationCatalog
// ---------------------------------------------------------------------------

/// Registry of operations and their declared access, keyed by group and name.
#[derive(Debug, Default)]
pub struct OperationCatalog {
    groups: HashMap<String, GroupEntry>,
}

impl OperationCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the access of a whole group. Anonymous groups make every
    /// operation in them anonymous, including ones registered earlier.
    pub fn register_group(&mut self, group: &str, access: Access) -> &mut Self {
        let entry = self.groups.entry(group.to_owned()).or_default();
        entry.access = access;

        let refreshed: Vec<_> = entry
            .operations
            .iter()
            .map(|(name, (op_access, _))| {
                (name.clone(), *op_access, entry.describe(group, name, *op_access))
            })
            .collect();
        for (name, op_access, descriptor) in refreshed {
            entry.operations.insert(name, (op_access, descriptor));
        }
        self
    }

    /// Registers one operation and returns its resolved descriptor.
    pub fn register(&mut self, group: &str, name: &str, access: Access) -> Arc<OperationDescriptor> {
        let entry = self.groups.entry(group.to_owned()).or_default();
        let descriptor = entry.describe(group, name, access);
        entry
            .operations
            .insert(name.to_owned(), (access, Arc::clone(&descriptor)));
        descriptor
    }

    /// Registers several operations of `group` with the same access.
    pub fn register_all<'a>(
        &mut self,
        group: &str,
        names: impl IntoIterator<Item = &'a str>,
        access: Access,
    ) -> &mut Self {
        for name in names {
            self.register(group, name, access);
        }
        self
    }

    /// Descriptor for `group`/`name`.
    ///
    /// Unregistered operations require an API key unless their group was
    /// declared anonymous.
    #[must_use]
    pub fn resolve(&self, group: &str, name: &str) -> Arc<OperationDescriptor> {
        match self.groups.get(group) {
            Some(entry) => match entry.operations.get(name) {
                Some((_, descriptor)) => Arc::clone(descriptor),
                None => entry.describe(group, name, Access::ApiKey),
            },
            None => Arc::new(OperationDescriptor::protected(group, name)),
        }
    }

    /// Descriptor for an RPC method path of the form `/package.Service/Method`.
    #[must_use]
    pub fn resolve_rpc_path(&self, path: &str) -> Arc<OperationDescriptor> {
        let trimmed = path.trim_start_matches('/');
        match trimmed.rsplit_once('/') {
            Some((service, method)) => self.resolve(service, method),
            None => self.resolve("", trimmed),
        }
    }

    /// Number of registered operations across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(|g| g.operations.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
