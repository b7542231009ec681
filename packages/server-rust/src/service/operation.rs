use std::sync::Arc;

/// Access requirement declared for an operation or a whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// A valid, authorized API key is required.
    #[default]
    ApiKey,
    /// The gateway is bypassed entirely.
    Anonymous,
}

/// Routing-time description of one operation.
///
/// Resolved once when routes are registered; the gateway only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Owning group: the controller for HTTP, the fully qualified service for RPC.
    pub group: Arc<str>,
    /// Operation name as known by the authority and used for metrics.
    pub name: Arc<str>,
    /// True when the operation or its group was declared anonymous.
    pub allow_anonymous: bool,
}

impl OperationDescriptor {
    /// An operation requiring an API key.
    #[must_use]
    pub fn protected(group: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            allow_anonymous: false,
        }
    }

    /// An operation that bypasses the gateway.
    #[must_use]
    pub fn anonymous(group: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            allow_anonymous: true,
            ..Self::protected(group, name)
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
