//! Error-to-status translation.
//!
//! A [`StatusMapping`] is built once at startup by enumerating the declared
//! domain codes. [`StatusTranslator`] pairs it with the transport's default
//! status and turns an [`OperationError`] into a [`TranslatedStatus`] with a
//! single hash lookup.

use std::collections::HashMap;

use crate::code::{DeclaredStatus, DomainCode};
use crate::error::OperationError;

// ---------------------------------------------------------------------------
// StatusMapping
// ---------------------------------------------------------------------------

/// Read-only association from domain code to transport status.
#[derive(Debug, Clone)]
pub struct StatusMapping<C, S> {
    entries: HashMap<C, S>,
}

impl<C: DomainCode, S: Copy> StatusMapping<C, S> {
    /// Builds the mapping from every code's declared status.
    #[must_use]
    pub fn declared() -> Self
    where
        C: DeclaredStatus<S>,
    {
        C::ALL
            .iter()
            .filter_map(|code| code.declared_status().map(|status| (*code, status)))
            .collect()
    }

    /// Replaces or adds entries. Later pairs win.
    #[must_use]
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (C, S)>) -> Self {
        self.entries.extend(overrides);
        self
    }

    /// Explicit status for `code`, if one was declared.
    #[must_use]
    pub fn get(&self, code: C) -> Option<S> {
        self.entries.get(&code).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: DomainCode, S> FromIterator<(C, S)> for StatusMapping<C, S> {
    fn from_iter<I: IntoIterator<Item = (C, S)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusTranslator
// ---------------------------------------------------------------------------

/// A resolved status plus the caller-facing description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedStatus<S> {
    pub status: S,
    pub message: String,
}

/// Translates operation errors for one transport.
#[derive(Debug, Clone)]
pub struct StatusTranslator<C, S> {
    mapping: StatusMapping<C, S>,
    default_status: S,
}

impl<C: DomainCode, S: Copy> StatusTranslator<C, S> {
    #[must_use]
    pub fn new(mapping: StatusMapping<C, S>, default_status: S) -> Self {
        Self {
            mapping,
            default_status,
        }
    }

    /// Translator over the declared statuses of `C`.
    #[must_use]
    pub fn declared(default_status: S) -> Self
    where
        C: DeclaredStatus<S>,
    {
        Self::new(StatusMapping::declared(), default_status)
    }

    #[must_use]
    pub fn default_status(&self) -> S {
        self.default_status
    }

    #[must_use]
    pub fn mapping(&self) -> &StatusMapping<C, S> {
        &self.mapping
    }

    /// Resolves the status for `code`, falling back to the default.
    #[must_use]
    pub fn status_for(&self, code: Option<C>) -> S {
        code.and_then(|c| self.mapping.get(c))
            .unwrap_or(self.default_status)
    }

    /// Translates an operation error. Pure function of the static table.
    #[must_use]
    pub fn translate(&self, error: &OperationError<C>) -> TranslatedStatus<S> {
        TranslatedStatus {
            status: self.status_for(error.code),
            message: error.description().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
