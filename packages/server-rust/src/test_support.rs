//! Fakes shared by the unit test modules.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::http::StatusCode;
use gatekeeper_core::{ApiClient, DeclaredStatus, DomainCode};
use http::HeaderMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::traits::{
    AuthorizationDecision, Authority, Enablement, Requester, ThrottlingManager,
};

pub(crate) const TEST_KEY: &str = "0d3c5bd8-2f43-4c59-9a37-6f0a4b6a5e21";

pub(crate) fn test_key() -> Uuid {
    Uuid::parse_str(TEST_KEY).unwrap()
}

// ---------------------------------------------------------------------------
// TestCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TestCode {
    UserNotFound,
    NameTaken,
    Undeclared,
}

impl DomainCode for TestCode {
    const ALL: &'static [Self] = &[Self::UserNotFound, Self::NameTaken, Self::Undeclared];

    fn name(self) -> &'static str {
        match self {
            Self::UserNotFound => "UserNotFound",
            Self::NameTaken => "NameTaken",
            Self::Undeclared => "Undeclared",
        }
    }
}

impl DeclaredStatus<StatusCode> for TestCode {
    fn declared_status(self) -> Option<StatusCode> {
        match self {
            Self::UserNotFound => Some(StatusCode::NOT_FOUND),
            Self::NameTaken => Some(StatusCode::CONFLICT),
            Self::Undeclared => None,
        }
    }
}

impl DeclaredStatus<tonic::Code> for TestCode {
    fn declared_status(self) -> Option<tonic::Code> {
        match self {
            Self::UserNotFound => Some(tonic::Code::NotFound),
            Self::NameTaken => Some(tonic::Code::AlreadyExists),
            Self::Undeclared => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FakeAuthority
// ---------------------------------------------------------------------------

/// Authority with canned answers and call counters.
pub(crate) struct FakeAuthority {
    enablement: Result<Enablement, String>,
    decision: Result<AuthorizationDecision, String>,
    authorize_delay: Option<Duration>,
    enablement_calls: AtomicUsize,
    authorize_calls: AtomicUsize,
}

impl FakeAuthority {
    fn with_decision(decision: Result<AuthorizationDecision, String>) -> Self {
        Self {
            enablement: Ok(Enablement {
                service_enabled: true,
                operation_enabled: true,
            }),
            decision,
            authorize_delay: None,
            enablement_calls: AtomicUsize::new(0),
            authorize_calls: AtomicUsize::new(0),
        }
    }

    /// Authorizes every key as `note`.
    pub(crate) fn allowing(note: &str) -> Self {
        Self::with_decision(Ok(AuthorizationDecision {
            authorized: true,
            client: Some(ApiClient::new(test_key(), note)),
        }))
    }

    /// Denies every key; `note` names the owning client when known.
    pub(crate) fn denying(note: Option<&str>) -> Self {
        Self::with_decision(Ok(AuthorizationDecision {
            authorized: false,
            client: note.map(|n| ApiClient::new(test_key(), n)),
        }))
    }

    /// Fails every authorization lookup.
    pub(crate) fn failing(detail: &str) -> Self {
        Self::with_decision(Err(detail.to_owned()))
    }

    pub(crate) fn with_enablement(mut self, service_enabled: bool, operation_enabled: bool) -> Self {
        self.enablement = Ok(Enablement {
            service_enabled,
            operation_enabled,
        });
        self
    }

    pub(crate) fn with_enablement_failure(mut self, detail: &str) -> Self {
        self.enablement = Err(detail.to_owned());
        self
    }

    pub(crate) fn with_authorize_delay(mut self, delay: Duration) -> Self {
        self.authorize_delay = Some(delay);
        self
    }

    pub(crate) fn enablement_calls(&self) -> usize {
        self.enablement_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authority for FakeAuthority {
    async fn enablement(
        &self,
        _service: &str,
        _operation: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Enablement> {
        self.enablement_calls.fetch_add(1, Ordering::SeqCst);
        self.enablement.clone().map_err(anyhow::Error::msg)
    }

    async fn authorize(
        &self,
        _key: Uuid,
        _service: &str,
        _operation: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<AuthorizationDecision> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.authorize_delay {
            tokio::time::sleep(delay).await;
        }
        self.decision.clone().map_err(anyhow::Error::msg)
    }
}

// ---------------------------------------------------------------------------
// FakeThrottle
// ---------------------------------------------------------------------------

/// Throttling manager with a fixed answer that records what it was asked.
pub(crate) struct FakeThrottle {
    allow: bool,
    calls: AtomicUsize,
    last: Mutex<Option<(Requester, Option<IpAddr>, String)>>,
}

impl FakeThrottle {
    pub(crate) fn new(allow: bool) -> Self {
        Self {
            allow,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_call(&self) -> Option<(Requester, Option<IpAddr>, String)> {
        self.last.lock().unwrap().clone()
    }
}

impl ThrottlingManager for FakeThrottle {
    fn is_allowed(
        &self,
        requester: &Requester,
        _metadata: &HeaderMap,
        origin: Option<IpAddr>,
        action: &str,
        _now: SystemTime,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((requester.clone(), origin, action.to_owned()));
        self.allow
    }
}
