use uuid::Uuid;

/// Caller identity resolved by the authority for one request.
///
/// Request-scoped: attached to the request extensions by the authorization
/// gateway and read by handlers. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClient {
    /// The API key the caller presented.
    pub key: Uuid,
    /// Display name of the client owning the key.
    pub note: String,
}

impl ApiClient {
    #[must_use]
    pub fn new(key: Uuid, note: impl Into<String>) -> Self {
        Self {
            key,
            note: note.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_compare_by_key_and_note() {
        let key = Uuid::new_v4();
        let client = ApiClient::new(key, "Partner-7");

        assert_eq!(client.clone(), ApiClient::new(key, String::from("Partner-7")));
        assert_ne!(client, ApiClient::new(key, "Partner-8"));
        assert_ne!(client, ApiClient::new(Uuid::new_v4(), "Partner-7"));
    }
}
