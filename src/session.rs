use crate::dto::rpc::{non_empty_params, JsonRpcRequest, JSONRPC_VERSION};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated {
        token: String,
        cookie: Option<String>,
    },
    /// Login was attempted and failed. Sticky until the session is reset.
    LoginFailed(String),
}

/// Per-client session: login state plus the request id counter.
///
/// Owned by exactly one client and never shared.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    auth: AuthState,
    request_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    pub fn token(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        match &self.auth {
            AuthState::Authenticated { cookie, .. } => cookie.as_deref(),
            _ => None,
        }
    }

    /// Id of the most recently built envelope, 0 before the first one.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Build the envelope for the next call, consuming one request id.
    pub fn next_envelope(&mut self, method: &str, params: Value) -> JsonRpcRequest {
        self.request_id += 1;
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: self.request_id,
            method: method.to_string(),
            params: non_empty_params(params),
        }
    }

    pub fn authenticate(&mut self, token: String, cookie: Option<String>) {
        self.auth = AuthState::Authenticated { token, cookie };
    }

    pub fn fail_login(&mut self, message: String) {
        self.auth = AuthState::LoginFailed(message);
    }

    /// Forget token and cookie. The request id keeps counting.
    pub fn reset(&mut self) {
        self.auth = AuthState::Unauthenticated;
    }
}

/// Reduce a `Set-Cookie` header to the bare `name=value` pair.
pub fn cookie_from_set_cookie(header: &str) -> Option<String> {
    let first = header.split_whitespace().next()?.trim_end_matches(';');
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_start_at_one_and_increment() {
        let mut session = SessionState::new();
        assert_eq!(session.request_id(), 0);

        for expected in 1..=5 {
            let envelope = session.next_envelope("Version.getApiVersion", json!({}));
            assert_eq!(envelope.id, expected);
        }
        assert_eq!(session.request_id(), 5);
    }

    #[test]
    fn test_empty_params_are_omitted() {
        let mut session = SessionState::new();
        let envelope = session.next_envelope("Session.logout", json!({}));
        assert_eq!(envelope.params, None);

        let wire = serde_json::to_string(&envelope).unwrap();
        assert!(!wire.contains("params"));
    }

    #[test]
    fn test_params_are_kept_verbatim() {
        let mut session = SessionState::new();
        let params = json!({"query": {"fields": ["id", "name"]}});
        let envelope = session.next_envelope("Domains.get", params.clone());
        assert_eq!(envelope.jsonrpc, "2.0");
        assert_eq!(envelope.method, "Domains.get");
        assert_eq!(envelope.params, Some(params));
    }

    #[test]
    fn test_auth_transitions() {
        let mut session = SessionState::new();
        assert_eq!(session.auth(), &AuthState::Unauthenticated);
        assert!(session.token().is_none());

        session.fail_login("bad credentials".to_string());
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());

        session.reset();
        session.authenticate("abc".to_string(), Some("sid=xyz".to_string()));
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("abc"));
        assert_eq!(session.cookie(), Some("sid=xyz"));
    }

    #[test]
    fn test_reset_keeps_request_id() {
        let mut session = SessionState::new();
        session.next_envelope("Session.login", json!({}));
        session.authenticate("abc".to_string(), None);
        session.reset();
        assert!(!session.is_authenticated());
        assert_eq!(session.next_envelope("Session.login", json!({})).id, 2);
    }

    #[test]
    fn test_cookie_from_set_cookie() {
        assert_eq!(
            cookie_from_set_cookie("sid=xyz; Path=/"),
            Some("sid=xyz".to_string())
        );
        assert_eq!(
            cookie_from_set_cookie("TOKEN_CONNECT_WEBADMIN=abc123; path=/admin/; Secure; HttpOnly"),
            Some("TOKEN_CONNECT_WEBADMIN=abc123".to_string())
        );
        assert_eq!(cookie_from_set_cookie("sid=xyz"), Some("sid=xyz".to_string()));
        assert_eq!(cookie_from_set_cookie("   "), None);
    }
}
