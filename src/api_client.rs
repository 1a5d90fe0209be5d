use crate::config::{Config, Credentials};
use crate::dto::rpc::{
    unify, ApiVersion, Application, LoginRequest, LoginResponse, NamedConstantList,
    ResponsePayload,
};
use crate::error::{KerioError, Result};
use crate::product::{configure, Component, Endpoint};
use crate::session::{cookie_from_set_cookie, AuthState, SessionState};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOGIN_METHOD: &str = "Session.login";
const LOGOUT_METHOD: &str = "Session.logout";
const UPLOAD_SUFFIX: &str = "attachment-upload/";
const LOGIN_FAILED: &str = "login failed";

const X_TOKEN: &str = "x-token";
const CONTENT_DESCRIPTION: &str = "content-description";

/// Assemble the request URI, refusing to go on without host and credentials.
pub fn build_uri(endpoint: &Endpoint, credentials: &Credentials) -> Result<String> {
    if endpoint.host().is_empty() {
        return Err(KerioError::Configuration("Hostname not set".to_string()));
    }
    if credentials.username.is_empty() {
        return Err(KerioError::Configuration("Username not set".to_string()));
    }
    if credentials.password.is_empty() {
        return Err(KerioError::Configuration("Password not set".to_string()));
    }
    if endpoint.port() == 0 || endpoint.path().is_empty() {
        return Err(KerioError::Configuration("API endpoint not set".to_string()));
    }
    Ok(format!("{}{}", endpoint.origin(), endpoint.path()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| KerioError::Configuration(format!("Invalid header value '{value}'")))
}

/// Session-holding client for the Kerio JSON-RPC API.
///
/// The first `invoke` or `upload` logs in with `Session.login`; the token and
/// cookie it returns are replayed on every later request. All calls that
/// touch the session take `&mut self`, so one client serves one caller at a
/// time. Run several clients for parallel sessions.
pub struct KerioApiClient {
    client: Client,
    endpoint: Endpoint,
    credentials: Credentials,
    component: Component,
    api_url: Option<String>,
    application: Application,
    session: SessionState,
}

impl KerioApiClient {
    /// Create a new API client
    pub fn new(config: Config) -> Result<Self> {
        let kerio = config.kerio;
        let component = kerio.component();

        let mut endpoint = configure(kerio.product, component, kerio.no_tls)?;
        endpoint.set_host(&kerio.hostname)?;

        let mut builder = Client::builder();
        if !kerio.verify_ssl {
            warn!(
                "TLS certificate verification disabled for {}",
                endpoint.host()
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(secs) = kerio.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        debug!(
            "Kerio {} {:?} endpoint: {}{}",
            kerio.product,
            component,
            endpoint.origin(),
            endpoint.path()
        );

        Ok(Self {
            client: builder.build()?,
            credentials: kerio.credentials(),
            endpoint,
            component,
            api_url: kerio.api_url,
            application: Application::default(),
            session: SessionState::new(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    pub fn cookie(&self) -> Option<&str> {
        self.session.cookie()
    }

    pub fn request_id(&self) -> u64 {
        self.session.request_id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Point the client at another host, optionally as `host:port`.
    pub fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        self.endpoint.set_host(hostname)
    }

    pub fn set_port(&mut self, port: u16) {
        self.endpoint.set_port(port);
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }

    /// Drop token and cookie so the next call logs in again.
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    /// Full URI requests are posted to.
    pub fn uri(&self) -> Result<String> {
        let uri = build_uri(&self.endpoint, &self.credentials)?;
        match &self.api_url {
            Some(base) => Ok(format!(
                "{}{}",
                base.trim_end_matches('/'),
                self.endpoint.path()
            )),
            None => Ok(uri),
        }
    }

    /// Log in unless the session already holds a token.
    pub async fn login(&mut self) -> Result<()> {
        let uri = self.uri()?;
        self.ensure_authenticated(&uri).await
    }

    /// Call `method` and return its `result`.
    ///
    /// Empty `params` (`{}` or `null`) are left off the request.
    pub async fn invoke(&mut self, method: &str, params: Value) -> Result<Value> {
        let uri = self.uri()?;
        self.ensure_authenticated(&uri).await?;

        let envelope = self.session.next_envelope(method, params);
        debug!("API request: {} (id {})", method, envelope.id);

        let headers = self.request_headers("application/json")?;
        let (_, body) = self
            .post(&uri, headers, serde_json::to_vec(&envelope)?)
            .await?;

        unify(&body, Some(method))
    }

    /// Typed wrapper around [`invoke`](Self::invoke).
    pub async fn call<P, R>(&mut self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = self.invoke(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Send raw file content, e.g. a user photo.
    ///
    /// The body is posted as-is with `Content-Type: image/jpeg`. In client
    /// mode the upload goes to the `attachment-upload/` handler.
    pub async fn upload(&mut self, data: Vec<u8>, filename: &str) -> Result<Value> {
        let base = self.uri()?;
        self.ensure_authenticated(&base).await?;

        let uri = match self.component {
            Component::Client => format!("{base}{UPLOAD_SUFFIX}"),
            Component::Admin => base,
        };
        let name = filename.rsplit_once('/').map_or(filename, |(_, name)| name);

        let mut headers = self.request_headers("image/jpeg")?;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        headers.insert(HeaderName::from_static(CONTENT_DESCRIPTION), header_value(name)?);

        debug!("Uploading {} ({} bytes) to {}", name, data.len(), uri);
        let (_, body) = self.post(&uri, headers, data).await?;

        unify(&body, None)
    }

    /// End the session on the server and forget token and cookie.
    pub async fn logout(&mut self) -> Result<Value> {
        if !self.session.is_authenticated() {
            self.session.reset();
            return Ok(Value::Null);
        }

        let result = self.invoke(LOGOUT_METHOD, json!({})).await;
        self.session.reset();
        info!("Logged out from {}", self.endpoint.host());
        result
    }

    pub async fn get_api_version(&mut self) -> Result<i64> {
        let version: ApiVersion = self.call("Version.getApiVersion", &json!({})).await?;
        Ok(version.api_version)
    }

    /// Named server constants as a name to value map.
    pub async fn get_constants(&mut self) -> Result<HashMap<String, Value>> {
        let list: NamedConstantList = self
            .call("Server.getNamedConstantList", &json!({}))
            .await?;
        Ok(list
            .constants
            .into_iter()
            .map(|constant| (constant.name, constant.value))
            .collect())
    }

    async fn ensure_authenticated(&mut self, uri: &str) -> Result<()> {
        match self.session.auth().clone() {
            AuthState::Authenticated { .. } => Ok(()),
            AuthState::LoginFailed(message) => Err(KerioError::Authentication(message)),
            AuthState::Unauthenticated => self.perform_login(uri).await,
        }
    }

    async fn perform_login(&mut self, uri: &str) -> Result<()> {
        let params = serde_json::to_value(LoginRequest {
            application: self.application.clone(),
            user_name: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        })?;
        let envelope = self.session.next_envelope(LOGIN_METHOD, params);
        debug!("API request: {} (id {})", LOGIN_METHOD, envelope.id);

        let headers = self.request_headers("application/json")?;
        let (set_cookie, body) = self
            .post(uri, headers, serde_json::to_vec(&envelope)?)
            .await?;

        let result = match ResponsePayload::parse(&body)?.into_result(Some(LOGIN_METHOD)) {
            Ok(result) => result,
            Err(KerioError::Protocol { message, .. }) => {
                warn!("Login as {} rejected: {}", self.credentials.username, message);
                self.session.fail_login(message.clone());
                return Err(KerioError::Authentication(message));
            }
            Err(err) => return Err(err),
        };

        let login: LoginResponse = serde_json::from_value(result).unwrap_or_default();
        match login.token.filter(|token| !token.is_empty()) {
            Some(token) => {
                let cookie = set_cookie.as_deref().and_then(cookie_from_set_cookie);
                self.session.authenticate(token, cookie);
                info!(
                    "Logged in to {} as {}",
                    self.endpoint.host(),
                    self.credentials.username
                );
                Ok(())
            }
            None => {
                warn!("Login as {} returned no token", self.credentials.username);
                self.session.fail_login(LOGIN_FAILED.to_string());
                Err(KerioError::Authentication(LOGIN_FAILED.to_string()))
            }
        }
    }

    fn request_headers(&self, content_type: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        if let Some(token) = self.session.token() {
            headers.insert(HeaderName::from_static(X_TOKEN), header_value(token)?);
        }
        if let Some(cookie) = self.session.cookie() {
            headers.insert(COOKIE, header_value(cookie)?);
        }
        Ok(headers)
    }

    /// POST `body` and return the first `Set-Cookie` header and the body text.
    async fn post(
        &self,
        uri: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<(Option<String>, String)> {
        let response = self
            .client
            .post(uri)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        debug!("API response status: {}", status);

        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let text = response.text().await?;
        debug!("API response: {}", text);

        Ok((set_cookie, text))
    }
}
