//! Product variants and the endpoint each one talks to.
//!
//! The three products speak the same protocol and only differ in the default
//! port and URL path, so the selection is a table lookup rather than a type
//! per product.

use crate::error::{KerioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ADMIN_PATH: &str = "/admin/api/jsonrpc/";
pub const WEBMAIL_PATH: &str = "/webmail/api/jsonrpc/";
pub const MYPHONE_PATH: &str = "/myphone/api/jsonrpc/";

pub const HTTPS_PORT: u16 = 443;
pub const HTTP_PORT: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductVariant {
    #[default]
    Connect,
    Operator,
    Control,
}

impl ProductVariant {
    pub fn admin_port(self) -> u16 {
        match self {
            ProductVariant::Connect => 4040,
            ProductVariant::Operator => 4021,
            ProductVariant::Control => 4081,
        }
    }

    /// Path of the end-user API (WebMail for Connect, MyPhone for Operator).
    pub fn client_path(self) -> Option<&'static str> {
        match self {
            ProductVariant::Connect => Some(WEBMAIL_PATH),
            ProductVariant::Operator => Some(MYPHONE_PATH),
            ProductVariant::Control => None,
        }
    }
}

impl fmt::Display for ProductVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductVariant::Connect => "Connect",
            ProductVariant::Operator => "Operator",
            ProductVariant::Control => "Control",
        };
        write!(f, "{name}")
    }
}

/// Which API of the product the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Component {
    #[default]
    Admin,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn for_port(port: u16) -> Self {
        if port == HTTP_PORT {
            Scheme::Http
        } else {
            Scheme::Https
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Network location of the JSON-RPC API.
///
/// The scheme is derived from the port and cannot be set on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::for_port(port),
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        self.scheme = Scheme::for_port(port);
    }

    /// Set the host, honouring an optional `:port` suffix.
    pub fn set_host(&mut self, host: &str) -> Result<()> {
        match host.split_once(':') {
            Some((name, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    KerioError::Configuration(format!("Invalid port in hostname '{host}'"))
                })?;
                self.host = name.to_string();
                self.set_port(port);
            }
            None => self.host = host.to_string(),
        }
        Ok(())
    }

    /// `<scheme>://<host>:<port>`
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// Resolve a product and component into the endpoint it listens on.
///
/// The host is left empty; it is filled in from configuration.
pub fn configure(variant: ProductVariant, component: Component, no_tls: bool) -> Result<Endpoint> {
    match component {
        Component::Admin => Ok(Endpoint::new("", variant.admin_port(), ADMIN_PATH)),
        Component::Client => {
            let path = variant.client_path().ok_or_else(|| {
                KerioError::Configuration(format!("Kerio {variant} has no client component"))
            })?;
            let port = if no_tls { HTTP_PORT } else { HTTPS_PORT };
            Ok(Endpoint::new("", port, path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_defaults() {
        let connect = configure(ProductVariant::Connect, Component::Admin, false).unwrap();
        assert_eq!(connect.port(), 4040);
        assert_eq!(connect.path(), ADMIN_PATH);
        assert_eq!(connect.scheme(), Scheme::Https);

        let operator = configure(ProductVariant::Operator, Component::Admin, false).unwrap();
        assert_eq!(operator.port(), 4021);

        let control = configure(ProductVariant::Control, Component::Admin, true).unwrap();
        assert_eq!(control.port(), 4081);
        assert_eq!(control.scheme(), Scheme::Https);
    }

    #[test]
    fn test_operator_client_without_tls() {
        let endpoint = configure(ProductVariant::Operator, Component::Client, true).unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Http);
        assert_eq!(endpoint.port(), 80);
        assert_eq!(endpoint.path(), "/myphone/api/jsonrpc/");
    }

    #[test]
    fn test_connect_client_with_tls() {
        let endpoint = configure(ProductVariant::Connect, Component::Client, false).unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Https);
        assert_eq!(endpoint.port(), 443);
        assert_eq!(endpoint.path(), "/webmail/api/jsonrpc/");
    }

    #[test]
    fn test_control_has_no_client_component() {
        let err = configure(ProductVariant::Control, Component::Client, false).unwrap_err();
        assert!(matches!(err, KerioError::Configuration(_)));
    }

    #[test]
    fn test_only_port_80_is_plain_http() {
        let mut endpoint = Endpoint::new("mail.example.com", 80, ADMIN_PATH);
        assert_eq!(endpoint.scheme(), Scheme::Http);

        for port in [1, 79, 81, 443, 4040, 8080, u16::MAX] {
            endpoint.set_port(port);
            assert_eq!(endpoint.scheme(), Scheme::Https, "port {port}");
        }

        endpoint.set_port(80);
        assert_eq!(endpoint.scheme(), Scheme::Http);
    }

    #[test]
    fn test_set_host_with_port_suffix() {
        let mut endpoint = Endpoint::new("", 4040, ADMIN_PATH);
        endpoint.set_host("mail.example.com:80").unwrap();
        assert_eq!(endpoint.host(), "mail.example.com");
        assert_eq!(endpoint.port(), 80);
        assert_eq!(endpoint.origin(), "http://mail.example.com:80");

        endpoint.set_host("other.example.com").unwrap();
        assert_eq!(endpoint.host(), "other.example.com");
        assert_eq!(endpoint.port(), 80);

        assert!(endpoint.set_host("mail.example.com:http").is_err());
    }
}
