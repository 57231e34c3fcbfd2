//! Process configuration.
//!
//! Built once at startup from an optional TOML file plus `MITZMOCK__`
//! environment overrides, validated, and then shared read-only by every
//! request. Immutability is the only synchronization the mock needs.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub saml: SamlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.cert_path.is_empty() || self.server.key_path.is_empty() {
            return Err("server.cert_path and server.key_path must be set".into());
        }
        if self.server.mtls_enabled && self.server.ca_cert_path.is_empty() {
            return Err("server.mtls_enabled=true requires server.ca_cert_path".into());
        }
        if self.saml.enabled && self.saml.signing_cert_path.is_empty() {
            return Err("saml.enabled=true requires saml.signing_cert_path".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

/// Listener and TLS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Server certificate presented on the TLS listener.
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    /// Private key for the server certificate.
    #[serde(default = "default_key_path")]
    pub key_path: String,
    /// When `true`, clients must present a certificate signed by the CA
    /// bundle below.
    #[serde(default)]
    pub mtls_enabled: bool,
    /// CA bundle used to verify client certificates.
    #[serde(default = "default_ca_cert_path")]
    pub ca_cert_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8443
}

fn default_cert_path() -> String {
    "certs/server.crt".to_string()
}

fn default_key_path() -> String {
    "certs/server.key".to_string()
}

fn default_ca_cert_path() -> String {
    "certs/ca.crt".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            mtls_enabled: false,
            ca_cert_path: default_ca_cert_path(),
        }
    }
}

/// SAML assertion validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlConfig {
    /// When `false` the FHIR endpoints accept any Authorization header.
    #[serde(default)]
    pub enabled: bool,
    /// Trust-anchor certificate of the expected assertion signer.
    #[serde(default = "default_signing_cert_path")]
    pub signing_cert_path: String,
    /// Expected Issuer text; empty skips the issuer check.
    #[serde(default)]
    pub expected_issuer: String,
    /// Tolerance in seconds applied on both validity-window boundaries.
    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u32,
}

fn default_signing_cert_path() -> String {
    "certs/client.crt".to_string()
}

fn default_clock_skew_seconds() -> u32 {
    5
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            signing_cert_path: default_signing_cert_path(),
            expected_issuer: String::new(),
            clock_skew_seconds: default_clock_skew_seconds(),
        }
    }
}

impl SamlConfig {
    pub fn clock_skew(&self) -> time::Duration {
        time::Duration::seconds(i64::from(self.clock_skew_seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load configuration from an optional TOML file plus environment
    /// overrides (e.g. `MITZMOCK__SERVER__PORT=9443`), then validate.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("mitzmock.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        builder = builder.add_source(
            Environment::with_prefix("MITZMOCK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
