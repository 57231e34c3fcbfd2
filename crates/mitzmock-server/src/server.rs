use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{delete, get, head, post},
};
use axum_server::tls_rustls::RustlsConfig;
use mitzmock_auth::SamlValidator;
use mitzmock_config::AppConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware as app_middleware};

/// Shared request state: the immutable validator. Scenario data and
/// templates are compiled in, so this is all the handlers need.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<SamlValidator>,
}

pub fn build_app(validator: Arc<SamlValidator>) -> Router {
    let state = AppState { validator };

    Router::new()
        // SOAP endpoints
        .route(
            "/xacml",
            head(handlers::health).post(handlers::xacml::closed_authorization),
        )
        .route("/xcpd", post(handlers::xcpd::patient_discovery))
        // FHIR endpoints
        .route(
            "/fhir/Subscription",
            post(handlers::fhir::subscription_create),
        )
        .route(
            "/fhir/Subscription/{id}",
            delete(handlers::fhir::subscription_delete),
        )
        .route(
            "/fhir/Subscription/$processingStatus",
            get(handlers::fhir::processing_status),
        )
        .route(
            "/fhir/Consent/$processingStatus",
            get(handlers::fhir::processing_status),
        )
        .route("/fhir/", post(handlers::fhir::bundle_transaction))
        // Middleware stack: trace -> request id -> authentication gate
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::authentication_gate,
        ))
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("");
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        request_id = %request_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
    validator: Arc<SamlValidator>,
}

impl ServerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            validator: Arc::new(SamlValidator::disabled()),
        }
    }

    pub fn with_validator(mut self, validator: Arc<SamlValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn build(self) -> MitzMockServer {
        MitzMockServer {
            addr: self.config.addr(),
            app: build_app(self.validator),
            config: self.config,
        }
    }
}

pub struct MitzMockServer {
    addr: SocketAddr,
    app: Router,
    config: AppConfig,
}

impl MitzMockServer {
    /// Serve over TLS until the process is stopped.
    pub async fn run(self) -> anyhow::Result<()> {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let tls = build_tls_config(&self.config)?;

        tracing::info!("listening on https://{}", self.addr);
        axum_server::bind_rustls(self.addr, tls)
            .serve(self.app.into_make_service())
            .await?;
        Ok(())
    }
}

fn build_tls_config(config: &AppConfig) -> anyhow::Result<RustlsConfig> {
    let certs = load_certs(&config.server.cert_path)?;
    let key = load_key(&config.server.key_path)?;

    let builder = rustls::ServerConfig::builder();
    let server_config = if config.server.mtls_enabled {
        let mut roots = rustls::RootCertStore::empty();
        for cert in load_certs(&config.server.ca_cert_path)? {
            roots.add(cert).context("unparseable CA certificate")?;
        }
        let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
            .build()
            .context("building client certificate verifier")?;
        tracing::info!("mTLS enabled — client certificates will be verified");
        builder
            .with_client_cert_verifier(verifier)
            .with_single_cert(certs, key)
            .context("invalid server certificate or key")?
    } else {
        tracing::info!("mTLS disabled — any client can connect");
        builder
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .context("invalid server certificate or key")?
    };

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

fn load_certs(path: &str) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("reading certificate {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing certificate {path}"))
}

fn load_key(path: &str) -> anyhow::Result<PrivateKeyDer<'static>> {
    let file = File::open(path).with_context(|| format!("reading private key {path}"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("parsing private key {path}"))?
        .with_context(|| format!("no private key found in {path}"))
}
