use std::{env, sync::Arc};

use mitzmock_auth::{SamlValidator, SamlValidatorConfig};
use mitzmock_config::loader::load_config;
use mitzmock_server::ServerBuilder;

#[tokio::main]
async fn main() {
    // Load .env if present, before anything reads the environment.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    let config_path = resolve_config_path();
    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    mitzmock_server::observability::init_tracing(&cfg.logging.level);

    let validator = if cfg.saml.enabled {
        let cert_pem = match std::fs::read(&cfg.saml.signing_cert_path) {
            Ok(pem) => pem,
            Err(e) => {
                eprintln!(
                    "Failed to read SAML signing certificate {}: {e}",
                    cfg.saml.signing_cert_path
                );
                std::process::exit(2);
            }
        };
        let validator = match SamlValidator::new(SamlValidatorConfig {
            enabled: true,
            signing_cert_pem: cert_pem,
            expected_issuer: cfg.saml.expected_issuer.clone(),
            clock_skew: cfg.saml.clock_skew(),
        }) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Failed to create SAML validator: {e}");
                std::process::exit(2);
            }
        };
        tracing::info!(
            cert = %cfg.saml.signing_cert_path,
            issuer = %cfg.saml.expected_issuer,
            clock_skew_s = cfg.saml.clock_skew_seconds,
            "SAML validation enabled"
        );
        validator
    } else {
        tracing::info!("SAML validation disabled — FHIR endpoints accept any Authorization header");
        SamlValidator::disabled()
    };

    tracing::info!("Mitz mock starting on https://{}", cfg.addr());
    tracing::info!("  SOAP endpoints:");
    tracing::info!("    HEAD /xacml  — health check");
    tracing::info!("    POST /xacml  — closed authorization question");
    tracing::info!("    POST /xcpd   — open authorization question");
    tracing::info!("  FHIR endpoints:");
    tracing::info!("    POST   /fhir/Subscription                   — create subscription");
    tracing::info!("    DELETE /fhir/Subscription/{{id}}              — cancel subscription");
    tracing::info!("    POST   /fhir/                               — Bundle transaction");
    tracing::info!("    GET    /fhir/Subscription/$processingStatus — processing status");
    tracing::info!("    GET    /fhir/Consent/$processingStatus      — processing status");

    let server = ServerBuilder::new(cfg)
        .with_validator(Arc::new(validator))
        .build();

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: MITZMOCK_CONFIG
/// 3. Default: mitzmock.toml
fn resolve_config_path() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return Some(path);
        }
    }

    if let Ok(path) = env::var("MITZMOCK_CONFIG")
        && !path.is_empty()
    {
        return Some(path);
    }

    None
}
