// [apps/admission-webhook/src/main.rs]
/*!
 * APARATO: ADMISSION WEBHOOK MAIN ENTRY POINT (ESTRATO L1-APP)
 * RESPONSABILIDAD: IGNICION DEL PROCESO Y COMPOSICION DE VALIDADORES
 */

use std::sync::Arc;

use chutes_admission_core::{Controller, CosignConfigStore, NamespacePolicyStore, PolicyValidator, RegistryValidator, SignatureValidator};
use chutes_admission_webhook::config::WebhookConfig;
use chutes_admission_webhook::{build_router, AppState};
use chutes_heimdall::init_tracing;
use chutes_signature_verifier::{CosignCliBackend, CrictlDigestResolver, SignatureVerifier};
use dotenvy::dotenv;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("admission_webhook");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = WebhookConfig::from_env();

    let cosign_config_store = Arc::new(CosignConfigStore::load(&config.cosign_config_path));
    let signature_verifier = Arc::new(SignatureVerifier::new(Arc::new(CosignCliBackend::new(&config.cosign_binary_path))));
    let digest_resolver = Arc::new(CrictlDigestResolver::new(&config.crictl_binary_path));

    let validators: Vec<Arc<dyn chutes_admission_core::validators::Validator>> = vec![
        Arc::new(RegistryValidator::new(config.allowed_registries.clone())),
        Arc::new(PolicyValidator::new(&config.policy_engine_base_url, config.allowed_registries.clone())),
        Arc::new(SignatureValidator::new(
            cosign_config_store.clone(),
            signature_verifier,
            digest_resolver,
            config.restricted_key_paths.clone(),
        )),
    ];

    let controller = Arc::new(Controller::new(validators, Arc::new(NamespacePolicyStore::new())));
    spawn_cosign_reload_listener(cosign_config_store);

    let app_state = AppState { controller };
    let router = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.listen_port)).await?;
    info!(port = config.listen_port, "admission webhook listening");
    axum::serve(listener, router).await?;
    Ok(())
}

/// SIGHUP dispara una recarga de la configuracion de cosign sin reiniciar
/// el proceso.
fn spawn_cosign_reload_listener(store: Arc<CosignConfigStore>) {
    tokio::spawn(async move {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) else {
            return;
        };
        loop {
            signal.recv().await;
            if let Err(err) = store.reload() {
                tracing::warn!(error = %err, "cosign configuration reload failed");
            }
        }
    });
}
