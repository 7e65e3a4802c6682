// [apps/cache-manager/src/main.rs]
/*!
 * APARATO: CACHE MANAGER MAIN ENTRY POINT (ESTRATO L1-APP)
 * RESPONSABILIDAD: IGNICION DEL PROCESO Y COMPOSICION DE DEPENDENCIAS
 */

use std::sync::Arc;

use chutes_auth::{AuthGuardState, AuthorizeOptions, OutboundSigner, SignedRequestAuthenticator};
use chutes_cache_core::CacheManager;
use chutes_cache_manager::config::CacheManagerConfig;
use chutes_cache_manager::{build_router, AppState};
use chutes_heimdall::init_tracing;
use chutes_hf_hub_client::HfHubClient;
use dotenvy::dotenv;
use tracing::info;

const CACHE_AUTH_PURPOSE: &str = "cache";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("cache_manager");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CacheManagerConfig::from_env();

    let outbound_signer = match (&config.outbound_hotkey, &config.outbound_seed_hex) {
        (Some(hotkey), Some(seed_hex)) => Some(Arc::new(OutboundSigner::from_seed_hex(hotkey.clone(), seed_hex)?)),
        _ => None,
    };

    let hub_client = Arc::new(HfHubClient::new(
        config.hub_metadata_base_url.clone(),
        config.hub_resolve_base_url.clone(),
        outbound_signer,
    ));

    let cache_manager = Arc::new(CacheManager::new(config.cache_base.clone(), hub_client.clone(), hub_client));
    cache_manager.sync_from_disk().await;

    let authenticator = Arc::new(SignedRequestAuthenticator::new(config.miner_hotkey.clone(), config.validator_hotkeys.clone()));
    let auth_guard = AuthGuardState {
        authenticator,
        options: AuthorizeOptions {
            allow_miner: true,
            allow_validator: false,
            purpose: CACHE_AUTH_PURPOSE,
        },
    };

    let app_state = AppState { cache_manager, auth_guard };
    let router = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.listen_port)).await?;
    info!(port = config.listen_port, "cache manager listening");
    axum::serve(listener, router).await?;
    Ok(())
}
