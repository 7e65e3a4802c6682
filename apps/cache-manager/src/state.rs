// [apps/cache-manager/src/state.rs]
//! Estado compartido del gestor de cache: el `CacheManager` y el estado
//! que `signed_request_guard` necesita via `FromRef`.

use std::sync::Arc;

use axum::extract::FromRef;
use chutes_auth::AuthGuardState;
use chutes_cache_core::CacheManager;

#[derive(Clone)]
pub struct AppState {
    pub cache_manager: Arc<CacheManager>,
    pub auth_guard: AuthGuardState,
}

impl FromRef<AppState> for AuthGuardState {
    fn from_ref(state: &AppState) -> Self {
        state.auth_guard.clone()
    }
}
