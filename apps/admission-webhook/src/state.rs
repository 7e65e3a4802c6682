// [apps/admission-webhook/src/state.rs]
//! Estado compartido del webhook: un unico `Controller` detras de un
//! `Arc`, clonado barato en cada peticion de axum.

use std::sync::Arc;

use chutes_admission_core::Controller;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
}
