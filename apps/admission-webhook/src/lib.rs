// [apps/admission-webhook/src/lib.rs]
//! Expone el router y el estado compartido para pruebas de integracion
//! que ejercitan el servidor HTTP real; el binario en `main.rs` solo
//! agrega la ignicion de proceso sobre estas piezas.

pub mod config;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
