// [apps/cache-manager/src/lib.rs]
//! Expone el router y el estado compartido para pruebas de integracion
//! que ejercitan el servidor HTTP real.

pub mod config;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
