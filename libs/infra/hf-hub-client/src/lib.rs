// [libs/infra/hf-hub-client/src/lib.rs]
pub mod client;
pub mod errors;
pub mod types;

pub use client::HfHubClient;
