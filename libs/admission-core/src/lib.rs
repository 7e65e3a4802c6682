// [libs/admission-core/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CHUTES ADMISSION CORE (ESTRATO L2-DOMAIN)
 * RESPONSABILIDAD: ORQUESTACION DE VALIDADORES DE ADMISION DE KUBERNETES
 *
 * Todo lo que el binario `admission-webhook` necesita para transformar
 * un AdmissionReview en una decision: el controlador que reparte el
 * trabajo, los tres validadores (registro, politica, firma), y la
 * configuracion jerarquica de verificacion de firmas.
 * =================================================================
 */

pub mod controller;
pub mod cosign_config;
pub mod error;
pub mod image_ref;
pub mod metrics;
pub mod model;
pub mod namespace_policy;
pub mod validators;

pub use controller::{Controller, HealthReport};
pub use cosign_config::CosignConfigStore;
pub use error::AdmissionError;
pub use namespace_policy::NamespacePolicyStore;
pub use validators::{policy::PolicyValidator, registry::RegistryValidator, signature::SignatureValidator};
