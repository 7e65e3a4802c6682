// [libs/auth/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CHUTES AUTH (ESTRATO L1/L4-SECURITY)
 * RESPONSABILIDAD: AUTORIZACION DE PETICIONES FIRMADAS SR25519/SS58
 *
 * Punto de entrada unico para los dos consumidores de esta capa: el
 * gestor de cache (cada endpoint protegido) y, potencialmente, cualquier
 * otro servicio que necesite validar un hotkey de minero o de validador
 * sin mantener estado mas alla de la cache de claves publicas.
 * =================================================================
 */

pub mod authenticator;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod signer;

pub use authenticator::{
    sha256_hex, AuthorizeOptions, AuthorizedIdentity, SignedRequestAuthenticator, SignedRequestHeaders,
    NONCE_WINDOW_SECS,
};
pub use error::AuthError;
pub use keys::KeyringCache;
pub use middleware::{signed_request_guard, AuthGuardState};
pub use signer::{OutboundHeaders, OutboundSigner};
