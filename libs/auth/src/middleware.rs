// [libs/auth/src/middleware.rs]
/*!
 * APARATO: SIGNED REQUEST GUARD (ESTRATO L4-SECURITY)
 * RESPONSABILIDAD: EXTRACCION DE CABECERAS, HASH DE CUERPO E INYECCION DE IDENTIDAD
 *
 * Generaliza el guardia de autenticacion del orquestador (bearer token +
 * JWT) a la verificacion de firma SR25519: lee las cabeceras de firma,
 * recalcula el SHA-256 del cuerpo para metodos con payload, y vuelve a
 * exponer el cuerpo intacto para que el handler aguas abajo lo deserialice.
 */

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use crate::authenticator::{sha256_hex, AuthorizeOptions, SignedRequestAuthenticator, SignedRequestHeaders};
use crate::error::AuthError;

const HEADER_HOTKEY: &str = "x-hotkey";
const HEADER_NONCE: &str = "x-nonce";
const HEADER_SIGNATURE: &str = "x-signature";

fn header_value(req: &Request, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn has_body_payload(method: &Method) -> bool {
    matches!(method, &Method::POST | &Method::PUT | &Method::PATCH)
}

/// Estado minimo que cualquier `AppState` protegida debe poder proyectar
/// via `FromRef` para usar `signed_request_guard` como middleware.
#[derive(Clone)]
pub struct AuthGuardState {
    pub authenticator: Arc<SignedRequestAuthenticator>,
    pub options: AuthorizeOptions,
}

/// Construye un middleware de Axum que exige una peticion firmada valida
/// para el `purpose` y los roles de firmante dados, inyectando
/// `Extension<AuthorizedIdentity>` en la peticion para el handler final.
pub async fn signed_request_guard(
    State(guard): State<AuthGuardState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authenticator = guard.authenticator;
    let options = guard.options;
    let headers = SignedRequestHeaders {
        hotkey: header_value(&req, HEADER_HOTKEY),
        nonce: header_value(&req, HEADER_NONCE),
        signature: header_value(&req, HEADER_SIGNATURE),
    };

    let body_hash = if has_body_payload(req.method()) {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|_| AuthError::MalformedSignature)?;
        let hash = sha256_hex(&bytes);
        req = Request::from_parts(parts, Body::from(bytes));
        Some(hash)
    } else {
        None
    };

    let identity = authenticator.authorize(&headers, body_hash.as_deref(), &options)?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
