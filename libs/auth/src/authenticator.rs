// [libs/auth/src/authenticator.rs]
/*!
 * APARATO: SIGNED REQUEST AUTHENTICATOR (ESTRATO L1-SECURITY)
 * RESPONSABILIDAD: CONTRATO DE AUTORIZACION COMPARTIDO POR ADMISSION Y CACHE
 *
 * Stateless salvo por la cache de claves: cada invocacion recibe el
 * conjunto de cabeceras de la peticion y decide allow/deny sin guardar
 * nada entre llamadas mas alla de lo que ya vive en `KeyringCache`.
 */

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::keys::{verify_signature, KeyringCache};

/// Ventana de tolerancia al reloj para el nonce, en segundos.
pub const NONCE_WINDOW_SECS: i64 = 30;

/// Las tres cabeceras que conforman una peticion firmada.
#[derive(Debug, Clone)]
pub struct SignedRequestHeaders {
    pub hotkey: String,
    pub nonce: String,
    pub signature: String,
}

/// Parametros de la invocacion: quien puede firmar y para que proposito.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizeOptions {
    pub allow_miner: bool,
    pub allow_validator: bool,
    pub purpose: &'static str,
}

/// Identidad resuelta tras una autorizacion exitosa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedIdentity {
    pub hotkey: String,
    pub is_miner: bool,
    pub is_validator: bool,
}

pub struct SignedRequestAuthenticator {
    miner_hotkey: String,
    validator_hotkeys: HashSet<String>,
    keyring: KeyringCache,
}

impl SignedRequestAuthenticator {
    pub fn new(miner_hotkey: String, validator_hotkeys: HashSet<String>) -> Self {
        Self {
            miner_hotkey,
            validator_hotkeys,
            keyring: KeyringCache::new(),
        }
    }

    fn allowed_signer(&self, hotkey: &str, options: &AuthorizeOptions) -> bool {
        (options.allow_miner && hotkey == self.miner_hotkey)
            || (options.allow_validator && self.validator_hotkeys.contains(hotkey))
    }

    /// Autoriza una peticion firmada. `body_sha256` es `Some(hash)` para
    /// POST/PUT/PATCH (calculado aguas arriba por el middleware de hash de
    /// cuerpo) y `None` para GET, en cuyo caso `purpose` hace de mensaje.
    pub fn authorize(
        &self,
        headers: &SignedRequestHeaders,
        body_sha256: Option<&str>,
        options: &AuthorizeOptions,
    ) -> Result<AuthorizedIdentity, AuthError> {
        if headers.hotkey.is_empty() {
            return Err(AuthError::MissingHeader("X-Hotkey"));
        }
        if headers.nonce.is_empty() {
            return Err(AuthError::MissingHeader("X-Nonce"));
        }
        if headers.signature.is_empty() {
            return Err(AuthError::MissingHeader("X-Signature"));
        }

        if !self.allowed_signer(&headers.hotkey, options) {
            return Err(AuthError::UnknownSigner);
        }

        let nonce: i64 = headers
            .nonce
            .parse()
            .map_err(|_| AuthError::MalformedSignature)?;
        let now = current_unix_timestamp();
        if (now - nonce).abs() >= NONCE_WINDOW_SECS {
            return Err(AuthError::NonceOutOfWindow);
        }

        let payload_hash = body_sha256.unwrap_or(options.purpose);
        let signing_string = format!("{}:{}:{}", headers.hotkey, headers.nonce, payload_hash);

        verify_signature(&self.keyring, &headers.hotkey, &headers.signature, &signing_string)?;

        Ok(AuthorizedIdentity {
            hotkey: headers.hotkey.clone(),
            is_miner: headers.hotkey == self.miner_hotkey,
            is_validator: self.validator_hotkeys.contains(&headers.hotkey),
        })
    }
}

fn current_unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// SHA-256 del cuerpo, formateado como hex minuscula, tal como lo espera
/// la cadena de firma `hotkey:nonce:payloadHash`.
pub fn sha256_hex(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
