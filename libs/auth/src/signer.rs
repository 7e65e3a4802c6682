// [libs/auth/src/signer.rs]
/*!
 * APARATO: FIRMADOR DE PETICIONES SALIENTES (ESTRATO L1-SECURITY)
 * RESPONSABILIDAD: FIRMA SR25519 DE PETICIONES HACIA SERVICIOS UPSTREAM
 *
 * La contraparte de `authenticator.rs`: en vez de verificar una firma
 * entrante, produce una para que este proceso se autentique como minero
 * ante un servicio upstream (el servicio de manifiestos de Hugging Face).
 */

use std::time::{SystemTime, UNIX_EPOCH};

use schnorrkel::{signing_context, ExpansionMode, Keypair, MiniSecretKey};

use crate::authenticator::sha256_hex;
use crate::error::AuthError;
use crate::keys::signing_context_label;

/// Las tres cabeceras de una peticion saliente firmada.
pub struct OutboundHeaders {
    pub hotkey: String,
    pub nonce: String,
    pub signature: String,
}

pub struct OutboundSigner {
    hotkey: String,
    keypair: Keypair,
}

impl OutboundSigner {
    /// Deriva el par de claves desde una semilla hexadecimal de 32 bytes,
    /// el mismo formato mini-secret usado para derivar un hotkey SR25519.
    pub fn from_seed_hex(hotkey: String, seed_hex: &str) -> Result<Self, AuthError> {
        let seed_bytes =
            hex::decode(seed_hex.trim_start_matches("0x")).map_err(|_| AuthError::MalformedSignature)?;
        let mini_secret =
            MiniSecretKey::from_bytes(&seed_bytes).map_err(|_| AuthError::MalformedSignature)?;
        let keypair = mini_secret.expand_to_keypair(ExpansionMode::Ed25519);
        Ok(Self { hotkey, keypair })
    }

    pub fn hotkey(&self) -> &str {
        &self.hotkey
    }

    /// Firma una peticion saliente para el `purpose` y cuerpo dados. `body`
    /// es `Some(bytes)` para POST/PUT/PATCH, `None` para GET (donde
    /// `purpose` hace de mensaje, espejo de `authenticator::authorize`).
    pub fn sign(&self, purpose: &str, body: Option<&[u8]>) -> OutboundHeaders {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        let payload_hash = body.map(sha256_hex).unwrap_or_else(|| purpose.to_string());
        let signing_string = format!("{}:{}:{}", self.hotkey, nonce, payload_hash);

        let signature = self
            .keypair
            .sign(signing_context(signing_context_label()).bytes(signing_string.as_bytes()));

        OutboundHeaders {
            hotkey: self.hotkey.clone(),
            nonce: nonce.to_string(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}
