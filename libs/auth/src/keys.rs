// [libs/auth/src/keys.rs]
/*!
 * APARATO: KEYRING CACHE (ESTRATO L1-SECURITY)
 * RESPONSABILIDAD: DECODIFICACION SS58 Y VERIFICACION SR25519
 *
 * Decodifica direcciones SS58 a claves publicas SR25519 y cachea el
 * resultado para evitar re-parsear la misma clave en cada peticion
 * firmada (el hotkey de un validador no cambia entre llamadas).
 */

use moka::sync::Cache;
use schnorrkel::{PublicKey, Signature};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AuthError;

/// Contexto de firma SR25519, por convencion el mismo usado por el
/// esquema de direcciones Substrate.
const SIGNING_CONTEXT: &[u8] = b"substrate";

const KEYPAIR_CACHE_CAPACITY: u64 = 512;
const KEYPAIR_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Decodifica una direccion SS58 a sus 32 bytes de clave publica SR25519.
///
/// Formato: `[network_prefix_byte][public_key; 32][checksum]`, codificado
/// en Base58Check. El prefijo de red no se interpreta mas alla de
/// descartarlo: este deployment opera una unica red de identidades.
fn decode_ss58_public_key_bytes(address: &str) -> Result<[u8; 32], AuthError> {
    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| AuthError::MalformedSignature)?;

    if decoded.len() < 33 {
        return Err(AuthError::MalformedSignature);
    }

    let mut public_key_bytes = [0u8; 32];
    public_key_bytes.copy_from_slice(&decoded[1..33]);
    Ok(public_key_bytes)
}

/// Cache acotada de claves publicas ya derivadas desde su direccion SS58.
pub struct KeyringCache {
    cache: Cache<String, Arc<PublicKey>>,
}

impl Default for KeyringCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(KEYPAIR_CACHE_CAPACITY)
                .time_to_live(KEYPAIR_CACHE_TTL)
                .build(),
        }
    }

    /// Resuelve la clave publica SR25519 de un hotkey, hidratando la cache.
    pub fn resolve(&self, hotkey: &str) -> Result<Arc<PublicKey>, AuthError> {
        if let Some(cached) = self.cache.get(hotkey) {
            return Ok(cached);
        }

        let raw_bytes = decode_ss58_public_key_bytes(hotkey)?;
        let public_key =
            Arc::new(PublicKey::from_bytes(&raw_bytes).map_err(|_| AuthError::MalformedSignature)?);

        self.cache.insert(hotkey.to_string(), public_key.clone());
        Ok(public_key)
    }
}

/// Verifica una firma SR25519 hexadecimal contra el hotkey y el mensaje dados.
pub fn verify_signature(
    keyring: &KeyringCache,
    hotkey: &str,
    signature_hex: &str,
    message: &str,
) -> Result<(), AuthError> {
    let public_key = keyring.resolve(hotkey)?;

    let signature_bytes = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|_| AuthError::MalformedSignature)?;
    let signature =
        Signature::from_bytes(&signature_bytes).map_err(|_| AuthError::MalformedSignature)?;

    public_key
        .verify_simple(SIGNING_CONTEXT, message.as_bytes(), &signature)
        .map_err(|_| AuthError::SignatureMismatch)
}

pub fn signing_context_label() -> &'static [u8] {
    SIGNING_CONTEXT
}
