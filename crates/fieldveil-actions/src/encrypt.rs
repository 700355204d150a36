//! Encryption action and key store seam
//!
//! Ciphertext format: `enc:v1:<key_id>:<base64(nonce || ciphertext)>` with a
//! random 16-byte nonce. The built-in cipher derives a SHA-256 counter-mode
//! keystream from `(key, nonce)` and XORs it with the plaintext; deployments
//! with stronger requirements inject their own [`ProtectAction`] backed by an
//! AEAD and register it under `encrypt`.

use crate::action::{leaf_text, ActionOutput, Capability, Params, ProtectAction};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use fieldveil_core::{Error, FieldValue, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const FORMAT_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 16;

/// Key lookup by id. Key lifecycle (rotation, storage) is the caller's
/// concern; the action only ever asks for bytes.
pub trait KeyStore: Send + Sync {
    fn key(&self, key_id: &str) -> Result<Vec<u8>>;
}

/// Fixed key material handed over at construction
#[derive(Default)]
pub struct StaticKeyStore {
    keys: HashMap<String, Vec<u8>>,
}

impl StaticKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key_id: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        self.keys.insert(key_id.into(), key.into());
        self
    }
}

impl KeyStore for StaticKeyStore {
    fn key(&self, key_id: &str) -> Result<Vec<u8>> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| Error::dependency(format!("key '{key_id}' not found in key store")))
    }
}

/// Reversible encryption keyed through an injected [`KeyStore`]
pub struct EncryptAction {
    keys: Arc<dyn KeyStore>,
}

impl EncryptAction {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }
}

impl ProtectAction for EncryptAction {
    fn capability(&self) -> Capability {
        Capability::Reversible
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        match params.str_opt("key_id")? {
            Some(_) => Ok(()),
            None => Err(Error::policy_parse(
                "encrypt requires a 'key_id' param".to_string(),
            )),
        }
    }

    fn transform(&self, value: &FieldValue, params: &Params) -> Result<ActionOutput> {
        let Some(text) = leaf_text(value)? else {
            return Ok(ActionOutput::null_passthrough());
        };

        let key_id = params
            .str_opt("key_id")?
            .ok_or_else(|| Error::policy_parse("encrypt requires a 'key_id' param".to_string()))?;
        let key = self.keys.key(key_id)?;

        let nonce = Uuid::new_v4().into_bytes();
        let mut body = text.into_bytes();
        apply_keystream(&key, &nonce, &mut body);

        let mut payload = Vec::with_capacity(NONCE_LEN + body.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&body);

        let ciphertext = format!("{FORMAT_PREFIX}{key_id}:{}", BASE64.encode(payload));
        Ok(ActionOutput::new(ciphertext).with_summary(format!("encrypted with key '{key_id}'")))
    }

    fn reveal(&self, token: &str) -> Result<FieldValue> {
        let rest = token
            .strip_prefix(FORMAT_PREFIX)
            .ok_or_else(|| Error::dependency("unrecognized ciphertext format".to_string()))?;
        let (key_id, encoded) = rest
            .split_once(':')
            .ok_or_else(|| Error::dependency("ciphertext missing key id".to_string()))?;

        let payload = BASE64
            .decode(encoded)
            .map_err(|e| Error::dependency(format!("ciphertext is not valid base64: {e}")))?;
        if payload.len() < NONCE_LEN {
            return Err(Error::dependency("ciphertext too short".to_string()));
        }

        let key = self.keys.key(key_id)?;
        let (nonce, body) = payload.split_at(NONCE_LEN);
        let mut plaintext = body.to_vec();
        apply_keystream(&key, nonce, &mut plaintext);

        let text = String::from_utf8(plaintext)
            .map_err(|_| Error::dependency("decrypted payload is not UTF-8".to_string()))?;
        Ok(FieldValue::String(text))
    }
}

/// XOR `data` with a SHA-256 counter-mode keystream. Symmetric, so the same
/// call both encrypts and decrypts.
fn apply_keystream(key: &[u8], nonce: &[u8], data: &mut [u8]) {
    for (block_index, block) in data.chunks_mut(32).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(nonce);
        hasher.update((block_index as u64).to_be_bytes());
        let keystream = hasher.finalize();
        for (byte, k) in block.iter_mut().zip(keystream.iter()) {
            *byte ^= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> EncryptAction {
        EncryptAction::new(Arc::new(
            StaticKeyStore::new().with_key("k1", b"0123456789abcdef".to_vec()),
        ))
    }

    fn params() -> Params {
        Params::new().with("key_id", "k1")
    }

    #[test]
    fn encrypt_then_reveal_round_trip() {
        let action = action();
        let original = FieldValue::from("123-45-6789");

        let output = action.transform(&original, &params()).unwrap();
        let ciphertext = output.value.as_str().unwrap();
        assert!(ciphertext.starts_with("enc:v1:k1:"));
        assert!(!ciphertext.contains("123-45-6789"));

        assert_eq!(action.reveal(ciphertext).unwrap(), original);
    }

    #[test]
    fn long_values_round_trip_across_keystream_blocks() {
        let action = action();
        let original = FieldValue::from("x".repeat(100));
        let output = action.transform(&original, &params()).unwrap();
        assert_eq!(action.reveal(output.value.as_str().unwrap()).unwrap(), original);
    }

    #[test]
    fn missing_key_is_a_dependency_error() {
        let action = action();
        let result = action.transform(
            &FieldValue::from("v"),
            &Params::new().with("key_id", "nope"),
        );
        assert!(matches!(result, Err(Error::Dependency(_))));
    }

    #[test]
    fn key_id_param_is_mandatory() {
        assert!(action().check_params(&Params::new()).is_err());
        assert!(action().check_params(&params()).is_ok());
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let action = action();
        assert!(action.reveal("not-a-ciphertext").is_err());
        assert!(action.reveal("enc:v1:k1:!!!").is_err());
        assert!(action.reveal("enc:v1:k1:AAAA").is_err());
    }
}
