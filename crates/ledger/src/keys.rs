//! Ed25519 key pairs and envelope signatures
//!
//! A signer proves authorization by signing the 32-byte transaction hash.
//! The signature travels inside the envelope next to the signer's public key.

use crate::error::LedgerError;
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use quorum_core::PublicKey;
use serde::{Deserialize, Serialize};

/// Signature attached to an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    /// Signer public key
    pub public_key: PublicKey,

    /// Signature bytes (hex-encoded)
    pub signature: String,
}

impl DecoratedSignature {
    /// Verify this signature against a payload
    pub fn verify(&self, payload: &[u8]) -> Result<(), LedgerError> {
        let signer = self.public_key.to_string();

        let sig_bytes = hex::decode(&self.signature).map_err(|e| LedgerError::InvalidSignature {
            signer: signer.clone(),
            reason: format!("Invalid signature hex: {}", e),
        })?;

        let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|_| LedgerError::InvalidSignature {
            signer: signer.clone(),
            reason: "Signature must be 64 bytes".to_string(),
        })?;

        let verifying_key = VerifyingKey::from_bytes(&self.public_key.to_bytes()).map_err(|e| {
            LedgerError::InvalidSignature {
                signer: signer.clone(),
                reason: format!("Invalid public key: {}", e),
            }
        })?;

        let signature = Signature::from_bytes(&sig_array);

        verifying_key.verify(payload, &signature).map_err(|e| {
            LedgerError::SignatureVerificationFailed(format!("Signature from {} failed: {}", signer, e))
        })
    }
}

/// An ed25519 key pair held only for the duration of a signing call
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Create from a 32-byte seed (hex-encoded)
    pub fn from_secret_hex(hex_seed: &str) -> Result<Self, LedgerError> {
        let bytes = hex::decode(hex_seed.trim())
            .map_err(|e| LedgerError::InvalidSecret(format!("Invalid key hex: {}", e)))?;

        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidSecret("Key must be 32 bytes".to_string()))?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Generate a new random key pair
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Export the seed as hex (for storage)
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(&self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a payload (normally a transaction hash)
    pub fn sign(&self, payload: &[u8]) -> DecoratedSignature {
        let signature = self.signing_key.sign(payload);
        DecoratedSignature {
            public_key: self.public_key(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let payload = [42u8; 32];

        let signature = keypair.sign(&payload);

        assert_eq!(signature.public_key, keypair.public_key());
        assert!(signature.verify(&payload).is_ok());
    }

    #[test]
    fn test_secret_roundtrip() {
        let keypair = KeyPair::generate();
        let secret = keypair.secret_hex();

        let restored = KeyPair::from_secret_hex(&secret).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"original");

        assert!(matches!(
            signature.verify(b"tampered"),
            Err(LedgerError::SignatureVerificationFailed(_))
        ));
    }

    #[test]
    fn test_invalid_secret() {
        assert!(matches!(
            KeyPair::from_secret_hex("not-hex"),
            Err(LedgerError::InvalidSecret(_))
        ));
        assert!(matches!(
            KeyPair::from_secret_hex("abcd"),
            Err(LedgerError::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = KeyPair::generate();
        let debug = format!("{:?}", keypair);
        assert!(!debug.contains(&keypair.secret_hex()));
    }
}
