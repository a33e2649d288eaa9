//! Party identity and ed25519 signing.
//!
//! The protocol never inspects keys itself; it only asks an [`Identity`] to
//! sign transition payloads and lets the commit service check them with
//! [`verify_signature`].

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::PartyId;

/// A party's signing identity.
pub struct Identity {
    /// Human-readable name, used only in logs.
    name: String,
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh identity from the OS RNG.
    #[must_use]
    pub fn generate(name: impl Into<String>) -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            name: name.into(),
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Rebuild an identity from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    #[must_use]
    pub fn id(&self) -> PartyId {
        PartyId::from_pubkey(self.signing_key.verifying_key().to_bytes())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ed25519 signature over `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Check that `signature` is `party`'s ed25519 signature over `message`.
#[must_use]
pub fn verify_signature(party: &PartyId, message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(party.as_bytes()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}
