//! The asymmetric-key capability the issuer depends on.
//!
//! Implement [`CryptoProvider`] to issue certificates with keys held in an HSM,
//! a cloud KMS or a smart card. [`RustCryptoProvider`](crate::key::RustCryptoProvider)
//! is the in-process implementation.

use async_trait::async_trait;

use crate::algorithm::SigningAlgorithm;
use crate::error::{CertSmithError, Result};

/// Algorithm information a key carries about itself, such as its family and curve.
pub trait KeyMetadata {
    fn algorithm(&self) -> SigningAlgorithm;
}

/// Public-key export, signing and verification.
///
/// `sign` must return the raw signature of the algorithm (fixed-width `R || S`
/// for ECDSA); the issuer converts it to the certificate form. Errors raised by
/// `sign` reach the caller unchanged and are never retried, since some signers
/// keep counters or other state per call.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    type PublicKey: KeyMetadata + Send + Sync;
    type PrivateKey: KeyMetadata + Send + Sync;

    /// DER `SubjectPublicKeyInfo` of `key`.
    async fn export_public_key(&self, key: &Self::PublicKey) -> Result<Vec<u8>>;

    /// Loads a public key from DER `SubjectPublicKeyInfo`. Providers that
    /// only sign with keys they already hold can keep the default, which fails
    /// with [`CertSmithError::KeyError`].
    async fn import_public_key(&self, spki_der: &[u8]) -> Result<Self::PublicKey> {
        Err(CertSmithError::KeyError(format!(
            "this provider cannot import public keys ({} bytes offered)",
            spki_der.len()
        )))
    }

    async fn sign(
        &self,
        algorithm: &SigningAlgorithm,
        key: &Self::PrivateKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    /// Checks a raw signature over `data`.
    async fn verify(
        &self,
        algorithm: &SigningAlgorithm,
        key: &Self::PublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;
}
