//! In-process keys backed by the RustCrypto crates.
//!
//! Keys are imported from PKCS#8 or wrapped from RustCrypto key types; this
//! crate does not generate keys.

use async_trait::async_trait;
use const_oid::AssociatedOid;
use der::Decode;
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Digest;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::algorithm::{HashAlgorithm, KeyAlgorithm, SigningAlgorithm};
use crate::encoding;
use crate::error::{CertSmithError, Result};
use crate::provider::{CryptoProvider, KeyMetadata};

/// Supported private keys, each with its public half.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Imports a PKCS#8 `PrivateKeyInfo`, choosing the key type from its algorithm.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        use const_oid::db::{rfc5912, rfc8410};

        let info = pkcs8::PrivateKeyInfo::try_from(der)?;
        match info.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => Ok(RsaPrivateKey::from_pkcs8_der(der)?.into()),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = info.algorithm.parameters_oid()?;
                match curve {
                    rfc5912::SECP_256_R_1 => Ok(P256SigningKey::from_pkcs8_der(der)?.into()),
                    rfc5912::SECP_384_R_1 => Ok(P384SigningKey::from_pkcs8_der(der)?.into()),
                    other => Err(CertSmithError::KeyError(format!(
                        "Unsupported elliptic curve {other}"
                    ))),
                }
            }
            rfc8410::ID_ED_25519 => Ok(Ed25519SigningKey::from_pkcs8_der(der)?.into()),
            other => Err(CertSmithError::KeyError(format!(
                "Unsupported private key algorithm {other}"
            ))),
        }
    }

    /// Imports the first `PRIVATE KEY` object of a PEM document.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let object = encoding::decode_pem_objects(pem)?
            .into_iter()
            .find(|object| object.tag == "PRIVATE KEY")
            .ok_or_else(|| {
                CertSmithError::DecodingError("no PRIVATE KEY object in PEM input".to_string())
            })?;
        Self::from_pkcs8_der(&object.body)
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }
}

impl From<RsaPrivateKey> for KeyPair {
    fn from(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }
}

impl From<P256SigningKey> for KeyPair {
    fn from(signing_key: P256SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }
}

impl From<P384SigningKey> for KeyPair {
    fn from(signing_key: P384SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }
}

impl From<Ed25519SigningKey> for KeyPair {
    fn from(signing_key: Ed25519SigningKey) -> Self {
        KeyPair::Ed25519 { signing_key }
    }
}

impl KeyMetadata for KeyPair {
    fn algorithm(&self) -> SigningAlgorithm {
        self.public_key().algorithm()
    }
}

/// Supported public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    /// Parses a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        use const_oid::db::{rfc5912, rfc8410};

        let spki = SubjectPublicKeyInfoOwned::from_der(der)?;
        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(der)?)),
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .map(|parameters| parameters.decode_as::<const_oid::ObjectIdentifier>())
                    .transpose()?;
                match curve {
                    Some(rfc5912::SECP_256_R_1) => Ok(PublicKey::EcdsaP256(
                        P256VerifyingKey::from_public_key_der(der)?,
                    )),
                    Some(rfc5912::SECP_384_R_1) => Ok(PublicKey::EcdsaP384(
                        P384VerifyingKey::from_public_key_der(der)?,
                    )),
                    _ => Err(CertSmithError::KeyError(
                        "Unsupported or missing elliptic curve parameter".to_string(),
                    )),
                }
            }
            rfc8410::ID_ED_25519 => Ok(PublicKey::Ed25519(
                Ed25519VerifyingKey::from_public_key_der(der)?,
            )),
            other => Err(CertSmithError::KeyError(format!(
                "Unsupported public key algorithm {other}"
            ))),
        }
    }

    /// Encodes the key as DER `SubjectPublicKeyInfo`.
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::EcdsaP256(key) => key.to_public_key_der(),
            PublicKey::EcdsaP384(key) => key.to_public_key_der(),
            PublicKey::Ed25519(key) => key.to_public_key_der(),
        }
        .map_err(|e| CertSmithError::EncodingError(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }
}

impl KeyMetadata for PublicKey {
    fn algorithm(&self) -> SigningAlgorithm {
        match self {
            PublicKey::Rsa(_) => SigningAlgorithm::builder()
                .family(KeyAlgorithm::RsaPkcs1)
                .build(),
            PublicKey::EcdsaP256(_) => SigningAlgorithm::builder()
                .family(KeyAlgorithm::Ecdsa)
                .named_curve("P-256")
                .build(),
            PublicKey::EcdsaP384(_) => SigningAlgorithm::builder()
                .family(KeyAlgorithm::Ecdsa)
                .named_curve("P-384")
                .build(),
            PublicKey::Ed25519(_) => SigningAlgorithm::ed25519(),
        }
    }
}

/// [`CryptoProvider`] over [`KeyPair`] and [`PublicKey`].
///
/// ECDSA signatures are produced over a prehash of the requested digest and
/// returned as fixed-width `R || S`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

#[async_trait]
impl CryptoProvider for RustCryptoProvider {
    type PublicKey = PublicKey;
    type PrivateKey = KeyPair;

    async fn export_public_key(&self, key: &PublicKey) -> Result<Vec<u8>> {
        key.to_spki_der()
    }

    async fn import_public_key(&self, spki_der: &[u8]) -> Result<PublicKey> {
        PublicKey::from_spki_der(spki_der)
    }

    async fn sign(
        &self,
        algorithm: &SigningAlgorithm,
        key: &KeyPair,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        ensure_family(algorithm, &key.algorithm())?;
        match key {
            KeyPair::Rsa { private, .. } => match algorithm.require_hash()? {
                HashAlgorithm::Sha1 => rsa_sign::<sha1::Sha1>(private, data),
                HashAlgorithm::Sha256 => rsa_sign::<sha2::Sha256>(private, data),
                HashAlgorithm::Sha384 => rsa_sign::<sha2::Sha384>(private, data),
                HashAlgorithm::Sha512 => rsa_sign::<sha2::Sha512>(private, data),
            },
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let digest = algorithm.require_hash()?.digest(data);
                let signature: p256::ecdsa::Signature =
                    signing_key.sign_prehash(&digest).map_err(signing_failure)?;
                Ok(signature.to_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let digest = algorithm.require_hash()?.digest(data);
                let signature: p384::ecdsa::Signature =
                    signing_key.sign_prehash(&digest).map_err(signing_failure)?;
                Ok(signature.to_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => Ok(signing_key.sign(data).to_bytes().to_vec()),
        }
    }

    async fn verify(
        &self,
        algorithm: &SigningAlgorithm,
        key: &PublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        if ensure_family(algorithm, &key.algorithm()).is_err() {
            return Ok(false);
        }
        let verified = match key {
            PublicKey::Rsa(public) => match algorithm.require_hash()? {
                HashAlgorithm::Sha1 => rsa_verify::<sha1::Sha1>(public, data, signature),
                HashAlgorithm::Sha256 => rsa_verify::<sha2::Sha256>(public, data, signature),
                HashAlgorithm::Sha384 => rsa_verify::<sha2::Sha384>(public, data, signature),
                HashAlgorithm::Sha512 => rsa_verify::<sha2::Sha512>(public, data, signature),
            },
            PublicKey::EcdsaP256(verifying_key) => {
                let digest = algorithm.require_hash()?.digest(data);
                p256::ecdsa::Signature::from_slice(signature)
                    .and_then(|signature| verifying_key.verify_prehash(&digest, &signature))
                    .is_ok()
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let digest = algorithm.require_hash()?.digest(data);
                p384::ecdsa::Signature::from_slice(signature)
                    .and_then(|signature| verifying_key.verify_prehash(&digest, &signature))
                    .is_ok()
            }
            PublicKey::Ed25519(verifying_key) => ed25519_dalek::Signature::from_slice(signature)
                .and_then(|signature| verifying_key.verify(data, &signature))
                .is_ok(),
        };
        Ok(verified)
    }
}

fn ensure_family(requested: &SigningAlgorithm, key: &SigningAlgorithm) -> Result<()> {
    match (requested.family, key.family) {
        (Some(requested_family), Some(key_family)) if requested_family != key_family => {
            Err(CertSmithError::SigningFailure(format!(
                "{} key cannot produce {requested} signatures",
                key_family.name()
            )))
        }
        _ => Ok(()),
    }
}

fn signing_failure(err: impl std::fmt::Display) -> CertSmithError {
    CertSmithError::SigningFailure(err.to_string())
}

fn rsa_sign<D>(private: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>>
where
    D: Digest + AssociatedOid,
{
    rsa::pkcs1v15::SigningKey::<D>::new(private.clone())
        .try_sign(data)
        .map(|signature| signature.to_vec())
        .map_err(signing_failure)
}

fn rsa_verify<D>(public: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool
where
    D: Digest + AssociatedOid,
{
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(public.clone());
    rsa::pkcs1v15::Signature::try_from(signature)
        .and_then(|signature| verifying_key.verify(data, &signature))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::EncodePrivateKey;
    use rand_core::OsRng;

    #[tokio::test]
    async fn test_ecdsa_sign_produces_fixed_width_signature() {
        let provider = RustCryptoProvider;
        let key = KeyPair::from(P384SigningKey::random(&mut OsRng));
        let algorithm = SigningAlgorithm::ecdsa(HashAlgorithm::Sha384).merge(&key.algorithm());

        let signature = provider.sign(&algorithm, &key, b"payload").await.unwrap();
        assert_eq!(signature.len(), 96);
        assert!(
            provider
                .verify(&algorithm, &key.public_key(), b"payload", &signature)
                .await
                .unwrap()
        );
        assert!(
            !provider
                .verify(&algorithm, &key.public_key(), b"tampered", &signature)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_family_mismatch_is_a_signing_failure() {
        let provider = RustCryptoProvider;
        let key = KeyPair::from(Ed25519SigningKey::generate(&mut OsRng));
        let err = provider
            .sign(&SigningAlgorithm::ecdsa(HashAlgorithm::Sha256), &key, b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, CertSmithError::SigningFailure(_)));
    }

    #[tokio::test]
    async fn test_spki_round_trip() {
        let provider = RustCryptoProvider;
        for key in [
            KeyPair::from(P256SigningKey::random(&mut OsRng)),
            KeyPair::from(Ed25519SigningKey::generate(&mut OsRng)),
        ] {
            let public = key.public_key();
            let der = provider.export_public_key(&public).await.unwrap();
            assert_eq!(provider.import_public_key(&der).await.unwrap(), public);
        }
    }

    #[test]
    fn test_pkcs8_pem_import() {
        let signing_key = P256SigningKey::random(&mut OsRng);
        let pem = signing_key.to_pkcs8_pem(pkcs8::LineEnding::LF).unwrap();
        let key = KeyPair::from_pkcs8_pem(&pem).unwrap();
        assert_eq!(key.public_key(), PublicKey::EcdsaP256(*signing_key.verifying_key()));
        assert_eq!(key.algorithm().named_curve.as_deref(), Some("P-256"));
    }
}
