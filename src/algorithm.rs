//! Signing algorithm descriptors and their mapping to X.509 algorithm identifiers.

use std::fmt;

use bon::Builder;
use const_oid::ObjectIdentifier;
use sha2::Digest;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{CertSmithError, Result};

const ECDSA_WITH_SHA_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const SHA_1_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA_384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA_512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// Digest algorithms usable in a certificate signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Hashes `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Signature algorithm families. Signature formatters decide applicability by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// ECDSA over a named curve.
    Ecdsa,
    /// RSASSA-PKCS1-v1_5.
    RsaPkcs1,
    Ed25519,
}

impl KeyAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::RsaPkcs1 => "RSASSA-PKCS1-v1_5",
            KeyAlgorithm::Ed25519 => "Ed25519",
        }
    }
}

/// A possibly partial description of a signing algorithm.
///
/// Callers usually supply only what they care about (for instance the hash) and
/// let the signing key's own metadata fill the rest through [`SigningAlgorithm::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct SigningAlgorithm {
    pub family: Option<KeyAlgorithm>,
    pub hash: Option<HashAlgorithm>,
    /// Curve name such as `P-256`; only meaningful for ECDSA.
    #[builder(into)]
    pub named_curve: Option<String>,
}

impl SigningAlgorithm {
    pub fn ecdsa(hash: HashAlgorithm) -> Self {
        Self {
            family: Some(KeyAlgorithm::Ecdsa),
            hash: Some(hash),
            named_curve: None,
        }
    }

    pub fn ecdsa_on(named_curve: impl Into<String>, hash: HashAlgorithm) -> Self {
        Self {
            named_curve: Some(named_curve.into()),
            ..Self::ecdsa(hash)
        }
    }

    pub fn rsa_pkcs1(hash: HashAlgorithm) -> Self {
        Self {
            family: Some(KeyAlgorithm::RsaPkcs1),
            hash: Some(hash),
            named_curve: None,
        }
    }

    pub fn ed25519() -> Self {
        Self {
            family: Some(KeyAlgorithm::Ed25519),
            hash: None,
            named_curve: None,
        }
    }

    /// Returns a descriptor where every field missing from `self` is taken from `other`.
    pub fn merge(&self, other: &SigningAlgorithm) -> SigningAlgorithm {
        SigningAlgorithm {
            family: self.family.or(other.family),
            hash: self.hash.or(other.hash),
            named_curve: self.named_curve.clone().or_else(|| other.named_curve.clone()),
        }
    }

    /// Fills a missing hash with the conventional choice for the family and curve.
    pub fn with_family_defaults(mut self) -> SigningAlgorithm {
        if self.hash.is_none() {
            self.hash = match self.family {
                Some(KeyAlgorithm::Ecdsa) => Some(match self.named_curve.as_deref() {
                    Some("P-384") => HashAlgorithm::Sha384,
                    Some("P-521") => HashAlgorithm::Sha512,
                    _ => HashAlgorithm::Sha256,
                }),
                Some(KeyAlgorithm::RsaPkcs1) => Some(HashAlgorithm::Sha256),
                Some(KeyAlgorithm::Ed25519) | None => None,
            };
        }
        self
    }

    pub fn require_family(&self) -> Result<KeyAlgorithm> {
        self.family.ok_or_else(|| {
            CertSmithError::InvalidInput(format!("signing algorithm {self} has no family"))
        })
    }

    pub fn require_hash(&self) -> Result<HashAlgorithm> {
        self.hash.ok_or_else(|| {
            CertSmithError::InvalidInput(format!("signing algorithm {self} has no hash"))
        })
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = self.family.map_or("?", |family| family.name());
        write!(f, "{family}")?;
        if let Some(hash) = self.hash {
            write!(f, "/{}", hash.name())?;
        }
        if let Some(curve) = &self.named_curve {
            write!(f, "/{curve}")?;
        }
        Ok(())
    }
}

/// Maps signing algorithm descriptors to and from X.509 `AlgorithmIdentifier`s.
pub trait AlgorithmProvider: Send + Sync {
    /// Returns the identifier placed in both the TBS `signature` field and the
    /// outer `signatureAlgorithm` field.
    fn to_algorithm_identifier(
        &self,
        algorithm: &SigningAlgorithm,
    ) -> Result<AlgorithmIdentifierOwned>;

    /// Recovers a descriptor (family and hash) from an identifier.
    fn from_algorithm_identifier(
        &self,
        identifier: &AlgorithmIdentifierOwned,
    ) -> Result<SigningAlgorithm>;
}

/// The algorithm table covering ECDSA, RSASSA-PKCS1-v1_5 and Ed25519.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAlgorithmProvider;

impl DefaultAlgorithmProvider {
    fn oid_for(algorithm: &SigningAlgorithm) -> Option<ObjectIdentifier> {
        use const_oid::db::{rfc5912, rfc8410};

        match (algorithm.family?, algorithm.hash) {
            (KeyAlgorithm::Ecdsa, Some(HashAlgorithm::Sha1)) => Some(ECDSA_WITH_SHA_1),
            (KeyAlgorithm::Ecdsa, Some(HashAlgorithm::Sha256)) => {
                Some(rfc5912::ECDSA_WITH_SHA_256)
            }
            (KeyAlgorithm::Ecdsa, Some(HashAlgorithm::Sha384)) => {
                Some(rfc5912::ECDSA_WITH_SHA_384)
            }
            (KeyAlgorithm::Ecdsa, Some(HashAlgorithm::Sha512)) => {
                Some(rfc5912::ECDSA_WITH_SHA_512)
            }
            (KeyAlgorithm::RsaPkcs1, Some(HashAlgorithm::Sha1)) => Some(SHA_1_WITH_RSA_ENCRYPTION),
            (KeyAlgorithm::RsaPkcs1, Some(HashAlgorithm::Sha256)) => {
                Some(rfc5912::SHA_256_WITH_RSA_ENCRYPTION)
            }
            (KeyAlgorithm::RsaPkcs1, Some(HashAlgorithm::Sha384)) => {
                Some(SHA_384_WITH_RSA_ENCRYPTION)
            }
            (KeyAlgorithm::RsaPkcs1, Some(HashAlgorithm::Sha512)) => {
                Some(SHA_512_WITH_RSA_ENCRYPTION)
            }
            (KeyAlgorithm::Ed25519, _) => Some(rfc8410::ID_ED_25519),
            (_, None) => None,
        }
    }
}

impl AlgorithmProvider for DefaultAlgorithmProvider {
    fn to_algorithm_identifier(
        &self,
        algorithm: &SigningAlgorithm,
    ) -> Result<AlgorithmIdentifierOwned> {
        let oid = Self::oid_for(algorithm).ok_or_else(|| {
            CertSmithError::InvalidInput(format!("no algorithm identifier for {algorithm}"))
        })?;
        // RFC 4055: the RSA PKCS#1 identifiers carry an explicit NULL parameter.
        let parameters = match algorithm.family {
            Some(KeyAlgorithm::RsaPkcs1) => Some(der::asn1::Any::null()),
            _ => None,
        };
        Ok(AlgorithmIdentifierOwned { oid, parameters })
    }

    fn from_algorithm_identifier(
        &self,
        identifier: &AlgorithmIdentifierOwned,
    ) -> Result<SigningAlgorithm> {
        use const_oid::db::{rfc5912, rfc8410};

        let algorithm = match identifier.oid {
            ECDSA_WITH_SHA_1 => SigningAlgorithm::ecdsa(HashAlgorithm::Sha1),
            rfc5912::ECDSA_WITH_SHA_256 => SigningAlgorithm::ecdsa(HashAlgorithm::Sha256),
            rfc5912::ECDSA_WITH_SHA_384 => SigningAlgorithm::ecdsa(HashAlgorithm::Sha384),
            rfc5912::ECDSA_WITH_SHA_512 => SigningAlgorithm::ecdsa(HashAlgorithm::Sha512),
            SHA_1_WITH_RSA_ENCRYPTION => SigningAlgorithm::rsa_pkcs1(HashAlgorithm::Sha1),
            rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                SigningAlgorithm::rsa_pkcs1(HashAlgorithm::Sha256)
            }
            SHA_384_WITH_RSA_ENCRYPTION => SigningAlgorithm::rsa_pkcs1(HashAlgorithm::Sha384),
            SHA_512_WITH_RSA_ENCRYPTION => SigningAlgorithm::rsa_pkcs1(HashAlgorithm::Sha512),
            rfc8410::ID_ED_25519 => SigningAlgorithm::ed25519(),
            other => {
                return Err(CertSmithError::DecodingError(format!(
                    "Unsupported signature algorithm {other}"
                )));
            }
        };
        Ok(algorithm)
    }
}
