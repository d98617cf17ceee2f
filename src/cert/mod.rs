pub mod extensions;
pub mod params;

use std::fmt;
use std::str::FromStr;

use der::{Decode, Encode};
use extensions::ToAndFromX509Extension;
use params::{ExtensionParam, Validity};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::algorithm::AlgorithmProvider;
use crate::encoding::{self, EncodedInput, Encoding};
use crate::error::{CertSmithError, Result};
use crate::provider::{CryptoProvider, KeyMetadata};
use crate::signature::SignatureFormatterRegistry;
use crate::tbs_certificate::serial_number_to_hex;

/// PEM label of an encoded certificate.
pub const PEM_TAG: &str = "CERTIFICATE";

/// Where a [`Certificate`] comes from: encoded bytes or text, or an already
/// parsed structure.
#[derive(Debug, Clone)]
pub enum CertificateSource {
    Encoded(EncodedInput),
    Structured(x509_cert::Certificate),
}

/// An issued X.509 certificate.
///
/// Holds the DER encoding together with the parsed structure. `Display`
/// renders PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    inner: x509_cert::Certificate,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = x509_cert::Certificate::from_der(der)
            .map_err(|e| CertSmithError::CertificateError(e.to_string()))?;
        Ok(Self {
            der: der.to_vec(),
            inner,
        })
    }

    /// Parses a certificate from DER bytes or from PEM, hex, base64 or base64url text.
    pub fn decode(input: impl Into<EncodedInput>) -> Result<Self> {
        Self::from_der(&encoding::decode(input)?)
    }

    pub fn from_x509(inner: x509_cert::Certificate) -> Result<Self> {
        let der = inner
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))?;
        Ok(Self { der, inner })
    }

    /// The DER encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.der.clone()
    }

    /// The DER encoding rendered as text. PEM output uses the `CERTIFICATE` label.
    pub fn to_string_as(&self, encoding: Encoding) -> String {
        encoding::encode(&self.der, encoding, PEM_TAG)
    }

    pub fn inner(&self) -> &x509_cert::Certificate {
        &self.inner
    }

    /// The serial number as lower-case hex.
    pub fn serial_number(&self) -> String {
        serial_number_to_hex(&self.inner.tbs_certificate.serial_number)
    }

    /// The subject as an RFC 4514 string.
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// The issuer as an RFC 4514 string.
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    pub fn validity(&self) -> Validity {
        Validity::from_x509_validity(&self.inner.tbs_certificate.validity)
    }

    /// DER encoding of the `tbsCertificate`, the signed bytes.
    pub fn tbs_bytes(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    /// The outer `signatureAlgorithm`.
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.inner.signature_algorithm
    }

    /// The signature as stored in the certificate.
    pub fn signature(&self) -> &[u8] {
        self.inner.signature.raw_bytes()
    }

    /// DER `SubjectPublicKeyInfo` of the subject.
    pub fn subject_public_key_info(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ExtensionParam::from_x509_extension)
            .collect()
    }

    /// The first extension of type `E`, decoded.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension::<E>())
            .transpose()
    }

    /// Whether the `signature` field of the body equals the outer `signatureAlgorithm`.
    pub fn signature_algorithms_match(&self) -> bool {
        self.inner.tbs_certificate.signature == self.inner.signature_algorithm
    }

    /// Checks the certificate signature with `public_key`.
    ///
    /// The stored signature is converted back to raw form with `registry`
    /// and handed to `provider` together with the body bytes. A certificate
    /// whose two algorithm identifiers differ never verifies.
    pub async fn verify<P: CryptoProvider>(
        &self,
        provider: &P,
        registry: &SignatureFormatterRegistry,
        algorithms: &dyn AlgorithmProvider,
        public_key: &P::PublicKey,
    ) -> Result<bool> {
        if !self.signature_algorithms_match() {
            log::warn!(
                "certificate {} has mismatched signature algorithm identifiers",
                self.serial_number()
            );
            return Ok(false);
        }
        let algorithm = algorithms
            .from_algorithm_identifier(self.signature_algorithm())?
            .merge(&public_key.algorithm());
        let raw = registry
            .to_raw(&algorithm, self.signature())?
            .ok_or_else(|| CertSmithError::SignatureConversionUnsupported(algorithm.to_string()))?;
        provider
            .verify(&algorithm, public_key, &self.tbs_bytes()?, &raw)
            .await
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_as(Encoding::Pem))
    }
}

impl FromStr for Certificate {
    type Err = CertSmithError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl TryFrom<CertificateSource> for Certificate {
    type Error = CertSmithError;

    fn try_from(source: CertificateSource) -> Result<Self> {
        match source {
            CertificateSource::Encoded(input) => Self::decode(input),
            CertificateSource::Structured(inner) => Self::from_x509(inner),
        }
    }
}

impl TryFrom<x509_cert::Certificate> for Certificate {
    type Error = CertSmithError;

    fn try_from(inner: x509_cert::Certificate) -> Result<Self> {
        Self::from_x509(inner)
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.der
    }
}
