use der::{Decode, Encode};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::RdnSequence;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::params::{ExtensionParam, NameInput, Validity};
use crate::error::{CertSmithError, Result};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The serial number as a hex string.
/// * `signature_algorithm` - Identifier of the algorithm that signs the certificate.
/// * `issuer` - The issuer name; an empty name when absent.
/// * `validity` - The validity window.
/// * `subject` - The subject name; an empty name when absent.
/// * `subject_public_key_info` - DER `SubjectPublicKeyInfo` of the subject key.
/// * `extensions` - Additional X.509 extensions for the certificate.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub serial_number: String,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: Option<NameInput>,
    pub validity: Validity,
    pub subject: Option<NameInput>,
    pub subject_public_key_info: Vec<u8>,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a version 3 `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;

        let subject_public_key_info = SubjectPublicKeyInfoOwned::from_der(
            &self.subject_public_key_info,
        )
        .map_err(|e| CertSmithError::KeyError(format!("invalid SubjectPublicKeyInfo: {e}")))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: serial_number_from_hex(&self.serial_number)?,
            signature: self.signature_algorithm.clone(),
            issuer: to_name(self.issuer.as_ref())?,
            validity: self.validity.to_x509_validity()?,
            subject: to_name(self.subject.as_ref())?,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format. These are the bytes that get signed.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }
}

fn to_name(name: Option<&NameInput>) -> Result<RdnSequence> {
    match name {
        Some(name) => name.to_x509_name(),
        None => Ok(RdnSequence::default()),
    }
}

/// Parses a hex serial number into a positive INTEGER.
///
/// Leading zeros are dropped and a 0x00 octet is prefixed when the first
/// remaining octet has its high bit set. An odd number of digits is read as if
/// it had a leading zero.
pub fn serial_number_from_hex(serial: &str) -> Result<SerialNumber> {
    let digits = serial.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() {
        return Err(CertSmithError::InvalidInput(
            "serial number is empty".to_string(),
        ));
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded)
        .map_err(|e| CertSmithError::InvalidInput(format!("serial number '{serial}': {e}")))?;

    let start = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    let magnitude = &bytes[start..];
    let mut canonical = Vec::with_capacity(magnitude.len() + 1);
    if magnitude.first().is_some_and(|byte| byte & 0x80 != 0) {
        canonical.push(0);
    }
    canonical.extend_from_slice(magnitude);

    SerialNumber::new(&canonical)
        .map_err(|e| CertSmithError::InvalidInput(format!("serial number '{serial}': {e}")))
}

/// Lower-case hex of a serial number without the sign octet.
pub fn serial_number_to_hex(serial: &SerialNumber) -> String {
    let bytes = serial.as_bytes();
    match bytes {
        [0, rest @ ..] if !rest.is_empty() => hex::encode(rest),
        _ => hex::encode(bytes),
    }
}
