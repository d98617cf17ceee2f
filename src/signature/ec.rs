//! ECDSA signatures: fixed-width `R || S` to DER `Ecdsa-Sig-Value` and back.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use der::asn1::{Any, Uint};
use der::{Decode, Encode, Sequence, Tag, Tagged};

use super::SignatureFormatter;
use crate::algorithm::{KeyAlgorithm, SigningAlgorithm};
use crate::error::{CertSmithError, Result};

/// Coordinate width used for curves missing from the table.
pub const DEFAULT_POINT_SIZE: usize = 32;

/// Maps curve names to the byte width of one coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurvePointSizes {
    sizes: HashMap<String, usize>,
}

impl Default for CurvePointSizes {
    /// The NIST curves and secp256k1 under their JOSE names.
    fn default() -> Self {
        let sizes = [("P-256", 32), ("K-256", 32), ("P-384", 48), ("P-521", 66)]
            .into_iter()
            .map(|(name, size)| (name.to_string(), size))
            .collect();
        Self { sizes }
    }
}

impl CurvePointSizes {
    pub fn empty() -> Self {
        Self {
            sizes: HashMap::new(),
        }
    }

    pub fn register(&mut self, curve: impl Into<String>, point_size: usize) -> Result<()> {
        let curve = curve.into();
        if point_size == 0 {
            return Err(CertSmithError::InvalidInput(format!(
                "point size for curve {curve} must be positive"
            )));
        }
        log::debug!("curve {curve} uses {point_size}-byte coordinates");
        self.sizes.insert(curve, point_size);
        Ok(())
    }

    /// Width for `curve`, or [`DEFAULT_POINT_SIZE`] when unknown or unnamed.
    pub fn point_size(&self, curve: Option<&str>) -> usize {
        curve
            .and_then(|name| self.sizes.get(name).copied())
            .unwrap_or(DEFAULT_POINT_SIZE)
    }
}

static GLOBAL_POINT_SIZES: LazyLock<Arc<RwLock<CurvePointSizes>>> =
    LazyLock::new(|| Arc::new(RwLock::new(CurvePointSizes::default())));

/// Registers a curve in the process-wide table read by
/// [`EcSignatureFormatter::default`].
pub fn register_curve_point_size(curve: impl Into<String>, point_size: usize) -> Result<()> {
    GLOBAL_POINT_SIZES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(curve, point_size)
}

/// `Ecdsa-Sig-Value ::= SEQUENCE { r INTEGER, s INTEGER }` (RFC 3279).
#[derive(Debug, Clone, PartialEq, Eq, Sequence)]
struct EcdsaSigValue {
    r: Uint,
    s: Uint,
}

/// Decoding view of `Ecdsa-Sig-Value` that keeps each INTEGER's content
/// octets as found, including redundant leading zeros.
#[derive(Debug, Clone, PartialEq, Eq, Sequence)]
struct LenientSigValue {
    r: Any,
    s: Any,
}

/// Transcodes ECDSA signatures. Declines every other family.
#[derive(Debug, Clone)]
pub struct EcSignatureFormatter {
    point_sizes: Arc<RwLock<CurvePointSizes>>,
}

impl Default for EcSignatureFormatter {
    /// Reads the process-wide table, including later registrations.
    fn default() -> Self {
        Self {
            point_sizes: Arc::clone(&GLOBAL_POINT_SIZES),
        }
    }
}

impl EcSignatureFormatter {
    /// A formatter with its own table, isolated from the process-wide one.
    pub fn new(point_sizes: CurvePointSizes) -> Self {
        Self {
            point_sizes: Arc::new(RwLock::new(point_sizes)),
        }
    }

    pub fn point_size(&self, algorithm: &SigningAlgorithm) -> usize {
        self.point_sizes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .point_size(algorithm.named_curve.as_deref())
    }
}

impl SignatureFormatter for EcSignatureFormatter {
    fn name(&self) -> &str {
        "ecdsa"
    }

    fn to_structured(
        &self,
        algorithm: &SigningAlgorithm,
        signature: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        if algorithm.family != Some(KeyAlgorithm::Ecdsa) {
            return Ok(None);
        }
        let point_size = self.point_size(algorithm);
        if signature.len() != point_size * 2 {
            return Err(CertSmithError::MalformedSignature(format!(
                "raw {algorithm} signature is {} bytes, expected {}",
                signature.len(),
                point_size * 2
            )));
        }
        let (r, s) = signature.split_at(point_size);
        let value = EcdsaSigValue {
            r: to_integer(r)?,
            s: to_integer(s)?,
        };
        let der = value
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))?;
        Ok(Some(der))
    }

    fn to_raw(&self, algorithm: &SigningAlgorithm, signature: &[u8]) -> Result<Option<Vec<u8>>> {
        if algorithm.family != Some(KeyAlgorithm::Ecdsa) {
            return Ok(None);
        }
        let point_size = self.point_size(algorithm);
        let value = LenientSigValue::from_der(signature)
            .map_err(|e| CertSmithError::MalformedSignature(e.to_string()))?;
        let mut raw = Vec::with_capacity(point_size * 2);
        append_padded(&mut raw, integer_bytes(&value.r, "r")?, point_size, "r")?;
        append_padded(&mut raw, integer_bytes(&value.s, "s")?, point_size, "s")?;
        Ok(Some(raw))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Minimal unsigned magnitude of a coordinate. The DER integer encoder adds
/// the sign byte when the top bit is set; zero is encoded as a single 0x00.
fn to_integer(coordinate: &[u8]) -> Result<Uint> {
    const ZERO: &[u8] = &[0];
    let magnitude = match strip_leading_zeros(coordinate) {
        [] => ZERO,
        magnitude => magnitude,
    };
    Uint::new(magnitude).map_err(|e| CertSmithError::EncodingError(e.to_string()))
}

/// Content octets of a non-negative INTEGER, leading zeros left in place.
fn integer_bytes<'a>(value: &'a Any, name: &str) -> Result<&'a [u8]> {
    let tag = Tagged::tag(value);
    if tag != Tag::Integer {
        return Err(CertSmithError::MalformedSignature(format!(
            "{name} is {tag}, expected INTEGER"
        )));
    }
    match value.value() {
        [] => Err(CertSmithError::MalformedSignature(format!(
            "{name} is an empty INTEGER"
        ))),
        [first, ..] if first & 0x80 != 0 => Err(CertSmithError::MalformedSignature(format!(
            "{name} is negative"
        ))),
        bytes => Ok(bytes),
    }
}

fn append_padded(out: &mut Vec<u8>, integer: &[u8], point_size: usize, name: &str) -> Result<()> {
    let magnitude = strip_leading_zeros(integer);
    if magnitude.len() > point_size {
        return Err(CertSmithError::MalformedSignature(format!(
            "{name} is {} bytes, larger than the {point_size}-byte point size",
            magnitude.len()
        )));
    }
    out.resize(out.len() + point_size - magnitude.len(), 0);
    out.extend_from_slice(magnitude);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::HashAlgorithm;
    use rstest::rstest;

    fn formatter() -> EcSignatureFormatter {
        EcSignatureFormatter::new(CurvePointSizes::default())
    }

    fn raw(r: &[u8], s: &[u8], point_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        append_padded(&mut out, r, point_size, "r").unwrap();
        append_padded(&mut out, s, point_size, "s").unwrap();
        out
    }

    #[rstest]
    #[case("P-256", &[0x01], &[0x02])]
    #[case("P-256", &[], &[0x7f, 0xff])]
    #[case("P-256", &[0x80; 32], &[])]
    #[case("P-256", &[0xff; 32], &[0x00, 0x00, 0x80, 0x01])]
    #[case("P-384", &[0x80, 0x00, 0x01], &[0xc3; 48])]
    #[case("P-521", &[0x01; 66], &[0x01, 0xff])]
    #[case("brainpoolP256r1", &[0x9a; 32], &[0x10; 31])]
    fn test_raw_round_trip(#[case] curve: &str, #[case] r: &[u8], #[case] s: &[u8]) {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on(curve, HashAlgorithm::Sha256);
        let point_size = formatter.point_size(&algorithm);
        let signature = raw(r, s, point_size);

        let der = formatter.to_structured(&algorithm, &signature).unwrap().unwrap();
        let back = formatter.to_raw(&algorithm, &der).unwrap().unwrap();
        assert_eq!(back, signature);
    }

    #[test]
    fn test_sign_byte_and_zero_encoding() {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("P-256", HashAlgorithm::Sha256);
        let signature = raw(&[0x80, 0x01], &[], 32);

        let der = formatter.to_structured(&algorithm, &signature).unwrap().unwrap();
        assert_eq!(der, vec![0x30, 0x08, 0x02, 0x03, 0x00, 0x80, 0x01, 0x02, 0x01, 0x00]);
    }

    #[rstest]
    #[case(&[0x30, 0x07, 0x02, 0x02, 0x00, 0x01, 0x02, 0x01, 0x01], &[0x01], &[0x01])]
    #[case(&[0x30, 0x08, 0x02, 0x02, 0x00, 0x00, 0x02, 0x02, 0x00, 0x00], &[], &[])]
    #[case(&[0x30, 0x09, 0x02, 0x03, 0x00, 0x00, 0x7f, 0x02, 0x02, 0x00, 0x80], &[0x7f], &[0x80])]
    fn test_redundant_leading_zeros_are_stripped(
        #[case] der: &[u8],
        #[case] r: &[u8],
        #[case] s: &[u8],
    ) {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("P-256", HashAlgorithm::Sha256);
        assert_eq!(
            formatter.to_raw(&algorithm, der).unwrap().unwrap(),
            raw(r, s, 32)
        );
    }

    #[rstest]
    #[case(&[0x30, 0x06, 0x02, 0x01, 0x81, 0x02, 0x01, 0x01])]
    #[case(&[0x30, 0x06, 0x04, 0x01, 0x01, 0x02, 0x01, 0x01])]
    #[case(&[0x30, 0x05, 0x02, 0x00, 0x02, 0x01, 0x01])]
    fn test_non_integer_or_negative_is_malformed(#[case] der: &[u8]) {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("P-256", HashAlgorithm::Sha256);
        let err = formatter.to_raw(&algorithm, der).unwrap_err();
        assert!(matches!(err, CertSmithError::MalformedSignature(_)));
    }

    #[test]
    fn test_unknown_curve_falls_back_to_32_bytes() {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("unheard-of", HashAlgorithm::Sha256);
        assert_eq!(formatter.point_size(&algorithm), DEFAULT_POINT_SIZE);

        let mut signature = vec![0u8; 64];
        signature[31] = 5;
        signature[63] = 6;
        let der = formatter.to_structured(&algorithm, &signature).unwrap().unwrap();
        assert_eq!(der, vec![0x30, 0x06, 0x02, 0x01, 0x05, 0x02, 0x01, 0x06]);
    }

    #[test]
    fn test_oversized_integer_is_malformed() {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("P-256", HashAlgorithm::Sha256);
        let value = EcdsaSigValue {
            r: Uint::new(&[0x01; 33]).unwrap(),
            s: Uint::new(&[0x01]).unwrap(),
        };
        let err = formatter
            .to_raw(&algorithm, &value.to_der().unwrap())
            .unwrap_err();
        assert!(matches!(err, CertSmithError::MalformedSignature(_)));
    }

    #[test]
    fn test_wrong_raw_length_is_malformed() {
        let formatter = formatter();
        let algorithm = SigningAlgorithm::ecdsa_on("P-384", HashAlgorithm::Sha384);
        let err = formatter.to_structured(&algorithm, &[1; 64]).unwrap_err();
        assert!(matches!(err, CertSmithError::MalformedSignature(_)));
    }

    #[test]
    fn test_declines_other_families() {
        let formatter = formatter();
        let rsa = SigningAlgorithm::rsa_pkcs1(HashAlgorithm::Sha256);
        assert_eq!(formatter.to_structured(&rsa, &[1; 64]).unwrap(), None);
        assert_eq!(formatter.to_raw(&rsa, &[0x30, 0x00]).unwrap(), None);
    }

    #[test]
    fn test_custom_table_registration() {
        let mut sizes = CurvePointSizes::empty();
        sizes.register("X-100", 13).unwrap();
        assert!(sizes.register("X-0", 0).is_err());
        let formatter = EcSignatureFormatter::new(sizes);
        let algorithm = SigningAlgorithm::ecdsa_on("X-100", HashAlgorithm::Sha256);
        assert_eq!(formatter.point_size(&algorithm), 13);
        let signature = raw(&[0xaa; 13], &[0x01], 13);
        let der = formatter.to_structured(&algorithm, &signature).unwrap().unwrap();
        assert_eq!(formatter.to_raw(&algorithm, &der).unwrap().unwrap(), signature);
    }

    #[test]
    fn test_global_registration_reaches_default_formatter() {
        register_curve_point_size("test-curve-40", 40).unwrap();
        let algorithm = SigningAlgorithm::ecdsa_on("test-curve-40", HashAlgorithm::Sha256);
        assert_eq!(EcSignatureFormatter::default().point_size(&algorithm), 40);
    }
}
