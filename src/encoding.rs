//! Conversion between raw bytes and the textual forms certificates travel in.
//!
//! Text input is classified in a fixed priority order: PEM, then hex, then
//! standard base64, then URL-safe base64. The first classifier that matches
//! decides the decoder. Because plain hex is also valid base64 for some inputs,
//! callers that know the representation should use [`decode_as`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;

use crate::error::{CertSmithError, Result};

/// URL-safe alphabet, emits no padding and accepts input with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static PEM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-----BEGIN [^\r\n]*?-----").expect("valid PEM regex"));
static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9a-fA-F]{2})*$").expect("valid hex regex"));
static BASE64: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("valid base64 regex")
});
static BASE64_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]*={0,2}$").expect("valid base64url regex"));

/// Textual encodings a binary artifact can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    Hex,
    Base64,
    Base64Url,
    /// Base64 body between `-----BEGIN <tag>-----` and `-----END <tag>-----` lines.
    #[default]
    Pem,
}

impl Encoding {
    /// All encodings, in classification priority order.
    pub const ALL: [Encoding; 4] = [
        Encoding::Pem,
        Encoding::Hex,
        Encoding::Base64,
        Encoding::Base64Url,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
            Encoding::Base64Url => "base64url",
            Encoding::Pem => "pem",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = CertSmithError;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::ALL
            .into_iter()
            .find(|encoding| encoding.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CertSmithError::UnsupportedEncodingFormat(format!("'{s}'")))
    }
}

/// How an [`EncodedBlob`] was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Binary,
    Text(Encoding),
}

/// Input accepted by [`decode`]: bytes pass through, text is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedInput {
    Binary(Vec<u8>),
    Text(String),
}

impl From<Vec<u8>> for EncodedInput {
    fn from(value: Vec<u8>) -> Self {
        EncodedInput::Binary(value)
    }
}

impl From<&[u8]> for EncodedInput {
    fn from(value: &[u8]) -> Self {
        EncodedInput::Binary(value.to_vec())
    }
}

impl From<String> for EncodedInput {
    fn from(value: String) -> Self {
        EncodedInput::Text(value)
    }
}

impl From<&str> for EncodedInput {
    fn from(value: &str) -> Self {
        EncodedInput::Text(value.to_string())
    }
}

/// A single PEM object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemObject {
    pub tag: String,
    pub body: Vec<u8>,
}

impl PemObject {
    pub fn new(tag: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.into(),
            body: body.into(),
        }
    }
}

/// Immutable bytes together with the representation they were read from.
///
/// The bytes are the source of truth; textual forms are produced on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    bytes: Vec<u8>,
    representation: Option<Representation>,
}

impl EncodedBlob {
    /// Decodes `input`, classifying text by the priority order of this module.
    pub fn new(input: impl Into<EncodedInput>) -> Result<Self> {
        match input.into() {
            EncodedInput::Binary(bytes) => Ok(Self {
                bytes,
                representation: Some(Representation::Binary),
            }),
            EncodedInput::Text(text) => {
                let encoding = detect(&text).ok_or_else(|| unsupported(&text))?;
                Ok(Self {
                    bytes: decode_as(&text, encoding)?,
                    representation: Some(Representation::Text(encoding)),
                })
            }
        }
    }

    /// Decodes `text` known to be in `encoding`, skipping classification.
    pub fn from_text(text: &str, encoding: Encoding) -> Result<Self> {
        Ok(Self {
            bytes: decode_as(text, encoding)?,
            representation: Some(Representation::Text(encoding)),
        })
    }

    /// Wraps bytes without recording where they came from.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            representation: None,
        }
    }

    pub fn representation(&self) -> Option<Representation> {
        self.representation
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Renders the bytes in `encoding`; `pem_tag` is only used for PEM.
    pub fn to_string_as(&self, encoding: Encoding, pem_tag: &str) -> String {
        encode(&self.bytes, encoding, pem_tag)
    }
}

impl AsRef<[u8]> for EncodedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Returns the first encoding, in priority order, whose classifier accepts `text`.
pub fn detect(text: &str) -> Option<Encoding> {
    if PEM_BOUNDARY.is_match(text) {
        return Some(Encoding::Pem);
    }
    let compact = compact(text);
    if HEX.is_match(&compact) {
        Some(Encoding::Hex)
    } else if BASE64.is_match(&compact) && STANDARD.decode(&compact).is_ok() {
        Some(Encoding::Base64)
    } else if BASE64_URL.is_match(&compact) && URL_SAFE_LENIENT.decode(&compact).is_ok() {
        Some(Encoding::Base64Url)
    } else {
        None
    }
}

/// Decodes bytes or text into raw bytes.
///
/// Bytes are returned unchanged. Text is classified with [`detect`]; PEM input
/// yields the body of its first object.
pub fn decode(input: impl Into<EncodedInput>) -> Result<Vec<u8>> {
    match input.into() {
        EncodedInput::Binary(bytes) => Ok(bytes),
        EncodedInput::Text(text) => {
            let encoding = detect(&text).ok_or_else(|| unsupported(&text))?;
            log::debug!("classified {} characters of input as {encoding}", text.len());
            decode_as(&text, encoding)
        }
    }
}

/// Decodes `text` that is known to be in `encoding`.
pub fn decode_as(text: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Pem => decode_pem_objects(text)?
            .into_iter()
            .next()
            .map(|object| object.body)
            .ok_or_else(|| CertSmithError::DecodingError("no PEM object found".to_string())),
        Encoding::Hex => Ok(hex::decode(compact(text))?),
        Encoding::Base64 => Ok(STANDARD.decode(compact(text))?),
        Encoding::Base64Url => Ok(URL_SAFE_LENIENT.decode(compact(text))?),
    }
}

/// Renders `bytes` in `encoding`. `pem_tag` labels the PEM boundaries and is
/// ignored by the other encodings.
pub fn encode(bytes: &[u8], encoding: Encoding, pem_tag: &str) -> String {
    match encoding {
        Encoding::Hex => hex::encode(bytes),
        Encoding::Base64 => STANDARD.encode(bytes),
        Encoding::Base64Url => URL_SAFE_LENIENT.encode(bytes),
        Encoding::Pem => encode_pem_objects(&[PemObject::new(pem_tag, bytes)]),
    }
}

/// Parses every PEM object in `text`, in order. The tag is not checked
/// against any fixed set.
pub fn decode_pem_objects(text: &str) -> Result<Vec<PemObject>> {
    let objects = pem::parse_many(text)?
        .into_iter()
        .map(|pem| PemObject::new(pem.tag(), pem.contents()))
        .collect();
    Ok(objects)
}

/// Concatenates the PEM encodings of `objects`, LF line endings.
pub fn encode_pem_objects(objects: &[PemObject]) -> String {
    let pems: Vec<pem::Pem> = objects
        .iter()
        .map(|object| pem::Pem::new(object.tag.clone(), object.body.clone()))
        .collect();
    pem::encode_many_config(
        &pems,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn unsupported(text: &str) -> CertSmithError {
    let preview: String = text.trim().chars().take(16).collect();
    CertSmithError::UnsupportedEncodingFormat(format!("input starting with '{preview}'"))
}
