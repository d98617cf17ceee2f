use core::str::FromStr;
use std::time::Duration as StdDuration;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{GeneralizedTime, Ia5StringRef, OctetString, PrintableStringRef, UtcTime};
use der::{Any, Decode, Encode};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::name::RdnSequence;

use super::extensions::ToAndFromX509Extension;
use crate::algorithm::SigningAlgorithm;
use crate::error::{CertSmithError, Result};

/// Input for [`CertificateIssuer::create`](crate::issuer::CertificateIssuer::create).
///
/// # Fields
/// * `serial_number` - Serial number as a hex string, for example `"01"`.
/// * `validity` - The `notBefore` / `notAfter` window. Ordering is not checked.
/// * `subject` - Subject name; an empty name when absent.
/// * `issuer` - Issuer name; an empty name when absent.
/// * `public_key` - The subject public key, exported through the provider.
/// * `signing_key` - The issuer private key.
/// * `signing_algorithm` - Partial algorithm choice, completed from the signing key.
/// * `extensions` - Extensions in the order they are written.
#[derive(Clone, Debug, Builder)]
pub struct CertificateParams<'a, Pub, Priv> {
    #[builder(into)]
    pub serial_number: String,
    pub validity: Validity,
    #[builder(into)]
    pub subject: Option<NameInput>,
    #[builder(into)]
    pub issuer: Option<NameInput>,
    pub public_key: &'a Pub,
    pub signing_key: &'a Priv,
    #[builder(default)]
    pub signing_algorithm: SigningAlgorithm,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Input for [`CertificateIssuer::create_self_signed`](crate::issuer::CertificateIssuer::create_self_signed).
///
/// `name` is written as both subject and issuer, and `private_key` signs the
/// certificate for `public_key`.
#[derive(Clone, Debug, Builder)]
pub struct SelfSignedCertificateParams<'a, Pub, Priv> {
    #[builder(into)]
    pub serial_number: String,
    pub validity: Validity,
    #[builder(into)]
    pub name: Option<NameInput>,
    pub public_key: &'a Pub,
    pub private_key: &'a Priv,
    #[builder(default)]
    pub signing_algorithm: SigningAlgorithm,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

impl<'a, Pub, Priv> From<SelfSignedCertificateParams<'a, Pub, Priv>>
    for CertificateParams<'a, Pub, Priv>
{
    fn from(params: SelfSignedCertificateParams<'a, Pub, Priv>) -> Self {
        CertificateParams {
            serial_number: params.serial_number,
            validity: params.validity,
            subject: params.name.clone(),
            issuer: params.name,
            public_key: params.public_key,
            signing_key: params.private_key,
            signing_algorithm: params.signing_algorithm,
            extensions: params.extensions,
        }
    }
}

/// A subject or issuer name in any of the accepted shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameInput {
    /// RFC 4514 string such as `CN=example.com,O=Example Corp`.
    Text(String),
    Structured(DistinguishedName),
    /// DER-encoded `Name`.
    Der(Vec<u8>),
}

impl NameInput {
    /// DER encoding of the name.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        match self {
            NameInput::Text(text) => {
                let name = RdnSequence::from_str(text).map_err(|e| {
                    CertSmithError::InvalidInput(format!("invalid name '{text}': {e}"))
                })?;
                Ok(name.to_der()?)
            }
            NameInput::Structured(name) => name.as_x509_name()?.to_der().map_err(Into::into),
            NameInput::Der(der) => Ok(der.clone()),
        }
    }

    /// The name as an X.509 `Name`, parsed back from its DER encoding.
    pub fn to_x509_name(&self) -> Result<x509_cert::name::Name> {
        Ok(RdnSequence::from_der(&self.to_der()?)?)
    }
}

impl From<&str> for NameInput {
    fn from(value: &str) -> Self {
        NameInput::Text(value.to_string())
    }
}

impl From<String> for NameInput {
    fn from(value: String) -> Self {
        NameInput::Text(value)
    }
}

impl From<DistinguishedName> for NameInput {
    fn from(value: DistinguishedName) -> Self {
        NameInput::Structured(value)
    }
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    const CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
    const C: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
    const L: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
    const ST: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
    const O: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
    const OU: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

    /// Converts the distinguished name to an X.509 `Name`, leaving out absent attributes.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let attributes = [
            ("CN", Some(&self.common_name)),
            ("OU", self.organization_unit.as_ref()),
            ("O", self.organization.as_ref()),
            ("L", self.locality.as_ref()),
            ("ST", self.state.as_ref()),
            ("C", self.country.as_ref()),
        ];
        let rfc4514_name = attributes
            .into_iter()
            .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
            .map(|(key, value)| format!("{key}={}", escape_rfc4514(value)))
            .collect::<Vec<_>>()
            .join(",");
        RdnSequence::from_str(&rfc4514_name)
            .map_err(|e| CertSmithError::InvalidInput(format!("invalid name: {e}")))
    }

    /// Creates a `DistinguishedName` from an X.509 `Name`. Attributes other than
    /// the six fields are ignored.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Self {
        let mut name = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = attribute_text(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    Self::CN => name.common_name = value,
                    Self::C => name.country = Some(value),
                    Self::L => name.locality = Some(value),
                    Self::ST => name.state = Some(value),
                    Self::O => name.organization = Some(value),
                    Self::OU => name.organization_unit = Some(value),
                    _ => {}
                }
            }
        }
        name
    }
}

fn attribute_text(value: &Any) -> Option<String> {
    value
        .decode_as::<String>()
        .ok()
        .or_else(|| {
            value
                .decode_as::<PrintableStringRef<'_>>()
                .ok()
                .map(|s| s.as_str().to_string())
        })
        .or_else(|| {
            value
                .decode_as::<Ia5StringRef<'_>>()
                .ok()
                .map(|s| s.as_str().to_string())
        })
}

fn escape_rfc4514(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());
    for (i, &c) in chars.iter().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && matches!(c, '#' | ' '))
            || (i + 1 == chars.len() && c == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    /// Encodes the window with second precision: UTCTime through 2049,
    /// GeneralizedTime from 2050 on (RFC 5280, 4.1.2.5).
    pub fn to_x509_validity(&self) -> Result<x509_cert::time::Validity> {
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }

    pub fn from_x509_validity(validity: &x509_cert::time::Validity) -> Self {
        Self {
            not_before: OffsetDateTime::from(validity.not_before.to_system_time()),
            not_after: OffsetDateTime::from(validity.not_after.to_system_time()),
        }
    }
}

fn to_x509_time(instant: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let seconds = u64::try_from(instant.unix_timestamp()).map_err(|_| {
        CertSmithError::InvalidInput(format!("{instant} predates the Unix epoch"))
    })?;
    let date_time = der::DateTime::from_unix_duration(StdDuration::from_secs(seconds))?;
    if date_time.year() < 2050 {
        Ok(x509_cert::time::Time::UtcTime(UtcTime::from_date_time(
            date_time,
        )?))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        ))
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a typed extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes the value into a typed extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    /// Parses a whole DER `Extension` (`extnID`, `critical`, `extnValue`).
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self::from_x509_extension(&x509_cert::ext::Extension::from_der(der)?))
    }

    /// DER encoding of the whole `Extension`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_x509_extension()?
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))
    }

    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }

    pub fn from_x509_extension(extension: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: extension.extn_id,
            critical: extension.critical,
            value: extension.extn_value.as_bytes().to_vec(),
        }
    }
}
