//! # certsmith - Certificate issuance over pluggable signers
//!
//! certsmith builds X.509 v3 certificates with the RustCrypto crates while
//! leaving the private key wherever it lives: every signature is requested
//! through the async [`CryptoProvider`](provider::CryptoProvider) trait, so an
//! HSM, a cloud KMS or an in-process key all issue certificates the same way.
//!
//! Signers return raw signatures (fixed-width `R || S` for ECDSA). A
//! [`SignatureFormatterRegistry`](signature::SignatureFormatterRegistry)
//! converts them to the form a certificate carries, and new families can be
//! supported by registering another formatter.
//!
//! ## Supported Key Types
//!
//! The bundled [`RustCryptoProvider`](key::RustCryptoProvider) handles:
//! - **ECDSA**: P-256 and P-384, with SHA-1, SHA-256, SHA-384 or SHA-512
//! - **RSA**: RSASSA-PKCS1-v1_5
//! - **Ed25519**
//!
//! ## Supported Encodings
//!
//! Certificates and other binary blobs are read from DER or from PEM, hex,
//! base64 and base64url text, and written to any of the four text forms. See
//! [`encoding`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certsmith::{
//!     cert::params::{SelfSignedCertificateParams, Validity},
//!     issuer::CertificateIssuer,
//!     key::{KeyPair, RustCryptoProvider},
//! };
//!
//! # async fn run(pkcs8_pem: &str) -> Result<(), certsmith::error::CertSmithError> {
//! let key_pair = KeyPair::from_pkcs8_pem(pkcs8_pem)?;
//! let public_key = key_pair.public_key();
//!
//! let issuer = CertificateIssuer::new(RustCryptoProvider);
//! let certificate = issuer
//!     .create_self_signed(
//!         SelfSignedCertificateParams::builder()
//!             .serial_number("01")
//!             .validity(Validity::for_days(365))
//!             .name("CN=example.com,O=Example Corp")
//!             .public_key(&public_key)
//!             .private_key(&key_pair)
//!             .build(),
//!     )
//!     .await?;
//!
//! println!("{certificate}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::CertSmithError`]:
//!
//! ```rust
//! use certsmith::{encoding, error::CertSmithError};
//!
//! match encoding::decode("not *any* encoding") {
//!     Ok(bytes) => println!("decoded {} bytes", bytes.len()),
//!     Err(CertSmithError::UnsupportedEncodingFormat(msg)) => println!("unsupported: {msg}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`encoding`]: PEM, hex, base64 and base64url detection and conversion
//! - [`signature`]: Signature formatters and the ECDSA transcoder
//! - [`algorithm`]: Signing algorithm descriptors and identifier mapping
//! - [`provider`]: The signer capability the issuer depends on
//! - [`key`]: In-process RustCrypto keys and provider
//! - [`cert`]: The certificate artifact, parameters and extensions
//! - [`issuer`]: Certificate issuance
//! - [`tbs_certificate`]: Low-level certificate body assembly
//! - [`error`]: Error types

pub mod algorithm;
pub mod cert;
pub mod encoding;
pub mod error;
pub mod issuer;
pub mod key;
pub mod provider;
pub mod signature;
pub mod tbs_certificate;

pub use cert::Certificate;
pub use error::{CertSmithError, Result};
pub use issuer::CertificateIssuer;
pub use signature::{register_curve_point_size, register_signature_formatter};
