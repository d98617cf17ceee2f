//! Conversion between the signature bytes a signer produces and the bytes a
//! certificate carries.
//!
//! Each [`SignatureFormatter`] handles one family of algorithms. The
//! [`SignatureFormatterRegistry`] tries its formatters from the most recently
//! registered to the oldest and returns the first answer, so a new family can
//! be supported by registering a formatter without touching the issuer.

pub mod ec;

use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

pub use ec::{
    CurvePointSizes, DEFAULT_POINT_SIZE, EcSignatureFormatter, register_curve_point_size,
};

use crate::algorithm::{KeyAlgorithm, SigningAlgorithm};
use crate::error::Result;

/// Converts signatures of one algorithm family between raw and structured form.
///
/// Both methods return `Ok(None)` when the algorithm is not handled by this
/// formatter, leaving the decision to the next formatter in the registry.
pub trait SignatureFormatter: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Raw signer output to the form stored in a certificate.
    fn to_structured(
        &self,
        algorithm: &SigningAlgorithm,
        signature: &[u8],
    ) -> Result<Option<Vec<u8>>>;

    /// Certificate form back to what a verifier of raw signatures expects.
    fn to_raw(&self, algorithm: &SigningAlgorithm, signature: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Ordered list of formatters. Later registrations take precedence.
#[derive(Clone, Default)]
pub struct SignatureFormatterRegistry {
    formatters: Vec<Arc<dyn SignatureFormatter>>,
}

impl fmt::Debug for SignatureFormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.formatters.iter().map(|formatter| formatter.name()))
            .finish()
    }
}

impl SignatureFormatterRegistry {
    /// An empty registry. Every conversion is declined until formatters are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the passthrough formatter and, tried first, the EC
    /// formatter backed by the process-wide point size table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PassthroughSignatureFormatter);
        registry.register(EcSignatureFormatter::default());
        registry
    }

    pub fn register(&mut self, formatter: impl SignatureFormatter + 'static) {
        self.register_shared(Arc::new(formatter));
    }

    pub fn register_shared(&mut self, formatter: Arc<dyn SignatureFormatter>) {
        log::debug!("registering signature formatter {}", formatter.name());
        self.formatters.push(formatter);
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// Returns the first structured form produced by a formatter, newest first.
    pub fn to_structured(
        &self,
        algorithm: &SigningAlgorithm,
        signature: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        for formatter in self.formatters.iter().rev() {
            if let Some(converted) = formatter.to_structured(algorithm, signature)? {
                log::debug!("{} converted {algorithm} signature to structured form", formatter.name());
                return Ok(Some(converted));
            }
        }
        Ok(None)
    }

    /// Returns the first raw form produced by a formatter, newest first.
    pub fn to_raw(
        &self,
        algorithm: &SigningAlgorithm,
        signature: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        for formatter in self.formatters.iter().rev() {
            if let Some(converted) = formatter.to_raw(algorithm, signature)? {
                log::debug!("{} converted {algorithm} signature to raw form", formatter.name());
                return Ok(Some(converted));
            }
        }
        Ok(None)
    }
}

static DEFAULT_REGISTRY: LazyLock<RwLock<SignatureFormatterRegistry>> =
    LazyLock::new(|| RwLock::new(SignatureFormatterRegistry::with_defaults()));

/// Adds `formatter` to the process-wide registry.
///
/// Registration must complete before certificates are issued concurrently.
pub fn register_signature_formatter(formatter: impl SignatureFormatter + 'static) {
    DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(formatter);
}

/// A snapshot of the process-wide registry.
pub fn default_registry() -> SignatureFormatterRegistry {
    DEFAULT_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Formatter for families whose signer output already is the certificate form:
/// RSASSA-PKCS1-v1_5 and Ed25519.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSignatureFormatter;

impl PassthroughSignatureFormatter {
    fn accepts(algorithm: &SigningAlgorithm) -> bool {
        matches!(
            algorithm.family,
            Some(KeyAlgorithm::RsaPkcs1 | KeyAlgorithm::Ed25519)
        )
    }
}

impl SignatureFormatter for PassthroughSignatureFormatter {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn to_structured(
        &self,
        algorithm: &SigningAlgorithm,
        signature: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        Ok(Self::accepts(algorithm).then(|| signature.to_vec()))
    }

    fn to_raw(&self, algorithm: &SigningAlgorithm, signature: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(Self::accepts(algorithm).then(|| signature.to_vec()))
    }
}
