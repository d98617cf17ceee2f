use std::sync::Arc;

use der::Encode;
use der::asn1::BitString;
use x509_cert::certificate::CertificateInner;

use crate::algorithm::{AlgorithmProvider, DefaultAlgorithmProvider};
use crate::cert::Certificate;
use crate::cert::params::{CertificateParams, SelfSignedCertificateParams};
use crate::error::{CertSmithError, Result};
use crate::provider::{CryptoProvider, KeyMetadata};
use crate::signature::{SignatureFormatterRegistry, default_registry};
use crate::tbs_certificate::TbsCertificate;

/// Builds and signs X.509 v3 certificates through a [`CryptoProvider`].
///
/// The issuer never touches key material itself: the subject key is exported
/// through the provider, the body is signed by the provider, and the raw
/// signature is converted to its certificate form by the formatter registry.
pub struct CertificateIssuer<P: CryptoProvider> {
    provider: P,
    registry: SignatureFormatterRegistry,
    algorithms: Arc<dyn AlgorithmProvider>,
}

impl<P: CryptoProvider> CertificateIssuer<P> {
    /// An issuer using a snapshot of the process-wide formatter registry and
    /// the default algorithm table.
    pub fn new(provider: P) -> Self {
        Self::with_registries(provider, default_registry(), DefaultAlgorithmProvider)
    }

    pub fn with_registries(
        provider: P,
        registry: SignatureFormatterRegistry,
        algorithms: impl AlgorithmProvider + 'static,
    ) -> Self {
        Self {
            provider,
            registry,
            algorithms: Arc::new(algorithms),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &SignatureFormatterRegistry {
        &self.registry
    }

    pub fn algorithms(&self) -> &dyn AlgorithmProvider {
        self.algorithms.as_ref()
    }

    /// Issues a certificate for `params.public_key`, signed with `params.signing_key`.
    ///
    /// Errors from the provider's `sign` are returned unchanged.
    pub async fn create(
        &self,
        params: CertificateParams<'_, P::PublicKey, P::PrivateKey>,
    ) -> Result<Certificate> {
        log::debug!("issuing certificate with serial {}", params.serial_number);

        let subject_public_key_info = self.provider.export_public_key(params.public_key).await?;
        log::debug!(
            "exported {}-byte subject public key",
            subject_public_key_info.len()
        );

        let algorithm = params
            .signing_algorithm
            .merge(&params.signing_key.algorithm())
            .with_family_defaults();
        let algorithm_identifier = self.algorithms.to_algorithm_identifier(&algorithm)?;
        log::debug!(
            "signing with {algorithm} ({})",
            algorithm_identifier.oid
        );

        let tbs_certificate = TbsCertificate {
            serial_number: params.serial_number,
            signature_algorithm: algorithm_identifier.clone(),
            issuer: params.issuer,
            validity: params.validity,
            subject: params.subject,
            subject_public_key_info,
            extensions: params.extensions,
        }
        .to_tbs_certificate_inner()?;
        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| CertSmithError::EncodingError(e.to_string()))?;
        log::debug!("encoded {}-byte certificate body", tbs_der.len());

        let raw_signature = self
            .provider
            .sign(&algorithm, params.signing_key, &tbs_der)
            .await?;
        let signature = self
            .registry
            .to_structured(&algorithm, &raw_signature)?
            .ok_or_else(|| CertSmithError::SignatureConversionUnsupported(algorithm.to_string()))?;

        let certificate = Certificate::from_x509(CertificateInner {
            tbs_certificate,
            signature_algorithm: algorithm_identifier,
            signature: BitString::from_bytes(&signature)?,
        })?;
        log::debug!(
            "issued certificate {} for {}",
            certificate.serial_number(),
            certificate.subject()
        );
        Ok(certificate)
    }

    /// Issues a certificate whose subject and issuer are both `params.name`.
    pub async fn create_self_signed(
        &self,
        params: SelfSignedCertificateParams<'_, P::PublicKey, P::PrivateKey>,
    ) -> Result<Certificate> {
        self.create(params.into()).await
    }

    /// Checks `certificate` against `public_key` with this issuer's registries.
    pub async fn verify(
        &self,
        certificate: &Certificate,
        public_key: &P::PublicKey,
    ) -> Result<bool> {
        certificate
            .verify(
                &self.provider,
                &self.registry,
                self.algorithms.as_ref(),
                public_key,
            )
            .await
    }
}
