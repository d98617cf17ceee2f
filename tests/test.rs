mod util;

use async_trait::async_trait;
use certsmith::algorithm::{DefaultAlgorithmProvider, HashAlgorithm, SigningAlgorithm};
use certsmith::cert::Certificate;
use certsmith::cert::extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use certsmith::cert::params::{
    CertificateParams, DistinguishedName, ExtensionParam, SelfSignedCertificateParams,
};
use certsmith::error::CertSmithError;
use certsmith::issuer::CertificateIssuer;
use certsmith::key::{KeyPair, PublicKey, RustCryptoProvider};
use certsmith::provider::CryptoProvider;
use certsmith::signature::SignatureFormatterRegistry;
use const_oid::db::{rfc5912, rfc8410};
use ecdsa::signature::Verifier;

pub type Result<T> = std::result::Result<T, CertSmithError>;

async fn self_signed(
    issuer: &CertificateIssuer<RustCryptoProvider>,
    key: &KeyPair,
    name: &str,
) -> Result<Certificate> {
    let public_key = key.public_key();
    issuer
        .create_self_signed(
            SelfSignedCertificateParams::builder()
                .serial_number("01")
                .validity(util::validity())
                .name(name)
                .public_key(&public_key)
                .private_key(key)
                .build(),
        )
        .await
}

/// Issues a self-signed P-256 certificate and checks it with an independent verifier.
#[tokio::test]
async fn self_signed_ecdsa_p256() -> Result<()> {
    let key = util::p256_key();
    let issuer = util::issuer();
    let cert = self_signed(&issuer, &key, "CN=example.com,O=Example Corp").await?;

    let reparsed = Certificate::from_der(cert.as_bytes())?;
    assert_eq!(reparsed, cert);
    assert!(reparsed.signature_algorithms_match());
    assert_eq!(reparsed.signature_algorithm().oid, rfc5912::ECDSA_WITH_SHA_256);
    assert_eq!(reparsed.signature_algorithm().parameters, None);
    assert_eq!(reparsed.serial_number(), "01");
    assert_eq!(reparsed.subject(), reparsed.issuer());
    assert!(reparsed.subject().contains("CN=example.com"));
    assert_eq!(reparsed.validity(), util::validity());
    assert_eq!(
        reparsed.inner().tbs_certificate.version,
        x509_cert::Version::V3
    );

    let KeyPair::EcdsaP256 { verifying_key, .. } = &key else {
        unreachable!("p256_key returns a P-256 key");
    };
    let signature = p256::ecdsa::Signature::from_der(reparsed.signature())
        .expect("certificate signature is a DER Ecdsa-Sig-Value");
    verifying_key
        .verify(&reparsed.tbs_bytes()?, &signature)
        .expect("signature verifies over the certificate body");

    assert!(issuer.verify(&reparsed, &key.public_key()).await?);
    assert!(!issuer.verify(&reparsed, &util::p256_key().public_key()).await?);

    use std::io::Write;
    std::fs::create_dir_all(".debug_certs").unwrap();
    std::fs::File::create(".debug_certs/ca_cert.pem")
        .unwrap()
        .write_all(cert.to_string().as_bytes())
        .unwrap();
    Ok(())
}

/// A P-384 CA signs a P-256 leaf; the hash follows the CA curve.
#[tokio::test]
async fn issuer_signed_leaf() -> Result<()> {
    let ca_key = util::p384_key();
    let leaf_key = util::p256_key();
    let leaf_public_key = leaf_key.public_key();
    let issuer = util::issuer();

    let ca_name = DistinguishedName::builder()
        .common_name("Example CA")
        .organization("Example Corp")
        .build();
    let ca = self_signed(&issuer, &ca_key, "CN=Example CA,O=Example Corp").await?;

    let leaf_spki = issuer.provider().export_public_key(&leaf_public_key).await?;
    let leaf = issuer
        .create(
            CertificateParams::builder()
                .serial_number("8f1e")
                .validity(util::validity())
                .subject("CN=server.example.com")
                .issuer(ca_name)
                .public_key(&leaf_public_key)
                .signing_key(&ca_key)
                .extensions(vec![
                    ExtensionParam::from_extension(BasicConstraints::default(), true)?,
                    ExtensionParam::from_extension(
                        KeyUsage(KeyUsages::DigitalSignature.into()),
                        true,
                    )?,
                    ExtensionParam::from_extension(
                        ExtendedKeyUsage {
                            usage: vec![ExtendedKeyUsageOption::ServerAuth],
                        },
                        false,
                    )?,
                    ExtensionParam::from_extension(
                        SubjectAltName {
                            names: vec!["server.example.com".to_string()],
                        },
                        false,
                    )?,
                    ExtensionParam::from_extension(
                        SubjectKeyIdentifier::from_public_key(&leaf_spki)?,
                        false,
                    )?,
                ])
                .build(),
        )
        .await?;

    assert_eq!(leaf.issuer(), ca.subject());
    assert_eq!(leaf.serial_number(), "8f1e");
    assert_eq!(leaf.signature_algorithm().oid, rfc5912::ECDSA_WITH_SHA_384);
    assert_eq!(leaf.subject_public_key_info()?, leaf_spki);

    assert_eq!(leaf.extensions().len(), 5);
    assert_eq!(
        leaf.extension::<BasicConstraints>()?,
        Some(BasicConstraints::default())
    );
    assert_eq!(
        leaf.extension::<SubjectAltName>()?.map(|san| san.names),
        Some(vec!["server.example.com".to_string()])
    );

    assert!(issuer.verify(&leaf, &ca_key.public_key()).await?);
    assert!(!issuer.verify(&leaf, &util::p384_key().public_key()).await?);
    Ok(())
}

/// An explicit hash overrides the one implied by the curve.
#[tokio::test]
async fn explicit_hash_overrides_curve_default() -> Result<()> {
    let key = util::p256_key();
    let public_key = key.public_key();
    let issuer = util::issuer();
    let cert = issuer
        .create_self_signed(
            SelfSignedCertificateParams::builder()
                .serial_number("02")
                .validity(util::validity())
                .name("CN=sha384.example.com")
                .public_key(&public_key)
                .private_key(&key)
                .signing_algorithm(SigningAlgorithm::builder().hash(HashAlgorithm::Sha384).build())
                .build(),
        )
        .await?;

    assert_eq!(cert.signature_algorithm().oid, rfc5912::ECDSA_WITH_SHA_384);
    assert!(issuer.verify(&cert, &public_key).await?);
    Ok(())
}

#[tokio::test]
async fn self_signed_ed25519() -> Result<()> {
    let key = util::ed25519_key();
    let issuer = util::issuer();
    let cert = self_signed(&issuer, &key, "CN=ed25519.example.com").await?;

    assert_eq!(cert.signature_algorithm().oid, rfc8410::ID_ED_25519);
    assert_eq!(cert.signature().len(), 64);
    assert!(issuer.verify(&cert, &key.public_key()).await?);
    Ok(())
}

#[tokio::test]
async fn self_signed_rsa() -> Result<()> {
    let key = util::rsa_key();
    let issuer = util::issuer();
    let cert = self_signed(&issuer, &key, "CN=rsa.example.com").await?;

    assert_eq!(
        cert.signature_algorithm().oid,
        rfc5912::SHA_256_WITH_RSA_ENCRYPTION
    );
    assert!(cert.signature_algorithm().parameters.is_some());
    assert_eq!(cert.signature().len(), 256);
    assert!(issuer.verify(&cert, &key.public_key()).await?);
    Ok(())
}

/// Without any formatter the raw signature cannot be placed in the certificate.
#[tokio::test]
async fn empty_registry_rejects_issuance() {
    let key = util::p256_key();
    let issuer = CertificateIssuer::with_registries(
        RustCryptoProvider,
        SignatureFormatterRegistry::new(),
        DefaultAlgorithmProvider,
    );
    let err = self_signed(&issuer, &key, "CN=nowhere").await.unwrap_err();
    assert!(matches!(
        err,
        CertSmithError::SignatureConversionUnsupported(_)
    ));
}

/// A signer that refuses every request, as a locked hardware token would.
struct LockedToken;

#[async_trait]
impl CryptoProvider for LockedToken {
    type PublicKey = PublicKey;
    type PrivateKey = KeyPair;

    async fn export_public_key(&self, key: &PublicKey) -> Result<Vec<u8>> {
        RustCryptoProvider.export_public_key(key).await
    }

    async fn sign(
        &self,
        _algorithm: &SigningAlgorithm,
        _key: &KeyPair,
        _data: &[u8],
    ) -> Result<Vec<u8>> {
        Err(CertSmithError::SigningFailure("token is locked".to_string()))
    }

    async fn verify(
        &self,
        algorithm: &SigningAlgorithm,
        key: &PublicKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        RustCryptoProvider
            .verify(algorithm, key, data, signature)
            .await
    }
}

#[tokio::test]
async fn signer_failure_propagates_unchanged() {
    let key = util::p256_key();
    let public_key = key.public_key();
    let issuer = CertificateIssuer::new(LockedToken);
    let err = issuer
        .create_self_signed(
            SelfSignedCertificateParams::builder()
                .serial_number("03")
                .validity(util::validity())
                .public_key(&public_key)
                .private_key(&key)
                .build(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CertSmithError::SigningFailure("token is locked".to_string())
    );
}

/// Providers that never load foreign keys keep the default import, which refuses.
#[tokio::test]
async fn default_public_key_import_is_refused() -> Result<()> {
    let public_key = util::p256_key().public_key();
    let spki = LockedToken.export_public_key(&public_key).await?;

    let err = LockedToken.import_public_key(&spki).await.unwrap_err();
    assert!(matches!(err, CertSmithError::KeyError(_)));
    assert_eq!(RustCryptoProvider.import_public_key(&spki).await?, public_key);
    Ok(())
}

/// A certificate whose body names a different algorithm than its outer field never verifies.
#[tokio::test]
async fn mismatched_algorithm_identifiers_do_not_verify() -> Result<()> {
    let key = util::p256_key();
    let issuer = util::issuer();
    let cert = self_signed(&issuer, &key, "CN=tampered").await?;

    let mut inner = cert.inner().clone();
    inner.signature_algorithm.oid = rfc5912::ECDSA_WITH_SHA_384;
    let tampered = Certificate::from_x509(inner)?;

    assert!(!tampered.signature_algorithms_match());
    assert!(!issuer.verify(&tampered, &key.public_key()).await?);
    Ok(())
}

/// Subject and issuer default to an empty name.
#[tokio::test]
async fn absent_names_are_empty() -> Result<()> {
    let key = util::ed25519_key();
    let public_key = key.public_key();
    let cert = util::issuer()
        .create(
            CertificateParams::builder()
                .serial_number("04")
                .validity(util::validity())
                .public_key(&public_key)
                .signing_key(&key)
                .build(),
        )
        .await?;

    assert_eq!(cert.subject(), "");
    assert_eq!(cert.issuer(), "");
    assert!(cert.extensions().is_empty());
    Ok(())
}
