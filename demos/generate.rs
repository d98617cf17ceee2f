use certsmith::cert::extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use certsmith::cert::params::{
    CertificateParams, DistinguishedName, ExtensionParam, SelfSignedCertificateParams, Validity,
};
use certsmith::encoding::Encoding;
use certsmith::error::CertSmithError;
use certsmith::issuer::CertificateIssuer;
use certsmith::key::{KeyPair, RustCryptoProvider};
use certsmith::provider::CryptoProvider;
use rand_core::OsRng;

#[tokio::main]
async fn main() -> Result<(), CertSmithError> {
    let issuer = CertificateIssuer::new(RustCryptoProvider);

    // CA: P-384, self-signed
    let ca_key = KeyPair::from(p384::ecdsa::SigningKey::random(&mut OsRng));
    let ca_public_key = ca_key.public_key();
    let ca_name = DistinguishedName::builder()
        .common_name("My Test CA")
        .organization("Example Corp")
        .country("US")
        .build();

    let ca_cert = issuer
        .create_self_signed(
            SelfSignedCertificateParams::builder()
                .serial_number("01")
                .validity(Validity::for_days(3650))
                .name(ca_name.clone())
                .public_key(&ca_public_key)
                .private_key(&ca_key)
                .extensions(vec![
                    ExtensionParam::from_extension(
                        BasicConstraints {
                            is_ca: true,
                            max_path_length: Some(0),
                        },
                        true,
                    )?,
                    ExtensionParam::from_extension(
                        KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign),
                        true,
                    )?,
                ])
                .build(),
        )
        .await?;
    println!("CA Certificate PEM:\n{ca_cert}");

    // Server: Ed25519, signed by the CA
    let server_key = KeyPair::from(ed25519_dalek::SigningKey::generate(&mut OsRng));
    let server_public_key = server_key.public_key();
    let server_spki = issuer.provider().export_public_key(&server_public_key).await?;

    let server_cert = issuer
        .create(
            CertificateParams::builder()
                .serial_number("1000")
                .validity(Validity::for_days(365))
                .subject("CN=myserver.local")
                .issuer(ca_name)
                .public_key(&server_public_key)
                .signing_key(&ca_key)
                .extensions(vec![
                    ExtensionParam::from_extension(
                        SubjectAltName {
                            names: vec!["myserver.local".to_string()],
                        },
                        false,
                    )?,
                    ExtensionParam::from_extension(
                        ExtendedKeyUsage {
                            usage: vec![ExtendedKeyUsageOption::ServerAuth],
                        },
                        false,
                    )?,
                    ExtensionParam::from_extension(
                        SubjectKeyIdentifier::from_public_key(&server_spki)?,
                        false,
                    )?,
                ])
                .build(),
        )
        .await?;

    println!("Server Certificate PEM:\n{server_cert}");
    println!(
        "Server Certificate base64url:\n{}",
        server_cert.to_string_as(Encoding::Base64Url)
    );
    println!(
        "Verified against CA key: {}",
        issuer.verify(&server_cert, &ca_public_key).await?
    );

    Ok(())
}
