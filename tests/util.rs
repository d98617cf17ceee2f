#![allow(dead_code)]

use certsmith::cert::params::Validity;
use certsmith::issuer::CertificateIssuer;
use certsmith::key::{KeyPair, RustCryptoProvider};
use rand_core::OsRng;
use time::OffsetDateTime;

pub fn p256_key() -> KeyPair {
    KeyPair::from(p256::ecdsa::SigningKey::random(&mut OsRng))
}

pub fn p384_key() -> KeyPair {
    KeyPair::from(p384::ecdsa::SigningKey::random(&mut OsRng))
}

pub fn ed25519_key() -> KeyPair {
    KeyPair::from(ed25519_dalek::SigningKey::generate(&mut OsRng))
}

pub fn rsa_key() -> KeyPair {
    KeyPair::from(rsa::RsaPrivateKey::new(&mut OsRng, 2048).expect("RSA key generation"))
}

/// 2024-01-01T00:00:00Z to 2034-01-01T00:00:00Z.
pub fn validity() -> Validity {
    Validity::new(
        OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap(),
        OffsetDateTime::from_unix_timestamp(2_019_686_400).unwrap(),
    )
}

pub fn issuer() -> CertificateIssuer<RustCryptoProvider> {
    CertificateIssuer::new(RustCryptoProvider)
}
