//! PKCS#12 archive loading.
//!
//! Archive bytes and passwords are borrowed only for the duration of one
//! call; decrypted key material lives in zeroizing buffers until it has been
//! turned into an [`RsaPrivateKey`], which wipes itself on drop.

use const_oid::db::rfc5912::RSA_ENCRYPTION;
use p12::PFX;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_parser::prelude::*;
use zeroize::Zeroizing;

use crate::error::CertificateError;

/// Certificates and private key decrypted from an archive, not yet checked.
pub(crate) struct OpenedArchive {
    /// Signing certificate, DER
    pub certificate: Vec<u8>,
    /// Remaining certificates, DER
    pub chain: Vec<Vec<u8>>,
    /// First private key, PKCS#8 DER
    pub private_key: Zeroizing<Vec<u8>>,
}

impl OpenedArchive {
    /// Decrypt an archive.
    ///
    /// Wrong password, corrupt data and unsupported encryption schemes all
    /// map to [`CertificateError::Unreadable`].
    pub fn open(archive: &[u8], password: &str) -> Result<Self, CertificateError> {
        let pfx = PFX::parse(archive).map_err(|_| CertificateError::Unreadable)?;
        if !pfx.verify_mac(password) {
            return Err(CertificateError::Unreadable);
        }

        let mut keys: Vec<Zeroizing<Vec<u8>>> = pfx
            .key_bags(password)
            .map_err(|_| CertificateError::Unreadable)?
            .into_iter()
            .map(Zeroizing::new)
            .collect();
        let mut certs = pfx
            .cert_x509_bags(password)
            .map_err(|_| CertificateError::Unreadable)?;

        if keys.is_empty() || certs.is_empty() {
            return Err(CertificateError::Incomplete);
        }
        let private_key = keys.swap_remove(0);

        // The signing certificate is the one matching the key; archives may
        // list the chain in any order.
        let signer_index = RsaPrivateKey::from_pkcs8_der(&private_key)
            .ok()
            .map(|key| RsaPublicKey::from(&key))
            .and_then(|public| {
                certs
                    .iter()
                    .position(|der| certificate_public_key(der).ok().as_ref() == Some(&public))
            })
            .unwrap_or(0);
        let certificate = certs.remove(signer_index);

        log::debug!("opened certificate archive with {} chain certificate(s)", certs.len());
        Ok(Self {
            certificate,
            chain: certs,
            private_key,
        })
    }

    /// Decode the private key, checking it is RSA and matches the
    /// certificate.
    pub fn rsa_key(&self) -> Result<RsaPrivateKey, CertificateError> {
        let key = match RsaPrivateKey::from_pkcs8_der(&self.private_key) {
            Ok(key) => key,
            Err(_) => {
                return Err(match pkcs8::PrivateKeyInfo::try_from(self.private_key.as_slice()) {
                    Ok(info) if info.algorithm.oid != RSA_ENCRYPTION => {
                        CertificateError::UnsupportedKey(info.algorithm.oid.to_string())
                    },
                    _ => CertificateError::Unreadable,
                });
            },
        };

        match certificate_public_key(&self.certificate) {
            Ok(public) if public == RsaPublicKey::from(&key) => Ok(key),
            Ok(_) => Err(CertificateError::KeyMismatch),
            Err(e) => Err(e),
        }
    }
}

/// RSA public key of a DER certificate.
pub(crate) fn certificate_public_key(der: &[u8]) -> Result<RsaPublicKey, CertificateError> {
    let (_, cert) = X509Certificate::from_der(der).map_err(|_| CertificateError::Unreadable)?;
    let spki = cert.public_key();
    RsaPublicKey::from_public_key_der(spki.raw).map_err(|_| {
        CertificateError::UnsupportedKey(spki.algorithm.algorithm.to_id_string())
    })
}

/// Certificate and key for one signing operation.
///
/// Created per call from an archive and dropped when the call returns; the
/// engine never caches credentials.
pub struct SigningCredentials {
    certificate: Vec<u8>,
    chain: Vec<Vec<u8>>,
    private_key: RsaPrivateKey,
}

impl SigningCredentials {
    /// Build credentials from parts already in memory.
    ///
    /// The key must belong to the certificate.
    pub fn new(certificate: Vec<u8>, private_key: RsaPrivateKey) -> Result<Self, CertificateError> {
        if certificate_public_key(&certificate)? != RsaPublicKey::from(&private_key) {
            return Err(CertificateError::KeyMismatch);
        }
        Ok(Self {
            certificate,
            chain: Vec::new(),
            private_key,
        })
    }

    /// Add intermediate certificates (DER) to embed in signatures.
    pub fn with_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.chain = chain;
        self
    }

    /// Load credentials from a PKCS#12 (.p12/.pfx) archive.
    pub fn from_pkcs12(archive: &[u8], password: &str) -> Result<Self, CertificateError> {
        let opened = OpenedArchive::open(archive, password)?;
        let private_key = opened.rsa_key()?;
        Ok(Self {
            certificate: opened.certificate,
            chain: opened.chain,
            private_key,
        })
    }

    /// Signing certificate, DER.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// Intermediate certificates, DER.
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("certificate", &format!("{} bytes", self.certificate.len()))
            .field("private_key", &"[REDACTED]")
            .field("chain", &format!("{} certificates", self.chain.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_archive_is_unreadable() {
        let err = OpenedArchive::open(b"definitely not pkcs12", "secret").err();
        assert_eq!(err, Some(CertificateError::Unreadable));
    }

    #[test]
    fn test_empty_archive_is_unreadable() {
        assert!(matches!(
            SigningCredentials::from_pkcs12(&[], ""),
            Err(CertificateError::Unreadable)
        ));
    }
}
