//! Detached CMS `SignedData` containers (PKCS#7, SHA256withRSA).
//!
//! The container carries the signer certificate (plus any chain
//! certificates), the signed attributes `content-type`, `message-digest`
//! and optionally `signing-time`, and an RSA PKCS#1 v1.5 signature over the
//! DER encoding of those attributes. The signed bytes themselves are not
//! encapsulated.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use const_oid::db::rfc5911::{ID_CONTENT_TYPE, ID_DATA, ID_MESSAGE_DIGEST, ID_SIGNED_DATA, ID_SIGNING_TIME};
use const_oid::db::rfc5912::{ID_SHA_256, SHA_256_WITH_RSA_ENCRYPTION};
use const_oid::ObjectIdentifier;
use der::asn1::{Null, OctetString, SetOfVec, UtcTime};
use der::{Any, Decode, Encode, SliceReader};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::RsaPublicKey;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer, Verifier};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;
use x509_cert::Certificate;

use crate::certificates::SigningCredentials;
use crate::error::{Error, Result};

fn build_err(e: impl std::fmt::Display) -> Error {
    Error::Signing(format!("CMS encoding failed: {}", e))
}

fn parse_err(e: impl std::fmt::Display) -> Error {
    Error::InvalidPdf(format!("malformed signature container: {}", e))
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute> {
    let values = SetOfVec::try_from(vec![value]).map_err(build_err)?;
    Ok(Attribute { oid, values })
}

fn sha256_identifier() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: ID_SHA_256,
        parameters: None,
    }
}

/// Build a detached `SignedData` over a precomputed SHA-256 `digest`.
///
/// Returns the DER encoded `ContentInfo`.
pub(crate) fn build_signed_data(
    credentials: &SigningCredentials,
    digest: &[u8],
    signing_time: Option<DateTime<Utc>>,
) -> Result<Vec<u8>> {
    let mut attributes = vec![
        attribute(ID_CONTENT_TYPE, Any::encode_from(&ID_DATA).map_err(build_err)?)?,
        attribute(
            ID_MESSAGE_DIGEST,
            Any::encode_from(&OctetString::new(digest.to_vec()).map_err(build_err)?).map_err(build_err)?,
        )?,
    ];
    if let Some(at) = signing_time {
        let secs = u64::try_from(at.timestamp()).map_err(build_err)?;
        let time = UtcTime::from_system_time(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).map_err(build_err)?;
        attributes.push(attribute(ID_SIGNING_TIME, Any::encode_from(&time).map_err(build_err)?)?);
    }
    assemble(credentials, attributes)
}

/// Sign `attributes` and wrap them with the signer certificate and chain.
fn assemble(credentials: &SigningCredentials, attributes: Vec<Attribute>) -> Result<Vec<u8>> {
    let certificate = Certificate::from_der(credentials.certificate()).map_err(build_err)?;
    let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: certificate.tbs_certificate.issuer.clone(),
        serial_number: certificate.tbs_certificate.serial_number.clone(),
    });

    let signed_attrs = SetOfVec::try_from(attributes).map_err(build_err)?;

    let signing_key = SigningKey::<Sha256>::new(credentials.private_key().clone());
    let signed_attrs_der = signed_attrs.to_der().map_err(build_err)?;
    let rsa_signature: Signature = signing_key
        .try_sign(&signed_attrs_der)
        .map_err(|e| Error::Signing(format!("RSA signing failed: {}", e)))?;

    let signer_info = SignerInfo {
        version: CmsVersion::V1,
        sid,
        digest_alg: sha256_identifier(),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: SHA_256_WITH_RSA_ENCRYPTION,
            parameters: Some(Any::encode_from(&Null).map_err(build_err)?),
        },
        signature: OctetString::new(rsa_signature.to_vec()).map_err(build_err)?,
        unsigned_attrs: None,
    };

    let mut certificates = vec![CertificateChoices::Certificate(certificate)];
    for der in credentials.chain() {
        certificates.push(CertificateChoices::Certificate(
            Certificate::from_der(der).map_err(build_err)?,
        ));
    }

    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![sha256_identifier()]).map_err(build_err)?,
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: ID_DATA,
            econtent: None,
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(certificates).map_err(build_err)?)),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).map_err(build_err)?),
    };

    let content_info = ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::encode_from(&signed_data).map_err(build_err)?,
    };
    content_info.to_der().map_err(build_err)
}

/// The parts of a signature container needed for verification.
#[derive(Debug, Clone)]
pub(crate) struct ParsedContainer {
    /// Signer certificate, DER
    pub certificate: Option<Vec<u8>>,
    /// `message-digest` signed attribute
    pub message_digest: Option<Vec<u8>>,
    /// `signing-time` signed attribute
    pub signing_time: Option<DateTime<Utc>>,
    signed_attributes: Option<Vec<u8>>,
    signature: Vec<u8>,
}

impl ParsedContainer {
    /// Decode a container. Trailing bytes (the zero padding of the
    /// placeholder) are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = SliceReader::new(bytes).map_err(parse_err)?;
        let content_info = ContentInfo::decode(&mut reader).map_err(parse_err)?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(parse_err(format!("content type {} is not signedData", content_info.content_type)));
        }
        let signed_data =
            SignedData::from_der(&content_info.content.to_der().map_err(parse_err)?).map_err(parse_err)?;

        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| parse_err("no signer info"))?;
        if signer_info.digest_alg.oid != ID_SHA_256 {
            return Err(Error::Unsupported(format!("digest algorithm {}", signer_info.digest_alg.oid)));
        }

        let serial = match &signer_info.sid {
            SignerIdentifier::IssuerAndSerialNumber(sid) => Some(sid.serial_number.clone()),
            SignerIdentifier::SubjectKeyIdentifier(_) => None,
        };
        let certificates: Vec<&Certificate> = signed_data
            .certificates
            .as_ref()
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        CertificateChoices::Certificate(cert) => Some(cert),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let certificate = certificates
            .iter()
            .find(|cert| Some(&cert.tbs_certificate.serial_number) == serial.as_ref())
            .or_else(|| certificates.first())
            .map(|cert| cert.to_der())
            .transpose()
            .map_err(parse_err)?;

        let mut message_digest = None;
        let mut signing_time = None;
        let mut signed_attributes = None;
        if let Some(attrs) = &signer_info.signed_attrs {
            for attr in attrs.iter() {
                let Some(value) = attr.values.iter().next() else {
                    continue;
                };
                if attr.oid == ID_MESSAGE_DIGEST {
                    message_digest = Some(value.value().to_vec());
                } else if attr.oid == ID_SIGNING_TIME {
                    let time = Time::from_der(&value.to_der().map_err(parse_err)?).map_err(parse_err)?;
                    signing_time = Some(DateTime::<Utc>::from(time.to_system_time()));
                }
            }
            if message_digest.is_none() {
                return Err(parse_err("signed attributes lack a message-digest"));
            }
            signed_attributes = Some(attrs.to_der().map_err(parse_err)?);
        }

        Ok(Self {
            certificate,
            message_digest,
            signing_time,
            signed_attributes,
            signature: signer_info.signature.as_bytes().to_vec(),
        })
    }

    /// Check the RSA signature with `public_key`.
    ///
    /// `signed_content` is only used when the container has no signed
    /// attributes.
    pub fn verify_signature(&self, public_key: &RsaPublicKey, signed_content: &[u8]) -> Result<()> {
        let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
        let signature = Signature::try_from(self.signature.as_slice())
            .map_err(|e| Error::Signing(format!("malformed RSA signature: {}", e)))?;
        let message = self.signed_attributes.as_deref().unwrap_or(signed_content);
        verifying_key
            .verify(message, &signature)
            .map_err(|_| Error::Signing("signature does not match the signer certificate".to_string()))
    }
}
