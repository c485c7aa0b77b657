//! Certificate metadata extracted for display and audit.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use x509_parser::prelude::*;

use crate::error::CertificateError;
use crate::model::hex_lower;

lazy_static! {
    /// "NAME:ID" convention used by Brazilian e-CPF/e-CNPJ subject names,
    /// where ID is an 11-digit CPF or a 14-digit CNPJ.
    static ref HOLDER_CN: Regex = Regex::new(r"^\s*(.+?)\s*:\s*(\d{11}|\d{14})\s*$").unwrap();
}

/// Identity and validity of a signing certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Serial number, lowercase hex
    pub serial: String,
    /// Start of the validity window
    pub valid_from: DateTime<Utc>,
    /// End of the validity window
    pub valid_to: DateTime<Utc>,
    /// Holder identifier taken from the common name, if it follows the
    /// "NAME:ID" convention
    pub holder_id: Option<String>,
    /// Holder name taken from the common name
    pub holder_name: Option<String>,
}

impl CertificateInfo {
    /// Parse a DER encoded X.509 certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = X509Certificate::from_der(der).map_err(|_| CertificateError::Unreadable)?;

        let valid_from = timestamp(cert.validity().not_before.timestamp())?;
        let valid_to = timestamp(cert.validity().not_after.timestamp())?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);
        let (holder_name, holder_id) = match common_name.as_deref().map(parse_holder) {
            Some(Some((name, id))) => (Some(name), Some(id)),
            Some(None) => (common_name.clone(), None),
            None => (None, None),
        };

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: hex_lower(cert.raw_serial()),
            valid_from,
            valid_to,
            holder_id,
            holder_name,
        })
    }

    /// Whether `at` falls inside the validity window (inclusive).
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_to
    }

    /// Whole days left until expiry, negative once expired.
    pub fn days_remaining(&self, at: DateTime<Utc>) -> i64 {
        (self.valid_to - at).num_days()
    }
}

/// Split a "NAME:ID" common name. Returns `None` when the convention is not
/// followed.
pub fn parse_holder(common_name: &str) -> Option<(String, String)> {
    let caps = HOLDER_CN.captures(common_name)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, CertificateError> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CertificateError::Unreadable)
}
