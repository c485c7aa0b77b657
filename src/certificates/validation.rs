//! Certificate validation against a point in time and the trusted issuer list.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::archive::{OpenedArchive, SigningCredentials};
use super::info::CertificateInfo;
use crate::config::EngineConfig;
use crate::error::{CertificateError, Error, Result};

/// Non-blocking finding about a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CertificateWarning {
    /// Issuer does not match any entry of the trusted-issuer list
    UntrustedIssuer {
        /// Issuer distinguished name
        issuer: String,
    },
    /// Certificate expires within the configured warning window
    ExpiresSoon {
        /// Whole days left
        days_remaining: i64,
    },
}

impl std::fmt::Display for CertificateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertificateWarning::UntrustedIssuer { issuer } => {
                write!(f, "issuer is not on the trusted list: {}", issuer)
            },
            CertificateWarning::ExpiresSoon { days_remaining } => {
                write!(f, "certificate expires in {} day(s)", days_remaining)
            },
        }
    }
}

/// Outcome of checking a certificate archive.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateValidation {
    /// True when no blocking error was found
    pub valid: bool,
    /// Blocking problems
    pub errors: Vec<CertificateError>,
    /// Advisory findings
    pub warnings: Vec<CertificateWarning>,
    /// Certificate details, when the archive could be read
    pub info: Option<CertificateInfo>,
}

impl CertificateValidation {
    fn failed(error: CertificateError) -> Self {
        Self {
            valid: false,
            errors: vec![error],
            warnings: Vec::new(),
            info: None,
        }
    }
}

/// Reads and checks PKCS#12 certificate archives.
///
/// Holds only policy (trusted issuers, expiry warning window); nothing about
/// a particular certificate is retained between calls.
#[derive(Debug, Clone)]
pub struct CertificateManager {
    trusted_issuers: Vec<String>,
    expiry_warning_days: i64,
}

impl Default for CertificateManager {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CertificateManager {
    /// Create a manager using the policy from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            trusted_issuers: config.trusted_issuers.clone(),
            expiry_warning_days: config.expiry_warning_days,
        }
    }

    /// Parse the archive and describe its signing certificate.
    pub fn extract_certificate_info(&self, archive: &[u8], password: &str) -> Result<CertificateInfo> {
        let opened = OpenedArchive::open(archive, password)?;
        Ok(CertificateInfo::from_der(&opened.certificate)?)
    }

    /// Check the archive against the current time.
    pub fn validate_certificate(&self, archive: &[u8], password: &str) -> CertificateValidation {
        self.validate_certificate_at(archive, password, Utc::now())
    }

    /// Check the archive as of `now`.
    pub fn validate_certificate_at(
        &self,
        archive: &[u8],
        password: &str,
        now: DateTime<Utc>,
    ) -> CertificateValidation {
        match self.inspect(archive, password, now) {
            Ok((validation, _)) => validation,
            Err(e) => CertificateValidation::failed(e),
        }
    }

    /// Validate the archive and, if it passes, hand out credentials for a
    /// single signing call.
    ///
    /// The validity window is checked against `now` on every call.
    pub fn open_for_signing(
        &self,
        archive: &[u8],
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(SigningCredentials, CertificateValidation)> {
        let (validation, credentials) = self.inspect(archive, password, now).map_err(Error::Credentials)?;
        if let Some(error) = validation.errors.first() {
            log::warn!("certificate rejected for signing: {}", error);
            return Err(Error::Credentials(error.clone()));
        }
        match credentials {
            Some(credentials) => Ok((credentials, validation)),
            None => Err(Error::Credentials(CertificateError::Incomplete)),
        }
    }

    fn inspect(
        &self,
        archive: &[u8],
        password: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<(CertificateValidation, Option<SigningCredentials>), CertificateError> {
        let opened = OpenedArchive::open(archive, password)?;
        let info = CertificateInfo::from_der(&opened.certificate)?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if now < info.valid_from {
            errors.push(CertificateError::NotYetValid {
                valid_from: info.valid_from.to_rfc3339(),
            });
        } else if now > info.valid_to {
            errors.push(CertificateError::Expired {
                valid_to: info.valid_to.to_rfc3339(),
            });
        } else {
            let days = info.days_remaining(now);
            if days <= self.expiry_warning_days {
                warnings.push(CertificateWarning::ExpiresSoon { days_remaining: days });
            }
        }

        let credentials = match opened.rsa_key() {
            Ok(key) => Some(
                SigningCredentials::new(opened.certificate.clone(), key)?.with_chain(opened.chain.clone()),
            ),
            Err(e) => {
                errors.push(e);
                None
            },
        };

        if !self.is_trusted_issuer(&info.issuer) {
            warnings.push(CertificateWarning::UntrustedIssuer {
                issuer: info.issuer.clone(),
            });
        }

        log::debug!(
            "certificate serial {} checked: {} error(s), {} warning(s)",
            info.serial,
            errors.len(),
            warnings.len()
        );
        Ok((
            CertificateValidation {
                valid: errors.is_empty(),
                errors,
                warnings,
                info: Some(info),
            },
            credentials,
        ))
    }

    /// Case-insensitive substring match of the issuer DN against the
    /// trusted list. An empty list trusts nothing.
    fn is_trusted_issuer(&self, issuer: &str) -> bool {
        let issuer = issuer.to_lowercase();
        self.trusted_issuers
            .iter()
            .any(|trusted| !trusted.trim().is_empty() && issuer.contains(&trusted.trim().to_lowercase()))
    }
}

/// [`CertificateManager::extract_certificate_info`] with the default policy.
pub fn extract_certificate_info(archive: &[u8], password: &str) -> Result<CertificateInfo> {
    CertificateManager::default().extract_certificate_info(archive, password)
}

/// [`CertificateManager::validate_certificate`] with the default policy.
pub fn validate_certificate(archive: &[u8], password: &str) -> CertificateValidation {
    CertificateManager::default().validate_certificate(archive, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_archive_single_error() {
        let result = validate_certificate(b"garbage", "pw");
        assert!(!result.valid);
        assert_eq!(result.errors, vec![CertificateError::Unreadable]);
        assert!(result.info.is_none());
    }

    #[test]
    fn test_trusted_issuer_matching() {
        let manager = CertificateManager::new(
            &EngineConfig::new().with_trusted_issuers(["ICP-Brasil", "  "]),
        );
        assert!(manager.is_trusted_issuer("CN=AC SOLUTI v5, O=ICP-Brasil, C=BR"));
        assert!(manager.is_trusted_issuer("O=icp-brasil"));
        assert!(!manager.is_trusted_issuer("CN=Some Other CA"));
    }

    #[test]
    fn test_open_for_signing_hides_reason() {
        let err = CertificateManager::default()
            .open_for_signing(b"garbage", "pw", Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot sign with provided credentials");
        assert!(err.is_credentials());
    }
}
