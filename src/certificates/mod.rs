//! Certificate Manager: PKCS#12 archives, certificate details and checks.
//!
//! A failure here is an authorization failure for signing. Callers get a
//! structured [`CertificateValidation`] for display, while the signing path
//! surfaces [`crate::Error::Credentials`], whose message never says whether
//! the password or the archive was at fault.
//!
//! Chain-of-trust building is not performed; the issuer is only matched
//! against a configured allow-list.

mod archive;
mod info;
mod validation;

pub(crate) use archive::certificate_public_key;
pub use archive::SigningCredentials;
pub use info::{parse_holder, CertificateInfo};
pub use validation::{
    extract_certificate_info, validate_certificate, CertificateManager, CertificateValidation,
    CertificateWarning,
};
