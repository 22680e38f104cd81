//! TOTP two-factor authentication.
//!
//! RFC 6238 codes (SHA1, 6 digits, 30 second step) with one step of clock
//! skew either way. Setup hands the client a base32 secret, an `otpauth://`
//! URL and the same URL as a PNG QR code data URL. Backup codes are shown
//! once and stored only as SHA-256 hashes.

use rand::{distributions::Uniform, Rng};
use serde::Serialize;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// Number of one-time backup codes issued when 2FA is enabled.
pub const BACKUP_CODE_COUNT: usize = 8;

/// Length of each backup code.
pub const BACKUP_CODE_LENGTH: usize = 10;

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error)]
pub enum TwoFactorError {
    #[error("Invalid two-factor secret: {0}")]
    InvalidSecret(String),

    #[error("Failed to render QR code: {0}")]
    QrCode(String),

    #[error("System clock error: {0}")]
    Clock(String),
}

/// Material returned by `POST /api/auth/2fa/setup`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetup {
    pub secret: String,
    pub otpauth_url: String,
    /// `data:image/png;base64,...`
    pub qr_code: String,
}

#[derive(Debug, Clone)]
pub struct TwoFactorService {
    issuer: String,
}

impl TwoFactorService {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    fn totp(&self, secret: &str, account: &str) -> Result<TOTP, TwoFactorError> {
        let bytes = Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|e| TwoFactorError::InvalidSecret(format!("{:?}", e)))?;
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP_SECS,
            bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| TwoFactorError::InvalidSecret(e.to_string()))
    }

    /// Generates a new secret for `account` (the login email).
    pub fn generate_setup(&self, account: &str) -> Result<TwoFactorSetup, TwoFactorError> {
        let secret = match Secret::generate_secret().to_encoded() {
            Secret::Encoded(s) => s,
            Secret::Raw(_) => {
                return Err(TwoFactorError::InvalidSecret(
                    "secret could not be encoded".into(),
                ))
            }
        };
        let totp = self.totp(&secret, account)?;
        let qr = totp.get_qr_base64().map_err(TwoFactorError::QrCode)?;

        Ok(TwoFactorSetup {
            secret,
            otpauth_url: totp.get_url(),
            qr_code: format!("data:image/png;base64,{}", qr),
        })
    }

    /// Checks `code` against the current time window.
    pub fn verify(&self, secret: &str, code: &str) -> Result<bool, TwoFactorError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| TwoFactorError::Clock(e.to_string()))?
            .as_secs();
        self.verify_at(secret, code, now)
    }

    pub fn verify_at(&self, secret: &str, code: &str, unix_secs: u64) -> Result<bool, TwoFactorError> {
        let code = code.trim().replace(' ', "");
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }
        // Account name is not part of the code computation.
        let totp = self.totp(secret, "verify")?;
        Ok(totp.check(&code, unix_secs))
    }

    /// Code for `unix_secs`; used by tests and the setup confirmation flow.
    pub fn code_at(&self, secret: &str, unix_secs: u64) -> Result<String, TwoFactorError> {
        Ok(self.totp(secret, "verify")?.generate(unix_secs))
    }
}

/// Generates fresh backup codes in plain text.
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..BACKUP_CODE_ALPHABET.len());
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            (0..BACKUP_CODE_LENGTH)
                .map(|_| BACKUP_CODE_ALPHABET[rng.sample(dist)] as char)
                .collect()
        })
        .collect()
}

/// Hash stored for a backup code. Case, spaces and dashes are ignored.
pub fn hash_backup_code(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    shared::crypto::sha256_hex(&normalized)
}

/// True when `code` looks like a backup code rather than a TOTP code.
pub fn is_backup_code_format(code: &str) -> bool {
    code.chars().filter(|c| c.is_ascii_alphanumeric()).count() == BACKUP_CODE_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TwoFactorService {
        TwoFactorService::new("Comprar & Construir")
    }

    #[test]
    fn test_setup_returns_secret_url_and_qr() {
        let setup = service().generate_setup("obra@construtora.com.br").unwrap();
        assert!(!setup.secret.is_empty());
        assert!(setup.otpauth_url.starts_with("otpauth://totp/"));
        assert!(setup.otpauth_url.contains(&setup.secret));
        assert!(setup.qr_code.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_verify_accepts_current_and_adjacent_steps() {
        let svc = service();
        let setup = svc.generate_setup("a@b.com").unwrap();
        let t = 1_700_000_000;
        let code = svc.code_at(&setup.secret, t).unwrap();

        assert!(svc.verify_at(&setup.secret, &code, t).unwrap());
        assert!(svc.verify_at(&setup.secret, &code, t + STEP_SECS).unwrap());
        assert!(!svc.verify_at(&setup.secret, &code, t + 3 * STEP_SECS).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let svc = service();
        let setup = svc.generate_setup("a@b.com").unwrap();
        assert!(!svc.verify_at(&setup.secret, "12345", 0).unwrap());
        assert!(!svc.verify_at(&setup.secret, "abcdef", 0).unwrap());
        assert!(!svc.verify_at(&setup.secret, "", 0).unwrap());
    }

    #[test]
    fn test_invalid_secret_is_an_error() {
        assert!(service().verify_at("not base32!", "123456", 0).is_err());
    }

    #[test]
    fn test_backup_codes_shape() {
        let codes = generate_backup_codes();
        assert_eq!(codes.len(), BACKUP_CODE_COUNT);
        for code in &codes {
            assert_eq!(code.len(), BACKUP_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(is_backup_code_format(code));
        }
    }

    #[test]
    fn test_backup_code_hash_is_normalized() {
        assert_eq!(hash_backup_code("abcde-fghjk"), hash_backup_code("ABCDEFGHJK"));
        assert_ne!(hash_backup_code("ABCDEFGHJK"), hash_backup_code("ABCDEFGHJM"));
        assert!(!is_backup_code_format("123456"));
    }
}
