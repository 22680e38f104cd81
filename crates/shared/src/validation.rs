//! Common validation utilities for Brazilian documents, addresses and phones.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref CEP_RE: Regex = Regex::new(r"^\d{5}-?\d{3}$").unwrap();
}

/// The 26 states plus the Federal District.
pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Strips everything that is not an ASCII digit.
pub fn normalize_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_of(input: &str) -> Vec<u32> {
    input.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn cnpj_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

/// Returns true when `input` (formatted or not) is a CNPJ with valid check digits.
pub fn is_valid_cnpj(input: &str) -> bool {
    if input.chars().any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '/' | '-' | ' '))) {
        return false;
    }
    let digits = digits_of(input);
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }
    let first = cnpj_check_digit(&digits[..12], &CNPJ_WEIGHTS_FIRST);
    let second = cnpj_check_digit(&digits[..13], &CNPJ_WEIGHTS_SECOND);
    digits[12] == first && digits[13] == second
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (start - i as u32))
        .sum();
    (sum * 10 % 11) % 10
}

/// Returns true when `input` (formatted or not) is a CPF with valid check digits.
pub fn is_valid_cpf(input: &str) -> bool {
    if input.chars().any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | ' '))) {
        return false;
    }
    let digits = digits_of(input);
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    digits[9] == cpf_check_digit(&digits[..9]) && digits[10] == cpf_check_digit(&digits[..10])
}

/// Normalizes a CEP (postal code) to its 8 digits, or `None` if malformed.
pub fn normalize_cep(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if CEP_RE.is_match(trimmed) {
        Some(normalize_digits(trimmed))
    } else {
        None
    }
}

/// Returns true for a known two-letter state code (case-insensitive).
pub fn is_valid_uf(input: &str) -> bool {
    let upper = input.trim().to_uppercase();
    BRAZILIAN_STATES.contains(&upper.as_str())
}

/// Accepts landline and mobile numbers with optional country code (10-13 digits).
pub fn is_valid_phone_br(input: &str) -> bool {
    if input
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | ' ')))
    {
        return false;
    }
    (10..=13).contains(&normalize_digits(input).len())
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// `validator` adapter for CNPJ fields.
pub fn validate_cnpj(value: &str) -> Result<(), ValidationError> {
    if is_valid_cnpj(value) {
        Ok(())
    } else {
        Err(error("cnpj", "Invalid CNPJ"))
    }
}

/// `validator` adapter for a client document: either a CPF or a CNPJ.
pub fn validate_document(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) || is_valid_cnpj(value) {
        Ok(())
    } else {
        Err(error("document", "Document must be a valid CPF or CNPJ"))
    }
}

/// `validator` adapter for CEP fields.
pub fn validate_cep(value: &str) -> Result<(), ValidationError> {
    normalize_cep(value)
        .map(|_| ())
        .ok_or_else(|| error("cep", "CEP must have 8 digits"))
}

/// `validator` adapter for state (UF) fields.
pub fn validate_uf(value: &str) -> Result<(), ValidationError> {
    if is_valid_uf(value) {
        Ok(())
    } else {
        Err(error("uf", "Invalid state code"))
    }
}

/// `validator` adapter for phone fields.
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if is_valid_phone_br(value) {
        Ok(())
    } else {
        Err(error("phone", "Invalid phone number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_digits() {
        assert_eq!(normalize_digits("11.222.333/0001-81"), "11222333000181");
        assert_eq!(normalize_digits("abc"), "");
    }

    #[test]
    fn test_valid_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(is_valid_cnpj("11222333000181"));
    }

    #[test]
    fn test_invalid_cnpj() {
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(!is_valid_cnpj("00000000000000"));
        assert!(!is_valid_cnpj("1122233300018"));
        assert!(!is_valid_cnpj("11a22233300018"));
        assert!(!is_valid_cnpj(""));
    }

    #[test]
    fn test_valid_cpf() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
    }

    #[test]
    fn test_invalid_cpf() {
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("5299822472"));
    }

    #[test]
    fn test_normalize_cep() {
        assert_eq!(normalize_cep("01310-100"), Some("01310100".to_string()));
        assert_eq!(normalize_cep(" 01310100 "), Some("01310100".to_string()));
        assert_eq!(normalize_cep("0131-0100"), None);
        assert_eq!(normalize_cep("1310100"), None);
    }

    #[test]
    fn test_uf() {
        assert!(is_valid_uf("SP"));
        assert!(is_valid_uf("rj"));
        assert!(!is_valid_uf("XX"));
        assert_eq!(BRAZILIAN_STATES.len(), 27);
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone_br("(11) 98765-4321"));
        assert!(is_valid_phone_br("+55 11 3333-4444"));
        assert!(!is_valid_phone_br("12345"));
        assert!(!is_valid_phone_br("11 9876x4321"));
    }

    #[test]
    fn test_validator_adapters() {
        assert!(validate_cnpj("11.222.333/0001-81").is_ok());
        let err = validate_cnpj("123").unwrap_err();
        assert_eq!(err.code, "cnpj");
        assert!(validate_document("529.982.247-25").is_ok());
        assert!(validate_document("11.222.333/0001-81").is_ok());
        assert!(validate_document("123").is_err());
        assert!(validate_cep("01310-100").is_ok());
        assert!(validate_uf("MG").is_ok());
        assert!(validate_phone("11987654321").is_ok());
    }
}
