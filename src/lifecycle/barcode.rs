//! Specimen barcodes.

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::error::LifecycleError;

const PREFIX: &str = "HP";
const RANDOM_LEN: usize = 10;
const MAX_LEN: usize = 64;

/// Fresh random barcode, e.g. `HP7K2M9Q4XA1`. Uniqueness is the store's job.
pub fn generate_barcode() -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{PREFIX}{body}")
}

/// Caller-supplied barcodes: ASCII letters, digits and `-`, 1..=64 chars.
pub fn validate_barcode(code: &str) -> Result<(), LifecycleError> {
    if code.is_empty() || code.len() > MAX_LEN {
        return Err(LifecycleError::Validation(format!(
            "barCode must be 1 to {MAX_LEN} characters"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(LifecycleError::Validation(
            "barCode may only contain letters, digits and '-'".into(),
        ));
    }
    Ok(())
}
