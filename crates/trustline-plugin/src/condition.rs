//! Condition validation for two-phase transfers
//!
//! Conditions and fulfillments are opaque strings to the state machine;
//! validation is an injected primitive.

use sha2::{Digest, Sha256};

/// Decides whether a fulfillment satisfies a condition
pub trait ConditionValidator: Send + Sync {
    fn validate(&self, fulfillment: &str, condition: &str) -> bool;
}

/// Reference validator: the condition is the hex SHA-256 digest of the
/// fulfillment bytes.
pub struct PreimageValidator;

impl PreimageValidator {
    /// Derive the condition for a fulfillment, for transfer construction
    pub fn condition_for(fulfillment: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(fulfillment.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl ConditionValidator for PreimageValidator {
    fn validate(&self, fulfillment: &str, condition: &str) -> bool {
        Self::condition_for(fulfillment).eq_ignore_ascii_case(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preimage_matches_its_condition() {
        let condition = PreimageValidator::condition_for("secret");
        assert!(PreimageValidator.validate("secret", &condition));
        assert!(PreimageValidator.validate("secret", &condition.to_uppercase()));
    }

    #[test]
    fn test_wrong_preimage_fails() {
        let condition = PreimageValidator::condition_for("secret");
        assert!(!PreimageValidator.validate("guess", &condition));
        assert!(!PreimageValidator.validate("secret", "not-a-digest"));
    }
}
