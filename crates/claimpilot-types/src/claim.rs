//! Claim input.

use serde::{Deserialize, Serialize};

/// Fields that must be present (and non-blank) for a run to proceed,
/// in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "claim_id",
    "denial_code",
    "denial_description",
    "payer_name",
];

/// A denied claim submitted for appeal drafting.
///
/// Every field is optional at the type level so that incomplete submissions
/// can still be represented and rejected with a precise list of what is
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimInput {
    pub claim_id: Option<String>,
    /// Payer denial code, e.g. `CO-197`.
    pub denial_code: Option<String>,
    pub denial_description: Option<String>,
    pub payer_name: Option<String>,
    /// Raw policy text supplied alongside the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_text: Option<String>,
}

impl ClaimInput {
    /// Create a claim with all required fields populated.
    pub fn new(
        claim_id: impl Into<String>,
        denial_code: impl Into<String>,
        denial_description: impl Into<String>,
        payer_name: impl Into<String>,
    ) -> Self {
        Self {
            claim_id: Some(claim_id.into()),
            denial_code: Some(denial_code.into()),
            denial_description: Some(denial_description.into()),
            payer_name: Some(payer_name.into()),
            policy_text: None,
        }
    }

    /// Attach raw policy text.
    pub fn with_policy_text(mut self, text: impl Into<String>) -> Self {
        self.policy_text = Some(text.into());
        self
    }

    /// Look up a required field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "claim_id" => self.claim_id.as_deref(),
            "denial_code" => self.denial_code.as_deref(),
            "denial_description" => self.denial_description.as_deref(),
            "payer_name" => self.payer_name.as_deref(),
            "policy_text" => self.policy_text.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<String> {
        REQUIRED_FIELDS
            .iter()
            .filter(|name| self.field(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Claim id, or an empty string when absent. Convenient for logging.
    pub fn claim_id_or_empty(&self) -> &str {
        self.claim_id.as_deref().unwrap_or_default()
    }

    pub fn denial_code_or_empty(&self) -> &str {
        self.denial_code.as_deref().unwrap_or_default()
    }

    pub fn denial_description_or_empty(&self) -> &str {
        self.denial_description.as_deref().unwrap_or_default()
    }

    pub fn payer_name_or_empty(&self) -> &str {
        self.payer_name.as_deref().unwrap_or_default()
    }
}
