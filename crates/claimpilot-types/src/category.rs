//! Denial categories.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of denial categories a claim can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialCategory {
    /// Service not covered by the policy.
    Coverage,
    /// Procedure deemed not medically necessary.
    #[serde(rename = "Medical Necessity")]
    MedicalNecessity,
    /// Incorrect CPT/ICD codes or billing errors.
    Coding,
    /// Missing prior authorization or pre-certification.
    Authorization,
    /// Anything that fits none of the above.
    Other,
}

impl DenialCategory {
    /// All categories, in matching priority order.
    pub const ALL: [DenialCategory; 5] = [
        DenialCategory::Coverage,
        DenialCategory::MedicalNecessity,
        DenialCategory::Coding,
        DenialCategory::Authorization,
        DenialCategory::Other,
    ];

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            DenialCategory::Coverage => "Coverage",
            DenialCategory::MedicalNecessity => "Medical Necessity",
            DenialCategory::Coding => "Coding",
            DenialCategory::Authorization => "Authorization",
            DenialCategory::Other => "Other",
        }
    }

    /// Resolve free-form model output to a category.
    ///
    /// The first canonical label (in [`DenialCategory::ALL`] order) found as a
    /// case-insensitive substring wins, so `"Category: coding error"` resolves
    /// to [`DenialCategory::Coding`]. Output with no recognizable label
    /// resolves to [`DenialCategory::Other`]; this never fails.
    pub fn from_model_output(text: &str) -> Self {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| lowered.contains(&category.label().to_lowercase()))
            .unwrap_or(DenialCategory::Other)
    }
}

impl std::fmt::Display for DenialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string is not exactly one of the canonical labels.
#[derive(Debug, Clone, Error)]
#[error("unknown denial category '{0}'")]
pub struct ParseCategoryError(pub String);

impl FromStr for DenialCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_labels() {
        for category in DenialCategory::ALL {
            assert_eq!(DenialCategory::from_model_output(category.label()), category);
        }
    }

    #[test]
    fn test_label_with_surrounding_words() {
        assert_eq!(
            DenialCategory::from_model_output("The category is: Medical Necessity."),
            DenialCategory::MedicalNecessity
        );
        assert_eq!(
            DenialCategory::from_model_output("  authorization\n"),
            DenialCategory::Authorization
        );
    }

    #[test]
    fn test_unmatched_output_is_other() {
        assert_eq!(DenialCategory::from_model_output(""), DenialCategory::Other);
        assert_eq!(
            DenialCategory::from_model_output("I cannot determine this"),
            DenialCategory::Other
        );
    }

    #[test]
    fn test_priority_order() {
        // Coverage is checked before Coding.
        assert_eq!(
            DenialCategory::from_model_output("Coding or Coverage"),
            DenialCategory::Coverage
        );
    }

    #[test]
    fn test_from_str_is_strict() {
        assert_eq!(
            "medical necessity".parse::<DenialCategory>().unwrap(),
            DenialCategory::MedicalNecessity
        );
        assert!("necessity".parse::<DenialCategory>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&DenialCategory::MedicalNecessity).unwrap();
        assert_eq!(json, "\"Medical Necessity\"");
        let back: DenialCategory = serde_json::from_str("\"Coding\"").unwrap();
        assert_eq!(back, DenialCategory::Coding);
    }
}
