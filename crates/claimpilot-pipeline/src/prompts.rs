//! Prompt text for the generating stages.

use claimpilot_types::{ClaimInput, DenialCategory, PolicyExcerpt};

/// Shown to the drafter when retrieval found nothing.
pub const NO_EXCERPTS_PLACEHOLDER: &str = "No specific policy excerpts available for this payer.";

pub const CLASSIFY_SYSTEM: &str = "You classify health insurance claim denials.
Pick exactly ONE category:

1. Coverage - the service is not covered by the policy
2. Medical Necessity - the procedure was judged not medically necessary
3. Coding - wrong CPT/ICD codes or another billing error
4. Authorization - prior authorization or pre-certification was missing
5. Other - anything that fits none of the above

Answer with the category name only.";

pub const DRAFT_SYSTEM: &str = "You are a medical billing specialist writing formal appeal letters.

The letter must:
1. Cite the policy sections provided, and only those
2. Explain why the denial should be overturned
3. Stay professional and respectful
4. Run between 200 and 500 words
5. Use formal business letter format
6. Make no assumptions beyond the data given

Structure: greeting to the appeals committee, claim and denial reference,
argument citing the policies, request for reconsideration, closing.";

pub const AUDIT_SYSTEM: &str = "You are a compliance officer reviewing appeal letters.

Check the draft against four criteria:
1. TONE: professional, respectful, non-accusatory
2. CITATIONS: cites only the policy excerpts provided
3. ADDRESSES_DENIAL: responds directly to the denial reason
4. LENGTH: between 200 and 500 words

Reply with JSON only:
{
  \"tone_compliant\": true/false,
  \"citations_valid\": true/false,
  \"addresses_denial\": true/false,
  \"length_appropriate\": true/false,
  \"issues\": [\"each specific problem, or an empty list\"]
}";

pub fn classify_prompt(claim: &ClaimInput) -> String {
    format!(
        "Denial Code: {}\nDenial Description: {}\nPayer: {}\n\nCategory:",
        claim.denial_code_or_empty(),
        claim.denial_description_or_empty(),
        claim.payer_name_or_empty(),
    )
}

/// Number, title, quote and score each excerpt, or the placeholder.
pub fn format_excerpts(excerpts: &[PolicyExcerpt]) -> String {
    if excerpts.is_empty() {
        return NO_EXCERPTS_PLACEHOLDER.to_string();
    }

    excerpts
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "{}. {}\n   \"{}\"\n   (Relevance: {:.2})",
                i + 1,
                e.section_title,
                e.section_text,
                e.similarity_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn draft_prompt(
    claim: &ClaimInput,
    category: DenialCategory,
    excerpts: &[PolicyExcerpt],
) -> String {
    let mut prompt = format!(
        "Draft an appeal letter for this denied claim:\n\n\
         Claim ID: {}\n\
         Payer: {}\n\
         Denial Code: {}\n\
         Denial Reason: {}\n\
         Classification Category: {}\n\n\
         Relevant Policy Excerpts:\n{}\n",
        claim.claim_id_or_empty(),
        claim.payer_name_or_empty(),
        claim.denial_code_or_empty(),
        claim.denial_description_or_empty(),
        category,
        format_excerpts(excerpts),
    );

    if let Some(policy_text) = claim.field("policy_text") {
        prompt.push_str("\nAdditional policy context supplied with the claim:\n");
        prompt.push_str(policy_text);
        prompt.push('\n');
    }

    prompt.push_str("\nDraft the appeal letter:");
    prompt
}

pub fn audit_prompt(draft: &str, excerpts: &[PolicyExcerpt], denial_description: &str) -> String {
    let titles = if excerpts.is_empty() {
        "None provided".to_string()
    } else {
        excerpts
            .iter()
            .map(|e| format!("- {}", e.section_title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Review this appeal draft:\n\nDRAFT:\n{draft}\n\n\
         PROVIDED POLICY EXCERPTS:\n{titles}\n\n\
         DENIAL REASON:\n{denial_description}\n\n\
         Compliance evaluation (JSON only):"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(title: &str, text: &str, score: f32) -> PolicyExcerpt {
        PolicyExcerpt {
            id: format!("id-{title}"),
            section_title: title.to_string(),
            section_text: text.to_string(),
            payer_name: "Acme".to_string(),
            similarity_score: score,
        }
    }

    #[test]
    fn test_format_excerpts() {
        let formatted = format_excerpts(&[
            excerpt("Prior Authorization", "PA required for MRI", 0.912),
            excerpt("Imaging", "Imaging is covered", 0.5),
        ]);
        assert_eq!(
            formatted,
            "1. Prior Authorization\n   \"PA required for MRI\"\n   (Relevance: 0.91)\n\n\
             2. Imaging\n   \"Imaging is covered\"\n   (Relevance: 0.50)"
        );
    }

    #[test]
    fn test_format_excerpts_placeholder() {
        assert_eq!(format_excerpts(&[]), NO_EXCERPTS_PLACEHOLDER);
    }

    #[test]
    fn test_draft_prompt_includes_policy_text() {
        let claim = ClaimInput::new("C-1", "CO-197", "No prior auth", "Acme")
            .with_policy_text("Plan section 4.2 allows retro auth");
        let prompt = draft_prompt(&claim, DenialCategory::Authorization, &[]);

        assert!(prompt.contains("Claim ID: C-1"));
        assert!(prompt.contains("Classification Category: Authorization"));
        assert!(prompt.contains(NO_EXCERPTS_PLACEHOLDER));
        assert!(prompt.contains("Plan section 4.2 allows retro auth"));
    }

    #[test]
    fn test_audit_prompt_lists_titles() {
        let prompt = audit_prompt("Dear committee", &[excerpt("Coverage", "x", 0.1)], "denied");
        assert!(prompt.contains("- Coverage"));
        assert!(audit_prompt("d", &[], "denied").contains("None provided"));
    }
}
