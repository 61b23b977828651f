//! Listing quality checks.
//!
//! Five checks run in a fixed order: duplicate fingerprint, trademark
//! terms, platform policy, AI-sounding copy, and SEO readiness. The SEO
//! check contributes issues but never risk. A report that fails here is
//! recorded and warned about upstream; it does not stop the cycle.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use hk_core::types::{ListingDraft, ValidationCheck, ValidationReport};

use crate::traits::{CapabilityError, Validator};

// ---------------------------------------------------------------------------
// Term tables
// ---------------------------------------------------------------------------

/// Brand and franchise names a listing must not mention.
const FORBIDDEN_TERMS: [&str; 23] = [
    "adobe",
    "microsoft",
    "google",
    "apple",
    "amazon",
    "etsy",
    "gumroad",
    "canva",
    "figma",
    "notion",
    "disney",
    "marvel",
    "harry potter",
    "star wars",
    "nike",
    "adidas",
    "gucci",
    "prada",
    "cocacola",
    "facebook",
    "instagram",
    "twitter",
    "linkedin",
];

/// Phrases that give away machine-written copy. Each hit adds 0.1 to
/// the AI score; the check fails at 0.30.
const AI_INDICATORS: [&str; 5] = [
    "as an ai",
    "i cannot",
    "as a language model",
    "please note that",
    "it is important to note",
];

/// Content Lemon Squeezy refuses to host.
const PROHIBITED_CONTENT: [&str; 5] = ["nft", "crypto", "gambling", "adult", "weapon"];

const AI_SCORE_CEILING: f64 = 0.30;

// ---------------------------------------------------------------------------
// ListingValidator
// ---------------------------------------------------------------------------

/// Stateful validator. Remembers a fingerprint of every draft it has
/// seen so re-submissions of near-identical content are flagged.
pub struct ListingValidator {
    seen: Mutex<HashSet<u64>>,
}

impl ListingValidator {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Case- and whitespace-insensitive hash of name plus description.
    fn content_fingerprint(draft: &ListingDraft) -> u64 {
        let normalized = format!("{} {}", draft.name, draft.description)
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        hasher.finish()
    }

    fn duplicate_check(&self, draft: &ListingDraft) -> ValidationCheck {
        let fingerprint = Self::content_fingerprint(draft);
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let duplicate = !seen.insert(fingerprint);
        ValidationCheck {
            name: "duplicate".to_string(),
            passed: !duplicate,
            detail: if duplicate {
                "content fingerprint already seen".to_string()
            } else {
                "content is unique".to_string()
            },
        }
    }

    fn trademark_check(draft: &ListingDraft) -> (ValidationCheck, Vec<String>) {
        let text = format!("{} {}", draft.name, draft.description).to_lowercase();
        let issues: Vec<String> = FORBIDDEN_TERMS
            .iter()
            .filter(|term| text.contains(*term))
            .map(|term| format!("trademark keyword found: {term}"))
            .collect();
        let check = ValidationCheck {
            name: "trademark".to_string(),
            passed: issues.is_empty(),
            detail: format!("{} trademark terms matched", issues.len()),
        };
        (check, issues)
    }

    /// Platform rules from every target the listing may reach, each
    /// issue prefixed with the platform it came from.
    fn policy_check(draft: &ListingDraft) -> (ValidationCheck, Vec<String>) {
        let mut issues = Vec::new();

        if draft.description.len() < 50 {
            issues.push("gumroad: description too short (min 50 chars)".to_string());
        }
        if draft.price_usd < 0.0 {
            issues.push("gumroad: negative price".to_string());
        }

        if draft.description.len() < 150 {
            issues.push("etsy: description too short (min 150 chars)".to_string());
        }
        if draft.seo_keywords.len() > 13 {
            issues.push("etsy: more than 13 tags".to_string());
        }

        let text = format!("{} {}", draft.name, draft.description).to_lowercase();
        for term in PROHIBITED_CONTENT {
            if text.contains(term) {
                issues.push(format!("lemonsqueezy: prohibited content ({term})"));
            }
        }

        let check = ValidationCheck {
            name: "policy".to_string(),
            passed: issues.is_empty(),
            detail: format!("{} policy violations", issues.len()),
        };
        (check, issues)
    }

    fn ai_content_check(draft: &ListingDraft) -> (ValidationCheck, f64) {
        let text = format!("{} {}", draft.name, draft.description).to_lowercase();
        let hits = AI_INDICATORS.iter().filter(|p| text.contains(*p)).count();
        let score = hits as f64 * 0.1;
        let check = ValidationCheck {
            name: "ai_content".to_string(),
            passed: score < AI_SCORE_CEILING,
            detail: format!("ai indicator score {score:.2}"),
        };
        (check, score)
    }

    fn seo_check(draft: &ListingDraft) -> (ValidationCheck, Vec<String>) {
        let mut issues = Vec::new();

        if draft.name.len() < 10 {
            issues.push("title too short".to_string());
        }
        if draft.description.len() < 50 {
            issues.push("description too short for search".to_string());
        }
        if draft.seo_keywords.len() < 3 {
            issues.push("fewer than 3 seo keywords".to_string());
        }

        let title_words: Vec<String> = draft
            .name
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        if !title_words.is_empty() {
            let description = draft.description.to_lowercase();
            let matches = title_words.iter().filter(|w| description.contains(*w)).count();
            if (matches as f64 / title_words.len() as f64) < 0.3 {
                issues.push("title keywords missing from description".to_string());
            }
        }

        let check = ValidationCheck {
            name: "seo".to_string(),
            passed: issues.is_empty(),
            detail: format!("{} seo issues", issues.len()),
        };
        (check, issues)
    }
}

impl Default for ListingValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for ListingValidator {
    async fn validate(&self, draft: &ListingDraft) -> Result<ValidationReport, CapabilityError> {
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        let duplicate = self.duplicate_check(draft);
        if !duplicate.passed {
            issues.push("similar listing already exists".to_string());
            recommendations.push("differentiate the listing further".to_string());
        }

        let (trademark, trademark_issues) = Self::trademark_check(draft);
        let trademark_hits = trademark_issues.len();
        issues.extend(trademark_issues);

        let (policy, policy_issues) = Self::policy_check(draft);
        issues.extend(policy_issues);

        let (ai_content, ai_score) = Self::ai_content_check(draft);
        if !ai_content.passed {
            issues.push(format!("copy reads machine-written (score {ai_score:.2})"));
            recommendations.push("rewrite in more natural language".to_string());
        }

        let (seo, seo_issues) = Self::seo_check(draft);
        issues.extend(seo_issues);

        // SEO problems are advisory and carry no risk weight.
        let risk_score = f64::min(
            1.0,
            (if duplicate.passed { 0.0 } else { 0.3 })
                + 0.2 * trademark_hits as f64 / 5.0
                + (if policy.passed { 0.0 } else { 0.3 })
                + (if ai_content.passed { 0.0 } else { 0.2 }),
        );

        let checks = vec![duplicate, trademark, policy, ai_content, seo];
        let passed = checks.iter().all(|c| c.passed);

        info!(
            listing = %draft.name,
            passed,
            risk = risk_score,
            issues = issues.len(),
            "validation complete"
        );

        Ok(ValidationReport {
            listing_id: draft.id,
            passed,
            risk_score,
            checks,
            issues,
            recommendations,
            created_at: chrono::Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hk_core::types::{ListingCategory, ListingKind};
    use uuid::Uuid;

    fn draft(name: &str, description: &str, keywords: &[&str]) -> ListingDraft {
        ListingDraft {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            kind: ListingKind::NotionTemplate,
            category: ListingCategory::Productivity,
            features: vec!["Feature".to_string()],
            seo_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            price_usd: 49.0,
            locales: vec!["en".to_string()],
        }
    }

    fn clean_draft() -> ListingDraft {
        draft(
            "Ultimate Workflow Dashboard",
            "The ultimate workflow dashboard for busy professionals. Track every \
             project, habit and goal in one place with automated reviews, weekly \
             planning views and a complete resource library built for daily use.",
            &["workflow", "dashboard", "productivity"],
        )
    }

    #[tokio::test]
    async fn clean_draft_passes_all_checks() {
        let validator = ListingValidator::new();
        let report = validator.validate(&clean_draft()).await.unwrap();
        assert!(report.passed);
        assert_eq!(report.risk_score, 0.0);
        assert!(report.issues.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.checks.len(), 5);
    }

    #[tokio::test]
    async fn trademark_term_is_flagged() {
        let validator = ListingValidator::new();
        let mut d = clean_draft();
        d.name = "Notion Workflow Dashboard".to_string();
        d.description = format!("{} Works with your notion setup.", d.description);
        let report = validator.validate(&d).await.unwrap();
        assert!(!report.passed);
        assert!(report
            .issues
            .iter()
            .any(|i| i == "trademark keyword found: notion"));
        assert!((report.risk_score - 0.04).abs() < 1e-9);
    }

    #[tokio::test]
    async fn short_description_fails_both_platform_rules() {
        let validator = ListingValidator::new();
        let d = draft("Daily Planner Pack", "Too short.", &["planner", "daily", "pack"]);
        let report = validator.validate(&d).await.unwrap();
        assert!(!report.passed);
        assert!(report.issues.iter().any(|i| i.starts_with("gumroad:")));
        assert!(report.issues.iter().any(|i| i.starts_with("etsy:")));
        assert!((report.risk_score - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn three_ai_indicators_fail_the_ai_check() {
        let validator = ListingValidator::new();
        let mut d = clean_draft();
        d.description = format!(
            "{} As an AI I cannot verify this. Please note that results vary.",
            d.description
        );
        let report = validator.validate(&d).await.unwrap();
        assert!(!report.passed);
        assert!((report.risk_score - 0.2).abs() < 1e-9);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r == "rewrite in more natural language"));
    }

    #[tokio::test]
    async fn two_ai_indicators_stay_under_ceiling() {
        let validator = ListingValidator::new();
        let mut d = clean_draft();
        d.description = format!("{} As an AI I cannot verify this.", d.description);
        let report = validator.validate(&d).await.unwrap();
        let ai = report.checks.iter().find(|c| c.name == "ai_content").unwrap();
        assert!(ai.passed);
    }

    #[tokio::test]
    async fn seo_issues_carry_no_risk() {
        let validator = ListingValidator::new();
        let mut d = clean_draft();
        // Below the 10-char title floor but present in the description.
        d.name = "Workflow".to_string();
        let report = validator.validate(&d).await.unwrap();
        assert!(!report.passed);
        assert_eq!(report.risk_score, 0.0);
        assert!(report.issues.iter().any(|i| i == "title too short"));
    }

    #[tokio::test]
    async fn second_submission_is_a_duplicate() {
        let validator = ListingValidator::new();
        let d = clean_draft();
        let first = validator.validate(&d).await.unwrap();
        assert!(first.passed);

        let second = validator.validate(&d).await.unwrap();
        assert!(!second.passed);
        assert!((second.risk_score - 0.3).abs() < 1e-9);
        assert!(second
            .recommendations
            .iter()
            .any(|r| r == "differentiate the listing further"));
    }

    #[tokio::test]
    async fn fingerprint_ignores_case_and_spacing() {
        let validator = ListingValidator::new();
        let d = clean_draft();
        validator.validate(&d).await.unwrap();

        let mut restyled = clean_draft();
        restyled.name = "ULTIMATE   workflow Dashboard".to_string();
        let report = validator.validate(&restyled).await.unwrap();
        let dup = report.checks.iter().find(|c| c.name == "duplicate").unwrap();
        assert!(!dup.passed);
    }

    #[tokio::test]
    async fn risk_caps_at_one() {
        let validator = ListingValidator::new();
        let d = draft(
            "notion canva figma adobe google apple",
            "As an AI I cannot verify. Please note that.",
            &["a", "b", "c"],
        );
        validator.validate(&d).await.unwrap();
        let second = validator.validate(&d).await.unwrap();
        assert!((second.risk_score - 1.0).abs() < 1e-9);
    }
}
