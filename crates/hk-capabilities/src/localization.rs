//! Table-driven localization.
//!
//! Renders a listing into each configured locale without calling a
//! translation service: copy passes through unchanged, search keywords
//! gain the locale's own terms, and the price is scaled by a per-market
//! purchasing power factor.

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use hk_core::types::{ContentSpec, LocaleContent, LocalizedBundle};

use crate::traits::{CapabilityError, Localizer};

// ---------------------------------------------------------------------------
// Locale table
// ---------------------------------------------------------------------------

struct LocaleRow {
    code: &'static str,
    currency_symbol: &'static str,
    price_factor: f64,
    seo_terms: [&'static str; 3],
}

const LOCALES: [LocaleRow; 5] = [
    LocaleRow {
        code: "en",
        currency_symbol: "$",
        price_factor: 1.0,
        seo_terms: ["template", "download", "digital"],
    },
    LocaleRow {
        code: "es",
        currency_symbol: "\u{20ac}",
        price_factor: 0.85,
        seo_terms: ["plantilla", "descargar", "digital"],
    },
    LocaleRow {
        code: "pt",
        currency_symbol: "R$",
        price_factor: 0.80,
        seo_terms: ["modelo", "baixar", "digital"],
    },
    LocaleRow {
        code: "ja",
        currency_symbol: "\u{a5}",
        price_factor: 0.90,
        seo_terms: ["テンプレート", "ダウンロード", "デジタル"],
    },
    LocaleRow {
        code: "de",
        currency_symbol: "\u{20ac}",
        price_factor: 1.0,
        seo_terms: ["vorlage", "herunterladen", "digital"],
    },
];

fn locale_row(code: &str) -> Option<&'static LocaleRow> {
    LOCALES.iter().find(|l| l.code == code)
}

// ---------------------------------------------------------------------------
// TableLocalizer
// ---------------------------------------------------------------------------

/// Localizer backed by the built-in locale table.
pub struct TableLocalizer {
    locales: Vec<String>,
}

impl TableLocalizer {
    /// Keep the configured locales the table knows, preserving order and
    /// dropping duplicates. Unknown codes are skipped with a warning.
    pub fn new(locales: &[String]) -> Self {
        let mut kept: Vec<String> = Vec::new();
        for code in locales {
            if locale_row(code).is_none() {
                warn!(locale = %code, "unsupported locale, skipping");
                continue;
            }
            if !kept.contains(code) {
                kept.push(code.clone());
            }
        }
        Self { locales: kept }
    }

    /// Locale codes the table supports.
    pub fn supported() -> Vec<&'static str> {
        LOCALES.iter().map(|l| l.code).collect()
    }

    pub fn locale_count(&self) -> usize {
        self.locales.len()
    }
}

#[async_trait]
impl Localizer for TableLocalizer {
    async fn localize(
        &self,
        spec: &ContentSpec,
        base_price_usd: f64,
    ) -> Result<LocalizedBundle, CapabilityError> {
        let entries = self
            .locales
            .iter()
            .filter_map(|code| {
                let row = locale_row(code)?;
                Some(LocaleContent {
                    locale: code.clone(),
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    seo_keywords: expand_keywords(&spec.seo_keywords, row),
                    price: round2(base_price_usd * row.price_factor),
                    currency_symbol: row.currency_symbol.to_string(),
                })
            })
            .collect();

        Ok(LocalizedBundle {
            source_id: spec.id,
            entries,
            created_at: Utc::now(),
        })
    }
}

/// Source keywords followed by the locale's own search terms, deduped.
fn expand_keywords(base: &[String], row: &LocaleRow) -> Vec<String> {
    let mut keywords: Vec<String> = base.to_vec();
    for term in row.seo_terms {
        if !keywords.iter().any(|k| k == term) {
            keywords.push(term.to_string());
        }
    }
    keywords
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
