//! Core domain types for the hawker cycle pipeline.
//!
//! Everything that crosses a crate boundary lives here: listing and
//! market types produced by the capability providers, the per-cycle
//! result record persisted by the report store, and the daemon / health
//! state machines the supervisor drives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One step of the fixed cycle sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    MarketAnalysis,
    ContentGeneration,
    Localization,
    AssetGeneration,
    Validation,
    Pricing,
    MultiTargetPublish,
    Promotion,
    CompetitiveIntelligence,
    MetricsFlush,
}

impl Phase {
    /// Every phase, in the order the executor runs them.
    pub const ALL: [Phase; 10] = [
        Phase::MarketAnalysis,
        Phase::ContentGeneration,
        Phase::Localization,
        Phase::AssetGeneration,
        Phase::Validation,
        Phase::Pricing,
        Phase::MultiTargetPublish,
        Phase::Promotion,
        Phase::CompetitiveIntelligence,
        Phase::MetricsFlush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::MarketAnalysis => "market_analysis",
            Phase::ContentGeneration => "content_generation",
            Phase::Localization => "localization",
            Phase::AssetGeneration => "asset_generation",
            Phase::Validation => "validation",
            Phase::Pricing => "pricing",
            Phase::MultiTargetPublish => "multi_target_publish",
            Phase::Promotion => "promotion",
            Phase::CompetitiveIntelligence => "competitive_intelligence",
            Phase::MetricsFlush => "metrics_flush",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// The format a listing is delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    NotionTemplate,
    CanvaTemplate,
    PdfGuide,
    ExcelTool,
    DigitalPlanner,
    BusinessToolkit,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::NotionTemplate => "notion_template",
            ListingKind::CanvaTemplate => "canva_template",
            ListingKind::PdfGuide => "pdf_guide",
            ListingKind::ExcelTool => "excel_tool",
            ListingKind::DigitalPlanner => "digital_planner",
            ListingKind::BusinessToolkit => "business_toolkit",
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broad catalog category, derived from the niche name when the content
/// engine does not supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    Productivity,
    Finance,
    Planning,
    Marketing,
    Education,
    Creative,
    Business,
}

impl ListingCategory {
    /// Keyword match on the niche name. Unrecognized niches fall back to
    /// `Productivity`, the catalog's largest segment.
    pub fn from_niche(niche: &str) -> Self {
        let lowered = niche.to_lowercase();
        let matches_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
        if matches_any(&["budget", "finance", "money", "investment"]) {
            ListingCategory::Finance
        } else if matches_any(&["plan", "schedule", "calendar", "organize"]) {
            ListingCategory::Planning
        } else if matches_any(&["marketing", "content", "social"]) {
            ListingCategory::Marketing
        } else if matches_any(&["educate", "course", "learn", "student"]) {
            ListingCategory::Education
        } else if matches_any(&["creative", "design", "art"]) {
            ListingCategory::Creative
        } else if matches_any(&["business", "project", "management"]) {
            ListingCategory::Business
        } else {
            ListingCategory::Productivity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCategory::Productivity => "productivity",
            ListingCategory::Finance => "finance",
            ListingCategory::Planning => "planning",
            ListingCategory::Marketing => "marketing",
            ListingCategory::Education => "education",
            ListingCategory::Creative => "creative",
            ListingCategory::Business => "business",
        }
    }
}

impl std::fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Pricing tiers
// ---------------------------------------------------------------------------

/// Price band a listing is slotted into. Band edges are USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    Low,
    Mid,
    High,
    BundleBasic,
    BundlePremium,
    BundleAllAccess,
}

impl PricingTier {
    /// Inclusive (min, max) band in USD.
    pub fn band(&self) -> (f64, f64) {
        match self {
            PricingTier::Low => (8.0, 19.0),
            PricingTier::Mid => (40.0, 80.0),
            PricingTier::High => (100.0, 250.0),
            PricingTier::BundleBasic => (49.0, 79.0),
            PricingTier::BundlePremium => (99.0, 149.0),
            PricingTier::BundleAllAccess => (199.0, 389.0),
        }
    }

    /// Midpoint of the band, used as the anchor before market adjustment.
    pub fn anchor_price(&self) -> f64 {
        let (min, max) = self.band();
        ((min + max) / 2.0).round()
    }

    /// Clamp a candidate price into this tier's band.
    pub fn clamp(&self, price: f64) -> f64 {
        let (min, max) = self.band();
        price.clamp(min, max)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingTier::Low => "low",
            PricingTier::Mid => "mid",
            PricingTier::High => "high",
            PricingTier::BundleBasic => "bundle_basic",
            PricingTier::BundlePremium => "bundle_premium",
            PricingTier::BundleAllAccess => "bundle_all_access",
        }
    }
}

impl std::fmt::Display for PricingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Market analysis
// ---------------------------------------------------------------------------

/// How crowded a niche looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompetitionLevel::Low => "low",
            CompetitionLevel::Medium => "medium",
            CompetitionLevel::High => "high",
        };
        write!(f, "{s}")
    }
}

/// A raw demand observation fed into market analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSignal {
    pub source: String,
    pub niche: String,
    /// 0.0 ..= 1.0
    pub trend_score: f64,
    pub avg_price_usd: f64,
}

impl MarketSignal {
    pub fn new(source: impl Into<String>, niche: impl Into<String>, trend_score: f64, avg_price_usd: f64) -> Self {
        Self {
            source: source.into(),
            niche: niche.into(),
            trend_score,
            avg_price_usd,
        }
    }

    /// Built-in demand rows used when no intel provider is registered.
    pub fn seed_rows() -> Vec<Self> {
        vec![
            MarketSignal::new("builtin", "AI Productivity", 0.95, 49.0),
            MarketSignal::new("builtin", "Second Brain", 0.88, 79.0),
            MarketSignal::new("builtin", "Digital Planner 2025", 0.78, 39.0),
        ]
    }
}

/// Output of the market analysis phase: the niche the rest of the cycle
/// builds for, plus the price corridor publishing stays inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAssessment {
    pub niche: String,
    /// 0.0 ..= 1.0
    pub trend_score: f64,
    pub competition: CompetitionLevel,
    pub price_floor_usd: f64,
    pub price_ceiling_usd: f64,
    pub gaps: Vec<String>,
    pub recommended_kind: ListingKind,
}

impl MarketAssessment {
    /// Assessment used when no content engine is registered. Keeps the
    /// cycle moving on a niche known to convert.
    pub fn fallback() -> Self {
        Self {
            niche: "AI Productivity System".to_string(),
            trend_score: 0.92,
            competition: CompetitionLevel::Medium,
            price_floor_usd: 29.0,
            price_ceiling_usd: 79.0,
            gaps: vec![
                "AI Integration".to_string(),
                "Beginner Friendly".to_string(),
                "Video Tutorials".to_string(),
            ],
            recommended_kind: ListingKind::NotionTemplate,
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// A generated listing spec, before localization and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSpec {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: ListingKind,
    pub category: ListingCategory,
    pub features: Vec<String>,
    pub target_audience: String,
    pub tier: PricingTier,
    pub seo_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentSpec {
    /// Minimal spec used when no content engine is registered.
    pub fn placeholder(niche: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: format!("{niche} Template"),
            description: format!(
                "Boost your productivity with AI-powered {} tools and workflows.",
                niche.to_lowercase()
            ),
            kind: ListingKind::NotionTemplate,
            category: ListingCategory::from_niche(niche),
            features: vec![
                "AI Integration".to_string(),
                "Automation".to_string(),
                "Analytics".to_string(),
            ],
            target_audience: "professionals".to_string(),
            tier: PricingTier::Mid,
            seo_keywords: vec![
                "template".to_string(),
                "AI".to_string(),
                "productivity".to_string(),
            ],
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Localization
// ---------------------------------------------------------------------------

/// One locale's rendering of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleContent {
    pub locale: String,
    pub name: String,
    pub description: String,
    pub seo_keywords: Vec<String>,
    pub price: f64,
    pub currency_symbol: String,
}

/// All locale renderings for one listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedBundle {
    pub source_id: Uuid,
    pub entries: Vec<LocaleContent>,
    pub created_at: DateTime<Utc>,
}

impl LocalizedBundle {
    /// A bundle holding only the source locale at the source price. Used
    /// when no localizer is registered.
    pub fn single_locale(spec: &ContentSpec, locale: impl Into<String>, price_usd: f64) -> Self {
        Self {
            source_id: spec.id,
            entries: vec![LocaleContent {
                locale: locale.into(),
                name: spec.name.clone(),
                description: spec.description.clone(),
                seo_keywords: spec.seo_keywords.clone(),
                price: price_usd,
                currency_symbol: "$".to_string(),
            }],
            created_at: Utc::now(),
        }
    }

    pub fn locales(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.locale.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A planned promotional asset. The plan carries the prompt that would
/// drive image generation; rendering is a publisher concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPlan {
    pub asset_kind: String,
    pub prompt: String,
    pub style: String,
}

impl AssetPlan {
    pub fn new(asset_kind: impl Into<String>, prompt: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            asset_kind: asset_kind.into(),
            prompt: prompt.into(),
            style: style.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing draft
// ---------------------------------------------------------------------------

/// The assembled listing handed to validation, publishing and promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: ListingKind,
    pub category: ListingCategory,
    pub features: Vec<String>,
    pub seo_keywords: Vec<String>,
    pub price_usd: f64,
    pub locales: Vec<String>,
}

impl ListingDraft {
    pub fn from_spec(spec: &ContentSpec, price_usd: f64, locales: Vec<String>) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            kind: spec.kind,
            category: spec.category,
            features: spec.features.clone(),
            seo_keywords: spec.seo_keywords.clone(),
            price_usd,
            locales,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Outcome of one quality check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Quality report for a listing draft. `risk_score` is 0.0 ..= 1.0.
/// A failed report is logged and recorded but does not stop the cycle
/// from publishing; operators review flagged listings after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub listing_id: Uuid,
    pub passed: bool,
    pub risk_score: f64,
    pub checks: Vec<ValidationCheck>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Passing report with zero risk. Used when no validator is
    /// registered so downstream phases are not blocked.
    pub fn pass(listing_id: Uuid) -> Self {
        Self {
            listing_id,
            passed: true,
            risk_score: 0.0,
            checks: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing and payment rails
// ---------------------------------------------------------------------------

/// One way a buyer can pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRail {
    /// Asset or currency code, e.g. "USD", "ETH", "SOL".
    pub symbol: String,
    pub network: String,
    /// Receiving address, empty for fiat rails.
    pub address: String,
    /// Payment URI when the rail defines one, e.g. `ethereum:0x...`.
    pub uri: Option<String>,
}

impl PaymentRail {
    /// The fiat rail every listing carries.
    pub fn fiat_usd() -> Self {
        Self {
            symbol: "USD".to_string(),
            network: "fiat".to_string(),
            address: String::new(),
            uri: None,
        }
    }
}

/// Output of the pricing phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingDecision {
    pub list_price_usd: f64,
    pub tier: PricingTier,
    pub rails: Vec<PaymentRail>,
}

impl PricingDecision {
    /// Flat list price on the USD rail. Used when no payment processor
    /// is registered.
    pub fn flat(list_price_usd: f64, tier: PricingTier) -> Self {
        Self {
            list_price_usd,
            tier,
            rails: vec![PaymentRail::fiat_usd()],
        }
    }
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// Result of pushing a listing to one sales target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub target: String,
    pub success: bool,
    /// Listing URL or platform id when the target returned one.
    pub reference: Option<String>,
    pub detail: Option<String>,
}

impl DeploymentRecord {
    pub fn success(target: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: true,
            reference: Some(reference.into()),
            detail: None,
        }
    }

    pub fn failure(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: false,
            reference: None,
            detail: Some(detail.into()),
        }
    }

    /// Demo deployments recorded when no publisher is registered, so a
    /// cycle always produces a non-empty deployment list.
    pub fn demo_fallback() -> Vec<Self> {
        vec![
            DeploymentRecord::success("demo_gumroad", "https://demo.gumroad.com/template1"),
            DeploymentRecord::success("demo_etsy", "https://demo.etsy.com/listing/123"),
        ]
    }
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

/// Marketing channel a campaign runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Tiktok,
    Youtube,
    Telegram,
    Discord,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Tiktok => "tiktok",
            Channel::Youtube => "youtube",
            Channel::Telegram => "telegram",
            Channel::Discord => "discord",
            Channel::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tiktok" => Some(Channel::Tiktok),
            "youtube" => Some(Channel::Youtube),
            "telegram" => Some(Channel::Telegram),
            "discord" => Some(Channel::Discord),
            "email" => Some(Channel::Email),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a campaign ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Copy rendered, channel has no live credential.
    Prepared,
    /// Delivered to the channel.
    Sent,
    Failed,
}

/// Result of one channel's launch for one listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignOutcome {
    pub channel: Channel,
    pub status: CampaignStatus,
    pub detail: String,
}

// ---------------------------------------------------------------------------
// Competitive intelligence
// ---------------------------------------------------------------------------

/// Reference price points for a niche.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceBenchmark {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Default for PriceBenchmark {
    fn default() -> Self {
        Self {
            low: 29.0,
            mid: 49.0,
            high: 99.0,
        }
    }
}

/// Output of the competitive intelligence phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelReport {
    pub niche: String,
    pub competitor_count: u32,
    /// Up to three named competitors with their catalog size and price.
    pub top_players: Vec<String>,
    pub price_benchmark: PriceBenchmark,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl IntelReport {
    /// Single-line report produced when no intel provider is registered.
    pub fn analyzed_only(niche: impl Into<String>) -> Self {
        Self {
            niche: niche.into(),
            competitor_count: 0,
            top_players: Vec::new(),
            price_benchmark: PriceBenchmark::default(),
            opportunities: Vec::new(),
            threats: Vec::new(),
            recommendations: vec!["analyzed".to_string()],
            analyzed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

/// Error surfaced by a phase. Collected, never propagated out of a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleError {
    pub phase: Phase,
    pub message: String,
}

/// Outcome of one phase inside a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub success: bool,
    /// True when the phase ran its built-in default because the backing
    /// capability was absent.
    pub degraded: bool,
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// Everything one cycle produced. This is the record the report store
/// persists and the per-cycle summary the supervisor logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phases: Vec<PhaseOutcome>,
    pub errors: Vec<CycleError>,
    pub niche: String,
    pub listing_name: String,
    pub list_price_usd: f64,
    pub locales_produced: Vec<String>,
    pub deployments: Vec<DeploymentRecord>,
    pub campaigns: Vec<CampaignOutcome>,
}

impl CycleResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// A cycle failed when it accumulated more errors than the
    /// configured threshold allows.
    pub fn is_failure(&self, error_threshold: usize) -> bool {
        self.errors.len() > error_threshold
    }

    pub fn deployments_succeeded(&self) -> usize {
        self.deployments.iter().filter(|d| d.success).count()
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Aggregate health classification, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Point-in-time health sample combining resource gauges with the
/// monitor's cumulative counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub network_ok: bool,
    pub cycles_completed: u64,
    pub errors_encountered: u64,
    pub status: HealthStatus,
    pub recent_events: Vec<String>,
}

// ---------------------------------------------------------------------------
// Daemon state machine
// ---------------------------------------------------------------------------

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Idle,
    Running,
    Sleeping,
    Retrying,
    Stopping,
    Stopped,
}

impl DaemonState {
    /// Legal state transitions. Anything not listed is a supervisor bug.
    pub fn can_transition_to(&self, next: DaemonState) -> bool {
        matches!(
            (self, next),
            (DaemonState::Idle, DaemonState::Running)
                | (DaemonState::Idle, DaemonState::Stopping)
                | (DaemonState::Running, DaemonState::Sleeping)
                | (DaemonState::Running, DaemonState::Retrying)
                | (DaemonState::Running, DaemonState::Stopping)
                | (DaemonState::Sleeping, DaemonState::Running)
                | (DaemonState::Sleeping, DaemonState::Stopping)
                | (DaemonState::Retrying, DaemonState::Running)
                | (DaemonState::Retrying, DaemonState::Sleeping)
                | (DaemonState::Retrying, DaemonState::Stopping)
                | (DaemonState::Stopping, DaemonState::Stopped)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DaemonState::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonState::Idle => "idle",
            DaemonState::Running => "running",
            DaemonState::Sleeping => "sleeping",
            DaemonState::Retrying => "retrying",
            DaemonState::Stopping => "stopping",
            DaemonState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Daily stats
// ---------------------------------------------------------------------------

/// Per-day counters the supervisor keeps and resets at local midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub cycles_run: u64,
    pub cycles_failed: u64,
    pub deployments_succeeded: u64,
    pub campaigns_prepared: u64,
    pub errors: u64,
}

impl DailyStats {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            cycles_run: 0,
            cycles_failed: 0,
            deployments_succeeded: 0,
            campaigns_prepared: 0,
            errors: 0,
        }
    }

    /// Reset counters when the calendar day has rolled over.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.date != today {
            *self = DailyStats::for_date(today);
        }
    }

    /// Fold one cycle's result into the day's counters.
    pub fn observe(&mut self, result: &CycleResult, error_threshold: usize) {
        self.cycles_run += 1;
        if result.is_failure(error_threshold) {
            self.cycles_failed += 1;
        }
        self.deployments_succeeded += result.deployments_succeeded() as u64;
        self.campaigns_prepared += result.campaigns.len() as u64;
        self.errors += result.errors.len() as u64;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(errors: usize) -> CycleResult {
        let now = Utc::now();
        CycleResult {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            phases: Vec::new(),
            errors: (0..errors)
                .map(|i| CycleError {
                    phase: Phase::MarketAnalysis,
                    message: format!("error {i}"),
                })
                .collect(),
            niche: "Test Niche".to_string(),
            listing_name: "Test Listing".to_string(),
            list_price_usd: 49.0,
            locales_produced: vec!["en".to_string()],
            deployments: DeploymentRecord::demo_fallback(),
            campaigns: Vec::new(),
        }
    }

    #[test]
    fn phase_order_is_fixed() {
        assert_eq!(Phase::ALL.len(), 10);
        assert_eq!(Phase::ALL[0], Phase::MarketAnalysis);
        assert_eq!(Phase::ALL[4], Phase::Validation);
        assert_eq!(Phase::ALL[9], Phase::MetricsFlush);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::MultiTargetPublish).unwrap();
        assert_eq!(json, "\"multi_target_publish\"");
    }

    #[test]
    fn category_from_niche_keywords() {
        assert_eq!(ListingCategory::from_niche("Finance Tracker"), ListingCategory::Finance);
        assert_eq!(ListingCategory::from_niche("Digital Planner 2025"), ListingCategory::Planning);
        assert_eq!(ListingCategory::from_niche("Social Media Kit"), ListingCategory::Marketing);
        assert_eq!(ListingCategory::from_niche("Student Dashboard"), ListingCategory::Education);
        assert_eq!(ListingCategory::from_niche("Creator Economy Tools"), ListingCategory::Productivity);
        assert_eq!(ListingCategory::from_niche("AI Productivity System"), ListingCategory::Productivity);
    }

    #[test]
    fn tier_bands_and_anchor() {
        assert_eq!(PricingTier::Low.band(), (8.0, 19.0));
        assert_eq!(PricingTier::BundleAllAccess.band(), (199.0, 389.0));
        assert_eq!(PricingTier::Mid.anchor_price(), 60.0);
        assert_eq!(PricingTier::Mid.clamp(500.0), 80.0);
        assert_eq!(PricingTier::Mid.clamp(1.0), 40.0);
    }

    #[test]
    fn fallback_assessment_matches_known_niche() {
        let a = MarketAssessment::fallback();
        assert_eq!(a.niche, "AI Productivity System");
        assert_eq!(a.competition, CompetitionLevel::Medium);
        assert_eq!(a.price_floor_usd, 29.0);
        assert_eq!(a.price_ceiling_usd, 79.0);
    }

    #[test]
    fn placeholder_spec_carries_defaults() {
        let spec = ContentSpec::placeholder("Second Brain");
        assert_eq!(spec.name, "Second Brain Template");
        assert_eq!(spec.features.len(), 3);
        assert!(spec.seo_keywords.contains(&"template".to_string()));
    }

    #[test]
    fn single_locale_bundle_keeps_source_price() {
        let spec = ContentSpec::placeholder("AI Productivity");
        let bundle = LocalizedBundle::single_locale(&spec, "en", 49.0);
        assert_eq!(bundle.locales(), vec!["en"]);
        assert_eq!(bundle.entries[0].price, 49.0);
        assert_eq!(bundle.entries[0].currency_symbol, "$");
    }

    #[test]
    fn demo_deployments_are_successful() {
        let demo = DeploymentRecord::demo_fallback();
        assert_eq!(demo.len(), 2);
        assert!(demo.iter().all(|d| d.success));
        assert!(demo[0].target.starts_with("demo_"));
    }

    #[test]
    fn channel_parse_round_trip() {
        for ch in [Channel::Tiktok, Channel::Youtube, Channel::Telegram, Channel::Discord, Channel::Email] {
            assert_eq!(Channel::parse(ch.as_str()), Some(ch));
        }
        assert_eq!(Channel::parse("carrier_pigeon"), None);
    }

    #[test]
    fn cycle_failure_requires_exceeding_threshold() {
        assert!(!sample_result(3).is_failure(3));
        assert!(sample_result(4).is_failure(3));
    }

    #[test]
    fn health_status_orders_by_severity() {
        assert!(HealthStatus::Healthy < HealthStatus::Warning);
        assert!(HealthStatus::Warning < HealthStatus::Critical);
    }

    #[test]
    fn daemon_state_transitions() {
        assert!(DaemonState::Idle.can_transition_to(DaemonState::Running));
        assert!(DaemonState::Running.can_transition_to(DaemonState::Sleeping));
        assert!(DaemonState::Running.can_transition_to(DaemonState::Retrying));
        assert!(DaemonState::Retrying.can_transition_to(DaemonState::Running));
        assert!(DaemonState::Sleeping.can_transition_to(DaemonState::Stopping));
        assert!(DaemonState::Stopping.can_transition_to(DaemonState::Stopped));

        assert!(!DaemonState::Idle.can_transition_to(DaemonState::Sleeping));
        assert!(!DaemonState::Stopped.can_transition_to(DaemonState::Running));
        assert!(!DaemonState::Sleeping.can_transition_to(DaemonState::Retrying));
        assert!(DaemonState::Stopped.is_terminal());
    }

    #[test]
    fn daily_stats_roll_over_resets_counters() {
        let day_one = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut stats = DailyStats::for_date(day_one);
        stats.observe(&sample_result(0), 3);
        assert_eq!(stats.cycles_run, 1);
        assert_eq!(stats.deployments_succeeded, 2);

        stats.roll_over(day_one);
        assert_eq!(stats.cycles_run, 1);

        let day_two = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        stats.roll_over(day_two);
        assert_eq!(stats.cycles_run, 0);
        assert_eq!(stats.date, day_two);
    }
}
