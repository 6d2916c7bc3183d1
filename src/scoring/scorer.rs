//! Core location scoring pipeline.
//!
//! Walks the static POI model in declaration order, fetches and cleans
//! each named type, and folds the counts into per-category accumulators
//! before the qualitative pass and final grading.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::amap::models::{Coordinates, Poi};
use crate::amap::PoiProvider;
use crate::scoring::grade::{classify, Grade};
use crate::scoring::profile::{
    Category, PoiTypeConfig, SCHOOL_STRICT_RADIUS_M, SCHOOL_TYPE_NAME,
};
use crate::scoring::qualitative::{self, DiningProfile};

/// Running score and raw count for one logical category. Reset at the
/// start of each address evaluation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryTally {
    /// Signed contribution total; negative categories accumulate below zero.
    pub score: f64,
    pub count: u32,
}

/// Per-category accumulators for a single evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTotals {
    pub core_demographic: CategoryTally,
    pub synergy: CategoryTally,
    pub infrastructure: CategoryTally,
    pub direct_competition: CategoryTally,
    pub policy_risk: CategoryTally,
    pub risk_demographic: CategoryTally,
}

impl CategoryTotals {
    fn tally_mut(&mut self, category: Category) -> &mut CategoryTally {
        match category {
            Category::CoreDemographic => &mut self.core_demographic,
            Category::Synergy => &mut self.synergy,
            Category::Infrastructure => &mut self.infrastructure,
            Category::DirectCompetition => &mut self.direct_competition,
            Category::PolicyRisk => &mut self.policy_risk,
            Category::RiskDemographic => &mut self.risk_demographic,
        }
    }

    /// Sum of the three positive-polarity category scores.
    pub fn quantitative_score(&self) -> f64 {
        self.core_demographic.score + self.synergy.score + self.infrastructure.score
    }

    /// Magnitude of the three negative-polarity category scores.
    pub fn negative_score(&self) -> f64 {
        -(self.direct_competition.score + self.policy_risk.score + self.risk_demographic.score)
    }

    pub fn base_score(&self) -> f64 {
        self.quantitative_score() - self.negative_score()
    }
}

/// Cleaned count of one named type, in model declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub name: &'static str,
    pub count: u32,
}

/// Outcome of one full address evaluation. Immutable once built;
/// persisted as one summary CSV row.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub address: String,
    pub radius_m: u32,
    pub coordinates: Coordinates,
    pub categories: CategoryTotals,
    pub type_counts: Vec<TypeCount>,
    pub dining: DiningProfile,
    pub rating_bonus: f64,
    pub cost_bonus: f64,
    pub base_score: f64,
    pub total_score: f64,
    pub grade: Grade,
    pub recommendation: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Saturation-adjusted effective count: `S * (1 - e^(-count/S))`.
/// Strictly increasing in `count` and bounded above by `S`; uncapped
/// types count linearly.
pub fn effective_count(count: u32, saturation: Option<f64>) -> f64 {
    let n = f64::from(count);
    match saturation {
        Some(s) => s * (1.0 - (-n / s).exp()),
        None => n,
    }
}

/// Keep only POIs sharing at least one type code with the expected set.
/// Keyword-driven queries pass `None` and are returned untouched; so is
/// an empty expected set.
pub fn clean_by_typecode(pois: Vec<Poi>, expected_types: Option<&str>) -> Vec<Poi> {
    let Some(expected_types) = expected_types else {
        return pois;
    };
    if expected_types.trim().is_empty() {
        return pois;
    }

    let expected: HashSet<&str> = expected_types.split('|').collect();
    pois.into_iter()
        .filter(|poi| poi.typecode.split(';').any(|code| expected.contains(code)))
        .collect()
}

fn apply_type(totals: &mut CategoryTotals, config: &PoiTypeConfig, count: u32) {
    let tally = totals.tally_mut(config.category);
    if count > 0 {
        if config.category.is_positive() {
            let effective = effective_count(count, config.saturation);
            let impact = effective * config.weight;
            debug!(name = config.name, count, effective, impact, "Positive contribution");
            tally.score += impact;
        } else {
            let impact = f64::from(count) * config.weight;
            debug!(name = config.name, count, impact, "Negative contribution");
            tally.score -= impact;
        }
    }
    tally.count += count;
}

/// Evaluate one address end to end. Returns `Ok(None)` when geocoding
/// produced no usable coordinates; the caller logs and skips the address.
pub async fn evaluate_location(
    provider: &dyn PoiProvider,
    profile: &[PoiTypeConfig],
    address: &str,
    radius_m: u32,
) -> Result<Option<EvaluationResult>> {
    let Some(coordinates) = provider.geocode(address).await? else {
        return Ok(None);
    };

    let mut categories = CategoryTotals::default();
    let mut type_counts = Vec::with_capacity(profile.len());

    for (index, config) in profile.iter().enumerate() {
        info!(
            step = index + 1,
            total = profile.len(),
            name = config.name,
            label = config.label,
            "Querying named type"
        );

        let filter = config.spec.filter();
        let mut raw = provider
            .search_around(coordinates, radius_m, &filter, config.label)
            .await?;

        // Schools only count inside the strict regulatory radius,
        // whatever the outer search radius was.
        if config.name == SCHOOL_TYPE_NAME {
            raw.retain(|poi| poi.distance_m() <= SCHOOL_STRICT_RADIUS_M);
        }

        let raw_count = raw.len();
        let cleaned = clean_by_typecode(raw, config.spec.expected_types());
        if cleaned.len() != raw_count {
            debug!(
                name = config.name,
                raw = raw_count,
                cleaned = cleaned.len(),
                "Type-code cleaning dropped off-target results"
            );
        }

        let count = cleaned.len() as u32;
        apply_type(&mut categories, config, count);
        type_counts.push(TypeCount {
            name: config.name,
            count,
        });
    }

    let base_score = categories.base_score();

    let dining = qualitative::dining_profile(provider, coordinates, radius_m).await?;
    let rating_bonus = qualitative::rating_bonus(dining.avg_rating);
    let cost_bonus = qualitative::cost_bonus(dining.avg_cost);
    let total_score = base_score + rating_bonus + cost_bonus;

    let (grade, recommendation) = classify(total_score, categories.policy_risk.count);

    info!(
        address,
        base_score,
        rating_bonus,
        cost_bonus,
        total_score,
        grade = %grade,
        "Evaluation complete"
    );

    Ok(Some(EvaluationResult {
        address: address.to_string(),
        radius_m,
        coordinates,
        categories,
        type_counts,
        dining,
        rating_bonus,
        cost_bonus,
        base_score,
        total_score,
        grade,
        recommendation,
        evaluated_at: Utc::now(),
    }))
}
