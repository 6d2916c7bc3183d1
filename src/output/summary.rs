//! Running summary CSV.
//!
//! One dated file per day in append mode, header only when the file is
//! new. Each completed evaluation appends immediately, so a crash
//! mid-batch loses at most the in-flight address.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::output::csv_field;
use crate::scoring::profile::PoiTypeConfig;
use crate::scoring::scorer::EvaluationResult;

pub struct SummaryWriter {
    path: PathBuf,
    columns: Vec<String>,
}

impl SummaryWriter {
    pub fn new(path: PathBuf, profile: &[PoiTypeConfig]) -> Self {
        let mut columns: Vec<String> = [
            "evaluated_at",
            "address",
            "radius_m",
            "total_score",
            "grade",
            "core_demographic_score",
            "synergy_score",
            "infrastructure_score",
            "competition_score",
            "risk_score",
            "recommendation",
            "longitude",
            "latitude",
            "competitor_count",
            "school_count",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
        columns.extend(profile.iter().map(|t| format!("{}_count", t.name)));

        Self { path, columns }
    }

    /// Summary file for today, named `<prefix>_<YYYYMMDD>.csv`.
    pub fn dated(prefix: &str, profile: &[PoiTypeConfig]) -> Self {
        let path = PathBuf::from(format!("{prefix}_{}.csv", Utc::now().format("%Y%m%d")));
        Self::new(path, profile)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one evaluation row, creating the file and header on first use.
    pub fn append(&self, result: &EvaluationResult) -> Result<()> {
        let new_file = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open summary file {}", self.path.display()))?;

        if new_file {
            writeln!(file, "{}", self.columns.join(","))?;
        }

        let categories = &result.categories;
        let mut fields = vec![
            result.evaluated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            csv_field(&result.address),
            result.radius_m.to_string(),
            format!("{:.2}", result.total_score),
            result.grade.code().to_string(),
            format!("{:.2}", categories.core_demographic.score),
            format!("{:.2}", categories.synergy.score),
            format!("{:.2}", categories.infrastructure.score),
            format!("{:.2}", categories.direct_competition.score),
            format!(
                "{:.2}",
                categories.policy_risk.score + categories.risk_demographic.score
            ),
            csv_field(&result.recommendation),
            format!("{:.6}", result.coordinates.longitude),
            format!("{:.6}", result.coordinates.latitude),
            categories.direct_competition.count.to_string(),
            categories.policy_risk.count.to_string(),
        ];
        fields.extend(result.type_counts.iter().map(|t| t.count.to_string()));

        writeln!(file, "{}", fields.join(","))?;
        Ok(())
    }
}
