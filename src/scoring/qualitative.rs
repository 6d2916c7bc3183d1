//! Qualitative dining-profile analysis.
//!
//! Samples the broad food-service category around a location and turns
//! the average rating and per-head cost into two score adjustments.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::amap::models::Coordinates;
use crate::amap::{PoiFilter, PoiProvider};

/// Top-level AMap food-service category. Deliberately broader than the
/// named fast-food entries in the scoring model so the sample covers the
/// whole dining mix around the location.
const DINING_TYPES: &str = "050000";

/// Label for the dining query in logs and the raw backup.
pub const DINING_LABEL: &str = "餐饮服务";

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DiningProfile {
    /// Mean of parseable ratings; 0 when none were usable.
    pub avg_rating: f64,
    /// Mean of parseable, strictly positive per-head costs; 0 when none.
    pub avg_cost: f64,
    /// Raw sample size before field filtering.
    pub sampled: usize,
}

/// Fetch the dining sample and average its rating and cost fields.
pub async fn dining_profile(
    provider: &dyn PoiProvider,
    center: Coordinates,
    radius_m: u32,
) -> Result<DiningProfile> {
    let pois = provider
        .search_around(
            center,
            radius_m,
            &PoiFilter::Types(DINING_TYPES.to_string()),
            DINING_LABEL,
        )
        .await?;

    let mut ratings = Vec::new();
    let mut costs = Vec::new();
    for poi in &pois {
        let Some(business) = &poi.business else {
            continue;
        };
        if let Some(rating) = business.rating.as_deref().and_then(|r| r.parse::<f64>().ok()) {
            ratings.push(rating);
        }
        // A zero or unparseable cost means "no data", not "free".
        if let Some(cost) = business.cost.as_deref().and_then(|c| c.parse::<f64>().ok()) {
            if cost > 0.0 {
                costs.push(cost);
            }
        }
    }

    let profile = DiningProfile {
        avg_rating: mean(&ratings),
        avg_cost: mean(&costs),
        sampled: pois.len(),
    };
    info!(
        sampled = profile.sampled,
        avg_rating = profile.avg_rating,
        avg_cost = profile.avg_cost,
        "Dining profile sampled"
    );
    Ok(profile)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Piecewise-linear rating adjustment with a neutral band at [3.8, 4.2].
/// A zero average means no data and stays neutral.
pub fn rating_bonus(avg_rating: f64) -> f64 {
    if avg_rating > 4.2 {
        (avg_rating - 4.2) * 25.0
    } else if avg_rating > 0.0 && avg_rating < 3.8 {
        (avg_rating - 3.8) * 20.0
    } else {
        0.0
    }
}

/// Step adjustment for the average per-head cost; cheaper is better for
/// the target audience.
pub fn cost_bonus(avg_cost: f64) -> f64 {
    if avg_cost <= 0.0 {
        0.0 // no data
    } else if avg_cost <= 35.0 {
        20.0
    } else if avg_cost <= 50.0 {
        10.0
    } else if avg_cost <= 80.0 {
        -5.0
    } else {
        -15.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amap::models::{Business, Poi};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rating_bonus_sample_points() {
        assert!(approx(rating_bonus(4.2), 0.0));
        assert!(approx(rating_bonus(4.5), 7.5));
        assert!(approx(rating_bonus(3.8), 0.0));
        assert!(approx(rating_bonus(3.5), -6.0));
        assert!(approx(rating_bonus(0.0), 0.0));
    }

    #[test]
    fn test_rating_bonus_below_band_is_negative() {
        for rating in [0.5, 1.0, 2.0, 3.0, 3.7] {
            assert!(rating_bonus(rating) < 0.0);
        }
    }

    #[test]
    fn test_cost_bonus_step_points() {
        assert!(approx(cost_bonus(0.0), 0.0));
        assert!(approx(cost_bonus(35.0), 20.0));
        assert!(approx(cost_bonus(35.01), 10.0));
        assert!(approx(cost_bonus(50.0), 10.0));
        assert!(approx(cost_bonus(50.01), -5.0));
        assert!(approx(cost_bonus(80.0), -5.0));
        assert!(approx(cost_bonus(80.01), -15.0));
    }

    fn dining_poi(rating: Option<&str>, cost: Option<&str>) -> Poi {
        Poi {
            name: "diner".to_string(),
            typecode: "050000".to_string(),
            distance: "100".to_string(),
            business: Some(Business {
                rating: rating.map(String::from),
                cost: cost.map(String::from),
            }),
        }
    }

    struct FixedProvider {
        pois: Vec<Poi>,
    }

    #[async_trait::async_trait]
    impl PoiProvider for FixedProvider {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>> {
            Ok(None)
        }

        async fn search_around(
            &self,
            _center: Coordinates,
            _radius_m: u32,
            _filter: &PoiFilter,
            _label: &str,
        ) -> Result<Vec<Poi>> {
            Ok(self.pois.clone())
        }
    }

    #[tokio::test]
    async fn test_zero_cost_excluded_from_average() {
        let provider = FixedProvider {
            pois: vec![
                dining_poi(Some("4.0"), Some("0")),
                dining_poi(Some("4.0"), Some("40")),
                dining_poi(None, Some("not-a-number")),
            ],
        };
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };

        let profile = dining_profile(&provider, center, 800).await.unwrap();
        assert!(approx(profile.avg_cost, 40.0));
        assert!(approx(profile.avg_rating, 4.0));
        assert_eq!(profile.sampled, 3);
    }

    #[tokio::test]
    async fn test_empty_sample_is_neutral() {
        let provider = FixedProvider { pois: Vec::new() };
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };

        let profile = dining_profile(&provider, center, 800).await.unwrap();
        assert!(approx(profile.avg_rating, 0.0));
        assert!(approx(profile.avg_cost, 0.0));
        assert!(approx(rating_bonus(profile.avg_rating), 0.0));
        assert!(approx(cost_bonus(profile.avg_cost), 0.0));
    }
}
