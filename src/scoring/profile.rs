//! Static POI scoring model.
//!
//! Every named type maps to exactly one category and one polarity. The
//! table is declared once, positive types before negative types, and the
//! scorer iterates it in declaration order.

use serde::Serialize;

use crate::amap::PoiFilter;

/// Logical category a named POI type contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    CoreDemographic,
    Synergy,
    Infrastructure,
    DirectCompetition,
    PolicyRisk,
    RiskDemographic,
}

impl Category {
    /// Positive-polarity categories add to the base score; the rest
    /// subtract from it.
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Self::CoreDemographic | Self::Synergy | Self::Infrastructure
        )
    }
}

/// How a named type is queried: by category code or by keyword search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSpec {
    /// Pipe-joined AMap category codes. Doubles as the expected set for
    /// post-fetch cleaning.
    Types(&'static str),
    /// Pipe-joined keyword terms. Keyword results carry no expected set
    /// and skip cleaning.
    Keywords(&'static str),
}

impl MatchSpec {
    pub fn filter(self) -> PoiFilter {
        match self {
            Self::Types(types) => PoiFilter::Types(types.to_string()),
            Self::Keywords(keywords) => PoiFilter::Keywords(keywords.to_string()),
        }
    }

    /// Expected type codes for the cleaning step, if any.
    pub fn expected_types(self) -> Option<&'static str> {
        match self {
            Self::Types(types) => Some(types),
            Self::Keywords(_) => None,
        }
    }
}

/// Immutable configuration record for one named POI type.
#[derive(Debug, Clone)]
pub struct PoiTypeConfig {
    /// Stable identifier; also names the summary CSV count column.
    pub name: &'static str,
    /// Operator-facing label in the AMap category vocabulary.
    pub label: &'static str,
    pub spec: MatchSpec,
    pub weight: f64,
    pub category: Category,
    /// Diminishing-returns cap for positive types; `None` counts linearly.
    pub saturation: Option<f64>,
}

/// Strict regulatory radius for the primary/secondary school type,
/// applied regardless of the requested search radius.
pub const SCHOOL_STRICT_RADIUS_M: u32 = 200;

/// The named type the strict-radius rule and the grading veto key off.
pub const SCHOOL_TYPE_NAME: &str = "primary_secondary_school";

pub const POI_PROFILE: &[PoiTypeConfig] = &[
    // Positive polarity, iterated first.
    PoiTypeConfig {
        name: "shopping_mall",
        label: "商场购物中心",
        spec: MatchSpec::Types("060100|060101"),
        weight: 2.5,
        category: Category::CoreDemographic,
        saturation: None,
    },
    PoiTypeConfig {
        name: "college",
        label: "大中专院校",
        spec: MatchSpec::Types("141200"),
        weight: 2.2,
        category: Category::CoreDemographic,
        saturation: None,
    },
    PoiTypeConfig {
        name: "office_tower",
        label: "写字楼",
        spec: MatchSpec::Types("120100"),
        weight: 1.8,
        category: Category::CoreDemographic,
        saturation: Some(20.0),
    },
    PoiTypeConfig {
        name: "residential_complex",
        label: "住宅小区",
        spec: MatchSpec::Types("120300"),
        weight: 1.5,
        category: Category::CoreDemographic,
        saturation: Some(25.0),
    },
    PoiTypeConfig {
        name: "youth_apartment",
        label: "青年公寓",
        spec: MatchSpec::Keywords("青年公寓|白领公寓|人才公寓"),
        weight: 2.0,
        category: Category::Synergy,
        saturation: Some(15.0),
    },
    PoiTypeConfig {
        name: "night_market",
        label: "夜市美食街",
        spec: MatchSpec::Keywords("夜市|美食街"),
        weight: 1.8,
        category: Category::Synergy,
        saturation: Some(5.0),
    },
    PoiTypeConfig {
        name: "cinema",
        label: "电影院",
        spec: MatchSpec::Types("080601"),
        weight: 1.6,
        category: Category::Synergy,
        saturation: Some(5.0),
    },
    PoiTypeConfig {
        name: "trendy_fast_food",
        label: "热门快餐奶茶",
        spec: MatchSpec::Keywords("蜜雪冰城|华莱士|瑞幸|星巴克"),
        weight: 1.5,
        category: Category::Synergy,
        saturation: Some(10.0),
    },
    PoiTypeConfig {
        name: "ktv",
        label: "KTV",
        spec: MatchSpec::Types("080301"),
        weight: 1.2,
        category: Category::Synergy,
        saturation: Some(10.0),
    },
    PoiTypeConfig {
        name: "bar",
        label: "酒吧",
        spec: MatchSpec::Types("080500"),
        weight: 1.2,
        category: Category::Synergy,
        saturation: Some(15.0),
    },
    PoiTypeConfig {
        name: "fast_food",
        label: "快餐小吃",
        spec: MatchSpec::Types("050300|050100"),
        weight: 1.0,
        category: Category::Synergy,
        saturation: Some(25.0),
    },
    PoiTypeConfig {
        name: "hotel",
        label: "宾馆酒店",
        spec: MatchSpec::Types("100100"),
        weight: 0.8,
        category: Category::Synergy,
        saturation: Some(20.0),
    },
    PoiTypeConfig {
        name: "metro_station",
        label: "地铁站",
        spec: MatchSpec::Types("150500"),
        weight: 2.0,
        category: Category::Infrastructure,
        saturation: None,
    },
    PoiTypeConfig {
        name: "bus_stop",
        label: "公交站",
        spec: MatchSpec::Types("150700"),
        weight: 0.5,
        category: Category::Infrastructure,
        saturation: Some(20.0),
    },
    // Negative polarity.
    PoiTypeConfig {
        name: "internet_cafe",
        label: "网吧",
        spec: MatchSpec::Types("080601"),
        weight: 4.0,
        category: Category::DirectCompetition,
        saturation: None,
    },
    PoiTypeConfig {
        name: "esports_hotel",
        label: "电竞酒店",
        spec: MatchSpec::Types("100108"),
        weight: 3.5,
        category: Category::DirectCompetition,
        saturation: None,
    },
    PoiTypeConfig {
        // Hard regulatory constraint: any hit inside the strict radius
        // vetoes the location outright.
        name: SCHOOL_TYPE_NAME,
        label: "中小学校",
        spec: MatchSpec::Types("141202|141203"),
        weight: 10.0,
        category: Category::PolicyRisk,
        saturation: None,
    },
    PoiTypeConfig {
        name: "industrial_park",
        label: "工业园区",
        spec: MatchSpec::Types("170205"),
        weight: 1.5,
        category: Category::RiskDemographic,
        saturation: None,
    },
];
