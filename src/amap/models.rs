use serde::{Deserialize, Serialize};

/// A longitude/latitude pair in the coordinate frame the AMap API uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// Parse the API's `"lon,lat"` location string.
    pub fn parse(location: &str) -> Option<Self> {
        let (lon, lat) = location.split_once(',')?;
        Some(Self {
            longitude: lon.trim().parse().ok()?,
            latitude: lat.trim().parse().ok()?,
        })
    }

    /// Format back into the `"lon,lat"` form the API expects.
    pub fn to_query(self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

/// One point of interest as returned by the around-search endpoint.
/// Numeric fields arrive as strings on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct Poi {
    #[serde(default)]
    pub name: String,
    /// Semicolon-delimited category codes.
    #[serde(default)]
    pub typecode: String,
    /// Distance from the search center in meters.
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub business: Option<Business>,
}

impl Poi {
    /// Distance in meters; unparseable or missing values fall back to 999
    /// so they land outside every strict-radius check.
    pub fn distance_m(&self) -> u32 {
        self.distance.parse().unwrap_or(999)
    }
}

/// The `business` field expansion carrying rating and per-head cost.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Business {
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
}

/// Geocoding endpoint envelope. Status and count are wire strings.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub infocode: String,
    #[serde(default)]
    pub geocodes: Vec<Geocode>,
}

impl GeocodeResponse {
    pub fn result_count(&self) -> usize {
        self.count.parse().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct Geocode {
    #[serde(default)]
    pub location: String,
}

/// Around-search endpoint envelope.
#[derive(Debug, Deserialize)]
pub struct AroundSearchResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: String,
    #[serde(default)]
    pub infocode: String,
    #[serde(default)]
    pub pois: Vec<Poi>,
}
