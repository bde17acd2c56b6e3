use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Weight used by the heat-map layer when rendering incident density.
    pub fn heat_weight(self) -> f64 {
        match self {
            Severity::Low => 0.3,
            Severity::Medium => 0.6,
            Severity::High => 1.0,
        }
    }
}

/// Coarse banding of a safety score for display badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyRating {
    Safe,
    Caution,
    Avoid,
}

impl SafetyRating {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            SafetyRating::Safe
        } else if score >= 50 {
            SafetyRating::Caution
        } else {
            SafetyRating::Avoid
        }
    }
}

/// A single reported crime. Everything past the coordinates and category is
/// optional descriptive metadata; absence is explicit, not an empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrimeIncident {
    pub id: u32,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl CrimeIncident {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub route: Vec<Coordinate>,
    pub safety_score: u8,
    pub rating: SafetyRating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub route: Vec<Coordinate>,
    pub safety_score: u8,
    pub rating: SafetyRating,
    pub distance_km: f64,
    pub gpx_base64: String,
    pub alternative_routes: Vec<AlternativeRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub incidents: Vec<CrimeIncident>,
    /// Set when the query matched nothing and sample data is being shown
    /// instead; the UI surfaces this as a toast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityResponse {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Severity-weighted point feeding the map's heat layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
