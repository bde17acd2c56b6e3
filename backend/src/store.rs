use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use serde::Deserialize;

use crate::models::{Coordinate, CrimeIncident, HeatPoint};

/// Incidents closer than this (plane distance in raw degrees) count as "near"
/// a queried coordinate. Not geodesically meaningful; kept for compatibility
/// with the original dataset semantics.
pub const PROXIMITY_RADIUS_DEG: f64 = 0.15;

/// How many incidents the text search serves when nothing matches at all.
pub const SAMPLE_FALLBACK_LEN: usize = 5;

const SAMPLE_DATASET: &str = include_str!("../data/sample_dataset.json");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid dataset definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("dataset has no cities")]
    EmptyCityTable,
    #[error("dataset has no incidents")]
    EmptyIncidents,
    #[error("duplicate incident id {0}")]
    DuplicateIncidentId(u32),
}

#[derive(Debug, Deserialize)]
pub struct DatasetFile {
    pub cities: Vec<CityRecord>,
    pub incidents: Vec<CrimeIncident>,
}

#[derive(Debug, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct CityEntry {
    /// Lowercase canonical key.
    pub name: String,
    pub coord: Coordinate,
}

/// Immutable crime dataset, loaded once at startup and injected into
/// handlers. Holds an ordered city table (tie-breaks follow table order) and
/// the incident list.
#[derive(Clone)]
pub struct CrimeStore {
    cities: Vec<CityEntry>,
    incidents: Vec<CrimeIncident>,
}

/// Result of a free-text search. `fallback` marks the "nothing matched,
/// serving sample data" degradation so callers can attach an advisory.
#[derive(Debug)]
pub struct SearchOutcome {
    pub incidents: Vec<CrimeIncident>,
    pub matched_city: Option<String>,
    pub fallback: bool,
}

impl CrimeStore {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        let dataset: DatasetFile = serde_json::from_reader(reader)?;
        Self::from_dataset(dataset)
    }

    /// The dataset bundled into the binary.
    pub fn sample() -> Result<Self, StoreError> {
        Self::from_reader(SAMPLE_DATASET.as_bytes())
    }

    pub fn from_dataset(dataset: DatasetFile) -> Result<Self, StoreError> {
        if dataset.cities.is_empty() {
            return Err(StoreError::EmptyCityTable);
        }
        if dataset.incidents.is_empty() {
            return Err(StoreError::EmptyIncidents);
        }

        let mut seen = std::collections::HashSet::new();
        for incident in &dataset.incidents {
            if !seen.insert(incident.id) {
                return Err(StoreError::DuplicateIncidentId(incident.id));
            }
        }

        let cities = dataset
            .cities
            .into_iter()
            .map(|record| CityEntry {
                name: record.name.to_lowercase(),
                coord: Coordinate {
                    lat: record.lat,
                    lon: record.lon,
                },
            })
            .collect();

        Ok(Self {
            cities,
            incidents: dataset.incidents,
        })
    }

    pub fn cities(&self) -> &[CityEntry] {
        &self.cities
    }

    pub fn incidents(&self) -> &[CrimeIncident] {
        &self.incidents
    }

    /// Closest known city by plane Euclidean distance. The table is non-empty
    /// by construction, so this always succeeds; the first minimum wins.
    pub fn nearest_city(&self, target: Coordinate) -> &CityEntry {
        let mut best = &self.cities[0];
        let mut best_dist = squared_distance(best.coord, target);
        for city in &self.cities[1..] {
            let dist = squared_distance(city.coord, target);
            if dist < best_dist {
                best = city;
                best_dist = dist;
            }
        }
        best
    }

    /// All incidents within [`PROXIMITY_RADIUS_DEG`] of the coordinate. When
    /// none are that close, falls back to every incident tagged with the
    /// nearest city, so a query near a covered city never comes back empty.
    pub fn incidents_near(&self, target: Coordinate) -> Vec<CrimeIncident> {
        let nearby: Vec<CrimeIncident> = self
            .incidents
            .iter()
            .filter(|incident| {
                squared_distance(incident.coordinate(), target)
                    < PROXIMITY_RADIUS_DEG * PROXIMITY_RADIUS_DEG
            })
            .cloned()
            .collect();

        if !nearby.is_empty() {
            return nearby;
        }

        let city = self.nearest_city(target);
        tracing::debug!(city = %city.name, "no incidents in radius, falling back to nearest city");
        self.incidents
            .iter()
            .filter(|incident| city_field_matches(&incident.city, &city.name))
            .cloned()
            .collect()
    }

    /// Severity-weighted points for the heat-map layer around a coordinate.
    pub fn heat_points(&self, target: Coordinate) -> Vec<HeatPoint> {
        self.incidents_near(target)
            .iter()
            .map(|incident| HeatPoint {
                lat: incident.lat,
                lon: incident.lon,
                weight: incident.severity.heat_weight(),
            })
            .collect()
    }

    /// Free-text search. Tries a city-name match first (substring containment
    /// in either direction, first city in table order wins), then raw
    /// substring matching over address/city/country, and finally degrades to
    /// a fixed-size prefix of the table so the result is never empty.
    pub fn search(&self, query: &str) -> SearchOutcome {
        let needle = query.trim().to_lowercase();

        let matched_city = self
            .cities
            .iter()
            .find(|city| city.name.contains(&needle) || needle.contains(&city.name))
            .map(|city| city.name.clone());

        let incidents: Vec<CrimeIncident> = match &matched_city {
            Some(city) => self
                .incidents
                .iter()
                .filter(|incident| {
                    incident
                        .city
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(city))
                        || field_contains(&incident.address, city)
                })
                .cloned()
                .collect(),
            None => self
                .incidents
                .iter()
                .filter(|incident| {
                    field_contains(&incident.address, &needle)
                        || field_contains(&incident.city, &needle)
                        || field_contains(&incident.country, &needle)
                })
                .cloned()
                .collect(),
        };

        if incidents.is_empty() {
            return SearchOutcome {
                incidents: self
                    .incidents
                    .iter()
                    .take(SAMPLE_FALLBACK_LEN)
                    .cloned()
                    .collect(),
                matched_city,
                fallback: true,
            };
        }

        SearchOutcome {
            incidents,
            matched_city,
            fallback: false,
        }
    }

    /// Case-insensitive exact lookup against the canonical city table.
    pub fn city_coordinate(&self, name: &str) -> Option<&CityEntry> {
        let key = name.trim().to_lowercase();
        self.cities.iter().find(|city| city.name == key)
    }
}

/// Exact-or-substring match in either direction, case-insensitive. Used for
/// the city fallback of the proximity lookup.
fn city_field_matches(field: &Option<String>, city: &str) -> bool {
    field.as_deref().is_some_and(|value| {
        let value = value.to_lowercase();
        value.contains(city) || city.contains(&value)
    })
}

fn field_contains(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|value| value.to_lowercase().contains(needle))
}

fn squared_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = a.lat - b.lat;
    let dlon = a.lon - b.lon;
    dlat * dlat + dlon * dlon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CrimeStore {
        CrimeStore::sample().expect("sample dataset")
    }

    #[test]
    fn nearest_city_at_registered_coordinate_is_that_city() {
        let store = store();
        for city in store.cities() {
            assert_eq!(store.nearest_city(city.coord).name, city.name);
        }
    }

    #[test]
    fn nearest_city_tie_breaks_by_table_order() {
        let dataset: DatasetFile = serde_json::from_str(
            r#"{
                "cities": [
                    {"name": "alpha", "lat": 1.0, "lon": 1.0},
                    {"name": "beta", "lat": -1.0, "lon": -1.0}
                ],
                "incidents": [
                    {"id": 1, "lat": 0.0, "lon": 0.0, "type": "Theft", "severity": "low"}
                ]
            }"#,
        )
        .unwrap();
        let store = CrimeStore::from_dataset(dataset).unwrap();
        // Both cities are equidistant from the origin.
        let city = store.nearest_city(Coordinate { lat: 0.0, lon: 0.0 });
        assert_eq!(city.name, "alpha");
    }

    #[test]
    fn incidents_near_returns_everything_in_radius() {
        let store = store();
        let downtown_ny = Coordinate {
            lat: 40.7128,
            lon: -74.006,
        };
        let incidents = store.incidents_near(downtown_ny);
        assert_eq!(incidents.len(), 6);
        assert!(incidents
            .iter()
            .all(|i| i.city.as_deref() == Some("New York")));
    }

    #[test]
    fn incidents_near_falls_back_to_nearest_city_subset() {
        let store = store();
        // South-west of Chicago, outside the 0.15 degree radius of every
        // sample incident but closest to Chicago's registered center.
        let outskirts = Coordinate {
            lat: 41.7,
            lon: -87.9,
        };
        let incidents = store.incidents_near(outskirts);
        assert!(!incidents.is_empty());
        assert!(incidents
            .iter()
            .all(|i| i.city.as_deref() == Some("Chicago")));
    }

    #[test]
    fn incidents_near_is_empty_for_city_without_incidents() {
        let store = store();
        // Berlin is in the city table but has no incidents.
        let berlin = Coordinate {
            lat: 52.52,
            lon: 13.405,
        };
        assert!(store.incidents_near(berlin).is_empty());
    }

    #[test]
    fn search_mumbai_returns_only_mumbai_incidents() {
        let store = store();
        let outcome = store.search("Mumbai");
        assert!(!outcome.fallback);
        assert_eq!(outcome.matched_city.as_deref(), Some("mumbai"));
        assert!(!outcome.incidents.is_empty());
        assert!(outcome
            .incidents
            .iter()
            .all(|i| i.city.as_deref() == Some("Mumbai")));
    }

    #[test]
    fn search_matches_city_names_bidirectionally() {
        let store = store();
        // Query longer than the canonical name still resolves to the city.
        let outcome = store.search("new york city");
        assert_eq!(outcome.matched_city.as_deref(), Some("new york"));
        assert!(!outcome.fallback);
    }

    #[test]
    fn search_falls_back_to_field_substrings() {
        let store = store();
        let outcome = store.search("Broadway");
        assert!(!outcome.fallback);
        assert!(outcome.matched_city.is_none());
        assert_eq!(outcome.incidents.len(), 1);
        assert_eq!(outcome.incidents[0].id, 1);
    }

    #[test]
    fn search_unknown_place_serves_sample_prefix() {
        let store = store();
        let outcome = store.search("Atlantis");
        assert!(outcome.fallback);
        let ids: Vec<u32> = outcome.incidents.iter().map(|i| i.id).collect();
        let expected: Vec<u32> = store
            .incidents()
            .iter()
            .take(SAMPLE_FALLBACK_LEN)
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn search_by_country_field() {
        let store = store();
        let outcome = store.search("United Kingdom");
        assert!(!outcome.fallback);
        assert!(outcome
            .incidents
            .iter()
            .all(|i| i.country.as_deref() == Some("United Kingdom")));
    }

    #[test]
    fn city_coordinate_lookup_is_case_insensitive() {
        let store = store();
        let city = store.city_coordinate("  Tokyo ").expect("tokyo");
        assert_eq!(city.name, "tokyo");
        assert!(store.city_coordinate("atlantis").is_none());
    }

    #[test]
    fn heat_points_carry_severity_weights() {
        let store = store();
        let downtown_ny = Coordinate {
            lat: 40.7128,
            lon: -74.006,
        };
        let points = store.heat_points(downtown_ny);
        assert_eq!(points.len(), 6);
        assert!(points.iter().all(|p| (0.3..=1.0).contains(&p.weight)));
    }

    #[test]
    fn rejects_duplicate_incident_ids() {
        let dataset: DatasetFile = serde_json::from_str(
            r#"{
                "cities": [{"name": "alpha", "lat": 0.0, "lon": 0.0}],
                "incidents": [
                    {"id": 7, "lat": 0.0, "lon": 0.0, "type": "Theft", "severity": "low"},
                    {"id": 7, "lat": 0.1, "lon": 0.1, "type": "Fraud", "severity": "medium"}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            CrimeStore::from_dataset(dataset),
            Err(StoreError::DuplicateIncidentId(7))
        ));
    }

    #[test]
    fn rejects_empty_tables() {
        let no_cities: DatasetFile =
            serde_json::from_str(r#"{"cities": [], "incidents": []}"#).unwrap();
        assert!(matches!(
            CrimeStore::from_dataset(no_cities),
            Err(StoreError::EmptyCityTable)
        ));

        let no_incidents: DatasetFile = serde_json::from_str(
            r#"{"cities": [{"name": "alpha", "lat": 0.0, "lon": 0.0}], "incidents": []}"#,
        )
        .unwrap();
        assert!(matches!(
            CrimeStore::from_dataset(no_incidents),
            Err(StoreError::EmptyIncidents)
        ));
    }
}
