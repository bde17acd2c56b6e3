pub use shared::{
    AlternativeRoute, ApiError, CityResponse, Coordinate, CrimeIncident, HeatPoint, RouteRequest,
    RouteResponse, SafetyRating, SearchResponse, Severity,
};
