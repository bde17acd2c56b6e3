use rand::Rng;

use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Number of interpolation segments; every route has SEGMENTS + 1 points.
pub const SEGMENTS: usize = 8;

/// Perpendicular displacement amplitude of each alternative route, in
/// degrees. Cosmetic; makes the alternatives bow away from the straight line.
const ALTERNATIVE_DEVIATIONS: [f64; 2] = [0.01, 0.015];

#[derive(Debug, Clone)]
pub struct ScoredRoute {
    pub route: Vec<Coordinate>,
    pub safety_score: u8,
}

#[derive(Debug, Clone)]
pub struct SafeRoute {
    pub route: Vec<Coordinate>,
    pub safety_score: u8,
    pub alternatives: Vec<ScoredRoute>,
}

/// Synthesize a recommended route plus two "alternative" paths between two
/// coordinates.
///
/// The recommended route is a straight-line interpolation. Each alternative
/// reuses it, displaced along the 90°-rotated unit direction of end−start by
/// `sin(t·π) · deviation`, so it coincides with the straight line at both
/// endpoints and bows outward at the midpoint. Safety scores are drawn from
/// the given `rng`: [60,100) for the recommended route, then [50,80) and
/// [40,60) for the alternatives, which are presented as less safe on purpose.
pub fn synthesize_route(start: Coordinate, end: Coordinate, rng: &mut impl Rng) -> SafeRoute {
    let route = interpolate_route(start, end);
    let safety_score = rng.gen_range(60..100);

    let perp = perpendicular_unit(start, end);
    let score_ranges = [50..80u8, 40..60u8];
    let alternatives = ALTERNATIVE_DEVIATIONS
        .iter()
        .zip(score_ranges)
        .map(|(&deviation, scores)| ScoredRoute {
            route: displaced_route(&route, perp, deviation),
            safety_score: rng.gen_range(scores),
        })
        .collect();

    SafeRoute {
        route,
        safety_score,
        alternatives,
    }
}

/// Straight-line route of SEGMENTS + 1 points. The endpoints are pushed
/// verbatim so the route starts and ends exactly where asked.
pub fn interpolate_route(start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
    let mut path = Vec::with_capacity(SEGMENTS + 1);
    path.push(start);
    for i in 1..SEGMENTS {
        path.push(start.interpolate(end, i as f64 / SEGMENTS as f64));
    }
    path.push(end);
    path
}

fn displaced_route(base: &[Coordinate], perp: Coordinate, deviation: f64) -> Vec<Coordinate> {
    let last = base.len() - 1;
    base.iter()
        .enumerate()
        .map(|(i, point)| {
            // sin(0) and sin(π) pin the endpoints; keep them bit-exact
            // rather than trusting rounding.
            if i == 0 || i == last {
                return *point;
            }
            let t = i as f64 / last as f64;
            let offset = (t * std::f64::consts::PI).sin() * deviation;
            Coordinate {
                lat: point.lat + perp.lat * offset,
                lon: point.lon + perp.lon * offset,
            }
        })
        .collect()
}

pub fn approximate_distance_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

fn perpendicular_unit(start: Coordinate, end: Coordinate) -> Coordinate {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
    Coordinate {
        lon: -dy / len,
        lat: dx / len,
    }
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
