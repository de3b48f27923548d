//! Spatial disambiguation between geocoder candidates.

use geo::{Centroid, MultiPoint, Point};

use crate::models::Coordinate;

/// Returned when asked to choose among zero candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no candidates to disambiguate")]
pub struct EmptyCandidates;

/// Pick the candidate nearest to the centroid of `context`.
///
/// With a single candidate or no context the first candidate is returned as
/// is. Distances are planar squared degrees, which is good enough to tell
/// apart same-named places within one country.
pub fn disambiguate(
    candidates: &[Coordinate],
    context: &[Coordinate],
) -> Result<Coordinate, EmptyCandidates> {
    let first = *candidates.first().ok_or(EmptyCandidates)?;

    if candidates.len() == 1 {
        return Ok(first);
    }

    let centroid = match context_centroid(context) {
        Some(c) => c,
        None => return Ok(first),
    };

    Ok(candidates.iter().copied().fold(first, |best, candidate| {
        if squared_distance(candidate, centroid) < squared_distance(best, centroid) {
            candidate
        } else {
            best
        }
    }))
}

/// Arithmetic mean of the context points, `None` when there are none.
pub fn context_centroid(context: &[Coordinate]) -> Option<Coordinate> {
    let points: MultiPoint<f64> = context.iter().map(|c| Point::from(*c)).collect();
    points.centroid().map(Coordinate::from)
}

fn squared_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dx = a.lon - b.lon;
    let dy = a.lat - b.lat;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    #[test]
    fn test_picks_candidate_nearest_context() {
        let picked = disambiguate(&[c(0.0, 0.0), c(10.0, 10.0)], &[c(1.0, 1.0)]).unwrap();
        assert_eq!(picked, c(0.0, 0.0));

        let picked = disambiguate(&[c(0.0, 0.0), c(10.0, 10.0)], &[c(9.0, 9.0)]).unwrap();
        assert_eq!(picked, c(10.0, 10.0));
    }

    #[test]
    fn test_uses_centroid_of_all_context() {
        // Centroid of the context is (8, 8)
        let context = [c(6.0, 6.0), c(10.0, 10.0)];
        let picked = disambiguate(&[c(0.0, 0.0), c(7.0, 7.0)], &context).unwrap();
        assert_eq!(picked, c(7.0, 7.0));
    }

    #[test]
    fn test_without_context_returns_first() {
        let picked = disambiguate(&[c(67.0, 24.8), c(73.0, 33.6)], &[]).unwrap();
        assert_eq!(picked, c(67.0, 24.8));
    }

    #[test]
    fn test_single_candidate_returned_unchanged() {
        let picked = disambiguate(&[c(73.0, 33.6)], &[c(0.0, 0.0)]).unwrap();
        assert_eq!(picked, c(73.0, 33.6));
    }

    #[test]
    fn test_empty_candidates_is_error() {
        assert_eq!(disambiguate(&[], &[c(1.0, 1.0)]), Err(EmptyCandidates));
    }

    #[test]
    fn test_context_centroid() {
        assert_eq!(context_centroid(&[]), None);
        assert_eq!(
            context_centroid(&[c(0.0, 0.0), c(2.0, 4.0)]),
            Some(c(1.0, 2.0))
        );
    }

    #[test]
    fn test_ties_keep_first() {
        let picked = disambiguate(&[c(-1.0, 0.0), c(1.0, 0.0)], &[c(0.0, 0.0)]).unwrap();
        assert_eq!(picked, c(-1.0, 0.0));
    }
}
