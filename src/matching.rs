//! Name-matching policy over fuzzy-search candidates.

use std::cmp::Ordering;

use crate::models::{MatchCandidate, DISTRICT_LEVEL, EXACT_MATCH_SIMILARITY, SUB_DISTRICT_LEVEL};

/// Names up to this many characters get the most threshold relief.
const SHORT_NAME_MAX_CHARS: usize = 5;
/// Names up to this many characters get partial threshold relief.
const MEDIUM_NAME_MAX_CHARS: usize = 8;
/// How far the threshold is lowered for short names.
const SHORT_NAME_RELIEF: f64 = 0.30;
const SHORT_NAME_FLOOR: f64 = 0.40;
const MEDIUM_NAME_FLOOR: f64 = 0.50;

/// Similarity threshold to search with for `name`.
///
/// Trigram similarity punishes a single typo heavily on short strings, so
/// names of 5 characters or fewer search at `configured - 0.30` (never below
/// 0.40) and names of 6-8 characters at `configured - 0.30` (never below
/// 0.50). The result never exceeds `configured`.
pub fn effective_threshold(name: &str, configured: f64) -> f64 {
    let len = name.trim().chars().count();

    let adjusted = if len <= SHORT_NAME_MAX_CHARS {
        (configured - SHORT_NAME_RELIEF).max(SHORT_NAME_FLOOR)
    } else if len <= MEDIUM_NAME_MAX_CHARS {
        (configured - SHORT_NAME_RELIEF).max(MEDIUM_NAME_FLOOR)
    } else {
        configured
    };

    adjusted.min(configured)
}

/// Pick the best candidate, or `None` if there are none.
///
/// Exact matches (similarity >= 0.99) win outright, preferring a district,
/// then a sub-district, then whichever exact match came first. Provinces are
/// deliberately last: a bare city name almost always means its district.
///
/// Without exact matches the highest similarity wins, with distance from the
/// district level breaking ties. When `prefer_lower_admin_levels` is off only
/// similarity counts. Earlier candidates win remaining ties.
pub fn select_candidate(
    candidates: &[MatchCandidate],
    prefer_lower_admin_levels: bool,
) -> Option<&MatchCandidate> {
    if !prefer_lower_admin_levels {
        return max_first_by(candidates, |a, b| {
            a.similarity_score.total_cmp(&b.similarity_score)
        });
    }

    let mut first_exact = None;
    let mut exact_district = None;
    let mut exact_sub_district = None;

    for candidate in candidates
        .iter()
        .filter(|c| c.similarity_score >= EXACT_MATCH_SIMILARITY)
    {
        first_exact.get_or_insert(candidate);
        match candidate.place.hierarchy_level {
            DISTRICT_LEVEL => {
                exact_district.get_or_insert(candidate);
            }
            SUB_DISTRICT_LEVEL => {
                exact_sub_district.get_or_insert(candidate);
            }
            _ => {}
        }
    }

    if let Some(exact) = exact_district.or(exact_sub_district).or(first_exact) {
        return Some(exact);
    }

    max_first_by(candidates, |a, b| {
        a.similarity_score
            .total_cmp(&b.similarity_score)
            .then_with(|| district_distance(b).cmp(&district_distance(a)))
    })
}

/// Highest-similarity candidates first, truncated to `limit`.
pub fn top_suggestions(mut candidates: Vec<MatchCandidate>, limit: usize) -> Vec<MatchCandidate> {
    candidates.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    candidates.truncate(limit);
    candidates
}

fn district_distance(candidate: &MatchCandidate) -> u8 {
    candidate.place.hierarchy_level.abs_diff(DISTRICT_LEVEL)
}

/// Like `Iterator::max_by`, but the first of equal elements wins.
fn max_first_by<T>(items: &[T], mut cmp: impl FnMut(&T, &T) -> Ordering) -> Option<&T> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if cmp(item, b) != Ordering::Greater => Some(b),
        _ => Some(item),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Place;
    use uuid::Uuid;

    fn candidate(name: &str, level: u8, score: f64) -> MatchCandidate {
        MatchCandidate {
            place: Place {
                id: Uuid::new_v4(),
                name: name.to_string(),
                hierarchy_level: level,
                parent_id: None,
            },
            similarity_score: score,
        }
    }

    #[test]
    fn test_exact_prefers_district() {
        let candidates = vec![
            candidate("Hyderabad Division", 1, 1.0),
            candidate("Hyderabad City", 3, 1.0),
            candidate("Hyderabad", 2, 1.0),
        ];
        let best = select_candidate(&candidates, true).unwrap();
        assert_eq!(best.place.hierarchy_level, 2);
    }

    #[test]
    fn test_exact_falls_back_to_sub_district_then_any() {
        let candidates = vec![candidate("Sindh", 1, 1.0), candidate("Sindh Tehsil", 3, 0.995)];
        assert_eq!(select_candidate(&candidates, true).unwrap().place.hierarchy_level, 3);

        let candidates = vec![candidate("Punjab", 1, 1.0), candidate("Punjab Colony", 2, 0.7)];
        assert_eq!(select_candidate(&candidates, true).unwrap().place.name, "Punjab");
    }

    #[test]
    fn test_fuzzy_prefers_similarity_then_district_distance() {
        let candidates = vec![
            candidate("Larkana", 3, 0.8),
            candidate("Larkano", 1, 0.9),
            candidate("Larkana District", 2, 0.9),
        ];
        let best = select_candidate(&candidates, true).unwrap();
        assert_eq!(best.place.name, "Larkana District");

        let candidates = vec![candidate("Mardan", 1, 0.95), candidate("Mardaan", 2, 0.9)];
        assert_eq!(select_candidate(&candidates, true).unwrap().place.name, "Mardan");
    }

    #[test]
    fn test_fuzzy_ties_keep_first() {
        let candidates = vec![candidate("Swat A", 3, 0.9), candidate("Swat B", 1, 0.9)];
        assert_eq!(select_candidate(&candidates, true).unwrap().place.name, "Swat A");
    }

    #[test]
    fn test_without_level_preference_similarity_only() {
        let candidates = vec![candidate("Sindh", 1, 1.0), candidate("Sindh District", 2, 1.0)];
        assert_eq!(select_candidate(&candidates, false).unwrap().place.name, "Sindh");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(select_candidate(&[], true).is_none());
    }

    #[test]
    fn test_threshold_adjustment() {
        assert!((effective_threshold("Swat", 0.85) - 0.55).abs() < 1e-9);
        assert!((effective_threshold("Swat", 0.6) - 0.4).abs() < 1e-9);
        assert!((effective_threshold("Larkana", 0.85) - 0.55).abs() < 1e-9);
        assert!((effective_threshold("Larkana", 0.7) - 0.5).abs() < 1e-9);
        assert!((effective_threshold("Rawalpindi", 0.85) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_monotonic_in_length() {
        for configured in [0.0, 0.2, 0.45, 0.6, 0.85, 1.0] {
            let short = effective_threshold("Swat", configured);
            let medium = effective_threshold("Larkana", configured);
            let long = effective_threshold("Muzaffargarh", configured);
            assert!(short <= medium, "{configured}: {short} > {medium}");
            assert!(medium <= long, "{configured}: {medium} > {long}");
        }
    }

    #[test]
    fn test_top_suggestions_sorted_and_limited() {
        let candidates = vec![
            candidate("A", 2, 0.5),
            candidate("B", 2, 0.9),
            candidate("C", 2, 0.7),
            candidate("D", 2, 0.6),
        ];
        let top = top_suggestions(candidates, 3);
        let names: Vec<_> = top.iter().map(|c| c.place.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }
}
