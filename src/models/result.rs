//! Per-request options and per-location results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, MatchCandidate, Place};

/// Similarity at or above which a name match counts as exact.
pub const EXACT_MATCH_SIMILARITY: f64 = 0.99;

/// How a place was matched to the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactName,
    FuzzyName,
    PointInPolygon,
    DirectionalIntersection,
}

impl MatchMethod {
    /// Label a name match by its similarity score.
    pub fn for_similarity(score: f64) -> Self {
        if score >= EXACT_MATCH_SIMILARITY {
            MatchMethod::ExactName
        } else {
            MatchMethod::FuzzyName
        }
    }
}

/// Options supplied with each geocoding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeOptions {
    /// Break similarity ties in favour of districts over provinces.
    pub prefer_lower_admin_levels: bool,
    /// Report similarity scores on name matches.
    pub include_confidence_scores: bool,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            prefer_lower_admin_levels: true,
            include_confidence_scores: false,
        }
    }
}

/// A place resolved for one input string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPlace {
    pub id: Uuid,
    pub name: String,
    pub hierarchy_level: u8,
    pub match_method: MatchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl MatchedPlace {
    pub fn from_place(place: &Place, match_method: MatchMethod) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
            hierarchy_level: place.hierarchy_level,
            match_method,
            confidence: None,
        }
    }

    /// Name match, labelled exact or fuzzy by score.
    pub fn from_candidate(candidate: &MatchCandidate, include_confidence: bool) -> Self {
        let mut matched = Self::from_place(
            &candidate.place,
            MatchMethod::for_similarity(candidate.similarity_score),
        );
        if include_confidence {
            matched.confidence = Some(candidate.similarity_score);
        }
        matched
    }
}

/// Outcome of resolving one input string.
///
/// An empty `matched_places` with `error` set is a failure; `error` next to
/// matched places is a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub input: String,
    pub matched_places: Vec<MatchedPlace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions_processed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeocodeResult {
    pub fn matched(input: &str, matched_places: Vec<MatchedPlace>) -> Self {
        Self {
            input: input.to_string(),
            matched_places,
            regions_processed: None,
            direction: None,
            error: None,
        }
    }

    pub fn failed(input: &str, error: impl ToString) -> Self {
        Self {
            input: input.to_string(),
            matched_places: Vec::new(),
            regions_processed: None,
            direction: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.matched_places.is_empty() && self.error.is_some()
    }

    /// First matched id, if any
    pub fn primary_id(&self) -> Option<Uuid> {
        self.matched_places.first().map(|p| p.id)
    }
}

/// A "did you mean" entry for a failed lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub name: String,
    pub hierarchy_level: u8,
    pub similarity_score: f64,
}

impl From<MatchCandidate> for Suggestion {
    fn from(candidate: MatchCandidate) -> Self {
        Self {
            id: candidate.place.id,
            name: candidate.place.name,
            hierarchy_level: candidate.place.hierarchy_level,
            similarity_score: candidate.similarity_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_method_threshold() {
        assert_eq!(MatchMethod::for_similarity(1.0), MatchMethod::ExactName);
        assert_eq!(MatchMethod::for_similarity(0.99), MatchMethod::ExactName);
        assert_eq!(MatchMethod::for_similarity(0.989), MatchMethod::FuzzyName);
    }

    #[test]
    fn test_failed_result_serialization() {
        let result = GeocodeResult::failed("Atlantis", "no match");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["input"], "Atlantis");
        assert_eq!(json["matched_places"], serde_json::json!([]));
        assert_eq!(json["error"], "no match");
        assert!(json.get("direction").is_none());
        assert!(result.is_failure());
    }

    #[test]
    fn test_options_default_when_fields_missing() {
        let options: GeocodeOptions = serde_json::from_str("{}").unwrap();
        assert!(options.prefer_lower_admin_levels);
        assert!(!options.include_confidence_scores);
    }
}
