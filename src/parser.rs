//! Directional phrase parsing.
//!
//! Splits inputs like "North-Eastern Balochistan" into a compass
//! [`Direction`] and the place name it qualifies. One region per call:
//! conjunctions such as "Sindh and Balochistan" are not split, callers submit
//! those as separate inputs.

use regex::Regex;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::cache::FifoCache;
use crate::models::Direction;

/// Patterns in match priority. Compound directions must come before their
/// simple constituents and Central last, so "North-Eastern X" never parses as
/// North with a "-Eastern X" remainder.
const DIRECTION_PATTERNS: &[(Direction, &str)] = &[
    (Direction::NorthEast, r"(?i)\bnorth[\s-]?east(?:ern)?\b"),
    (Direction::NorthWest, r"(?i)\bnorth[\s-]?west(?:ern)?\b"),
    (Direction::SouthEast, r"(?i)\bsouth[\s-]?east(?:ern)?\b"),
    (Direction::SouthWest, r"(?i)\bsouth[\s-]?west(?:ern)?\b"),
    (Direction::North, r"(?i)\bnorth(?:ern)?\b"),
    (Direction::South, r"(?i)\bsouth(?:ern)?\b"),
    (Direction::East, r"(?i)\beast(?:ern)?\b"),
    (Direction::West, r"(?i)\bwest(?:ern)?\b"),
    (Direction::Central, r"(?i)\b(?:central|middle)\b"),
];

/// Result of parsing one location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub direction: Option<Direction>,
    /// Remaining place name. Empty when the input was blank or held only a direction.
    pub place_name: String,
}

/// Classifier for directional location strings, memoized by exact input.
#[derive(Debug)]
pub struct DirectionalParser {
    patterns: Vec<(Direction, Regex)>,
    memo: Mutex<FifoCache<String, ParsedLocation>>,
}

impl DirectionalParser {
    pub fn new(memo_capacity: usize) -> Result<Self, regex::Error> {
        let patterns = DIRECTION_PATTERNS
            .iter()
            .map(|(direction, pattern)| Ok((*direction, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            patterns,
            memo: Mutex::new(FifoCache::new(memo_capacity)),
        })
    }

    pub fn parse(&self, text: &str) -> ParsedLocation {
        if let Some(hit) = self.memo().get(&text.to_string()) {
            return hit.clone();
        }

        let parsed = self.classify(text);
        self.memo().insert(text.to_string(), parsed.clone());
        parsed
    }

    fn classify(&self, text: &str) -> ParsedLocation {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ParsedLocation {
                direction: None,
                place_name: String::new(),
            };
        }

        for (direction, pattern) in &self.patterns {
            if !pattern.is_match(trimmed) {
                continue;
            }

            let remainder = pattern.replace_all(trimmed, " ");
            let place_name = collapse_whitespace(&remainder)
                .trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
                .to_string();

            debug!(
                "Parsed '{}' as direction {} of '{}'",
                trimmed, direction, place_name
            );

            return ParsedLocation {
                direction: Some(*direction),
                place_name,
            };
        }

        ParsedLocation {
            direction: None,
            place_name: trimmed.to_string(),
        }
    }

    /// Drop all memoized results
    pub fn clear_memo(&self) {
        self.memo().clear();
    }

    fn memo(&self) -> std::sync::MutexGuard<'_, FifoCache<String, ParsedLocation>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DirectionalParser {
        DirectionalParser::new(16).unwrap()
    }

    fn parsed(direction: Option<Direction>, place_name: &str) -> ParsedLocation {
        ParsedLocation {
            direction,
            place_name: place_name.to_string(),
        }
    }

    #[test]
    fn test_compound_direction_takes_priority() {
        let p = parser();
        assert_eq!(
            p.parse("North-Eastern Balochistan"),
            parsed(Some(Direction::NorthEast), "Balochistan")
        );
        assert_eq!(
            p.parse("south west Punjab"),
            parsed(Some(Direction::SouthWest), "Punjab")
        );
        assert_eq!(
            p.parse("Northwestern KPK"),
            parsed(Some(Direction::NorthWest), "KPK")
        );
    }

    #[test]
    fn test_simple_directions() {
        let p = parser();
        assert_eq!(p.parse("Central Sindh"), parsed(Some(Direction::Central), "Sindh"));
        assert_eq!(p.parse("middle Sindh"), parsed(Some(Direction::Central), "Sindh"));
        assert_eq!(p.parse("NORTHERN Punjab"), parsed(Some(Direction::North), "Punjab"));
        assert_eq!(p.parse("Sindh eastern"), parsed(Some(Direction::East), "Sindh"));
    }

    #[test]
    fn test_no_direction_passthrough() {
        let p = parser();
        assert_eq!(p.parse("Islamabad"), parsed(None, "Islamabad"));
        assert_eq!(p.parse("  Dera Ghazi Khan  "), parsed(None, "Dera Ghazi Khan"));
    }

    #[test]
    fn test_word_boundaries() {
        let p = parser();
        // "west" inside a word is not a direction
        assert_eq!(p.parse("Westridge"), parsed(None, "Westridge"));
        assert_eq!(p.parse("Southampton"), parsed(None, "Southampton"));
    }

    #[test]
    fn test_empty_inputs() {
        let p = parser();
        assert_eq!(p.parse(""), parsed(None, ""));
        assert_eq!(p.parse("   "), parsed(None, ""));
        assert_eq!(p.parse("Central"), parsed(Some(Direction::Central), ""));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let p = parser();
        for input in ["Central Sindh", "Islamabad", "", "north-east Gilgit-Baltistan"] {
            let first = p.parse(input);
            p.clear_memo();
            assert_eq!(first, p.parse(input));
            assert_eq!(first, p.parse(input));
        }
    }

    #[test]
    fn test_leftover_separators_trimmed() {
        let p = parser();
        assert_eq!(p.parse("Sindh, Central"), parsed(Some(Direction::Central), "Sindh"));
        assert_eq!(p.parse("Punjab - North"), parsed(Some(Direction::North), "Punjab"));
    }

    #[test]
    fn test_hyphenated_place_names_survive() {
        let p = parser();
        assert_eq!(
            p.parse("Northern Gilgit-Baltistan"),
            parsed(Some(Direction::North), "Gilgit-Baltistan")
        );
    }
}
