//! Reference place records read from the spatial store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Administrative level of districts, the level users usually mean by a bare name.
pub const DISTRICT_LEVEL: u8 = 2;

/// Administrative level of sub-districts (tehsils).
pub const SUB_DISTRICT_LEVEL: u8 = 3;

/// A node of the administrative hierarchy.
///
/// Places are owned by the store; this crate only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    /// 1 = province, 2 = district, 3 = sub-district. Always greater than the parent's level.
    pub hierarchy_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

/// A place as it arrives on the wire, before field validation.
///
/// Region queries may hand back partial rows; see [`Place::try_from`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hierarchy_level: Option<u8>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Field missing from a [`PlaceRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("place record is missing field `{0}`")]
pub struct MissingField(pub &'static str);

impl TryFrom<PlaceRecord> for Place {
    type Error = MissingField;

    fn try_from(record: PlaceRecord) -> Result<Self, Self::Error> {
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(MissingField("name"))?;

        Ok(Self {
            id: record.id.ok_or(MissingField("id"))?,
            name,
            hierarchy_level: record
                .hierarchy_level
                .filter(|l| *l > 0)
                .ok_or(MissingField("hierarchy_level"))?,
            parent_id: record.parent_id,
        })
    }
}

impl From<Place> for PlaceRecord {
    fn from(place: Place) -> Self {
        Self {
            id: Some(place.id),
            name: Some(place.name),
            hierarchy_level: Some(place.hierarchy_level),
            parent_id: place.parent_id,
        }
    }
}

/// A fuzzy-search hit: a place plus its trigram similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    #[serde(flatten)]
    pub place: Place,
    /// 0.0 to 1.0, where 1.0 is an exact match.
    pub similarity_score: f64,
}

/// Geographic point (lon/lat)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.lon, c.lat)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lon, self.lat)
    }
}
