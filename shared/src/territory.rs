use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::InvalidInput;
use crate::geometry::{Ring, area};

/// The four player colors. Closed set: anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Green,
    Red,
    Blue,
    Yellow,
}

impl Owner {
    pub const ALL: [Owner; 4] = [Owner::Green, Owner::Red, Owner::Blue, Owner::Yellow];

    pub const fn as_str(self) -> &'static str {
        match self {
            Owner::Green => "green",
            Owner::Red => "red",
            Owner::Blue => "blue",
            Owner::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Owner {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Owner::ALL
            .into_iter()
            .find(|owner| owner.as_str() == normalized)
            .ok_or_else(|| InvalidInput::UnknownOwner(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryId(String);

impl TerritoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random identity for a freshly committed territory.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Deterministic identity for records that arrive without one.
    pub fn from_coordinates(coords: &[[f64; 2]]) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        for [lat, lng] in coords {
            hasher.update(&lat.to_bits().to_le_bytes());
            hasher.update(&lng.to_bits().to_le_bytes());
        }
        Self(format!("coords-{:08x}-{}", hasher.finalize(), coords.len()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed, owned region. The area is always derived from the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Territory {
    pub id: TerritoryId,
    pub owner: Owner,
    pub ring: Ring,
    pub area_km2: f64,
}

impl Territory {
    pub fn new(id: TerritoryId, owner: Owner, ring: Ring) -> Self {
        let area_km2 = area(&ring);
        Self {
            id,
            owner,
            ring,
            area_km2,
        }
    }

    pub fn replace_ring(&mut self, ring: Ring) {
        self.area_km2 = area(&ring);
        self.ring = ring;
    }

    pub fn to_record(&self) -> TerritoryRecord {
        TerritoryRecord {
            id: Some(self.id.clone()),
            player_color: self.owner.as_str().to_string(),
            coords: self.ring.to_lat_lng(),
            area: self.area_km2,
        }
    }
}

/// Wire form of a territory, as exchanged with the store and the feed.
///
/// Coordinates are `[lat, lng]`. The owner stays a string here so that an unknown color
/// rejects one record instead of failing a whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TerritoryId>,
    pub player_color: String,
    pub coords: Vec<[f64; 2]>,
    /// Display only; recomputed from `coords` on ingest.
    #[serde(default)]
    pub area: f64,
}

impl TryFrom<TerritoryRecord> for Territory {
    type Error = InvalidInput;

    fn try_from(record: TerritoryRecord) -> Result<Self, Self::Error> {
        let owner = record.player_color.parse::<Owner>()?;
        let ring = Ring::from_lat_lng(&record.coords)?;
        let id = record
            .id
            .unwrap_or_else(|| TerritoryId::from_coordinates(&record.coords));
        Ok(Territory::new(id, owner, ring))
    }
}

/// Either a well-formed record or anything else found in its place.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListEntry {
    Record(TerritoryRecord),
    Malformed(serde::de::IgnoredAny),
}

/// Deserialize a list of records, dropping entries that do not have the record shape.
pub fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<TerritoryRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ListEntry>::deserialize(deserializer)?;
    let total = entries.len();
    let records: Vec<TerritoryRecord> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            ListEntry::Record(record) => Some(record),
            ListEntry::Malformed(_skipped) => None,
        })
        .collect();
    if records.len() < total {
        debug!(
            dropped = total - records.len(),
            kept = records.len(),
            "dropping malformed territory records"
        );
    }
    Ok(records)
}

/// A territory list payload. Malformed entries are dropped one by one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordList(pub Vec<TerritoryRecord>);

impl RecordList {
    pub fn into_inner(self) -> Vec<TerritoryRecord> {
        self.0
    }
}

impl<'de> Deserialize<'de> for RecordList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_records(deserializer).map(RecordList)
    }
}

/// The local authoritative view: at most one territory per id, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerritorySet {
    territories: BTreeMap<TerritoryId, Territory>,
}

impl TerritorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    pub fn get(&self, id: &TerritoryId) -> Option<&Territory> {
        self.territories.get(id)
    }

    pub fn contains(&self, id: &TerritoryId) -> bool {
        self.territories.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    pub fn owned_by(&self, owner: Owner) -> impl Iterator<Item = &Territory> {
        self.iter().filter(move |t| t.owner == owner)
    }

    /// Insert or replace by id, returning the previous entry.
    pub fn insert(&mut self, territory: Territory) -> Option<Territory> {
        self.territories.insert(territory.id.clone(), territory)
    }

    pub fn remove(&mut self, id: &TerritoryId) -> Option<Territory> {
        self.territories.remove(id)
    }

    /// Replace a territory's ring in place. Returns false if the id is unknown.
    pub fn replace_ring(&mut self, id: &TerritoryId, ring: Ring) -> bool {
        match self.territories.get_mut(id) {
            Some(territory) => {
                territory.replace_ring(ring);
                true
            }
            None => false,
        }
    }

    /// Move a territory to the identity the store actually recorded.
    pub fn rekey(&mut self, from: &TerritoryId, to: TerritoryId) -> bool {
        let Some(mut territory) = self.territories.remove(from) else {
            return false;
        };
        territory.id = to.clone();
        self.territories.insert(to, territory);
        true
    }

    pub fn find_by_ring(&self, ring: &Ring) -> Option<&Territory> {
        self.iter().find(|t| &t.ring == ring)
    }

    pub fn total_area(&self) -> f64 {
        self.iter().map(|t| t.area_km2).sum()
    }

    pub fn total_area_of(&self, owner: Owner) -> f64 {
        self.owned_by(owner).map(|t| t.area_km2).sum()
    }
}

impl FromIterator<Territory> for TerritorySet {
    fn from_iter<I: IntoIterator<Item = Territory>>(iter: I) -> Self {
        let mut set = TerritorySet::new();
        for territory in iter {
            set.insert(territory);
        }
        set
    }
}
