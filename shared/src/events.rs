use serde::{Deserialize, Serialize};

use crate::territory::{TerritoryId, TerritoryRecord, deserialize_records};

/// Events pushed on the creation feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A territory was inserted by some client.
    Created {
        #[serde(default)]
        seq: u64,
        territory: TerritoryRecord,
        timestamp: String,
    },
    /// The subscriber fell behind; every current territory, to be folded like creations.
    Resync {
        #[serde(default)]
        seq: u64,
        #[serde(deserialize_with = "deserialize_records")]
        territories: Vec<TerritoryRecord>,
        timestamp: String,
    },
}

impl FeedEvent {
    pub fn seq(&self) -> u64 {
        match self {
            FeedEvent::Created { seq, .. } | FeedEvent::Resync { seq, .. } => *seq,
        }
    }

    pub fn into_records(self) -> Vec<TerritoryRecord> {
        match self {
            FeedEvent::Created { territory, .. } => vec![territory],
            FeedEvent::Resync { territories, .. } => territories,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub id: TerritoryId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub coords: Vec<[f64; 2]>,
    #[serde(default)]
    pub area: f64,
}
