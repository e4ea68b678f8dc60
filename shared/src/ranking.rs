use serde::{Deserialize, Serialize};

use crate::colors::owner_hex;
use crate::territory::{Owner, Territory};

/// Total holdings of one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerStanding {
    pub owner: Owner,
    pub color: String,
    pub area_km2: f64,
    pub territories: usize,
}

/// One standing per owner, in the fixed owner order, zero-filled.
pub fn standings<'a>(territories: impl IntoIterator<Item = &'a Territory>) -> Vec<OwnerStanding> {
    let mut totals = [(0.0_f64, 0_usize); 4];
    for territory in territories {
        let slot = &mut totals[owner_index(territory.owner)];
        slot.0 += territory.area_km2;
        slot.1 += 1;
    }

    Owner::ALL
        .into_iter()
        .zip(totals)
        .map(|(owner, (area_km2, territories))| OwnerStanding {
            owner,
            color: owner_hex(owner),
            area_km2,
            territories,
        })
        .collect()
}

/// Standings sorted by area, largest first; ties keep the fixed owner order.
pub fn leaderboard<'a>(territories: impl IntoIterator<Item = &'a Territory>) -> Vec<OwnerStanding> {
    let mut ranked = standings(territories);
    ranked.sort_by(|a, b| b.area_km2.total_cmp(&a.area_km2));
    ranked
}

pub fn format_km2(area_km2: f64) -> String {
    format!("{area_km2:.2} km²")
}

fn owner_index(owner: Owner) -> usize {
    match owner {
        Owner::Green => 0,
        Owner::Red => 1,
        Owner::Blue => 2,
        Owner::Yellow => 3,
    }
}
