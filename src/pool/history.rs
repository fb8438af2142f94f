//! Recorded real drafts, used as replay opponents and for training data.
//!
//! CSV columns: `draft_id, pick, team, player_id`. `pick` is the 1-based
//! overall pick number and `team` the 0-based seat.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::core::{DraftError, PlayerId, Result, TeamId};

/// One pick from a recorded draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPick {
    pub pick: usize,
    pub team: TeamId,
    pub player: PlayerId,
}

/// A complete recorded draft, picks sorted by overall pick number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealDraft {
    pub id: String,
    pub picks: Vec<HistoricalPick>,
}

impl RealDraft {
    /// Players a seat took, in the order it took them.
    #[must_use]
    pub fn picks_for(&self, team: TeamId) -> Vec<PlayerId> {
        self.picks
            .iter()
            .filter(|p| p.team == team)
            .map(|p| p.player)
            .collect()
    }

    /// Number of seats that made at least one pick.
    #[must_use]
    pub fn team_count(&self) -> usize {
        self.picks
            .iter()
            .map(|p| p.team.index() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    draft_id: String,
    pick: usize,
    team: u8,
    player_id: u32,
}

/// Load recorded drafts from any CSV reader, grouped by `draft_id`.
pub fn load_history_from_reader<R: Read>(reader: R) -> Result<Vec<RealDraft>> {
    let mut csv = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut drafts: BTreeMap<String, Vec<HistoricalPick>> = BTreeMap::new();

    for (i, row) in csv.deserialize::<HistoryRow>().enumerate() {
        let row = row.map_err(|e| DraftError::data(i + 1, e.to_string()))?;
        drafts.entry(row.draft_id).or_default().push(HistoricalPick {
            pick: row.pick,
            team: TeamId::new(row.team),
            player: PlayerId::new(row.player_id),
        });
    }

    Ok(drafts
        .into_iter()
        .map(|(id, mut picks)| {
            picks.sort_by_key(|p| p.pick);
            RealDraft { id, picks }
        })
        .collect())
}

/// Load recorded drafts from a CSV file.
pub fn load_history<P: AsRef<Path>>(path: P) -> Result<Vec<RealDraft>> {
    let file = std::fs::File::open(path)?;
    load_history_from_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_and_sort() {
        let data = "draft_id,pick,team,player_id\n\
                    b,2,1,20\n\
                    a,2,1,11\n\
                    a,1,0,10\n\
                    a,3,1,12\n\
                    b,1,0,21\n";
        let drafts = load_history_from_reader(data.as_bytes()).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].id, "a");
        assert_eq!(drafts[0].picks.iter().map(|p| p.pick).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(drafts[0].picks_for(TeamId::new(1)), vec![PlayerId(11), PlayerId(12)]);
        assert_eq!(drafts[0].team_count(), 2);
    }

    #[test]
    fn test_bad_row() {
        let data = "draft_id,pick,team,player_id\na,one,0,10\n";
        let err = load_history_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DraftError::DataValidation { row: 1, .. }));
    }
}
