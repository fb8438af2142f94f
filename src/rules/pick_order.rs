//! Pick order generation and validation.
//!
//! A `PickOrder` is the full, fixed sequence of seats for one draft. It is
//! built once per episode and never changes while the draft runs.

use std::sync::Arc;

use crate::core::{DraftError, PickOrderKind, Result, TeamId};

/// Fixed seat sequence for a whole draft. Cloning is O(1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickOrder {
    seats: Arc<[TeamId]>,
}

impl PickOrder {
    /// Snake order: direction reverses at each round boundary.
    ///
    /// ```
    /// use draft_optimizer::core::TeamId;
    /// use draft_optimizer::rules::PickOrder;
    ///
    /// let order = PickOrder::snake(2, 3);
    /// let seats: Vec<u8> = order.as_slice().iter().map(|t| t.0).collect();
    /// assert_eq!(seats, vec![0, 1, 1, 0, 0, 1]);
    /// ```
    #[must_use]
    pub fn snake(team_count: usize, rounds: usize) -> Self {
        let forward: Vec<TeamId> = TeamId::all(team_count).collect();
        let mut seats = Vec::with_capacity(team_count * rounds);
        for round in 0..rounds {
            if round % 2 == 0 {
                seats.extend(forward.iter().copied());
            } else {
                seats.extend(forward.iter().rev().copied());
            }
        }
        Self::from_seats(seats)
    }

    /// Linear order: every round uses seat order 0..n.
    #[must_use]
    pub fn linear(team_count: usize, rounds: usize) -> Self {
        let seats = (0..rounds)
            .flat_map(|_| TeamId::all(team_count))
            .collect::<Vec<_>>();
        Self::from_seats(seats)
    }

    /// Build the order for a configured kind.
    #[must_use]
    pub fn for_kind(kind: PickOrderKind, team_count: usize, rounds: usize) -> Self {
        match kind {
            PickOrderKind::Snake => Self::snake(team_count, rounds),
            PickOrderKind::Linear => Self::linear(team_count, rounds),
        }
    }

    /// Use an explicit seat sequence.
    #[must_use]
    pub fn from_seats(seats: Vec<TeamId>) -> Self {
        Self { seats: seats.into() }
    }

    /// Number of picks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the order has no picks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Seat on the clock at a turn.
    #[must_use]
    pub fn get(&self, turn: usize) -> Option<TeamId> {
        self.seats.get(turn).copied()
    }

    /// The whole sequence.
    #[must_use]
    pub fn as_slice(&self) -> &[TeamId] {
        &self.seats
    }

    /// Check that the order covers `team_count * rounds` picks, names only
    /// valid seats, and gives every seat exactly `rounds` picks.
    pub fn validate(&self, team_count: usize, rounds: usize) -> Result<()> {
        let expected = team_count * rounds;
        if self.seats.len() != expected {
            return Err(DraftError::config(format!(
                "pick order has {} picks, expected {expected} ({team_count} teams x {rounds} rounds)",
                self.seats.len()
            )));
        }
        let mut counts = vec![0_usize; team_count];
        for seat in self.seats.iter() {
            match counts.get_mut(seat.index()) {
                Some(count) => *count += 1,
                None => {
                    return Err(DraftError::config(format!(
                        "pick order names {seat} but only {team_count} teams are drafting"
                    )))
                }
            }
        }
        if let Some(seat) = counts.iter().position(|&c| c != rounds) {
            return Err(DraftError::config(format!(
                "seat {seat} has {} picks in the order, expected {rounds}",
                counts[seat]
            )));
        }
        Ok(())
    }
}
