//! Non-learning opponents.
//!
//! These act on concrete players rather than position categories and never
//! learn. They fill seats in training populations and tournaments and give
//! tests a deterministic opponent.

use serde::{Deserialize, Serialize};

use super::persistence::{PolicySnapshot, DEFAULT_POLICY_VERSION};
use super::{Agent, AgentInput, AgentKind};
use crate::core::{DraftError, DraftRng, PlayerId, Result, TeamId};
use crate::pool::RealDraft;
use crate::rules::LegalActions;

fn no_legal_player(legal: &LegalActions) -> DraftError {
    DraftError::IllegalAction {
        team: legal.team,
        player: PlayerId::new(u32::MAX),
        reason: "no legal player".to_string(),
    }
}

/// Best-ranked legal player: highest projection, then ADP, then ID.
fn greedy_pick(input: &AgentInput<'_>) -> Result<PlayerId> {
    let pool = input.state.pool();
    input
        .legal
        .players
        .iter()
        .filter_map(|id| pool.get(*id))
        .min_by(|a, b| a.rank_cmp(b))
        .map(|p| p.id)
        .ok_or_else(|| no_legal_player(input.legal))
}

// === Greedy ===

/// Always takes the highest projected legal player.
#[derive(Clone, Debug, Default)]
pub struct GreedyAgent;

impl GreedyAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Agent for GreedyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Greedy
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        greedy_pick(input)
    }

    fn set_training(&mut self, _training: bool) {}

    fn is_training(&self) -> bool {
        false
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        PolicySnapshot::encode(self.kind(), DEFAULT_POLICY_VERSION, &())
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        snapshot.decode::<()>(self.kind(), DEFAULT_POLICY_VERSION)
    }
}

// === Random ===

/// Uniformly random legal player.
#[derive(Clone, Debug)]
pub struct RandomAgent {
    rng: DraftRng,
}

impl RandomAgent {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DraftRng::new(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Random
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        self.rng
            .choose(&input.legal.players)
            .copied()
            .ok_or_else(|| no_legal_player(input.legal))
    }

    fn set_training(&mut self, _training: bool) {}

    fn is_training(&self) -> bool {
        false
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        PolicySnapshot::encode(self.kind(), DEFAULT_POLICY_VERSION, &self.rng.seed())
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        let seed: u64 = snapshot.decode(self.kind(), DEFAULT_POLICY_VERSION)?;
        self.rng = DraftRng::new(seed);
        Ok(())
    }
}

// === Replay ===

#[derive(Serialize, Deserialize)]
struct ReplayParams {
    draft: RealDraft,
}

/// Re-enacts a recorded draft.
///
/// The seat's recorded picks are tried in order; the first one still legal
/// is taken. When none is, the greedy pick is used.
#[derive(Clone, Debug)]
pub struct ReplayAgent {
    draft: RealDraft,
}

impl ReplayAgent {
    #[must_use]
    pub fn new(draft: RealDraft) -> Self {
        Self { draft }
    }

    /// The recorded draft being replayed.
    #[must_use]
    pub fn draft(&self) -> &RealDraft {
        &self.draft
    }
}

impl Agent for ReplayAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Replay
    }

    fn label(&self) -> String {
        format!("replay:{}", self.draft.id)
    }

    fn select_action(&mut self, input: &AgentInput<'_>) -> Result<PlayerId> {
        let seats = self.draft.team_count().max(1);
        let seat = TeamId::new((input.legal.team.index() % seats) as u8);
        let recorded = self
            .draft
            .picks
            .iter()
            .filter(|p| p.team == seat)
            .map(|p| p.player)
            .find(|id| input.legal.contains(*id));
        match recorded {
            Some(player) => Ok(player),
            None => greedy_pick(input),
        }
    }

    fn set_training(&mut self, _training: bool) {}

    fn is_training(&self) -> bool {
        false
    }

    fn save_policy(&self) -> Result<PolicySnapshot> {
        let params = ReplayParams {
            draft: self.draft.clone(),
        };
        PolicySnapshot::encode(self.kind(), DEFAULT_POLICY_VERSION, &params)
    }

    fn load_policy(&mut self, snapshot: &PolicySnapshot) -> Result<()> {
        let params: ReplayParams = snapshot.decode(self.kind(), DEFAULT_POLICY_VERSION)?;
        self.draft = params.draft;
        Ok(())
    }
}
