//! One draft played start to finish by a set of seated agents.
//!
//! The runner owns the turn loop. Each team's previous decision stays
//! pending until that team is on the clock again; at that point the
//! transition is completed with the team's new observation and delivered.
//! At the end of the draft every pending decision is closed with the
//! terminal reward and `done = true`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::{category_of, Agent, AgentInput, LearnSchedule, LearnStats};
use crate::core::{DraftError, PlayerId, Result, TeamId, TeamMap};
use crate::nn::{ActionMask, Observation, ObservationEncoder};
use crate::pool::PlayerPool;
use crate::rules::{DraftEnvironment, StepOutcome};

use super::trajectory::Transition;

/// Whether agents learn during the episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeMode {
    /// Deliver transitions and run learning updates.
    Train,
    /// Play only; no transitions, no updates.
    Evaluate,
}

/// Summary of one finished draft.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// `seating[team]` is the index of the agent in that seat.
    pub seating: Vec<usize>,
    /// Raw best-lineup points per team.
    pub final_scores: TeamMap<f32>,
    /// Sum of rewards each team received under its agent's reward scheme.
    pub rewards: TeamMap<f32>,
    pub picks: usize,
    /// Mean learning loss per agent index, if it learned this episode.
    pub losses: Vec<Option<f32>>,
}

impl EpisodeReport {
    /// Final score of the team seated with agent `agent`.
    #[must_use]
    pub fn score_of_agent(&self, agent: usize) -> Option<f32> {
        self.seating
            .iter()
            .position(|&a| a == agent)
            .map(|team| self.final_scores[TeamId::new(team as u8)])
    }
}

struct PendingStep {
    observation: Observation,
    legal: ActionMask,
    action: usize,
    player: PlayerId,
    reward: f32,
}

impl PendingStep {
    fn complete(self, next_observation: Observation, next_legal: ActionMask, terminal: Option<f32>) -> Transition {
        Transition {
            observation: self.observation,
            legal: self.legal,
            action: self.action,
            player: self.player,
            reward: self.reward + terminal.unwrap_or(0.0),
            next_observation,
            next_legal,
            done: terminal.is_some(),
        }
    }
}

#[derive(Default)]
struct LossTally {
    total: f32,
    updates: usize,
}

impl LossTally {
    fn add(&mut self, stats: Option<LearnStats>) {
        if let Some(stats) = stats {
            self.total += stats.loss;
            self.updates += 1;
        }
    }

    fn mean(&self) -> Option<f32> {
        (self.updates > 0).then(|| self.total / self.updates as f32)
    }
}

fn check_seating(seating: &[usize], team_count: usize, agent_count: usize) -> Result<()> {
    if seating.len() != team_count || agent_count != team_count {
        return Err(DraftError::config(format!(
            "{agent_count} agents in {} seats for a {team_count}-team draft",
            seating.len()
        )));
    }
    let mut seen = vec![false; agent_count];
    for &agent in seating {
        match seen.get_mut(agent) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(DraftError::config(format!("invalid seating {seating:?}"))),
        }
    }
    Ok(())
}

fn deliver(agent: &mut dyn Agent, transition: Transition, losses: &mut LossTally) {
    agent.observe_transition(transition);
    if agent.learn_schedule() == LearnSchedule::PerStep {
        losses.add(agent.learn());
    }
}

/// Play one draft.
///
/// `seating[team]` names the agent for each seat; it must be a permutation
/// of `0..agents.len()` and the agent count must equal the configured team
/// count. Any error aborts the episode; the caller is responsible for
/// discarding partial agent state via `Agent::abort_episode`.
pub fn run_episode(
    env: &mut DraftEnvironment,
    encoder: &ObservationEncoder,
    pool: Arc<PlayerPool>,
    agents: &mut [Box<dyn Agent>],
    seating: &[usize],
    mode: EpisodeMode,
) -> Result<EpisodeReport> {
    let team_count = env.config().team_count;
    check_seating(seating, team_count, agents.len())?;

    let order = env.default_order();
    env.reset(pool, team_count, order)?;

    let training = mode == EpisodeMode::Train;
    let mut pending: TeamMap<Option<PendingStep>> = TeamMap::new(team_count, |_| None);
    let mut rewards: TeamMap<f32> = TeamMap::with_value(team_count, 0.0);
    let mut losses: Vec<LossTally> = agents.iter().map(|_| LossTally::default()).collect();
    let mut last: Option<StepOutcome> = None;
    let mut picks = 0;

    while !env.is_done() {
        let state = env.state()?;
        let Some(team) = state.active_team() else { break };
        let seat = seating[team.index()];
        let agent = agents[seat].as_mut();

        let observation = encoder.encode(state, team, agent.scope());
        let legal = env.legal_actions()?;
        let mask = ActionMask::from(&legal);

        if training {
            if let Some(prev) = pending[team].take() {
                deliver(agent, prev.complete(observation.clone(), mask, None), &mut losses[seat]);
            }
        }

        let input = AgentInput {
            observation: &observation,
            legal: &legal,
            state,
        };
        let player = agent.select_action(&input)?;
        let action = category_of(state, player);

        let outcome = env.step(player)?;
        let reward = agent.reward_scheme().combine(outcome.shaping_reward, 0.0);
        rewards[team] += reward;
        pending[team] = Some(PendingStep {
            observation,
            legal: mask,
            action,
            player,
            reward,
        });
        picks += 1;
        last = Some(outcome);
    }

    let final_scores = last
        .as_ref()
        .and_then(|o| o.final_scores.clone())
        .unwrap_or_else(|| TeamMap::with_value(team_count, 0.0));
    let terminal = last
        .as_ref()
        .and_then(|o| o.terminal_rewards.clone())
        .unwrap_or_else(|| TeamMap::with_value(team_count, 0.0));

    let state = env.state()?;
    for team in TeamId::all(team_count) {
        let seat = seating[team.index()];
        let agent = agents[seat].as_mut();
        let terminal_reward = agent.reward_scheme().combine(0.0, terminal[team]);
        rewards[team] += terminal_reward;

        if training {
            if let Some(prev) = pending[team].take() {
                let final_obs = encoder.encode(state, team, agent.scope());
                let transition = prev.complete(final_obs, ActionMask::default(), Some(terminal_reward));
                deliver(agent, transition, &mut losses[seat]);
            }
        }
    }

    if training {
        for (agent, tally) in agents.iter_mut().zip(losses.iter_mut()) {
            if agent.learn_schedule() == LearnSchedule::PerEpisode {
                tally.add(agent.learn());
            }
            agent.end_episode();
        }
    }

    Ok(EpisodeReport {
        seating: seating.to_vec(),
        final_scores,
        rewards,
        picks,
        losses: losses.iter().map(LossTally::mean).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{GreedyAgent, RandomAgent};
    use crate::core::{DraftConfig, Player, Position, RosterConfig};

    fn setup() -> (DraftEnvironment, ObservationEncoder, Arc<PlayerPool>) {
        let players = vec![
            Player::new(PlayerId(0), "QB1", Position::QB, 300.0, 1.0, 50.0),
            Player::new(PlayerId(1), "QB2", Position::QB, 250.0, 2.0, 0.0),
            Player::new(PlayerId(2), "RB1", Position::RB, 200.0, 3.0, 40.0),
            Player::new(PlayerId(3), "RB2", Position::RB, 190.0, 4.0, 30.0),
            Player::new(PlayerId(4), "WR1", Position::WR, 180.0, 5.0, 20.0),
            Player::new(PlayerId(5), "WR2", Position::WR, 170.0, 6.0, 10.0),
        ];
        let roster = RosterConfig::default()
            .with_starters([1, 1, 1, 0, 0])
            .with_flex(0, vec![]);
        let config = DraftConfig::new(2, 3).with_roster(roster);
        let encoder = ObservationEncoder::new(&config);
        let env = DraftEnvironment::new(config).unwrap();
        (env, encoder, Arc::new(PlayerPool::new(players).unwrap()))
    }

    #[test]
    fn test_greedy_episode() {
        let (mut env, encoder, pool) = setup();
        let mut agents: Vec<Box<dyn Agent>> = vec![Box::new(GreedyAgent::new()), Box::new(GreedyAgent::new())];
        let report = run_episode(&mut env, &encoder, pool, &mut agents, &[0, 1], EpisodeMode::Evaluate).unwrap();

        // Snake A B B A A B: A takes QB1, RB2, WR1; B takes QB2, RB1, WR2
        assert_eq!(report.picks, 6);
        assert_eq!(report.final_scores[TeamId::new(0)], 670.0);
        assert_eq!(report.final_scores[TeamId::new(1)], 620.0);
        assert_eq!(report.score_of_agent(1), Some(620.0));
    }

    #[test]
    fn test_seating_validation() {
        let (mut env, encoder, pool) = setup();
        let mut agents: Vec<Box<dyn Agent>> = vec![Box::new(GreedyAgent::new()), Box::new(RandomAgent::new(1))];
        let err = run_episode(&mut env, &encoder, pool.clone(), &mut agents, &[0, 0], EpisodeMode::Train).unwrap_err();
        assert!(matches!(err, DraftError::Config(_)));

        let mut three: Vec<Box<dyn Agent>> = vec![
            Box::new(GreedyAgent::new()),
            Box::new(GreedyAgent::new()),
            Box::new(GreedyAgent::new()),
        ];
        assert!(run_episode(&mut env, &encoder, pool, &mut three, &[0, 1], EpisodeMode::Train).is_err());
    }

    #[test]
    fn test_swapped_seating() {
        let (mut env, encoder, pool) = setup();
        let mut agents: Vec<Box<dyn Agent>> = vec![Box::new(RandomAgent::new(3)), Box::new(GreedyAgent::new())];
        let report = run_episode(&mut env, &encoder, pool, &mut agents, &[1, 0], EpisodeMode::Evaluate).unwrap();
        // Greedy sits in seat 0 and always gets QB1
        let greedy_score = report.score_of_agent(1).unwrap();
        assert!(greedy_score >= 300.0);
        assert_eq!(report.final_scores[TeamId::new(0)], greedy_score);
    }
}
