//! Convergence tracking for training runs.
//!
//! - `MovingAverage`: fixed-window mean of recent values
//! - `EpisodeMetrics`: per-episode record for every agent in a population
//! - `MetricsLog`: JSON-lines sink, one `EpisodeMetrics` per line

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agents::AgentKind;
use crate::core::Result;

/// Mean over the last `window` values.
#[derive(Clone, Debug)]
pub struct MovingAverage {
    window: usize,
    values: VecDeque<f32>,
    sum: f64,
}

impl MovingAverage {
    /// Create an average over at most `window` values (minimum 1).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Add a value, dropping the oldest once the window is full.
    pub fn push(&mut self, value: f32) {
        if self.values.len() == self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= f64::from(old);
            }
        }
        self.values.push_back(value);
        self.sum += f64::from(value);
    }

    /// Current mean, `0.0` when empty.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            (self.sum / self.values.len() as f64) as f32
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the window has filled.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }
}

/// One agent's line in an episode record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentEpisodeMetrics {
    pub label: String,
    pub kind: AgentKind,
    pub seat: usize,
    /// Raw best-lineup points.
    pub score: f32,
    /// Reward received under the agent's own scheme.
    pub reward: f32,
    pub loss: Option<f32>,
    /// Moving average of `score` including this episode.
    pub score_average: f32,
}

/// Everything recorded about one training episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    pub episode: usize,
    pub picks: usize,
    pub agents: Vec<AgentEpisodeMetrics>,
}

impl EpisodeMetrics {
    /// Label of the highest-scoring agent.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        self.agents
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|a| a.label.as_str())
    }
}

/// Append-only JSON-lines metrics file.
pub struct MetricsLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl MetricsLog {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(File::create(path)?),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record.
    pub fn append(&mut self, metrics: &EpisodeMetrics) -> Result<()> {
        serde_json::to_writer(&mut self.writer, metrics)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read every record from a JSON-lines metrics file.
pub fn read_metrics(path: &Path) -> Result<Vec<EpisodeMetrics>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_window() {
        let mut avg = MovingAverage::new(3);
        assert_eq!(avg.mean(), 0.0);
        for v in [1.0, 2.0, 3.0] {
            avg.push(v);
        }
        assert!(avg.is_full());
        assert_eq!(avg.mean(), 2.0);
        avg.push(7.0);
        assert_eq!(avg.len(), 3);
        assert_eq!(avg.mean(), 4.0);
    }

    fn record(episode: usize) -> EpisodeMetrics {
        EpisodeMetrics {
            episode,
            picks: 4,
            agents: vec![
                AgentEpisodeMetrics {
                    label: "ppo".into(),
                    kind: AgentKind::Ppo,
                    seat: 0,
                    score: 120.0,
                    reward: 1.2,
                    loss: Some(0.3),
                    score_average: 120.0,
                },
                AgentEpisodeMetrics {
                    label: "greedy".into(),
                    kind: AgentKind::Greedy,
                    seat: 1,
                    score: 140.0,
                    reward: 1.4,
                    loss: None,
                    score_average: 140.0,
                },
            ],
        }
    }

    #[test]
    fn test_leader() {
        assert_eq!(record(0).leader(), Some("greedy"));
    }

    #[test]
    fn test_jsonl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/metrics.jsonl");

        let mut log = MetricsLog::create(&path).unwrap();
        log.append(&record(0)).unwrap();
        log.append(&record(1)).unwrap();
        log.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(read_metrics(&path).unwrap(), vec![record(0), record(1)]);
    }
}
