//! Serializable summaries of a solve.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::efg::PlayerId;
use crate::profile::BehaviorProfile;
use crate::subgame::config::SolveStats;

/// Everything a solve produced, ready for JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionReport {
    /// Game title.
    pub game: String,
    /// Backend name.
    pub method: String,
    /// Combination cap used (0 = unbounded).
    pub max_solutions: usize,
    /// Run statistics.
    pub stats: SolveStats,
    /// One entry per equilibrium found.
    pub solutions: Vec<SolutionEntry>,
}

/// One equilibrium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionEntry {
    /// Expected payoff per player.
    pub payoffs: Vec<f64>,
    /// Behavior strategy per player.
    pub players: Vec<PlayerStrategy>,
}

/// A player's behavior strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStrategy {
    /// Player name.
    pub name: String,
    /// Action probabilities per information set.
    pub infosets: Vec<InfosetStrategy>,
}

/// Action probabilities at one information set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfosetStrategy {
    /// Information set label.
    pub label: String,
    /// Action labels.
    pub actions: Vec<String>,
    /// Probability of each action.
    pub probs: Vec<f64>,
}

impl SolutionEntry {
    /// Describe `profile` using `names` for the players.
    pub fn new(profile: &BehaviorProfile, names: &[String], payoffs: Vec<f64>) -> Self {
        let players = (0..profile.num_players())
            .map(|pl| {
                let player = PlayerId(pl);
                PlayerStrategy {
                    name: names.get(pl).cloned().unwrap_or_else(|| player.to_string()),
                    infosets: (0..profile.infosets(player).len())
                        .map(|k| InfosetStrategy {
                            label: profile.infoset_label(player, k).to_string(),
                            actions: profile.action_labels(player, k).to_vec(),
                            probs: profile.infoset_probs(player, k).to_vec(),
                        })
                        .collect(),
                }
            })
            .collect();
        Self { payoffs, players }
    }
}

impl SolutionReport {
    /// Save to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())
    }

    /// Print a human-readable summary.
    pub fn print_summary(&self) {
        println!("\n========================================");
        println!("  {} - {}", self.game, self.method);
        println!(
            "  {} solutions | {} subgames | {:.3}s",
            self.stats.solutions, self.stats.subgames_solved, self.stats.elapsed_seconds
        );
        println!("========================================\n");

        for (i, solution) in self.solutions.iter().enumerate() {
            let payoffs: Vec<String> = solution.payoffs.iter().map(|p| format!("{:.4}", p)).collect();
            println!("Solution {} (payoffs {})", i + 1, payoffs.join(", "));
            for player in &solution.players {
                for infoset in &player.infosets {
                    let mix: Vec<String> = infoset
                        .actions
                        .iter()
                        .zip(&infoset.probs)
                        .map(|(a, p)| format!("{} {:.3}", a, p))
                        .collect();
                    println!("  {:<10} {:<28} {}", player.name, infoset.label, mix.join("  "));
                }
            }
        }
    }
}
