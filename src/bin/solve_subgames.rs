//! Subgame decomposition solver binary.
//!
//! Usage:
//!   cargo run --release --bin solve_subgames -- [OPTIONS]
//!
//! Options:
//!   --game <FILE>            Game JSON file
//!   --demo <NAME>            Built-in game: pennies, dilemma, sexes, two-stage,
//!                            centipede, menu, kuhn (default: two-stage)
//!   --config <FILE>          Run configuration JSON file (optional)
//!   --method <NAME>          Method with default parameters (overrides --config)
//!   --max <N>                Cap on combined solutions (0 = unbounded)
//!   --eliminate-dominated    Remove strictly dominated strategies first
//!   --output <FILE>          Output file (default: solutions.json)
//!   --quiet                  Only print the summary line

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use subgame_solver::efg::GameTree;
use subgame_solver::nfg::{NormalForm, Support};
use subgame_solver::{
    games, DominanceObserver, MethodConfig, NodeId, RunConfig, SolveObserver, SubgameSolver,
};

/// Ticks a spinner per subgame and optionally prunes dominated strategies.
struct ProgressObserver {
    bar: ProgressBar,
    subgames: u64,
    dominance: Option<DominanceObserver>,
}

impl ProgressObserver {
    fn new(eliminate_dominated: bool, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            bar,
            subgames: 0,
            dominance: eliminate_dominated.then(DominanceObserver::new),
        }
    }
}

impl SolveObserver for ProgressObserver {
    fn view_subgame(&mut self, node: NodeId, view: &GameTree) {
        self.subgames += 1;
        self.bar.set_message(format!(
            "subgame {} at {} ({} nodes)",
            self.subgames,
            node,
            view.num_nodes()
        ));
        self.bar.tick();
    }

    fn view_normal(&mut self, nfg: &NormalForm, support: &mut Support) {
        if let Some(dominance) = &mut self.dominance {
            dominance.view_normal(nfg, support);
        }
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        if let Some(dominance) = &self.dominance {
            info!("removed {} dominated strategies", dominance.removed());
        }
    }
}

fn demo(name: &str) -> Result<GameTree> {
    let tree = match name {
        "pennies" => games::matching_pennies()?,
        "dilemma" => games::prisoners_dilemma()?,
        "sexes" => games::battle_of_sexes()?,
        "two-stage" => games::two_stage()?,
        "centipede" => games::centipede(8)?,
        "menu" => games::pennies_menu(3)?,
        "kuhn" => games::kuhn_poker()?,
        _ => bail!("unknown demo game '{}'", name),
    };
    Ok(tree)
}

fn method_by_name(name: &str) -> Result<MethodConfig> {
    let method = match name {
        "efg_liap" => MethodConfig::EfgLiap(Default::default()),
        "nfg_liap" => MethodConfig::NfgLiap(Default::default()),
        "lemke" => MethodConfig::Lemke(Default::default()),
        "seq_form" => MethodConfig::SeqForm(Default::default()),
        "simpdiv" => MethodConfig::Simpdiv(Default::default()),
        "enum_mixed" => MethodConfig::EnumMixed(Default::default()),
        "pure_nash" => MethodConfig::PureNash,
        "zero_sum" => MethodConfig::ZeroSum(Default::default()),
        _ => bail!("unknown method '{}'", name),
    };
    Ok(method)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut game_file: Option<String> = None;
    let mut demo_name = "two-stage".to_string();
    let mut config_file: Option<String> = None;
    let mut method_name: Option<String> = None;
    let mut max_solutions: Option<usize> = None;
    let mut eliminate_dominated = false;
    let mut output_file = "solutions.json".to_string();
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--game" | "-g" => {
                i += 1;
                if i < args.len() {
                    game_file = Some(args[i].clone());
                }
            }
            "--demo" | "-d" => {
                i += 1;
                if i < args.len() {
                    demo_name = args[i].clone();
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_file = Some(args[i].clone());
                }
            }
            "--method" | "-m" => {
                i += 1;
                if i < args.len() {
                    method_name = Some(args[i].clone());
                }
            }
            "--max" => {
                i += 1;
                if i < args.len() {
                    max_solutions = Some(
                        args[i]
                            .parse()
                            .with_context(|| format!("invalid --max '{}'", args[i]))?,
                    );
                }
            }
            "--eliminate-dominated" | "-e" => {
                eliminate_dominated = true;
            }
            "--output" | "-o" => {
                i += 1;
                if i < args.len() {
                    output_file = args[i].clone();
                }
            }
            "--quiet" | "-q" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    // Load or create configuration
    let mut config = match &config_file {
        Some(path) => RunConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => RunConfig::default(),
    };
    if let Some(name) = &method_name {
        config.method = method_by_name(name)?;
    }
    if let Some(max) = max_solutions {
        config.solver.max_solutions = max;
    }
    config.eliminate_dominated |= eliminate_dominated;
    config.validate()?;

    let tree = match &game_file {
        Some(path) => GameTree::from_json_file(path)
            .with_context(|| format!("loading game from {}", path))?,
        None => demo(&demo_name)?,
    };

    info!(
        "solving '{}' ({} nodes) with {}, cap {}",
        tree.title(),
        tree.num_nodes(),
        config.method.name(),
        if config.solver.is_capped() {
            config.solver.max_solutions.to_string()
        } else {
            "none".to_string()
        }
    );

    let backend = config.method.build()?;
    let observer = ProgressObserver::new(config.eliminate_dominated, quiet);
    let mut solver = SubgameSolver::new(tree, backend, config.solver.clone())?.with_observer(observer);
    solver.solve()?;

    let report = solver.report();
    // Clears the spinner before printing.
    drop(solver);
    if quiet {
        println!(
            "{} solutions in {:.3}s",
            report.stats.solutions, report.stats.elapsed_seconds
        );
    } else {
        report.print_summary();
    }

    report
        .save_json(&output_file)
        .with_context(|| format!("saving solutions to {}", output_file))?;
    info!("solutions saved to {}", output_file);

    Ok(())
}

fn print_help() {
    println!("Subgame Decomposition Solver");
    println!();
    println!("Usage: solve_subgames [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --game, -g <FILE>          Game JSON file");
    println!("  --demo, -d <NAME>          Built-in game (default: two-stage)");
    println!("                             pennies, dilemma, sexes, two-stage,");
    println!("                             centipede, menu, kuhn");
    println!("  --config, -c <FILE>        Run configuration JSON file");
    println!("  --method, -m <NAME>        efg_liap, nfg_liap, lemke, seq_form,");
    println!("                             simpdiv, enum_mixed, pure_nash, zero_sum");
    println!("  --max <N>                  Cap on combined solutions (0 = unbounded)");
    println!("  --eliminate-dominated, -e  Remove strictly dominated strategies");
    println!("  --output, -o <FILE>        Output file (default: solutions.json)");
    println!("  --quiet, -q                Only print the summary line");
    println!("  --help, -h                 Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dilemma() -> NormalForm {
        NormalForm::bimatrix(
            &[vec![3.0, 0.0], vec![5.0, 1.0]],
            &[vec![3.0, 5.0], vec![0.0, 1.0]],
        )
    }

    #[test]
    fn test_progress_observer_counts_dominated_strategies() {
        let nfg = dilemma();
        let mut support = Support::full(&nfg);
        let mut observer = ProgressObserver::new(true, true);

        observer.view_normal(&nfg, &mut support);

        assert_eq!(support.num_active(0), 1);
        assert_eq!(observer.dominance.as_ref().map(DominanceObserver::removed), Some(2));
    }

    #[test]
    fn test_progress_observer_keeps_support_by_default() {
        let nfg = dilemma();
        let mut support = Support::full(&nfg);
        let mut observer = ProgressObserver::new(false, true);

        observer.view_normal(&nfg, &mut support);

        assert_eq!(support.num_active(0), 2);
        assert!(observer.dominance.is_none());
    }
}
