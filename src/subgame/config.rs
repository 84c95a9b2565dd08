//! Configuration for subgame decomposition runs.
//!
//! A run is described by two pieces: the [`SolverConfig`] that controls the
//! decomposition itself and the [`MethodConfig`] naming the backend that
//! solves each subgame. Both serialize to JSON and can be loaded together
//! from a [`RunConfig`] file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::methods::{
    EfgLiap, EnumMixed, EnumParams, Lemke, LemkeParams, LiapParams, NfgLiap, PureNash, SeqForm,
    SeqFormParams, Simpdiv, SimpdivParams, WorkCounters, ZeroSum, ZeroSumParams,
};
use crate::subgame::adapter::{ExtensiveFormAdapter, NormalFormAdapter};
use crate::subgame::backend::SubgameBackend;

/// Configuration for the decomposition engine.
///
/// # Example
/// ```
/// use subgame_solver::SolverConfig;
///
/// let config = SolverConfig::default().with_max_solutions(4);
/// assert_eq!(config.max_solutions, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Cap on the number of partial profiles kept at any level of the
    /// recursion, and on the number of full profiles a subgame returns.
    ///
    /// Zero means unbounded. When the cap binds, the first profiles
    /// enumerated are kept.
    pub max_solutions: usize,
}

impl SolverConfig {
    /// Create a configuration with no cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the combination cap.
    pub fn with_max_solutions(mut self, max_solutions: usize) -> Self {
        self.max_solutions = max_solutions;
        self
    }

    /// Whether a cap is in force.
    pub fn is_capped(&self) -> bool {
        self.max_solutions != 0
    }

    /// Whether `count` profiles fill the cap.
    pub(crate) fn is_full(&self, count: usize) -> bool {
        self.is_capped() && count >= self.max_solutions
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// Every cap is valid, so only malformed JSON is rejected.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// The equilibrium method used on every subgame, with its parameters.
///
/// Serialized with a `method` tag next to the parameters:
///
/// ```
/// use subgame_solver::MethodConfig;
///
/// let method: MethodConfig =
///     serde_json::from_str(r#"{ "method": "lemke", "all_labels": true }"#).unwrap();
/// assert_eq!(method.name(), "lemke");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MethodConfig {
    /// Liapunov minimization on the tree.
    EfgLiap(LiapParams),
    /// Liapunov minimization on the reduced normal form.
    NfgLiap(LiapParams),
    /// Lemke–Howson on the reduced normal form.
    Lemke(LemkeParams),
    /// Sequence-form pivoting on the tree.
    SeqForm(SeqFormParams),
    /// Grid refinement on the reduced normal form.
    Simpdiv(SimpdivParams),
    /// Support enumeration on the reduced normal form.
    EnumMixed(EnumParams),
    /// Pure equilibria of the reduced normal form.
    PureNash,
    /// Minimax linear program on the reduced normal form.
    ZeroSum(ZeroSumParams),
}

impl Default for MethodConfig {
    fn default() -> Self {
        MethodConfig::EnumMixed(EnumParams::default())
    }
}

impl MethodConfig {
    /// Tag of the method.
    pub fn name(&self) -> &'static str {
        match self {
            MethodConfig::EfgLiap(_) => "efg_liap",
            MethodConfig::NfgLiap(_) => "nfg_liap",
            MethodConfig::Lemke(_) => "lemke",
            MethodConfig::SeqForm(_) => "seq_form",
            MethodConfig::Simpdiv(_) => "simpdiv",
            MethodConfig::EnumMixed(_) => "enum_mixed",
            MethodConfig::PureNash => "pure_nash",
            MethodConfig::ZeroSum(_) => "zero_sum",
        }
    }

    /// Validate the method parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            MethodConfig::EfgLiap(params) | MethodConfig::NfgLiap(params) => params.validate(),
            MethodConfig::Lemke(params) => params.validate(),
            MethodConfig::SeqForm(params) => params.validate(),
            MethodConfig::Simpdiv(params) => params.validate(),
            MethodConfig::EnumMixed(params) => params.validate(),
            MethodConfig::PureNash => Ok(()),
            MethodConfig::ZeroSum(params) => params.validate(),
        }
    }

    /// Build the backend this configuration describes.
    pub fn build(&self) -> Result<Box<dyn SubgameBackend>, ConfigError> {
        self.validate()?;
        let backend: Box<dyn SubgameBackend> = match self.clone() {
            MethodConfig::EfgLiap(params) => Box::new(ExtensiveFormAdapter::new(EfgLiap::new(params))),
            MethodConfig::NfgLiap(params) => Box::new(NormalFormAdapter::new(NfgLiap::new(params))),
            MethodConfig::Lemke(params) => Box::new(NormalFormAdapter::new(Lemke::new(params))),
            MethodConfig::SeqForm(params) => Box::new(ExtensiveFormAdapter::new(SeqForm::new(params))),
            MethodConfig::Simpdiv(params) => Box::new(NormalFormAdapter::new(Simpdiv::new(params))),
            MethodConfig::EnumMixed(params) => {
                Box::new(NormalFormAdapter::new(EnumMixed::new(params)))
            }
            MethodConfig::PureNash => Box::new(NormalFormAdapter::new(PureNash::new())),
            MethodConfig::ZeroSum(params) => Box::new(NormalFormAdapter::new(ZeroSum::new(params))),
        };
        Ok(backend)
    }
}

/// A complete run: decomposition settings plus the subgame method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Decomposition settings.
    pub solver: SolverConfig,
    /// Method applied to every subgame.
    pub method: MethodConfig,
    /// Remove strictly dominated strategies after each normal-form reduction.
    pub eliminate_dominated: bool,
}

impl RunConfig {
    /// Validate the method parameters; any solver cap is accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.method.validate()
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A tolerance is out of range.
    InvalidTolerance(&'static str, f64),
    /// A count or budget that must be positive is zero.
    InvalidCount(&'static str),
    /// File could not be read.
    IoError(String),
    /// JSON could not be parsed.
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidTolerance(name, val) => {
                write!(f, "{} tolerance {} is out of range", name, val)
            }
            ConfigError::InvalidCount(name) => write!(f, "{} must be positive", name),
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics of one `solve` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Wall time spent (in seconds).
    pub elapsed_seconds: f64,
    /// Number of full profiles returned.
    pub solutions: usize,
    /// Subgames resolved and collapsed.
    pub subgames_solved: usize,
    /// Backend calls made.
    pub backend_calls: usize,
    /// Work the backend reported during the call.
    pub work: WorkCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_config_from_json() {
        let config = SolverConfig::from_json_str(r#"{ "max_solutions": 4 }"#).unwrap();
        assert_eq!(config, SolverConfig::new().with_max_solutions(4));
        assert!(config.is_full(4));
        assert!(!config.is_full(3));

        let unbounded = SolverConfig::from_json_str("{}").unwrap();
        assert!(!unbounded.is_capped());
        assert!(!unbounded.is_full(usize::MAX));
    }

    #[test]
    fn test_method_tags() {
        let method: MethodConfig =
            serde_json::from_str(r#"{ "method": "nfg_liap", "trials": 3, "seed": 9 }"#).unwrap();
        match &method {
            MethodConfig::NfgLiap(params) => {
                assert_eq!(params.trials, 3);
                assert_eq!(params.seed, Some(9));
                assert_eq!(params.max_iterations, LiapParams::default().max_iterations);
            }
            other => panic!("unexpected method {:?}", other),
        }

        let pure: MethodConfig = serde_json::from_str(r#"{ "method": "pure_nash" }"#).unwrap();
        assert_eq!(pure.name(), "pure_nash");
        assert_eq!(pure.build().unwrap().name(), "pure_nash");
    }

    #[test]
    fn test_invalid_params_rejected() {
        let json = r#"{ "method": { "method": "lemke", "max_pivots": 0 } }"#;
        assert_eq!(
            RunConfig::from_json_str(json).unwrap_err(),
            ConfigError::InvalidCount("lemke.max_pivots")
        );

        let method = MethodConfig::SeqForm(SeqFormParams {
            tolerance: -1.0,
            ..Default::default()
        });
        assert!(method.build().is_err());
    }

    #[test]
    fn test_run_config_defaults() {
        let run = RunConfig::from_json_str(r#"{ "solver": { "max_solutions": 2 } }"#).unwrap();
        assert_eq!(run.solver.max_solutions, 2);
        assert_eq!(run.method.name(), "enum_mixed");
        assert!(!run.eliminate_dominated);
    }

    #[test]
    fn test_any_cap_is_accepted() {
        let huge = format!(r#"{{ "max_solutions": {} }}"#, usize::MAX);
        let config = SolverConfig::from_json_str(&huge).unwrap();
        assert!(config.is_full(usize::MAX));

        let run = RunConfig {
            solver: SolverConfig::new().with_max_solutions(1),
            ..Default::default()
        };
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_parse_and_io_errors() {
        assert!(matches!(
            SolverConfig::from_json_str("not json"),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            RunConfig::from_json_file("/nonexistent/run.json"),
            Err(ConfigError::IoError(_))
        ));
    }
}
