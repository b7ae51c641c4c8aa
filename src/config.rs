use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Bfs,
    Dfs,
    Greedy,
    Astar,
    Wastar,
    Iw,
}

impl Strategy {
    /// BFS and DFS order the frontier structurally; everything else prices
    /// states through a heuristic.
    pub fn uses_heuristic(&self) -> bool {
        !matches!(self, Strategy::Bfs | Strategy::Dfs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicKind {
    GoalCount,
    Manhattan,
    Dijkstra,
    ComplexDijkstra,
}

#[derive(Parser, Debug)]
#[command(
    name = "Warehouse MAPF",
    about = "Multi-agent planner for the hospital warehouse domain.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the level file")]
    pub level: Option<String>,

    #[arg(long, help = "Search strategy to use", value_enum)]
    pub strategy: Option<Strategy>,

    #[arg(long, help = "Heuristic for best-first strategies", value_enum)]
    pub heuristic: Option<HeuristicKind>,

    #[arg(long, help = "Weight for weighted A*")]
    pub weight: Option<f64>,

    #[arg(long, help = "Initial novelty width for iterated-width search")]
    pub width: Option<usize>,

    #[arg(long, help = "Maximum novelty width before giving up")]
    pub max_width: Option<usize>,

    #[arg(long, help = "Expanded-node budget before aborting")]
    pub max_expanded: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Shuffle successors before insertion", default_value_t = false)]
    pub shuffle: bool,

    #[arg(
        long,
        help = "Disable heuristic pruning of low-ranked successors",
        default_value_t = false
    )]
    pub no_prune: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub level_path: String,
    pub strategy: Strategy,
    pub heuristic: HeuristicKind,
    pub weight: f64,
    pub width: usize,
    pub max_width: usize,
    pub max_expanded: Option<usize>,
    pub seed: u64,
    pub shuffle: bool,
    pub prune_expansions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            level_path: String::new(),
            strategy: Strategy::Astar,
            heuristic: HeuristicKind::ComplexDijkstra,
            weight: 5.0,
            width: 1,
            max_width: 3,
            max_expanded: None,
            seed: 0,
            shuffle: false,
            prune_expansions: true,
        }
    }
}

impl Config {
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(raw)?;
        Ok(config)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(level) = cli.level.as_ref() {
            self.level_path = level.clone();
        }
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if let Some(heuristic) = cli.heuristic {
            self.heuristic = heuristic;
        }
        if let Some(weight) = cli.weight {
            self.weight = weight;
        }
        if let Some(width) = cli.width {
            self.width = width;
        }
        if let Some(max_width) = cli.max_width {
            self.max_width = max_width;
        }
        if let Some(max_expanded) = cli.max_expanded {
            self.max_expanded = Some(max_expanded);
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.shuffle {
            self.shuffle = true;
        }
        if cli.no_prune {
            self.prune_expansions = false;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.level_path.is_empty() {
            return Err(anyhow!("no level file specified"));
        }
        if self.strategy == Strategy::Wastar && self.weight < 1.0 {
            return Err(anyhow!(
                "weighted A* weight must be at least 1.0, got {}",
                self.weight
            ));
        }
        if self.width < 1 {
            return Err(anyhow!("novelty width must be at least 1"));
        }
        if self.width > self.max_width {
            return Err(anyhow!(
                "initial width {} exceeds maximum width {}",
                self.width,
                self.max_width
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let raw = "level_path: levels/mapf01.lvl\nstrategy: greedy\nheuristic: manhattan\nseed: 7\n";
        let config = Config::from_yaml_str(raw).unwrap();
        assert_eq!(config.strategy, Strategy::Greedy);
        assert_eq!(config.heuristic, HeuristicKind::Manhattan);
        assert_eq!(config.seed, 7);
        assert_eq!(config.weight, 5.0);
        config.validate().unwrap();
    }

    #[test]
    fn unknown_yaml_field_is_rejected() {
        assert!(Config::from_yaml_str("level_path: a.lvl\nbudget: 3\n").is_err());
    }

    #[test]
    fn wastar_weight_below_one_fails_validation() {
        let config = Config {
            level_path: "a.lvl".to_string(),
            strategy: Strategy::Wastar,
            weight: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_level_fails_validation() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn width_above_max_fails_validation() {
        let config = Config {
            level_path: "a.lvl".to_string(),
            width: 4,
            max_width: 3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
