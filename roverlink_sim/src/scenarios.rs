//! Built-in mission scenarios.

use crate::network::LinkConfig;

/// Mission used by the classic, flaky-link and blackout scenarios.
pub const CLASSIC_MISSION: &str = "5 3
1 1 E
RFRFRFRF

3 2 N
FRRFLLFFRRFLL

0 3 W
LLFFFLFLFL
";

/// Two rovers leaving the same corner of a 1x1 grid.
pub const SCENT_GUARD_MISSION: &str = "1 1
1 1 N
F

1 1 N
F
";

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Three rovers on a 5x3 grid over a healthy link
    Classic,

    /// A second rover saved by the scent of the first
    ScentGuard,

    /// The classic mission over a lossy, dropping link
    FlakyLink,

    /// Every command fails; sessions go Unstable
    Blackout,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Classic,
            ScenarioId::ScentGuard,
            ScenarioId::FlakyLink,
            ScenarioId::Blackout,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Classic => "classic",
            ScenarioId::ScentGuard => "scent_guard",
            ScenarioId::FlakyLink => "flaky_link",
            ScenarioId::Blackout => "blackout",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Classic => {
                "5x3 grid, three rovers, one lost; later rovers respect its scent"
            }
            ScenarioId::ScentGuard => {
                "1x1 grid, two rovers leave the same corner; only the first is lost"
            }
            ScenarioId::FlakyLink => {
                "Classic mission at 20% command / 30% connect failure and 5% link drop"
            }
            ScenarioId::Blackout => {
                "100% command failure, every batch halts once the link is Unstable"
            }
        }
    }

    /// Mission text the scenario drives.
    pub fn mission(&self) -> &'static str {
        match self {
            ScenarioId::ScentGuard => SCENT_GUARD_MISSION,
            ScenarioId::Classic | ScenarioId::FlakyLink | ScenarioId::Blackout => CLASSIC_MISSION,
        }
    }

    /// Link faults for the scenario.
    pub fn link_config(&self) -> LinkConfig {
        match self {
            ScenarioId::Classic | ScenarioId::ScentGuard => LinkConfig::default(),
            ScenarioId::FlakyLink => LinkConfig::default()
                .with_command_failure_rate(0.2)
                .with_connect_failure_rate(0.3)
                .with_link_drop_rate(0.05),
            ScenarioId::Blackout => LinkConfig::default().with_command_failure_rate(1.0),
        }
    }

    /// Exact result lines, when the outcome does not depend on the seed.
    pub fn expected_lines(&self) -> Option<&'static [&'static str]> {
        match self {
            ScenarioId::Classic => Some(&["1 1 E", "3 3 N LOST", "2 3 S"]),
            ScenarioId::ScentGuard => Some(&["1 1 N LOST", "1 1 N"]),
            ScenarioId::FlakyLink => None,
            ScenarioId::Blackout => Some(&["1 1 E", "3 2 N", "0 3 W"]),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(ScenarioId::Classic),
            "scent_guard" | "scentguard" | "scent" => Ok(ScenarioId::ScentGuard),
            "flaky_link" | "flakylink" | "flaky" => Ok(ScenarioId::FlakyLink),
            "blackout" => Ok(ScenarioId::Blackout),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
