//! Game settings
//!
//! Chosen by the external screen flow and handed in through the page URL.
//! Nothing here is persisted between sessions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::GESTURE_ENDPOINT;
use crate::error::SettingsError;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Index into per-tier constant tables
    pub fn tier(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Parse, falling back to the easiest tier on unknown input
    pub fn parse_or_default(s: &str) -> Self {
        parse_or_warn(s)
    }
}

impl FromStr for Difficulty {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "e" => Ok(Difficulty::Easy),
            "medium" | "med" | "m" => Ok(Difficulty::Medium),
            "hard" | "h" => Ok(Difficulty::Hard),
            _ => Err(SettingsError::unknown("difficulty", s)),
        }
    }
}

/// Arithmetic operation the questions use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Mixed,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
        Operation::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
            Operation::Mixed => "mixed",
        }
    }

    /// Parse, falling back to addition on unknown input
    pub fn parse_or_default(s: &str) -> Self {
        parse_or_warn(s)
    }
}

impl FromStr for Operation {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "addition" | "add" | "+" => Ok(Operation::Addition),
            "subtraction" | "sub" | "-" => Ok(Operation::Subtraction),
            "multiplication" | "mul" | "*" | "x" => Ok(Operation::Multiplication),
            "division" | "div" | "/" => Ok(Operation::Division),
            "mixed" | "mix" => Ok(Operation::Mixed),
            _ => Err(SettingsError::unknown("operation", s)),
        }
    }
}

/// Where cursor/trigger input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    #[default]
    Gesture,
    Mouse,
    Touch,
}

impl InputMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMethod::Gesture => "gesture",
            InputMethod::Mouse => "mouse",
            InputMethod::Touch => "touch",
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        parse_or_warn(s)
    }
}

impl FromStr for InputMethod {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gesture" | "hand" | "camera" => Ok(InputMethod::Gesture),
            "mouse" => Ok(InputMethod::Mouse),
            "touch" => Ok(InputMethod::Touch),
            _ => Err(SettingsError::unknown("input", s)),
        }
    }
}

/// Which rule set a round is played under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// Misses cost points, single 60 s round clock
    #[default]
    ScorePenalty,
    /// Misses cost health, 20 s per question
    Health,
}

impl RuleSet {
    pub const ALL: [RuleSet; 2] = [RuleSet::ScorePenalty, RuleSet::Health];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSet::ScorePenalty => "score",
            RuleSet::Health => "health",
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        parse_or_warn(s)
    }
}

impl FromStr for RuleSet {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "score" | "score_penalty" | "classic" => Ok(RuleSet::ScorePenalty),
            "health" | "hearts" | "lives" => Ok(RuleSet::Health),
            _ => Err(SettingsError::unknown("rules", s)),
        }
    }
}

fn parse_or_warn<T: FromStr<Err = SettingsError> + Default>(s: &str) -> T {
    s.parse().unwrap_or_else(|err: SettingsError| {
        log::warn!("{err}, using default");
        T::default()
    })
}

/// Per-session game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    pub operation: Operation,
    pub input_method: InputMethod,
    pub rules: RuleSet,
    /// Countdown before play starts (0 = none)
    pub countdown_secs: u32,
    /// Pose recognition service address
    pub endpoint: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            operation: Operation::default(),
            input_method: InputMethod::default(),
            rules: RuleSet::default(),
            countdown_secs: 3,
            endpoint: GESTURE_ENDPOINT.to_string(),
        }
    }
}

impl GameSettings {
    /// Build settings from a URL query string (`?difficulty=hard&input=mouse`)
    ///
    /// Unknown keys are ignored; unknown values keep the default.
    pub fn from_query(query: &str) -> Self {
        let mut settings = Self::default();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "difficulty" => settings.difficulty = Difficulty::parse_or_default(value),
                "operation" | "op" => settings.operation = Operation::parse_or_default(value),
                "input" | "input_method" => {
                    settings.input_method = InputMethod::parse_or_default(value)
                }
                "rules" => settings.rules = RuleSet::parse_or_default(value),
                "countdown" => match value.parse::<u32>() {
                    Ok(secs) => settings.countdown_secs = secs,
                    Err(_) => log::warn!(
                        "{}, using default",
                        SettingsError::NotANumber {
                            field: "countdown",
                            value: value.to_string(),
                        }
                    ),
                },
                _ => {}
            }
        }

        settings
    }

    /// Load settings from the page URL (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let search = web_sys::window().and_then(|w| w.location().search().ok());

        match search {
            Some(search) if !search.is_empty() => {
                let settings = Self::from_query(&search);
                log::info!("Loaded settings from URL: {:?}", settings);
                settings
            }
            _ => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Med".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("div".parse::<Operation>(), Ok(Operation::Division));
        assert_eq!(" MOUSE ".parse::<InputMethod>(), Ok(InputMethod::Mouse));
        assert_eq!("hearts".parse::<RuleSet>(), Ok(RuleSet::Health));
    }

    #[test]
    fn test_unknown_value_fails_closed() {
        assert!("legendary".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::parse_or_default("legendary"), Difficulty::Easy);
        assert_eq!(Operation::parse_or_default("modulo"), Operation::Addition);
    }

    #[test]
    fn test_from_query() {
        let settings = GameSettings::from_query(
            "?difficulty=hard&operation=mixed&input=touch&rules=health&countdown=0&utm=x",
        );
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.operation, Operation::Mixed);
        assert_eq!(settings.input_method, InputMethod::Touch);
        assert_eq!(settings.rules, RuleSet::Health);
        assert_eq!(settings.countdown_secs, 0);
        assert_eq!(settings.endpoint, GESTURE_ENDPOINT);
    }

    #[test]
    fn test_from_query_bad_values_keep_defaults() {
        let settings = GameSettings::from_query("difficulty=nope&countdown=soon&input");
        assert_eq!(settings, GameSettings::default());
    }

    #[test]
    fn test_as_str_round_trips() {
        for d in Difficulty::ALL {
            assert_eq!(d.as_str().parse::<Difficulty>(), Ok(d));
        }
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
    }
}
