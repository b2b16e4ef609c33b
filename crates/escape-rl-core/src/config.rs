//! Loosely typed settings and option schemas
//!
//! Rooms and agents are configured from a flat `name -> value` map, the way
//! an editor panel hands them over. Values may be numbers, numeric strings,
//! or the `"Random"` sentinel for counts. Nothing here fails: a malformed
//! value falls back to the option's declared default.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::RangeInclusive;
use tracing::warn;

/// Sentinel selecting a random count
pub const RANDOM: &str = "Random";

/// Named settings for a room/agent pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Raw option values
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl Settings {
    /// Empty settings; every option takes its default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace an option
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    /// Raw value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Float option with fallback
    #[must_use]
    pub fn float(&self, key: &str, default: f64) -> f64 {
        let Some(value) = self.get(key) else {
            return default;
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => v,
            _ => {
                warn!(key, ?value, default, "malformed float option, using default");
                default
            }
        }
    }

    /// Non-negative integer option with fallback
    #[must_use]
    pub fn int(&self, key: &str, default: usize) -> usize {
        let Some(value) = self.get(key) else {
            return default;
        };
        match parse_usize(value) {
            Some(v) => v,
            None => {
                warn!(key, ?value, default, "malformed integer option, using default");
                default
            }
        }
    }

    /// Count option accepting the `"Random"` sentinel
    #[must_use]
    pub fn count(&self, key: &str, default: Count) -> Count {
        let Some(value) = self.get(key) else {
            return default;
        };
        if let Value::String(s) = value {
            if s.contains(RANDOM) {
                return Count::Random;
            }
        }
        match parse_usize(value) {
            Some(v) => Count::Fixed(v),
            None => {
                warn!(key, ?value, ?default, "malformed count option, using default");
                default
            }
        }
    }

    /// Choice among `options`, matched case-insensitively
    #[must_use]
    pub fn choice<'a>(&self, key: &str, options: &[&'a str], default: &'a str) -> &'a str {
        let Some(value) = self.get(key) else {
            return default;
        };
        let text = match value {
            Value::String(s) => s.as_str(),
            _ => "",
        };
        options
            .iter()
            .copied()
            .find(|o| o.eq_ignore_ascii_case(text.trim()))
            .unwrap_or_else(|| {
                warn!(key, ?value, default, "unknown choice, using default");
                default
            })
    }
}

fn parse_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

/// Object count that is either fixed or drawn at layout time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Count {
    /// Exactly this many
    Fixed(usize),
    /// Drawn uniformly from the option's random range
    Random,
}

impl Count {
    /// Resolve to a concrete number
    pub fn resolve<R: Rng + ?Sized>(self, random_range: RangeInclusive<usize>, rng: &mut R) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::Random => rng.gen_range(random_range),
        }
    }
}

/// Kind of editor widget for an option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptionKind {
    /// Pick one of a fixed list
    Dropdown {
        /// Allowed values
        options: Vec<String>,
    },
    /// Free float input
    Float,
    /// Free integer input
    Int,
}

/// One entry of an option schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Setting name
    pub key: String,
    /// Widget kind
    #[serde(flatten)]
    pub kind: OptionKind,
    /// Default value as shown in the editor
    pub default: String,
}

impl OptionSpec {
    /// Float input option
    #[must_use]
    pub fn float(key: &str, default: f64) -> Self {
        Self {
            key: key.to_string(),
            kind: OptionKind::Float,
            default: default.to_string(),
        }
    }

    /// Integer input option
    #[must_use]
    pub fn int(key: &str, default: usize) -> Self {
        Self {
            key: key.to_string(),
            kind: OptionKind::Int,
            default: default.to_string(),
        }
    }

    /// Count dropdown: `"Random"` followed by `0..=max`
    #[must_use]
    pub fn count(key: &str, max: usize, default: Count) -> Self {
        let mut options = vec![RANDOM.to_string()];
        options.extend((0..=max).map(|n| n.to_string()));
        let default = match default {
            Count::Fixed(n) => n.to_string(),
            Count::Random => RANDOM.to_string(),
        };
        Self {
            key: key.to_string(),
            kind: OptionKind::Dropdown { options },
            default,
        }
    }

    /// Dropdown over named choices
    #[must_use]
    pub fn choice(key: &str, options: &[&str], default: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: OptionKind::Dropdown {
                options: options.iter().map(|o| (*o).to_string()).collect(),
            },
            default: default.to_string(),
        }
    }
}

/// Settings pre-populated with every default of `schema`
#[must_use]
pub fn defaults_of(schema: &[OptionSpec]) -> Settings {
    let mut settings = Settings::new();
    for spec in schema {
        settings.set(spec.key.clone(), spec.default.clone());
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_coercion() {
        let s = Settings::new()
            .with("Gamma", "0.5")
            .with("Alpha", 0.25)
            .with("Max Steps", "300");
        assert_eq!(s.float("Gamma", 0.9), 0.5);
        assert_eq!(s.float("Alpha", 0.1), 0.25);
        assert_eq!(s.int("Max Steps", 200), 300);
    }

    #[test]
    fn test_malformed_falls_back() {
        let s = Settings::new()
            .with("Gamma", "not a number")
            .with("Max Steps", -4)
            .with("Theta", json!([1, 2]));
        assert_eq!(s.float("Gamma", 0.9), 0.9);
        assert_eq!(s.int("Max Steps", 200), 200);
        assert_eq!(s.float("Theta", 1e-6), 1e-6);
        assert_eq!(s.float("Missing", 3.0), 3.0);
    }

    #[test]
    fn test_count_sentinel() {
        let s = Settings::new().with("Walls", "Random").with("Slippery Tiles", "4");
        assert_eq!(s.count("Walls", Count::Fixed(0)), Count::Random);
        assert_eq!(s.count("Slippery Tiles", Count::Random), Count::Fixed(4));
        assert_eq!(s.count("Other", Count::Fixed(2)), Count::Fixed(2));
    }

    #[test]
    fn test_choice() {
        let s = Settings::new().with("Start with Items", "both");
        let opts = ["None", "Bag", "Rope", "Both"];
        assert_eq!(s.choice("Start with Items", &opts, "None"), "Both");
        let bad = Settings::new().with("Start with Items", "Lantern");
        assert_eq!(bad.choice("Start with Items", &opts, "None"), "None");
    }

    #[test]
    fn test_schema_defaults_round_trip() {
        let schema = vec![
            OptionSpec::count("Walls", 20, Count::Random),
            OptionSpec::float("Gamma", 0.9),
        ];
        let s = defaults_of(&schema);
        assert_eq!(s.count("Walls", Count::Fixed(0)), Count::Random);
        assert_eq!(s.float("Gamma", 0.0), 0.9);
    }
}
