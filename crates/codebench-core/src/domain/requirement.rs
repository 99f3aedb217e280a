//! Requirement and complexity tier definitions.

use serde::{Deserialize, Serialize};

/// Task complexity tier, from a small single-function task (C1) to a
/// multi-component system (C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Complexity {
    C1,
    C2,
    C3,
    C4,
}

impl Complexity {
    /// Tiers in ascending order.
    pub const ALL: [Complexity; 4] = [Complexity::C1, Complexity::C2, Complexity::C3, Complexity::C4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::C1 => "C1",
            Complexity::C2 => "C2",
            Complexity::C3 => "C3",
            Complexity::C4 => "C4",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C1" => Ok(Complexity::C1),
            "C2" => Ok(Complexity::C2),
            "C3" => Ok(Complexity::C3),
            "C4" => Ok(Complexity::C4),
            other => Err(format!("unknown complexity tier: {other}")),
        }
    }
}

/// Configured complexity for a run: one fixed tier, or a per-round mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComplexitySetting {
    Fixed(Complexity),
    Mixed,
}

impl ComplexitySetting {
    /// Tier for `round_index`.
    ///
    /// `Mixed` cycles through C1..C4 starting at `base_time_ms mod 4`, so two
    /// runs started with the same base time pick identical tiers.
    pub fn resolve(&self, base_time_ms: i64, round_index: usize) -> Complexity {
        match self {
            ComplexitySetting::Fixed(tier) => *tier,
            ComplexitySetting::Mixed => {
                let slot = (base_time_ms as i128 + round_index as i128).rem_euclid(4) as usize;
                Complexity::ALL[slot]
            }
        }
    }
}

impl Default for ComplexitySetting {
    fn default() -> Self {
        ComplexitySetting::Fixed(Complexity::C2)
    }
}

impl TryFrom<String> for ComplexitySetting {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("mixed") {
            return Ok(ComplexitySetting::Mixed);
        }
        value.parse().map(ComplexitySetting::Fixed)
    }
}

impl From<ComplexitySetting> for String {
    fn from(value: ComplexitySetting) -> Self {
        match value {
            ComplexitySetting::Fixed(tier) => tier.as_str().to_string(),
            ComplexitySetting::Mixed => "mixed".to_string(),
        }
    }
}

/// A generated task description. Immutable input to a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub title: String,
    #[serde(default)]
    pub functional_requirements: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub complexity: Complexity,
}

impl Requirement {
    /// Render the requirement as the plain-text brief handed to the target
    /// model and the judges.
    pub fn render(&self) -> String {
        let mut out = format!("# {}\n\nComplexity: {}\n", self.title, self.complexity);
        if !self.functional_requirements.is_empty() {
            out.push_str("\n## Functional requirements\n");
            for (i, item) in self.functional_requirements.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, item));
            }
        }
        if !self.constraints.is_empty() {
            out.push_str("\n## Constraints\n");
            for item in &self.constraints {
                out.push_str(&format!("- {}\n", item));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_setting_parses_tiers_and_mixed() {
        let fixed: ComplexitySetting = serde_json::from_str("\"C3\"").unwrap();
        assert_eq!(fixed, ComplexitySetting::Fixed(Complexity::C3));
        let mixed: ComplexitySetting = serde_json::from_str("\"mixed\"").unwrap();
        assert_eq!(mixed, ComplexitySetting::Mixed);
        assert!(serde_json::from_str::<ComplexitySetting>("\"C9\"").is_err());
        assert_eq!(serde_json::to_string(&mixed).unwrap(), "\"mixed\"");
    }

    #[test]
    fn test_mixed_resolution_is_deterministic() {
        let setting = ComplexitySetting::Mixed;
        let base = 1_700_000_000_001;
        let first: Vec<Complexity> = (0..6).map(|i| setting.resolve(base, i)).collect();
        let second: Vec<Complexity> = (0..6).map(|i| setting.resolve(base, i)).collect();
        assert_eq!(first, second);
        // base % 4 == 1
        assert_eq!(first[0], Complexity::C2);
        assert_eq!(first[3], Complexity::C1);
    }

    #[test]
    fn test_fixed_resolution_ignores_round() {
        let setting = ComplexitySetting::Fixed(Complexity::C4);
        assert!((0..10).all(|i| setting.resolve(12345, i) == Complexity::C4));
    }

    #[test]
    fn test_requirement_render_lists_sections() {
        let req = Requirement {
            title: "Rate limiter".to_string(),
            functional_requirements: vec!["token bucket".to_string()],
            constraints: vec!["no unsafe".to_string()],
            complexity: Complexity::C2,
        };
        let text = req.render();
        assert!(text.starts_with("# Rate limiter"));
        assert!(text.contains("1. token bucket"));
        assert!(text.contains("- no unsafe"));
    }
}
