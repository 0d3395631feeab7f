//! Bot strength tiers.

use std::fmt;
use std::str::FromStr;

/// Named strength tier, mapped onto Stockfish's `Skill Level` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Rookie,
    Intermediate,
    Experienced,
    Professional,
    Grandmaster,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Rookie,
        Difficulty::Intermediate,
        Difficulty::Experienced,
        Difficulty::Professional,
        Difficulty::Grandmaster,
    ];

    pub fn skill_level(self) -> u8 {
        match self {
            Difficulty::Rookie => 1,
            Difficulty::Intermediate => 5,
            Difficulty::Experienced => 10,
            Difficulty::Professional => 15,
            Difficulty::Grandmaster => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Rookie => "rookie",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Experienced => "experienced",
            Difficulty::Professional => "professional",
            Difficulty::Grandmaster => "grandmaster",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown difficulty '{0}' (expected rookie, intermediate, experienced, professional or grandmaster)")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseDifficultyError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_levels() {
        let levels: Vec<u8> = Difficulty::ALL.iter().map(|d| d.skill_level()).collect();
        assert_eq!(levels, vec![1, 5, 10, 15, 20]);
    }

    #[test]
    fn test_parse_names() {
        for d in Difficulty::ALL {
            assert_eq!(d.as_str().parse::<Difficulty>(), Ok(d));
        }
        assert!("Rookie".parse::<Difficulty>().is_err());
        assert!("easy".parse::<Difficulty>().is_err());
    }
}
