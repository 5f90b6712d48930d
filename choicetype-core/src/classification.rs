//! Answer tallies and the behavioral type derived from them
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three options offered by every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
}

impl Choice {
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    /// Parse a user-typed letter, case-insensitive.
    #[must_use]
    pub fn from_letter(input: &str) -> Option<Self> {
        match input.trim() {
            "a" | "A" => Some(Self::A),
            "b" | "B" => Some(Self::B),
            "c" | "C" => Some(Self::C),
            _ => None,
        }
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Derived behavioral type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Calm,
    Steady,
    Quick,
}

impl Classification {
    /// Persisted spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Steady => "steady",
            Self::Quick => "quick",
        }
    }

    /// Parse a persisted value; anything unrecognized is treated as absent.
    #[must_use]
    pub fn parse_stored(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Calm => "Calm Drifter",
            Self::Steady => "Steady Core",
            Self::Quick => "Quick Spark",
        }
    }

    /// Longer description shown next to the type on the home screen.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Calm => {
                "You don't rush decisions.\nYou like to feel the direction first.\nSlow doesn't mean weak, it means\ncareful."
            }
            Self::Steady => {
                "You react when it makes sense.\nNot too fast. Not too late.\nYou stay centered."
            }
            Self::Quick => {
                "You act first and adjust later.\nSpeed gives you momentum.\nMovement feels natural to you."
            }
        }
    }

    #[must_use]
    pub const fn share_body(self) -> &'static str {
        match self {
            Self::Calm => "I don't rush decisions. Slow means careful.",
            Self::Steady => "I react when it makes sense. I stay centered.",
            Self::Quick => "I act fast and adjust later. Movement feels natural to me.",
        }
    }

    #[must_use]
    pub fn share_message(self) -> String {
        format!("{}\n{}", self.title(), self.share_body())
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calm" => Ok(Self::Calm),
            "steady" => Ok(Self::Steady),
            "quick" => Ok(Self::Quick),
            _ => Err(()),
        }
    }
}

/// Prompt shown when no attempt has been completed yet.
pub const UNCLASSIFIED_PROMPT: &str = "Find out how you react.";

/// Per-attempt counters. Reset at attempt start, touched once per question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptTally {
    pub count_a: u32,
    pub count_b: u32,
    pub count_c: u32,
    pub correct: u32,
}

impl AttemptTally {
    /// Record an explicit pick against the expected answer for the question.
    pub fn record(&mut self, choice: Choice, expected: Choice) {
        match choice {
            Choice::A => self.count_a += 1,
            Choice::B => self.count_b += 1,
            Choice::C => self.count_c += 1,
        }
        if choice == expected {
            self.correct += 1;
        }
    }

    #[must_use]
    pub const fn answered(&self) -> u32 {
        self.count_a + self.count_b + self.count_c
    }

    #[must_use]
    pub const fn classify(&self) -> Classification {
        classify(self.count_a, self.count_b, self.count_c)
    }
}

/// B wins ties with A and C; C needs a strict lead over B; Calm covers the rest,
/// including an attempt where every question timed out.
#[must_use]
pub const fn classify(count_a: u32, count_b: u32, count_c: u32) -> Classification {
    if count_a == 0 && count_b == 0 && count_c == 0 {
        Classification::Calm
    } else if count_b >= count_a && count_b >= count_c {
        Classification::Steady
    } else if count_c >= count_a && count_c > count_b {
        Classification::Quick
    } else {
        Classification::Calm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(classify(0, 0, 0), Classification::Calm);
        assert_eq!(classify(3, 9, 0), Classification::Steady);
        assert_eq!(classify(0, 4, 8), Classification::Quick);
        assert_eq!(classify(5, 5, 2), Classification::Steady);
        assert_eq!(classify(4, 4, 4), Classification::Steady);
        assert_eq!(classify(7, 2, 3), Classification::Calm);
        assert_eq!(classify(5, 1, 5), Classification::Quick);
    }

    #[test]
    fn tally_counts_correct_only_on_match() {
        let mut tally = AttemptTally::default();
        tally.record(Choice::A, Choice::B);
        tally.record(Choice::B, Choice::B);
        tally.record(Choice::C, Choice::C);
        assert_eq!(tally.count_a, 1);
        assert_eq!(tally.count_b, 1);
        assert_eq!(tally.count_c, 1);
        assert_eq!(tally.correct, 2);
        assert_eq!(tally.answered(), 3);
    }

    #[test]
    fn stored_spellings_roundtrip() {
        for class in [
            Classification::Calm,
            Classification::Steady,
            Classification::Quick,
        ] {
            assert_eq!(Classification::parse_stored(class.as_str()), Some(class));
        }
        assert_eq!(Classification::parse_stored("Calm"), None);
        assert_eq!(Classification::parse_stored(""), None);
    }

    #[test]
    fn share_message_has_title_and_body() {
        let msg = Classification::Quick.share_message();
        assert!(msg.starts_with("Quick Spark\n"));
        assert!(msg.ends_with("Movement feels natural to me."));
    }

    #[test]
    fn letters_parse_case_insensitive() {
        assert_eq!(Choice::from_letter(" b "), Some(Choice::B));
        assert_eq!(Choice::from_letter("C"), Some(Choice::C));
        assert_eq!(Choice::from_letter("d"), None);
    }
}
