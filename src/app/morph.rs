use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

pub const DIGITS: &str = "0123456789";
pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const SYMBOLS: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Which character classes feed the random substitution pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceToggles {
    pub numbers: bool,
    pub letters: bool,
    pub symbols: bool,
}

impl SourceToggles {
    /// Read the toggle-group widget value (a list of option labels).
    pub fn from_value(value: &Value) -> Self {
        let mut toggles = Self::default();
        let Some(options) = value.as_array() else {
            return toggles;
        };
        for option in options {
            match option.as_str() {
                Some("Numbers") => toggles.numbers = true,
                Some("Letters") => toggles.letters = true,
                Some("Symbols") => toggles.symbols = true,
                _ => {}
            }
        }
        toggles
    }

    /// Pool of characters eligible for random substitution. Never empty: with
    /// every toggle off the pool falls back to the letter alphabet, since a
    /// uniform draw from nothing is meaningless.
    pub fn source_set(&self) -> Vec<char> {
        let mut set = String::new();
        if self.numbers {
            set.push_str(DIGITS);
        }
        if self.letters {
            set.push_str(LETTERS);
        }
        if self.symbols {
            set.push_str(SYMBOLS);
        }
        if set.is_empty() {
            set.push_str(LETTERS);
        }
        set.chars().collect()
    }
}

/// One run of the character-reveal animation for a single committed input.
///
/// At iteration `i` the first `floor(i / multiplier) + 1` characters of the
/// target show through (capped at the target length); every later position is
/// re-drawn from the source set. The run spans `(len + 1) * multiplier`
/// iterations, and the final frame equals the target exactly.
#[derive(Debug, Clone)]
pub struct MorphSession {
    target: Vec<char>,
    source: Vec<char>,
    multiplier: u32,
    iteration: u32,
}

impl MorphSession {
    pub fn new(target: &str, multiplier: u32, toggles: SourceToggles) -> Self {
        Self {
            target: target.chars().collect(),
            source: toggles.source_set(),
            multiplier: multiplier.max(1),
            iteration: 0,
        }
    }

    pub fn total_iterations(&self) -> u32 {
        (self.target.len() as u32 + 1) * self.multiplier
    }

    /// Produce the next frame, or `None` once the run has completed.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Option<String> {
        if self.iteration >= self.total_iterations() {
            return None;
        }
        let frame = self.frame(self.iteration, rng);
        self.iteration += 1;
        Some(frame)
    }

    fn frame<R: Rng>(&self, iteration: u32, rng: &mut R) -> String {
        let revealed = iteration / self.multiplier;
        self.target
            .iter()
            .enumerate()
            .map(|(position, &target_char)| {
                if position as u32 <= revealed {
                    target_char
                } else {
                    self.source.choose(rng).copied().unwrap_or(target_char)
                }
            })
            .collect()
    }
}
