use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use super::orientation::{Orientation, UnknownOrientation};

/// One authored merge rule: overlaying `overlay` on `base` at the given
/// relative orientation replaces both with `result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub base: String,
    pub overlay: String,
    pub overlay_relative: Orientation,
    pub result: String,
    pub result_relative: Orientation,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("expected 7 tokens, found {0}")]
    WrongTokenCount(usize),
    #[error(transparent)]
    UnknownOrientation(#[from] UnknownOrientation),
}

/// Parse one rule line: `<base> + <overlay> <orientation> -> <result>
/// <orientation>`. Tokens 1 and 4 are positional separators and their
/// content is ignored.
pub fn parse_rule(line: &str) -> Result<Combination, RuleParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 7 {
        return Err(RuleParseError::WrongTokenCount(tokens.len()));
    }
    Ok(Combination {
        base: tokens[0].to_string(),
        overlay: tokens[2].to_string(),
        overlay_relative: tokens[3].parse()?,
        result: tokens[5].to_string(),
        result_relative: tokens[6].parse()?,
    })
}

/// Expanded lookup table answering "what do these two overlapping pieces
/// merge into". Each authored rule implies three derived variants, so the
/// rule file stays small while queries work in either placement order.
#[derive(Resource, Debug, Clone, Default)]
pub struct CombinationTable {
    rules: HashMap<(String, String, Orientation), (String, Orientation)>,
}

impl CombinationTable {
    /// Insert an authored rule plus its derived variants:
    /// the base/overlay swap, and the two result-overlaid-with-operand
    /// forms. Orientations compose through the rotation algebra. Earlier
    /// insertions win on key collision.
    pub fn add(&mut self, rule: Combination) {
        let r = rule.overlay_relative;
        let rr = rule.result_relative;

        self.insert(
            rule.base.clone(),
            rule.overlay.clone(),
            r,
            rule.result.clone(),
            rr,
        );
        // Overlay placed first, base second: relative orientation negates
        // and the result composes with it.
        self.insert(
            rule.overlay.clone(),
            rule.base.clone(),
            r.inverse(),
            rule.result.clone(),
            rr.rotate(r.inverse().index()),
        );
        // Re-overlaying either operand onto the merged result is a no-op
        // merge back into the result.
        self.insert(
            rule.result.clone(),
            rule.base,
            rr.inverse(),
            rule.result.clone(),
            Orientation::North,
        );
        self.insert(
            rule.result.clone(),
            rule.overlay,
            Orientation::from_index(r.index() + rr.inverse().index()),
            rule.result,
            Orientation::North,
        );
    }

    fn insert(
        &mut self,
        base: String,
        overlay: String,
        relative: Orientation,
        result: String,
        result_relative: Orientation,
    ) {
        self.rules
            .entry((base, overlay, relative))
            .or_insert((result, result_relative));
    }

    /// Exact-match lookup over the expanded rule set. `None` means the two
    /// pieces do not merge at this relative orientation.
    pub fn find(
        &self,
        base: &str,
        overlay: &str,
        relative: Orientation,
    ) -> Option<(&str, Orientation)> {
        self.rules
            .get(&(base.to_string(), overlay.to_string(), relative))
            .map(|(result, result_relative)| (result.as_str(), *result_relative))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Load rules from text. Empty and `;`-prefixed lines are skipped;
    /// malformed lines are logged and skipped, never fatal.
    pub fn from_rules(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            match parse_rule(trimmed) {
                Ok(rule) => table.add(rule),
                Err(err) => {
                    warn!("skipping malformed rail combination rule {trimmed:?}: {err}");
                }
            }
        }
        table
    }

    /// The authored rule set shipped with the crate
    pub fn standard() -> Self {
        Self::from_rules(include_str!("../../assets/rail_combinations.txt"))
    }
}
