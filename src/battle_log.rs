//! Fixed-width battle log.
//!
//! A log is a header, a 56-character rule and one row per round. Columns
//! are padded for monospace display: round 6, names 15, damage 5
//! right-aligned, hit points 5 right-aligned.

use serde::{Deserialize, Serialize};

/// Header line of every battle log.
pub const HEADER: &str = "Раунд |   Атакующий    | Урон  |    Защитник    |   HP";

/// Width of the separator rule below the header.
pub const RULE_WIDTH: usize = 56;

/// One logged round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub round: u32,
    pub attacker: String,
    pub damage: i64,
    pub defender: String,
    /// Defender's hit points after the attack.
    pub defender_hp: i64,
    pub critical: bool,
}

impl RoundEntry {
    /// Render the padded row.
    pub fn format(&self) -> String {
        format!(
            "{:<6}| {:<15}| {:>5} | {:<15}| {:>5}",
            self.round, self.attacker, self.damage, self.defender, self.defender_hp
        )
    }

    pub fn missed(&self) -> bool {
        self.damage == 0
    }
}

/// Rounds of one duel.
///
/// # Examples
///
/// ```rust
/// use duelcore::battle_log::{BattleLog, RoundEntry};
///
/// let mut log = BattleLog::new();
/// log.push(RoundEntry {
///     round: 1,
///     attacker: "Alice".into(),
///     damage: 12,
///     defender: "Bob".into(),
///     defender_hp: 88,
///     critical: false,
/// });
///
/// let lines = log.lines();
/// assert_eq!(lines.len(), 3);
/// assert_eq!(lines[1], "-".repeat(56));
/// assert_eq!(lines[2], "1     | Alice          |    12 | Bob            |    88");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleLog {
    entries: Vec<RoundEntry>,
}

impl BattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RoundEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RoundEntry] {
        &self.entries
    }

    pub fn rounds(&self) -> usize {
        self.entries.len()
    }

    /// Header, rule and every row.
    pub fn lines(&self) -> Vec<String> {
        Self::render(&self.entries)
    }

    /// Header, rule and the last `rows` rows.
    pub fn recent(&self, rows: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(rows);
        Self::render(&self.entries[skip..])
    }

    /// Recent rows wrapped in a fenced block for chat display.
    pub fn to_markdown_block(&self, rows: usize) -> String {
        format!("```md\n{}\n```", self.recent(rows).join("\n"))
    }

    fn render(entries: &[RoundEntry]) -> Vec<String> {
        let mut lines = Vec::with_capacity(entries.len() + 2);
        lines.push(HEADER.to_string());
        lines.push("-".repeat(RULE_WIDTH));
        lines.extend(entries.iter().map(RoundEntry::format));
        lines
    }
}
