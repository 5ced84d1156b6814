use anyhow::Result;
use serde::Serialize;

/// Direction of a run over the ordered migration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Final state of one unit within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Skipped,
    Reverted,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub identifier: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Accumulated result of one run. Transient: produced per invocation,
/// handed to the reporter, never persisted.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    pub outcomes: Vec<UnitOutcome>,
    pub suggestions: Vec<String>,
}

impl RunReport {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            outcomes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn record(&mut self, identifier: &str, outcome: Outcome, reason: Option<String>) {
        self.outcomes.push(UnitOutcome {
            identifier: identifier.to_string(),
            outcome,
            reason,
        });
    }

    pub fn suggest(&mut self, suggestion: String) {
        self.suggestions.push(suggestion);
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == outcome).count()
    }

    pub fn applied(&self) -> usize {
        self.count(Outcome::Applied)
    }

    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    pub fn reverted(&self) -> usize {
        self.count(Outcome::Reverted)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    /// Deterministic text rendering: header, fixed-label count lines, one
    /// line per unit in processing order, then reordering suggestions.
    pub fn render(&self) -> String {
        let divider = "=".repeat(60);
        let title = match self.direction {
            Direction::Up => "MIGRATION RUN REPORT (up)",
            Direction::Down => "MIGRATION RUN REPORT (down)",
        };

        let mut out = String::new();
        out.push_str(&divider);
        out.push('\n');
        out.push_str(title);
        out.push('\n');
        out.push_str(&divider);
        out.push('\n');

        match self.direction {
            Direction::Up => out.push_str(&format!("Applied: {}\n", self.applied())),
            Direction::Down => out.push_str(&format!("Reverted: {}\n", self.reverted())),
        }
        out.push_str(&format!("Skipped: {}\n", self.skipped()));
        out.push_str(&format!("Failed: {}\n", self.failed()));

        if !self.outcomes.is_empty() {
            out.push('\n');
        }
        for unit in &self.outcomes {
            let glyph = match unit.outcome {
                Outcome::Applied | Outcome::Reverted => "✔",
                Outcome::Skipped => "➔",
                Outcome::Failed => "✖",
            };
            match &unit.reason {
                Some(reason) => {
                    out.push_str(&format!("  {} {} ({})\n", glyph, unit.identifier, reason))
                }
                None => out.push_str(&format!("  {} {}\n", glyph, unit.identifier)),
            }
        }

        if !self.suggestions.is_empty() {
            out.push_str("\nReordering suggestions:\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("  - {}\n", suggestion));
            }
        }

        out.push_str(&divider);
        out.push('\n');
        out
    }

    /// JSON rendering for scripting, with the aggregate counts inlined.
    pub fn render_json(&self) -> Result<String> {
        let value = serde_json::json!({
            "direction": self.direction,
            "applied": self.applied(),
            "skipped": self.skipped(),
            "reverted": self.reverted(),
            "failed": self.failed(),
            "outcomes": self.outcomes,
            "suggestions": self.suggestions,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }
}
