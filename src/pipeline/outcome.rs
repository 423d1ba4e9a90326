use alloy::primitives::Address;
use std::fmt;

pub const INTERRUPTED: &str = "interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

impl Outcome {
    /// Short marker used in report tables
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "✓",
            Outcome::Failed => "✗",
            Outcome::Skipped => "-",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Result of one operation for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: String,
    pub outcome: Outcome,
    pub note: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: Outcome::Succeeded,
            note: None,
        }
    }

    pub fn failed(step: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: Outcome::Failed,
            note: Some(note.into()),
        }
    }

    pub fn skipped(step: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome: Outcome::Skipped,
            note: Some(note.into()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// All steps of one account, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub index: usize,
    pub address: Address,
    pub steps: Vec<StepOutcome>,
}

impl AccountReport {
    pub fn new(index: usize, address: Address) -> Self {
        Self {
            index,
            address,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: StepOutcome) {
        self.steps.push(step);
    }

    /// Failed if any step failed, Skipped if nothing ran, Succeeded otherwise
    pub fn outcome(&self) -> Outcome {
        if self.steps.iter().any(|s| s.outcome == Outcome::Failed) {
            Outcome::Failed
        } else if self.steps.iter().all(|s| s.outcome == Outcome::Skipped) {
            Outcome::Skipped
        } else {
            Outcome::Succeeded
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// First note of the most severe step, for one-column summaries
    pub fn note(&self) -> Option<&str> {
        let overall = self.outcome();
        self.steps
            .iter()
            .filter(|s| s.outcome == overall)
            .find_map(|s| s.note.as_deref())
            .or_else(|| self.steps.iter().rev().find_map(|s| s.note.as_deref()))
    }

    /// Close a row abandoned mid-run, keeping the steps already recorded
    pub fn mark_interrupted(&mut self) {
        self.push(StepOutcome::failed("run", INTERRUPTED));
    }

    /// Row for an account the run never reached
    pub fn interrupted_before_start(index: usize, address: Address) -> Self {
        let mut report = Self::new(index, address);
        report.push(StepOutcome::skipped("run", INTERRUPTED));
        report
    }
}
