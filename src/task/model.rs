#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::DaybookError;
use crate::task::calendar::iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|e| DaybookError::Other(format!("invalid task id '{s}': {e}")))
    }
}

/// Urgency bucket, 1 is the most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    P1 = 1,
    P2 = 2,
    P3 = 3,
    #[default]
    P4 = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityOption {
    pub value: Priority,
    pub label: &'static str,
    pub color: &'static str,
}

pub const PRIORITY_OPTIONS: [PriorityOption; 4] = [
    PriorityOption {
        value: Priority::P1,
        label: "Priority 1",
        color: "#ef4444",
    },
    PriorityOption {
        value: Priority::P2,
        label: "Priority 2",
        color: "#f59e42",
    },
    PriorityOption {
        value: Priority::P3,
        label: "Priority 3",
        color: "#3b82f6",
    },
    PriorityOption {
        value: Priority::P4,
        label: "Priority 4",
        color: "#6b7280",
    },
];

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::P1, Priority::P2, Priority::P3, Priority::P4];

    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn option(self) -> &'static PriorityOption {
        &PRIORITY_OPTIONS[usize::from(self.value() - 1)]
    }

    #[must_use]
    pub fn color(self) -> &'static str {
        self.option().color
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.option().label
    }

    /// Next priority in the dropdown order, wrapping 4 -> 1.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Priority::P1 => Priority::P2,
            Priority::P2 => Priority::P3,
            Priority::P3 => Priority::P4,
            Priority::P4 => Priority::P1,
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        match self {
            Priority::P1 => Priority::P4,
            Priority::P2 => Priority::P1,
            Priority::P3 => Priority::P2,
            Priority::P4 => Priority::P3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TryFrom<u8> for Priority {
    type Error = DaybookError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Priority::P1),
            2 => Ok(Priority::P2),
            3 => Ok(Priority::P3),
            4 => Ok(Priority::P4),
            other => Err(DaybookError::InvalidPriority(other.to_string())),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.value()
    }
}

impl FromStr for Priority {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw
            .strip_prefix('p')
            .or_else(|| raw.strip_prefix('P'))
            .unwrap_or(raw);
        let v: u8 = raw
            .parse()
            .map_err(|_| DaybookError::InvalidPriority(s.to_owned()))?;
        Priority::try_from(v).map_err(|_| DaybookError::InvalidPriority(s.to_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "iso_date")]
    pub due: Date,
    pub date_label: String,
    /// `due < today` as of the last write to `due`.
    pub late: bool,
    pub priority: Priority,
    /// Snapshot of `priority.color()` taken when the task was saved.
    pub color: String,
    pub completed: bool,
}

impl Task {
    /// Late and still open; this is what gets highlighted.
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.late && !self.completed
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        let d = self.description.trim();
        if d.is_empty() { None } else { Some(d) }
    }
}

/// The user-editable part of a task, as submitted by a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due: Date,
    pub priority: Priority,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, due: Date) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due,
            priority: Priority::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), DaybookError> {
        if self.title.trim().is_empty() {
            return Err(DaybookError::EmptyTitle);
        }
        Ok(())
    }
}
