#![forbid(unsafe_code)]

use time::Date;

use crate::error::DaybookError;
use crate::task::calendar::{MIN_DUE_DATE, add_days, format_iso, parse_date};
use crate::task::{Priority, Task, TaskDraft, TaskId, TaskStore};
use crate::tui::input::TextInput;

pub const EMPTY_TITLE_MSG: &str = "Enter a task name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Description,
    Due,
    Priority,
}

impl EditorField {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Due => "Date",
            Self::Priority => "Priority",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Due,
            Self::Due => Self::Priority,
            Self::Priority => Self::Title,
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        match self {
            Self::Title => Self::Priority,
            Self::Description => Self::Title,
            Self::Due => Self::Description,
            Self::Priority => Self::Due,
        }
    }
}

/// Form state for creating a task or editing an existing one.
#[derive(Debug, Clone)]
pub struct TaskEditor {
    editing: Option<TaskId>,
    pub title: TextInput,
    pub description: TextInput,
    pub due: TextInput,
    pub priority: Priority,
    pub field: EditorField,
    /// Inline validation message shown under the offending field.
    pub error: Option<String>,
}

impl TaskEditor {
    #[must_use]
    pub fn create(today: Date, priority: Priority) -> Self {
        Self {
            editing: None,
            title: TextInput::default(),
            description: TextInput::default(),
            due: TextInput::new(format_iso(today)),
            priority,
            field: EditorField::Title,
            error: None,
        }
    }

    #[must_use]
    pub fn edit(task: &Task) -> Self {
        Self {
            editing: Some(task.id),
            title: TextInput::new(task.title.clone()),
            description: TextInput::new(task.description.clone()),
            due: TextInput::new(format_iso(task.due)),
            priority: task.priority,
            field: EditorField::Title,
            error: None,
        }
    }

    #[must_use]
    pub fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    #[must_use]
    pub fn heading(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit task"
        } else {
            "New task"
        }
    }

    pub fn focus_next(&mut self) {
        self.field = self.field.next();
    }

    pub fn focus_prev(&mut self) {
        self.field = self.field.prev();
    }

    /// Text input behind the focused field, if it is a text field.
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.field {
            EditorField::Title => Some(&mut self.title),
            EditorField::Description => Some(&mut self.description),
            EditorField::Due => Some(&mut self.due),
            EditorField::Priority => None,
        }
    }

    /// Moves the due date by `days`. An unparsable date restarts from today.
    pub fn step_due(&mut self, days: i64, today: Date) {
        let current = parse_date(self.due.as_str(), today).unwrap_or(today);
        let next = add_days(current, days).max(MIN_DUE_DATE);
        self.due.set(format_iso(next));
    }

    pub fn cycle_priority(&mut self, forward: bool) {
        self.priority = if forward {
            self.priority.next()
        } else {
            self.priority.prev()
        };
    }

    pub fn draft(&self, today: Date) -> Result<TaskDraft, DaybookError> {
        let input = self.due.as_str().trim();
        let due = parse_date(input, today)?;
        if due < MIN_DUE_DATE {
            return Err(DaybookError::InvalidDate {
                input: input.to_owned(),
                msg: format!("must be on or after {}", format_iso(MIN_DUE_DATE)),
            });
        }
        Ok(TaskDraft::new(self.title.as_str(), due)
            .description(self.description.as_str().trim())
            .priority(self.priority))
    }

    /// Saves the form into `store`. Validation failures are kept on the form
    /// and focus the offending field; other errors are returned.
    pub fn submit(&mut self, store: &mut TaskStore) -> Result<Option<Task>, DaybookError> {
        let draft = match self.draft(store.today()) {
            Ok(d) => d,
            Err(e) => {
                self.reject(&e);
                return Ok(None);
            }
        };
        let saved = match self.editing {
            Some(id) => store.update(id, draft),
            None => store.create(draft),
        };
        match saved {
            Ok(task) => Ok(Some(task)),
            Err(e) if e.is_validation() => {
                self.reject(&e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn reject(&mut self, err: &DaybookError) {
        let (field, msg) = match err {
            DaybookError::EmptyTitle => (EditorField::Title, EMPTY_TITLE_MSG.to_owned()),
            DaybookError::InvalidDate { .. } => (EditorField::Due, err.to_string()),
            DaybookError::InvalidPriority(_) => (EditorField::Priority, err.to_string()),
            _ => (self.field, err.to_string()),
        };
        self.field = field;
        self.error = Some(msg);
    }
}
