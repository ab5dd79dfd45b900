#![forbid(unsafe_code)]

use time::Date;

use crate::error::DaybookError;
use crate::task::calendar::{Clock, DateLocale, SystemClock};
use crate::task::model::{Task, TaskDraft, TaskId};
use crate::task::view::{self, StatsRange, StatsView, TodayView, UpcomingView};

/// Owns the task collection. Every change goes through `create`, `update`,
/// `toggle_completion` or `delete`; views only borrow.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    clock: Box<dyn Clock>,
    locale: DateLocale,
    last_id: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(Box::new(SystemClock), DateLocale::default())
    }
}

impl TaskStore {
    #[must_use]
    pub fn new(clock: Box<dyn Clock>, locale: DateLocale) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            locale,
            last_id: 0,
        }
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    #[must_use]
    pub fn today_label(&self) -> String {
        self.locale.format_label(self.today())
    }

    pub fn create(&mut self, draft: TaskDraft) -> Result<Task, DaybookError> {
        if let Err(e) = draft.validate() {
            tracing::warn!(error = %e, "rejected task creation");
            return Err(e);
        }

        let id = self.allocate_id();
        let today = self.today();
        let task = Task {
            id,
            title: draft.title,
            description: draft.description,
            due: draft.due,
            date_label: self.locale.format_label(draft.due),
            late: draft.due < today,
            priority: draft.priority,
            color: draft.priority.color().to_owned(),
            completed: false,
        };
        tracing::debug!(id = %task.id, due = %task.due, late = task.late, "created task");
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update(&mut self, id: TaskId, draft: TaskDraft) -> Result<Task, DaybookError> {
        let today = self.today();
        let locale = self.locale;
        let task = self.find_mut(id)?;
        if let Err(e) = draft.validate() {
            tracing::warn!(%id, error = %e, "rejected task update");
            return Err(e);
        }

        task.title = draft.title;
        task.description = draft.description;
        task.date_label = locale.format_label(draft.due);
        task.late = draft.due < today;
        task.due = draft.due;
        task.color = draft.priority.color().to_owned();
        task.priority = draft.priority;
        tracing::debug!(%id, due = %task.due, late = task.late, "updated task");
        Ok(task.clone())
    }

    /// Flips completion. `late` keeps the value from the last write.
    pub fn toggle_completion(&mut self, id: TaskId) -> Result<Task, DaybookError> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        tracing::debug!(%id, completed = task.completed, "toggled task");
        Ok(task.clone())
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Task, DaybookError> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            tracing::warn!(%id, "delete of unknown task");
            return Err(DaybookError::TaskNotFound(id));
        };
        let removed = self.tasks.remove(idx);
        tracing::debug!(%id, "deleted task");
        Ok(removed)
    }

    #[must_use]
    pub fn today_view(&self) -> TodayView<'_> {
        view::today_view(&self.tasks, &self.today_label())
    }

    #[must_use]
    pub fn upcoming_view(&self) -> UpcomingView<'_> {
        view::upcoming_view(&self.tasks, &self.today_label())
    }

    #[must_use]
    pub fn history_view(&self) -> Vec<&Task> {
        view::history_view(&self.tasks)
    }

    #[must_use]
    pub fn stats_view(&self, range: StatsRange) -> StatsView {
        view::stats_view(&self.tasks, self.today(), self.locale, range)
    }

    fn find_mut(&mut self, id: TaskId) -> Result<&mut Task, DaybookError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(DaybookError::TaskNotFound(id))
    }

    /// Creation time in milliseconds, bumped past the previous id on collision.
    fn allocate_id(&mut self) -> TaskId {
        let millis = u64::try_from(self.clock.now().unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        let id = millis.max(self.last_id + 1);
        self.last_id = id;
        TaskId(id)
    }
}
