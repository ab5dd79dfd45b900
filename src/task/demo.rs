#![forbid(unsafe_code)]

use time::macros::date;

use crate::error::DaybookError;
use crate::task::calendar::add_days;
use crate::task::model::{Priority, TaskDraft};
use crate::task::store::TaskStore;

impl TaskStore {
    /// Adds the sample tasks shown on first launch, dated relative to today.
    pub fn with_demo_tasks(mut self) -> Result<Self, DaybookError> {
        let today = self.today();
        let tomorrow = add_days(today, 1);
        let in_three_days = add_days(today, 3);

        let open = [
            ("Project meeting", "Sync with the team", today, Priority::P1),
            ("Send report", "", today, Priority::P2),
            ("Gym", "", today, Priority::P3),
            ("Dentist", "Dr. Silva", tomorrow, Priority::P4),
            ("Buy a present", "", tomorrow, Priority::P2),
            ("Q2 planning", "", in_three_days, Priority::P1),
        ];
        for (title, desc, due, priority) in open {
            self.create(TaskDraft::new(title, due).description(desc).priority(priority))?;
        }

        let done = [
            ("Read a book", "Chapters 1 to 5", today, Priority::P4),
            ("Pay the power bill", "", date!(2025 - 01 - 25), Priority::P1),
        ];
        for (title, desc, due, priority) in done {
            let t = self.create(TaskDraft::new(title, due).description(desc).priority(priority))?;
            self.toggle_completion(t.id)?;
        }

        tracing::debug!(count = self.len(), "seeded demo tasks");
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::task::calendar::{DateLocale, FixedClock};
    use crate::task::store::TaskStore;

    #[test]
    fn demo_tasks_populate_every_view() {
        let s = TaskStore::new(Box::new(FixedClock(date!(2026 - 10 - 19))), DateLocale::EnUs)
            .with_demo_tasks()
            .unwrap();

        assert_eq!(s.len(), 8);
        let today = s.today_view();
        assert!(today.late.is_empty());
        assert_eq!(today.today.len(), 3);
        let upcoming = s.upcoming_view();
        assert_eq!(upcoming.groups.len(), 2);
        assert_eq!(upcoming.groups[0].tasks.len(), 2);
        assert_eq!(s.history_view().len(), 2);
        // The completed bill is in the past, so its snapshot says late.
        assert!(s.history_view().iter().any(|t| t.late));
    }
}
