#![forbid(unsafe_code)]

//! Read-only projections of the task list. Every function here is pure and
//! recomputed from scratch on each call.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::DaybookError;
use crate::task::calendar::{DateLocale, add_days, iso_date};
use crate::task::model::Task;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TodayView<'a> {
    pub late: Vec<&'a Task>,
    pub today: Vec<&'a Task>,
}

impl TodayView<'_> {
    #[must_use]
    pub fn pending(&self) -> usize {
        self.late.len() + self.today.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateGroup<'a> {
    pub label: String,
    /// Due date of the first task that opened the group; used for ordering.
    #[serde(with = "iso_date")]
    pub due: Date,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpcomingView<'a> {
    pub groups: Vec<DateGroup<'a>>,
}

impl UpcomingView<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }
}

/// Open tasks due today (by label) or flagged late, split late-first.
#[must_use]
pub fn today_view<'a>(tasks: &'a [Task], today_label: &str) -> TodayView<'a> {
    let (late, today) = tasks
        .iter()
        .filter(|t| !t.completed && (t.date_label == today_label || t.late))
        .partition(|t| t.late);
    TodayView { late, today }
}

/// Open, non-late tasks not due today, grouped by label and ordered by date.
#[must_use]
pub fn upcoming_view<'a>(tasks: &'a [Task], today_label: &str) -> UpcomingView<'a> {
    let mut groups: Vec<DateGroup<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for t in tasks
        .iter()
        .filter(|t| !t.completed && !t.late && t.date_label != today_label)
    {
        if let Some(&i) = index.get(t.date_label.as_str()) {
            groups[i].tasks.push(t);
            continue;
        }
        index.insert(t.date_label.as_str(), groups.len());
        groups.push(DateGroup {
            label: t.date_label.clone(),
            due: t.due,
            tasks: vec![t],
        });
    }

    groups.sort_by_key(|g| g.due);
    UpcomingView { groups }
}

#[must_use]
pub fn history_view(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.completed).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsRange {
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl StatsRange {
    pub const ALL: [StatsRange; 3] = [StatsRange::Week, StatsRange::Month, StatsRange::Year];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StatsRange::Week => "7 days",
            StatsRange::Month => "30 days",
            StatsRange::Year => "1 year",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatsRange::Week => "7d",
            StatsRange::Month => "30d",
            StatsRange::Year => "1y",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            StatsRange::Week => StatsRange::Month,
            StatsRange::Month => StatsRange::Year,
            StatsRange::Year => StatsRange::Week,
        }
    }
}

impl fmt::Display for StatsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsRange {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" | "7" | "week" => Ok(StatsRange::Week),
            "30d" | "30" | "month" => Ok(StatsRange::Month),
            "1y" | "365d" | "year" => Ok(StatsRange::Year),
            other => Err(DaybookError::Other(format!(
                "invalid stats range '{other}': expected 7d, 30d or 1y"
            ))),
        }
    }
}

/// Fixed bar heights (percent) shown on the productivity chart. They are not
/// derived from the task list.
pub const SAMPLE_SERIES: [u8; 7] = [15, 25, 10, 45, 80, 50, 20];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub label: String,
    pub value: u8,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub completed: usize,
    pub range: StatsRange,
    /// Last seven days, oldest first.
    pub series: Vec<ChartPoint>,
    /// Always true: `series` holds [`SAMPLE_SERIES`], not real history.
    pub series_is_sample: bool,
}

#[must_use]
pub fn stats_view(tasks: &[Task], today: Date, locale: DateLocale, range: StatsRange) -> StatsView {
    let series = SAMPLE_SERIES
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let back = i64::try_from(SAMPLE_SERIES.len() - 1 - i).unwrap_or(0);
            let date = add_days(today, -back);
            ChartPoint {
                date,
                label: locale.format_chart(date),
                value,
                is_today: back == 0,
            }
        })
        .collect();

    StatsView {
        completed: tasks.iter().filter(|t| t.completed).count(),
        range,
        series,
        series_is_sample: true,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::task::calendar::FixedClock;
    use crate::task::model::{Priority, TaskDraft};
    use crate::task::store::TaskStore;

    const TODAY: Date = date!(2026 - 10 - 19);

    fn store() -> TaskStore {
        TaskStore::new(Box::new(FixedClock(TODAY)), DateLocale::EnUs)
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn today_view_splits_late_from_today_and_skips_future() {
        let mut s = store();
        s.create(TaskDraft::new("a-today", TODAY)).unwrap();
        s.create(TaskDraft::new("b-today", TODAY)).unwrap();
        s.create(TaskDraft::new("tomorrow", add_days(TODAY, 1)))
            .unwrap();
        s.create(TaskDraft::new("yesterday", add_days(TODAY, -1)))
            .unwrap();

        let v = s.today_view();
        assert_eq!(titles(&v.late), ["yesterday"]);
        assert_eq!(titles(&v.today), ["a-today", "b-today"]);
        assert_eq!(v.pending(), 3);
    }

    #[test]
    fn completed_tasks_leave_today_for_history() {
        let mut s = store();
        let milk = s
            .create(TaskDraft::new("Buy milk", TODAY).priority(Priority::P3))
            .unwrap();
        assert_eq!(titles(&s.today_view().today), ["Buy milk"]);
        assert_eq!(s.today_view().today[0].color, Priority::P3.color());

        s.toggle_completion(milk.id).unwrap();
        assert!(s.today_view().is_empty());
        assert_eq!(titles(&s.history_view()), ["Buy milk"]);
    }

    #[test]
    fn upcoming_groups_are_ordered_by_date_not_insertion() {
        let mut s = store();
        s.create(TaskDraft::new("ten", add_days(TODAY, 10))).unwrap();
        s.create(TaskDraft::new("three", add_days(TODAY, 3))).unwrap();
        s.create(TaskDraft::new("ten-b", add_days(TODAY, 10)))
            .unwrap();
        s.create(TaskDraft::new("today", TODAY)).unwrap();

        let v = s.upcoming_view();
        let labels: Vec<&str> = v.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["Oct 22", "Oct 29"]);
        assert_eq!(titles(&v.groups[1].tasks), ["ten", "ten-b"]);
        assert_eq!(v.task_count(), 3);
    }

    #[test]
    fn upcoming_orders_by_date_even_when_labels_sort_differently() {
        let mut s = store();
        // "Nov 02" < "Oct 30" as strings, but Oct 30 comes first.
        s.create(TaskDraft::new("nov", date!(2026 - 11 - 02))).unwrap();
        s.create(TaskDraft::new("oct", date!(2026 - 10 - 30))).unwrap();

        let v = s.upcoming_view();
        let labels: Vec<&str> = v.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["Oct 30", "Nov 02"]);
    }

    #[test]
    fn labels_without_year_collide_across_years() {
        let mut s = store();
        s.create(TaskDraft::new("nov5-2027", date!(2027 - 11 - 05)))
            .unwrap();
        s.create(TaskDraft::new("oct30", date!(2026 - 10 - 30))).unwrap();
        s.create(TaskDraft::new("nov5-2026", date!(2026 - 11 - 05)))
            .unwrap();
        s.create(TaskDraft::new("next-year-same-day", date!(2027 - 10 - 19)))
            .unwrap();
        s.create(TaskDraft::new("dec1", date!(2026 - 12 - 01))).unwrap();

        // Same label as today, so it is listed as due today.
        let today = s.today_view();
        assert!(today.late.is_empty());
        assert_eq!(titles(&today.today), ["next-year-same-day"]);

        let v = s.upcoming_view();
        let labels: Vec<&str> = v.groups.iter().map(|g| g.label.as_str()).collect();
        // The Nov 05 group opened with the 2027 task, so it sorts after Dec 01.
        assert_eq!(labels, ["Oct 30", "Dec 01", "Nov 05"]);
        assert_eq!(v.groups[2].due, date!(2027 - 11 - 05));
        assert_eq!(titles(&v.groups[2].tasks), ["nov5-2027", "nov5-2026"]);
        assert_eq!(v.task_count(), 4);
    }

    #[test]
    fn late_and_completed_tasks_are_not_upcoming() {
        let mut s = store();
        s.create(TaskDraft::new("late", add_days(TODAY, -4))).unwrap();
        let done = s.create(TaskDraft::new("done", add_days(TODAY, 2))).unwrap();
        s.toggle_completion(done.id).unwrap();
        assert!(s.upcoming_view().is_empty());
    }

    #[test]
    fn stats_counts_completed_and_labels_sample_series() {
        let mut s = store();
        let a = s.create(TaskDraft::new("a", TODAY)).unwrap();
        s.create(TaskDraft::new("b", TODAY)).unwrap();
        s.toggle_completion(a.id).unwrap();

        let v = s.stats_view(StatsRange::Month);
        assert_eq!(v.completed, 1);
        assert_eq!(v.range, StatsRange::Month);
        assert!(v.series_is_sample);
        assert_eq!(v.series.len(), 7);
        let values: Vec<u8> = v.series.iter().map(|p| p.value).collect();
        assert_eq!(values, SAMPLE_SERIES);
        assert_eq!(v.series[0].date, date!(2026 - 10 - 13));
        assert_eq!(v.series[6].label, "10/19");
        assert!(v.series[6].is_today);
        assert!(!v.series[0].is_today);
    }

    #[test]
    fn stats_range_parses_and_cycles() {
        assert_eq!("30d".parse::<StatsRange>().unwrap(), StatsRange::Month);
        assert!("2w".parse::<StatsRange>().is_err());
        assert_eq!(StatsRange::Year.next(), StatsRange::Week);
    }
}
