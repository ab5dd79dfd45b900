use daybook::config;
use daybook::error::DaybookError;
use daybook::task::calendar::{DateLocale, FixedClock, add_days};
use daybook::task::view::StatsRange;
use daybook::task::{Priority, TaskDraft, TaskStore};
use time::Date;
use time::macros::date;

const TODAY: Date = date!(2026 - 10 - 19);

fn store(locale: DateLocale) -> TaskStore {
    TaskStore::new(Box::new(FixedClock(TODAY)), locale)
}

#[test]
fn buy_milk_moves_through_every_view() {
    let mut s = store(DateLocale::EnUs);

    let milk = s
        .create(TaskDraft::new("Buy milk", TODAY).priority(Priority::P2))
        .expect("create");
    assert_eq!(milk.color, "#f59e42");
    assert_eq!(milk.date_label, "Oct 19");
    assert!(!milk.late);

    let today = s.today_view();
    assert_eq!(today.today.len(), 1);
    assert_eq!(today.today[0].id, milk.id);
    assert!(s.upcoming_view().is_empty());

    let done = s.toggle_completion(milk.id).expect("toggle");
    assert!(done.completed);
    assert!(s.today_view().is_empty());
    assert_eq!(s.history_view().len(), 1);
    assert_eq!(s.stats_view(StatsRange::Week).completed, 1);

    let removed = s.delete(milk.id).expect("delete");
    assert_eq!(removed.title, "Buy milk");
    assert!(s.is_empty());
    assert!(s.history_view().is_empty());

    assert!(matches!(
        s.toggle_completion(milk.id),
        Err(DaybookError::TaskNotFound(id)) if id == milk.id
    ));
    assert!(matches!(
        s.update(milk.id, TaskDraft::new("", TODAY)),
        Err(DaybookError::TaskNotFound(_))
    ));
}

#[test]
fn upcoming_orders_by_date_not_insertion() {
    let mut s = store(DateLocale::EnUs);
    s.create(TaskDraft::new("far", add_days(TODAY, 10)))
        .expect("create");
    s.create(TaskDraft::new("near", add_days(TODAY, 3)))
        .expect("create");
    s.create(TaskDraft::new("near too", add_days(TODAY, 3)))
        .expect("create");

    let view = s.upcoming_view();
    let labels: Vec<&str> = view.groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, ["Oct 22", "Oct 29"]);
    assert_eq!(view.groups[0].tasks.len(), 2);
    assert_eq!(view.task_count(), 3);
}

#[test]
fn config_file_drives_locale_and_defaults() {
    let td = tempfile::tempdir().expect("tempdir");
    let path = td.path().join("daybook").join("config.toml");

    config::set_value_string_at_path(&path, "locale", "pt-BR").expect("set locale");
    config::set_value_string_at_path(&path, "tasks.default_priority", "2").expect("set prio");
    assert!(config::set_value_string_at_path(&path, "tasks.default_priority", "9").is_err());

    let cfg = config::load_at_path(&path).expect("load");
    assert_eq!(cfg.ui.locale, DateLocale::PtBr);
    assert_eq!(cfg.tasks.default_priority(), Priority::P2);
    assert_eq!(
        config::get_value_string_at_path(&path, "ui.locale")
            .expect("get")
            .as_deref(),
        Some("pt-BR")
    );

    let mut s = store(cfg.ui.locale);
    let t = s
        .create(TaskDraft::new("Reunião", TODAY).priority(cfg.tasks.default_priority()))
        .expect("create");
    assert_eq!(t.date_label, "19 de out");
    assert_eq!(s.today_view().today.len(), 1);
    let chart = s.stats_view(StatsRange::Week);
    assert_eq!(chart.series.last().map(|p| p.label.as_str()), Some("19/10"));
}
