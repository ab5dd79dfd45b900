#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Args, CommandFactory as _, Parser, Subcommand};
use time::Date;

use crate::config::{self, Config, LogConfig};
use crate::logging::{self, LogTarget};
use crate::output::table::Table;
use crate::task::calendar::{Clock, FixedClock, SystemClock, format_iso, parse_iso};
use crate::task::view::{StatsRange, StatsView};
use crate::task::{PRIORITY_OPTIONS, Task, TaskStore};
use crate::tui;

#[derive(Debug, Parser)]
#[command(
    name = "daybook",
    version,
    about = "Today, upcoming and done: a small task list for the terminal"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true, value_name = "DATE", value_parser = parse_iso)]
    pub today: Option<Date>,
    /// Start without the sample tasks
    #[arg(long, global = true)]
    pub empty: bool,
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Late tasks and tasks due today
    Today(ViewArgs),
    /// Open tasks grouped by due date
    Upcoming(ViewArgs),
    /// Completed tasks
    History(ViewArgs),
    /// Completed count and the productivity chart
    Stats(StatsArgs),
    /// The priority table
    Priorities(PrioritiesArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ViewArgs {
    #[arg(long = "json", conflicts_with = "csv")]
    pub json: bool,
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// 7d, 30d or 1y (defaults to stats.default_range)
    #[arg(long)]
    pub range: Option<StatsRange>,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct PrioritiesArgs {
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Human,
    Json,
    Csv,
}

impl ViewArgs {
    fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else if self.csv {
            Format::Csv
        } else {
            Format::Human
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli).await;
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Cli { global, cmd } = cli;
    match cmd {
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "daybook", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Version) => Ok(cmd_version()),
        Some(Commands::Config(args)) => {
            // A broken config file must not stop `config set` from fixing it.
            logging::init(
                &LogConfig::default(),
                LogTarget::Stderr,
                global.quiet,
                global.verbose,
            )?;
            cmd_config(args).await
        }
        None => {
            let target = if tui::is_tty() {
                LogTarget::FileOnly
            } else {
                LogTarget::Stderr
            };
            let (cfg, store) = prepare(&global, target).await?;
            cmd_default(cfg, store).await
        }
        Some(Commands::Today(args)) => {
            let (cfg, store) = prepare(&global, LogTarget::Stderr).await?;
            write_today(&mut io::stdout().lock(), &store, args.format(), cfg.ui.icons)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Upcoming(args)) => {
            let (cfg, store) = prepare(&global, LogTarget::Stderr).await?;
            write_upcoming(&mut io::stdout().lock(), &store, args.format(), cfg.ui.icons)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::History(args)) => {
            let (cfg, store) = prepare(&global, LogTarget::Stderr).await?;
            write_history(&mut io::stdout().lock(), &store, args.format(), cfg.ui.icons)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Stats(args)) => {
            let (cfg, store) = prepare(&global, LogTarget::Stderr).await?;
            let range = args.range.unwrap_or(cfg.stats.default_range);
            write_stats(&mut io::stdout().lock(), &store.stats_view(range), args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Priorities(args)) => {
            write_priorities(&mut io::stdout().lock(), args.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads config, starts logging and builds the in-memory store.
async fn prepare(global: &GlobalArgs, target: LogTarget) -> anyhow::Result<(Config, TaskStore)> {
    let cfg = load_cfg().await?;
    logging::init(&cfg.log, target, global.quiet, global.verbose)?;
    let store = build_store(&cfg, global)?;
    Ok((cfg, store))
}

async fn load_cfg() -> anyhow::Result<Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<Config> {
        let (cfg, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

fn build_store(cfg: &Config, global: &GlobalArgs) -> anyhow::Result<TaskStore> {
    let clock: Box<dyn Clock> = match global.today {
        Some(d) => Box::new(FixedClock(d)),
        None => Box::new(SystemClock),
    };
    let store = TaskStore::new(clock, cfg.ui.locale);
    if cfg.tasks.demo_data && !global.empty {
        return Ok(store.with_demo_tasks()?);
    }
    Ok(store)
}

async fn cmd_default(cfg: Config, store: TaskStore) -> anyhow::Result<ExitCode> {
    if tui::is_tty() {
        tokio::task::spawn_blocking(move || tui::app::run(cfg, store)).await??;
        return Ok(ExitCode::SUCCESS);
    }

    // Non-TTY fallback: print the Today view.
    write_today(&mut io::stdout().lock(), &store, Format::Human, cfg.ui.icons)?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_config(args: ConfigArgs) -> anyhow::Result<ExitCode> {
    match args.cmd {
        ConfigCmd::List => {
            let text = tokio::task::spawn_blocking(config::list_resolved_toml).await??;
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Set(set) => {
            let (key, value) = (set.key.clone(), set.value.clone());
            tokio::task::spawn_blocking(move || config::set_value_string(&key, &value)).await??;
            println!("Set {} = {}", set.key, set.value);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCmd::Get(get) => {
            let key = get.key.clone();
            let val = tokio::task::spawn_blocking(move || config::get_value_string(&key)).await??;
            match val {
                Some(v) => {
                    println!("{v}");
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!(
                    "configuration key '{}' not found - use 'daybook config list' to see available keys",
                    get.key
                ),
            }
        }
    }
}

fn cmd_version() -> ExitCode {
    println!("daybook version {}", env!("CARGO_PKG_VERSION"));
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

const TASK_CSV_HEADERS: [&str; 10] = [
    "id",
    "section",
    "title",
    "description",
    "due",
    "date_label",
    "late",
    "priority",
    "color",
    "completed",
];

fn csv_row(section: &str, t: &Task) -> [String; 10] {
    [
        t.id.to_string(),
        section.to_owned(),
        t.title.clone(),
        t.description.clone(),
        format_iso(t.due),
        t.date_label.clone(),
        t.late.to_string(),
        t.priority.to_string(),
        t.color.clone(),
        t.completed.to_string(),
    ]
}

fn display_title(t: &Task, icons: bool) -> String {
    if !icons {
        return t.title.clone();
    }
    let icon = if t.completed {
        "✔"
    } else if t.is_overdue() {
        "!"
    } else {
        "○"
    };
    format!("{icon} {}", t.title)
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    let mut s = serde_json::to_string_pretty(value)?;
    s.push('\n');
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn write_today(
    out: &mut impl Write,
    store: &TaskStore,
    format: Format,
    icons: bool,
) -> anyhow::Result<()> {
    let view = store.today_view();
    let sections = [("late", &view.late), ("today", &view.today)];

    match format {
        Format::Json => write_json(out, &view),
        Format::Csv => {
            let mut t = Table::new(TASK_CSV_HEADERS);
            for (section, tasks) in sections {
                for task in tasks {
                    t.row(csv_row(section, task));
                }
            }
            t.write_csv(out)?;
            Ok(())
        }
        Format::Human => {
            writeln!(
                out,
                "Today, {}: {} pending",
                store.today_label(),
                view.pending()
            )?;
            if view.is_empty() {
                writeln!(out, "Nothing left for today.")?;
                return Ok(());
            }
            let mut t = Table::new(["ID", "SECTION", "TITLE", "DUE", "PRIORITY", "DESCRIPTION"]);
            for (section, tasks) in sections {
                for task in tasks {
                    t.row([
                        task.id.to_string(),
                        section.to_owned(),
                        display_title(task, icons),
                        task.date_label.clone(),
                        task.priority.label().to_owned(),
                        task.description.clone(),
                    ]);
                }
            }
            t.write_to(out)?;
            Ok(())
        }
    }
}

fn write_upcoming(
    out: &mut impl Write,
    store: &TaskStore,
    format: Format,
    icons: bool,
) -> anyhow::Result<()> {
    let view = store.upcoming_view();

    match format {
        Format::Json => write_json(out, &view),
        Format::Csv => {
            let mut t = Table::new(TASK_CSV_HEADERS);
            for group in &view.groups {
                for task in &group.tasks {
                    t.row(csv_row(&group.label, task));
                }
            }
            t.write_csv(out)?;
            Ok(())
        }
        Format::Human => {
            if view.is_empty() {
                writeln!(out, "Nothing scheduled.")?;
                return Ok(());
            }
            let mut t = Table::new(["DATE", "ID", "TITLE", "PRIORITY", "DESCRIPTION"]);
            for group in &view.groups {
                for task in &group.tasks {
                    t.row([
                        group.label.to_uppercase(),
                        task.id.to_string(),
                        display_title(task, icons),
                        task.priority.label().to_owned(),
                        task.description.clone(),
                    ]);
                }
            }
            t.write_to(out)?;
            Ok(())
        }
    }
}

fn write_history(
    out: &mut impl Write,
    store: &TaskStore,
    format: Format,
    icons: bool,
) -> anyhow::Result<()> {
    let done = store.history_view();

    match format {
        Format::Json => write_json(out, &done),
        Format::Csv => {
            let mut t = Table::new(TASK_CSV_HEADERS);
            for task in &done {
                t.row(csv_row("history", task));
            }
            t.write_csv(out)?;
            Ok(())
        }
        Format::Human => {
            if done.is_empty() {
                writeln!(out, "No completed tasks.")?;
                return Ok(());
            }
            let mut t = Table::new(["ID", "TITLE", "DUE", "PRIORITY"]);
            for task in &done {
                t.row([
                    task.id.to_string(),
                    display_title(task, icons),
                    task.date_label.clone(),
                    task.priority.label().to_owned(),
                ]);
            }
            t.write_to(out)?;
            Ok(())
        }
    }
}

fn write_stats(out: &mut impl Write, stats: &StatsView, json: bool) -> anyhow::Result<()> {
    if json {
        return write_json(out, stats);
    }

    writeln!(out, "Completed: {}", stats.completed)?;
    writeln!(out, "Range:     {}", stats.range.label())?;
    writeln!(out)?;
    for p in &stats.series {
        let bar: String = std::iter::repeat_n('█', usize::from(p.value / 5)).collect();
        let marker = if p.is_today { " <" } else { "" };
        writeln!(out, "{:>5}  {bar} {}%{marker}", p.label, p.value)?;
    }
    if stats.series_is_sample {
        writeln!(out)?;
        writeln!(out, "(sample data: the chart is not derived from your tasks)")?;
    }
    Ok(())
}

fn write_priorities(out: &mut impl Write, json: bool) -> anyhow::Result<()> {
    if json {
        return write_json(out, &PRIORITY_OPTIONS);
    }
    let mut t = Table::new(["VALUE", "LABEL", "COLOR"]);
    for opt in &PRIORITY_OPTIONS {
        t.row([
            opt.value.to_string(),
            opt.label.to_owned(),
            opt.color.to_owned(),
        ]);
    }
    t.write_to(out)?;
    Ok(())
}
