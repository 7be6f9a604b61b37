use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use tasklist_core::{
    parse_capture, CaptureInput, Category, Controller, FilterPatch, HttpGateway, Priority,
    TaskGateway, TaskRecord, TaskStats,
};

use crate::cli::{CliCommand, DeleteArgs, ListArgs, MoveArgs};
use crate::config::AppConfig;

/// Run a one-shot command against the configured server.
pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let gateway = HttpGateway::new(config.api_url(), config.request_timeout())?;
    let mut controller = Controller::new(Arc::new(gateway));
    runtime.block_on(execute_with(&mut controller, command, &mut writer))
}

pub async fn execute_with<G, W>(
    controller: &mut Controller<G>,
    command: CliCommand,
    mut writer: W,
) -> Result<()>
where
    G: TaskGateway,
    W: Write,
{
    match command {
        CliCommand::List(args) => handle_list(controller, args, &mut writer).await,
        CliCommand::Add(args) => {
            let draft = parse_capture(&CaptureInput::from(args))?;
            let record = controller.create(draft).await?;
            writeln!(writer, "Created task {}: {}", record.id, record.title)?;
            Ok(())
        }
        CliCommand::Done(args) => handle_completion(controller, &args.id, true, &mut writer).await,
        CliCommand::Undo(args) => handle_completion(controller, &args.id, false, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(controller, &args, &mut writer).await,
        CliCommand::Stats => {
            controller.refresh_stats().await?;
            write_stats(controller.stats(), &mut writer)
        }
        CliCommand::Health => {
            let health = controller.check_health().await?;
            match health.timestamp {
                Some(at) => writeln!(
                    writer,
                    "Server status: {} (at {})",
                    health.status,
                    local_time(at)
                )?,
                None => writeln!(writer, "Server status: {}", health.status)?,
            }
            if health.is_ok() {
                Ok(())
            } else {
                Err(anyhow!("server reported status '{}'", health.status))
            }
        }
        CliCommand::Move(args) => handle_move(controller, &args, &mut writer).await,
        CliCommand::Backup => {
            let message = controller.backup().await?;
            writeln!(writer, "{message}")?;
            Ok(())
        }
        CliCommand::Tui => Err(anyhow!("launch the terminal UI directly")),
    }
}

async fn handle_list<G: TaskGateway, W: Write>(
    controller: &mut Controller<G>,
    args: ListArgs,
    mut writer: W,
) -> Result<()> {
    controller.set_filter(FilterPatch {
        status: Some(args.status),
        category: Some(args.category),
        search: Some(args.search.unwrap_or_default()),
        sort: Some(args.sort),
    });
    controller.refresh_tasks().await?;
    let view = controller.view();

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &view)?;
        writeln!(writer)?;
        return Ok(());
    }

    if view.is_empty() {
        let message = if controller.tasks().is_empty() {
            "No tasks yet"
        } else {
            "No tasks match the current filters"
        };
        writeln!(writer, "{message}")?;
        return Ok(());
    }

    let now = Utc::now();
    for task in &view {
        writeln!(writer, "{}", ListRow { task, now })?;
    }
    Ok(())
}

async fn handle_completion<G: TaskGateway, W: Write>(
    controller: &mut Controller<G>,
    id: &str,
    completed: bool,
    mut writer: W,
) -> Result<()> {
    controller.refresh_tasks().await?;
    let record = controller.set_completed(id, completed).await?;
    let verb = if completed { "Completed" } else { "Reopened" };
    writeln!(writer, "{verb} task {}: {}", record.id, record.title)?;
    Ok(())
}

async fn handle_delete<G: TaskGateway, W: Write>(
    controller: &mut Controller<G>,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<()> {
    let mut summary = DeleteSummary::default();
    for id in &args.ids {
        match controller.delete(id).await {
            Ok(()) => summary.deleted += 1,
            Err(err) => summary.failed.push((id.clone(), err.user_message())),
        }
    }
    summary.write_to(&mut writer)?;
    if summary.deleted == 0 && !summary.failed.is_empty() {
        return Err(anyhow!(
            "failed to delete {} of {} task(s)",
            summary.failed.len(),
            args.ids.len()
        ));
    }
    Ok(())
}

async fn handle_move<G: TaskGateway, W: Write>(
    controller: &mut Controller<G>,
    args: &MoveArgs,
    mut writer: W,
) -> Result<()> {
    controller.reorder(&args.id, &args.target).await?;
    writeln!(
        writer,
        "Moved task {} next to task {}",
        args.id, args.target
    )?;
    Ok(())
}

fn write_stats<W: Write>(stats: &TaskStats, mut writer: W) -> Result<()> {
    writeln!(
        writer,
        "Total: {}  Active: {}  Completed: {}  Overdue: {}  Completed today: {}",
        stats.total, stats.active, stats.completed, stats.overdue, stats.completed_today
    )?;
    writeln!(
        writer,
        "Priority: {} {}, {} {}, {} {}",
        Priority::High,
        stats.by_priority.high,
        Priority::Medium,
        stats.by_priority.medium,
        Priority::Low,
        stats.by_priority.low
    )?;
    let categories: Vec<String> = Category::ALL
        .iter()
        .map(|category| {
            let count = stats.by_category.count(*category);
            format!("{category} {count} ({}%)", stats.share(count))
        })
        .collect();
    writeln!(writer, "Category: {}", categories.join(", "))?;
    Ok(())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

struct ListRow<'a> {
    task: &'a TaskRecord,
    now: DateTime<Utc>,
}

impl fmt::Display for ListRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task;
        let mark = if task.completed { "x" } else { " " };
        write!(
            f,
            "{:>4}  [{}] {}  {}/{}  {:>3}%",
            task.id, mark, task.title, task.category, task.priority, task.progress
        )?;
        if let Some(due) = task.due {
            write!(f, "  due {}", local_time(due))?;
            if !task.completed {
                write!(f, " ({})", task.time_remaining(self.now))?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    failed: Vec<(String, String)>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        for (id, reason) in &self.failed {
            writeln!(writer, "Not deleted: {id} ({reason})")?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{AddArgs, IdArgs};
    use pretty_assertions::assert_eq;
    use tasklist_core::{GatewayOp, MemoryGateway, SortKey, StatusFilter};

    fn add_args(text: &str) -> AddArgs {
        AddArgs {
            text: text.split_whitespace().map(str::to_string).collect(),
            description_words: Vec::new(),
            description: None,
            category: None,
            priority: None,
            due: None,
            progress: None,
        }
    }

    fn list_args() -> ListArgs {
        ListArgs {
            status: StatusFilter::All,
            category: None,
            search: None,
            sort: SortKey::Priority,
            json: false,
        }
    }

    async fn run(controller: &mut Controller<MemoryGateway>, command: CliCommand) -> String {
        let mut output = Vec::new();
        execute_with(controller, command, &mut output)
            .await
            .expect("command succeeds");
        String::from_utf8(output).expect("utf8")
    }

    async fn seeded(texts: &[&str]) -> (Arc<MemoryGateway>, Controller<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        let mut controller = Controller::new(Arc::clone(&gateway));
        for text in texts {
            run(&mut controller, CliCommand::Add(add_args(text))).await;
        }
        (gateway, controller)
    }

    #[tokio::test]
    async fn add_parses_inline_tokens() {
        let (gateway, mut controller) = seeded(&[]).await;
        let output = run(
            &mut controller,
            CliCommand::Add(add_args("Write report #work p:high prog:40")),
        )
        .await;

        assert_eq!(output, "Created task 1: Write report\n");
        let stored = gateway.tasks();
        assert_eq!(stored[0].category, Category::Work);
        assert_eq!(stored[0].priority, Priority::High);
        assert_eq!(stored[0].progress, 40);
    }

    #[tokio::test]
    async fn add_rejects_empty_title_before_any_request() {
        let (gateway, mut controller) = seeded(&[]).await;
        let mut output = Vec::new();
        let err = execute_with(&mut controller, CliCommand::Add(add_args("#work")), &mut output)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("title cannot be empty"));
        assert_eq!(gateway.requests(GatewayOp::Create), 0);
    }

    #[tokio::test]
    async fn list_prints_sorted_view() {
        let (_gateway, mut controller) = seeded(&["low one", "urgent one p:high"]).await;
        let output = run(&mut controller, CliCommand::List(list_args())).await;
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("urgent one"));
        assert!(lines[0].contains("other/high"));
        assert!(lines[1].contains("low one"));
    }

    #[tokio::test]
    async fn list_reports_empty_states() {
        let (_gateway, mut controller) = seeded(&[]).await;
        let output = run(&mut controller, CliCommand::List(list_args())).await;
        assert_eq!(output, "No tasks yet\n");

        run(&mut controller, CliCommand::Add(add_args("Buy milk"))).await;
        let mut args = list_args();
        args.search = Some("bread".into());
        let output = run(&mut controller, CliCommand::List(args)).await;
        assert_eq!(output, "No tasks match the current filters\n");
    }

    #[tokio::test]
    async fn list_json_emits_wire_fields() {
        let (_gateway, mut controller) = seeded(&["Buy milk #shopping"]).await;
        let mut args = list_args();
        args.json = true;
        let output = run(&mut controller, CliCommand::List(args)).await;
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value[0]["title"], "Buy milk");
        assert_eq!(value[0]["category"], "shopping");
        assert!(value[0].get("created_at").is_some());
    }

    #[tokio::test]
    async fn done_and_undo_round_trip_completion() {
        let (gateway, mut controller) = seeded(&["Ship it prog:30"]).await;

        let output = run(&mut controller, CliCommand::Done(IdArgs { id: "1".into() })).await;
        assert_eq!(output, "Completed task 1: Ship it\n");
        assert_eq!(gateway.tasks()[0].progress, 100);

        let output = run(&mut controller, CliCommand::Undo(IdArgs { id: "1".into() })).await;
        assert_eq!(output, "Reopened task 1: Ship it\n");
        assert!(!gateway.tasks()[0].completed);
    }

    #[tokio::test]
    async fn delete_reports_deleted_and_failed() {
        let (gateway, mut controller) = seeded(&["One", "Two"]).await;
        let args = DeleteArgs {
            ids: vec!["1".into(), "missing".into()],
        };
        let output = run(&mut controller, CliCommand::Delete(args)).await;

        assert!(output.contains("Deleted 1 task\n"));
        assert!(output.contains("Not deleted: missing (Todo not found)"));
        assert_eq!(gateway.tasks().len(), 1);
    }

    #[tokio::test]
    async fn delete_fails_when_nothing_is_deleted() {
        let (_gateway, mut controller) = seeded(&[]).await;
        let args = DeleteArgs {
            ids: vec!["missing".into(), "gone".into()],
        };
        let mut output = Vec::new();
        let err = execute_with(&mut controller, CliCommand::Delete(args), &mut output)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "failed to delete 2 of 2 task(s)");
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("No tasks deleted"));
        assert!(output.contains("Not deleted: gone (Todo not found)"));
    }

    #[tokio::test]
    async fn stats_prints_breakdowns() {
        let (_gateway, mut controller) = seeded(&["a #work p:high", "b #work", "c"]).await;
        let output = run(&mut controller, CliCommand::Stats).await;

        assert!(output.starts_with("Total: 3  Active: 3  Completed: 0"));
        assert!(output.contains("Priority: high 1, medium 0, low 2"));
        assert!(output.contains("work 2 (66%)"));
    }

    #[tokio::test]
    async fn move_and_backup_report_success() {
        let (gateway, mut controller) = seeded(&["a", "b", "c"]).await;
        let args = MoveArgs {
            id: "3".into(),
            target: "1".into(),
        };
        run(&mut controller, CliCommand::Move(args)).await;
        let order: Vec<String> = gateway.tasks().into_iter().map(|task| task.id).collect();
        assert_eq!(order, vec!["3", "1", "2"]);

        let output = run(&mut controller, CliCommand::Backup).await;
        assert_eq!(output, "Backup created successfully\n");
        assert_eq!(gateway.backups(), 1);
    }

    #[tokio::test]
    async fn server_failures_surface_as_errors() {
        let (gateway, mut controller) = seeded(&[]).await;
        gateway.fail_next(GatewayOp::Health, "database offline");
        let mut output = Vec::new();
        let err = execute_with(&mut controller, CliCommand::Health, &mut output)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "database offline");
    }
}
