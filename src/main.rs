//! task-forest CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use task_forest::ai::provider_from_config;
use task_forest::cli::{Cli, Command, SuggestCommand, TagCommand};
use task_forest::config::Config;
use task_forest::db::Database;
use task_forest::error::ServiceError;
use task_forest::filter::TaskFilter;
use task_forest::format;
use task_forest::service::{parse_due, NewTask, TaskPatch, TaskService};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let config = Config::load(cli.config.as_deref())?;
    let db_path = config.resolve_db_path(cli.database.as_deref());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %db_path.display(), "opening database");
    let db = Database::open(&db_path)?;
    let provider = provider_from_config(&config.ai);
    let service = TaskService::new(db, provider);

    let user = service
        .get_or_create_user(&cli.user)
        .map_err(anyhow::Error::new)?;

    match run(&service, user.id, cli.command, cli.json).await {
        Ok(()) => Ok(()),
        Err(err) => {
            if cli.json {
                println!("{}", serde_json::to_string(&err)?);
            } else {
                eprintln!("error: {err}");
            }
            std::process::exit(1);
        }
    }
}

async fn run(
    service: &TaskService,
    user_id: i64,
    command: Command,
    json: bool,
) -> std::result::Result<(), ServiceError> {
    match command {
        Command::Add(args) => {
            let due_at = match args.due.as_deref() {
                Some(raw) => Some(parse_due(raw).ok_or_else(|| {
                    ServiceError::invalid_value("due", "expected YYYY-MM-DD, YYYY-MM-DD HH:MM or epoch ms")
                })?),
                None => None,
            };
            let task = service
                .add_task(
                    user_id,
                    NewTask {
                        title: args.title,
                        parent_id: args.parent,
                        time_minutes: args.time,
                        importance: args.importance,
                        description: args.description,
                        due_at,
                        run_ai: args.ai,
                    },
                )
                .await?;
            if json {
                print_json(&task)?;
            } else {
                println!("Created task #{}: {}", task.id, task.title);
                for item in &task.suggestions {
                    println!("  - {}", item.text());
                }
            }
        }
        Command::List(args) => {
            let period = match args.period.as_deref() {
                Some(raw) => Some(
                    raw.parse()
                        .map_err(|e: String| ServiceError::invalid_value("period", &e))?,
                ),
                None => None,
            };
            let filter = TaskFilter {
                search: args.search,
                tag: args.tag,
                importance: args.importance,
                period,
            };
            let (forest, stats) = service.list_tasks(user_id, &filter)?;
            if json {
                print_json(&serde_json::json!({ "tasks": forest, "stats": stats }))?;
            } else {
                print!("{}", format::render_forest(&forest));
                print!("{}", format::render_stats(&stats));
            }
        }
        Command::Update(args) => {
            let task = service.update_task(
                user_id,
                args.id,
                TaskPatch {
                    title: args.title,
                    time_minutes: args.time,
                    importance: args.importance,
                    description: args.description,
                    due_at: args.due,
                },
            )?;
            if json {
                print_json(&task)?;
            } else {
                println!("Updated task #{}", task.id);
            }
        }
        Command::Complete { id } => {
            let count = service.complete_task(user_id, id)?;
            report(json, &serde_json::json!({ "completed": count }), || {
                format!("Completed {count} task(s)")
            })?;
        }
        Command::Uncomplete { id } => {
            let count = service.uncomplete_task(user_id, id)?;
            report(json, &serde_json::json!({ "reopened": count }), || {
                format!("Reopened {count} task(s)")
            })?;
        }
        Command::Delete { id } => {
            service.delete_task(user_id, id)?;
            report(json, &serde_json::json!({ "deleted": id }), || {
                format!("Deleted task #{id}")
            })?;
        }
        Command::Hide { id, duration } => {
            let hide_until = service.hide_task(user_id, id, &duration)?;
            report(json, &serde_json::json!({ "hide_until": hide_until }), || {
                format!("Task #{id} hidden for {duration}")
            })?;
        }
        Command::Tag(tag_command) => match tag_command {
            TagCommand::Add { id, name } => {
                let tags = service.add_tag(user_id, id, &name)?;
                report_tags(json, id, &tags)?;
            }
            TagCommand::Rm { id, tag_id } => {
                let tags = service.remove_tag(user_id, id, tag_id)?;
                report_tags(json, id, &tags)?;
            }
        },
        Command::Suggest(suggest_command) => match suggest_command {
            SuggestCommand::Clear { id } => {
                service.clear_suggestions(user_id, id)?;
                report(json, &serde_json::json!({ "cleared": id }), || {
                    format!("Cleared suggestions on task #{id}")
                })?;
            }
            SuggestCommand::Rm { id, text } => {
                service.remove_suggestion_item(user_id, id, &text)?;
                report(json, &serde_json::json!({ "removed": text }), || {
                    "Removed matching suggestion items".to_string()
                })?;
            }
            SuggestCommand::Toggle { id, text } => {
                let changed = service.toggle_suggestion_item(user_id, id, &text)?;
                report(json, &serde_json::json!({ "changed": changed }), || {
                    if changed {
                        "Toggled matching suggestion items".to_string()
                    } else {
                        "No matching suggestion item".to_string()
                    }
                })?;
            }
            SuggestCommand::Edit { id, old, new, time } => {
                let changed =
                    service.edit_suggestion_item(user_id, id, &old, &new, time.as_deref())?;
                report(json, &serde_json::json!({ "changed": changed }), || {
                    if changed {
                        "Edited suggestion item".to_string()
                    } else {
                        "No matching suggestion item".to_string()
                    }
                })?;
            }
        },
        Command::Context { id } => {
            let branch = service.export_branch(user_id, id)?;
            if json {
                print_json(&branch)?;
            } else {
                print!("{}", format::render_branch(&branch));
            }
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> std::result::Result<(), ServiceError> {
    let text = serde_json::to_string_pretty(value).map_err(ServiceError::internal)?;
    println!("{text}");
    Ok(())
}

fn report<F: FnOnce() -> String>(
    json: bool,
    value: &serde_json::Value,
    human: F,
) -> std::result::Result<(), ServiceError> {
    if json {
        print_json(value)
    } else {
        println!("{}", human());
        Ok(())
    }
}

fn report_tags(
    json: bool,
    task_id: i64,
    tags: &[task_forest::types::Tag],
) -> std::result::Result<(), ServiceError> {
    if json {
        print_json(&tags)
    } else {
        let names: Vec<String> = tags.iter().map(|t| format!("#{}", t.name)).collect();
        println!("Task #{task_id} tags: {}", names.join(" "));
        Ok(())
    }
}
