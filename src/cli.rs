//! CLI command definitions.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hierarchical task manager with tags, time budgets and AI sub-steps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Profile name owning the tasks
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task; #tags in the title are extracted and registered
    Add(AddArgs),

    /// List tasks as a tree with branch totals and a stats footer
    List(ListArgs),

    /// Update fields of an existing task
    Update(UpdateArgs),

    /// Complete a task and its whole subtree
    Complete { id: i64 },

    /// Reopen a task and its whole subtree
    Uncomplete { id: i64 },

    /// Delete a task; subtasks go with it
    Delete { id: i64 },

    /// Hide a task from listings for a duration (30m, 2h, 1d, 1w)
    Hide { id: i64, duration: String },

    /// Manage task tags
    #[command(subcommand)]
    Tag(TagCommand),

    /// Manage AI suggestion items
    #[command(subcommand)]
    Suggest(SuggestCommand),

    /// Print the branch containing a task
    Context { id: i64 },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title; may contain #tags
    pub title: String,

    /// Parent task id
    #[arg(short, long)]
    pub parent: Option<i64>,

    /// Estimated time in minutes
    #[arg(short, long)]
    pub time: Option<i64>,

    /// Importance: Important, Medium or Normal
    #[arg(short, long)]
    pub importance: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Due date: YYYY-MM-DD, "YYYY-MM-DD HH:MM" or epoch milliseconds
    #[arg(long)]
    pub due: Option<String>,

    /// Ask the configured AI provider for sub-step suggestions
    #[arg(long)]
    pub ai: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Substring match over titles, tags and importance
    #[arg(short, long)]
    pub search: Option<String>,

    /// Exact tag name; includes each match's whole subtree
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Exact importance match
    #[arg(short, long)]
    pub importance: Option<String>,

    /// today, tomorrow, this_week, next_week or all
    #[arg(short, long)]
    pub period: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: i64,

    /// New title; may contain new #tags
    #[arg(long)]
    pub title: Option<String>,

    /// Estimated time in minutes
    #[arg(long)]
    pub time: Option<String>,

    #[arg(long)]
    pub importance: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Due date; an empty string clears it
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Attach a tag to a task, creating it in the registry if needed
    Add { id: i64, name: String },

    /// Detach a tag from a task by tag id
    Rm { id: i64, tag_id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum SuggestCommand {
    /// Drop the whole suggestion list
    Clear { id: i64 },

    /// Remove every suggestion item with this exact text
    Rm { id: i64, text: String },

    /// Toggle the done flag on every matching item
    Toggle { id: i64, text: String },

    /// Rewrite the first matching item
    Edit {
        id: i64,
        old: String,
        new: String,

        /// New time estimate in minutes
        #[arg(long)]
        time: Option<String>,
    },
}
