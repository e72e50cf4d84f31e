//! cadence-queue - Manage the task and post queue
//!
//! Unix-style tool over the Cadence service: queue tasks and posts, edit
//! pending tasks, list what is waiting and show daily counters.

use std::io::Read;

use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use libcadence::logging::{LogFormat, LoggingConfig};
use libcadence::platforms::PlatformRegistry;
use libcadence::scheduling::parse_when;
use libcadence::service::{PostRequest, TaskRequest};
use libcadence::types::{ScheduledPost, TaskEdit, TaskMetadata};
use libcadence::{CadenceError, CadenceService, Config, Repository, Result, Task, TaskStatus};

#[derive(Parser, Debug)]
#[command(name = "cadence-queue")]
#[command(version)]
#[command(about = "Manage Cadence's task and post queue")]
#[command(long_about = "\
cadence-queue - Manage Cadence's task and post queue

DESCRIPTION:
    cadence-queue adds work for the cadence-send daemon and shows what is
    waiting. Tasks run on the next trigger tick once their time is due.

COMMANDS:
    task add     Queue a like, comment, follow, retweet, scrape or trend_monitor task
    task import  Queue many tasks from a JSON array (file or stdin)
    task edit    Change the action, priority or time of a pending task
    task list    List tasks
    post add     Schedule a post
    post list    List scheduled posts
    stats        Roll up and show counters for one day

USAGE EXAMPLES:
    # Follow an account in two hours
    cadence-queue task add --type follow --platform twitter --target rustlang --at +2h

    # Scrape at most 20 verified users from a subreddit, high priority
    cadence-queue task add --type scrape --platform reddit --target r/rust \\
        --verified-only --max-results 20 --priority 5

    # Import tasks spread out over the next hour
    cadence-queue task import tasks.json

    # Schedule a post from stdin
    echo \"Shipping today\" | cadence-queue post add --platform twitter --at \"tomorrow 9am\"

    # Yesterday's counters as JSON
    cadence-queue stats --format json

CONFIGURATION:
    Configuration file: ~/.config/cadence/config.toml
    Database location:  ~/.local/share/cadence/cadence.db

    Override with environment variables:
        CADENCE_CONFIG    - Path to config file
        CADENCE_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Database or configuration error
    3 - Invalid input (unknown task, bad time, unsupported platform, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue, edit and list tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Schedule and list posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Roll up and show counters for one day
    Stats {
        /// Day to roll up: YYYY-MM-DD, "today" or "yesterday"
        #[arg(short, long, default_value = "yesterday")]
        day: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommands {
    /// Queue one task
    Add {
        /// like, comment, follow, retweet, scrape or trend_monitor
        #[arg(long = "type", value_name = "TYPE")]
        task_type: String,

        /// twitter, reddit, instagram or facebook
        #[arg(short, long)]
        platform: String,

        /// Post ID, username, subreddit or hashtag, depending on the type
        #[arg(short, long)]
        target: String,

        /// Comment text or free-form action; defaults to the task type
        #[arg(short, long)]
        action: Option<String>,

        /// 1 (lowest) to 5 (highest), default 3
        #[arg(long)]
        priority: Option<i64>,

        /// When to run (e.g. "now", "+30m", "random:10m-1h", "tomorrow 9am")
        #[arg(long, default_value = "now")]
        at: String,

        /// Scrape: keep users with at least this many followers
        #[arg(long)]
        min_followers: Option<u64>,

        /// Scrape: keep users with at most this many followers
        #[arg(long)]
        max_followers: Option<u64>,

        /// Scrape: keep verified users only
        #[arg(long)]
        verified_only: bool,

        /// Scrape: keep users mentioning this keyword (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Scrape: maximum users stored per run
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Queue tasks from a JSON array
    Import {
        /// Path to the JSON file, or "-" for stdin
        file: String,
    },

    /// Edit a pending task
    Edit {
        /// Task ID
        task_id: String,

        /// New action
        #[arg(short, long)]
        action: Option<String>,

        /// New priority (clamped to 1..5)
        #[arg(long)]
        priority: Option<i64>,

        /// New time (same forms as `task add --at`)
        #[arg(long)]
        at: Option<String>,
    },

    /// List tasks, highest priority first
    List {
        /// Only tasks with this status (pending, scheduled, completed, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of tasks shown
        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
enum PostCommands {
    /// Schedule one post
    Add {
        /// Post text; read from stdin when omitted or "-"
        content: Option<String>,

        /// twitter, reddit, instagram or facebook
        #[arg(short, long)]
        platform: String,

        /// Publication time, must be in the future
        #[arg(long)]
        at: String,

        /// Media reference to attach (repeatable)
        #[arg(long)]
        media: Vec<String>,
    },

    /// List scheduled posts
    List {
        /// Only posts not yet published
        #[arg(long, conflicts_with = "posted")]
        pending: bool,

        /// Only published posts
        #[arg(long)]
        posted: bool,

        /// Maximum number of posts shown
        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(LogFormat::Text, "error".to_string(), cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    // The queue never calls adapters, so no platforms are registered
    let service = CadenceService::from_config(config, PlatformRegistry::new()).await?;

    match cli.command {
        Commands::Task { command } => match command {
            TaskCommands::Add {
                task_type,
                platform,
                target,
                action,
                priority,
                at,
                min_followers,
                max_followers,
                verified_only,
                keywords,
                max_results,
            } => {
                let mut metadata = TaskMetadata::default();
                metadata.filters.min_followers = min_followers;
                metadata.filters.max_followers = max_followers;
                metadata.filters.verified_only = verified_only;
                metadata.filters.keywords = keywords;
                if let Some(max_results) = max_results {
                    metadata.limits.max_results = max_results;
                }

                let action = action.unwrap_or_else(|| task_type.clone());
                let mut request = TaskRequest::new(task_type, platform, target, action);
                request.priority = priority;
                request.scheduled_time = Some(parse_when(&at, Utc::now())?);
                request.metadata = Some(metadata);

                cmd_task_add(&service, request).await?;
            }
            TaskCommands::Import { file } => {
                cmd_task_import(&service, &file).await?;
            }
            TaskCommands::Edit {
                task_id,
                action,
                priority,
                at,
            } => {
                let scheduled_time = at.map(|at| parse_when(&at, Utc::now())).transpose()?;
                let edit = TaskEdit {
                    action,
                    priority,
                    scheduled_time,
                };
                cmd_task_edit(&service, &task_id, edit).await?;
            }
            TaskCommands::List {
                status,
                limit,
                format,
            } => {
                cmd_task_list(&service, status.as_deref(), limit, &format).await?;
            }
        },
        Commands::Post { command } => match command {
            PostCommands::Add {
                content,
                platform,
                at,
                media,
            } => {
                let content = read_content(content)?;
                let request = PostRequest {
                    content,
                    platform,
                    scheduled_time: parse_when(&at, Utc::now())?,
                    media,
                };
                cmd_post_add(&service, request).await?;
            }
            PostCommands::List {
                pending,
                posted,
                limit,
                format,
            } => {
                let filter = match (pending, posted) {
                    (true, _) => Some(false),
                    (_, true) => Some(true),
                    _ => None,
                };
                cmd_post_list(&service, filter, limit, &format).await?;
            }
        },
        Commands::Stats { day, format } => {
            cmd_stats(&service, &day, &format).await?;
        }
    }

    Ok(())
}

/// Queue one task and print its ID
async fn cmd_task_add(service: &CadenceService, request: TaskRequest) -> Result<()> {
    let task = service.schedule_task(request).await?;
    println!("{}", task.id);
    Ok(())
}

/// Queue every task in a JSON array, one result line per item
async fn cmd_task_import(service: &CadenceService, file: &str) -> Result<()> {
    let content = if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| invalid(format!("Failed to read stdin: {}", e)))?;
        buffer
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| invalid(format!("Failed to read {}: {}", file, e)))?
    };

    let requests: Vec<TaskRequest> = serde_json::from_str(&content)
        .map_err(|e| invalid(format!("Import must be a JSON array of tasks: {}", e)))?;
    let total = requests.len();

    let results = service.schedule_tasks(requests).await;
    let mut rejected = 0;
    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(task) => println!("ok {}", task.id),
            Err(e) => {
                rejected += 1;
                println!("error #{}: {}", index, e);
            }
        }
    }

    if rejected > 0 {
        return Err(invalid(format!("{} of {} tasks rejected", rejected, total)));
    }
    Ok(())
}

async fn cmd_task_edit(service: &CadenceService, task_id: &str, edit: TaskEdit) -> Result<()> {
    let task = service.update_pending_task(task_id, edit).await?;
    println!(
        "{} | priority {} | {} | {}",
        task.id,
        task.priority,
        task.action,
        format_time_until(Utc::now().timestamp(), task.scheduled_time)
    );
    Ok(())
}

async fn cmd_task_list(
    service: &CadenceService,
    status: Option<&str>,
    limit: usize,
    format: &str,
) -> Result<()> {
    validate_format(format)?;
    let status = status.map(str::parse::<TaskStatus>).transpose()?;

    let tasks = service.database().list_tasks(status, limit).await?;

    if format == "json" {
        print_json(&tasks)
    } else {
        output_tasks_text(&tasks);
        Ok(())
    }
}

fn output_tasks_text(tasks: &[Task]) {
    let now = Utc::now().timestamp();

    for task in tasks {
        let when = match task.executed_time {
            Some(executed) => format!("ran {}", format_time_since(now, executed)),
            None => format_time_until(now, task.scheduled_time),
        };
        println!(
            "{} | {} | {} | {} | p{} | {} | {}",
            task.id,
            task.task_type,
            task.platform,
            task.status,
            task.priority,
            truncate_content(&task.target, 30),
            when
        );
    }
}

async fn cmd_post_add(service: &CadenceService, request: PostRequest) -> Result<()> {
    let post = service.schedule_post(request).await?;
    println!("{}", post.id);
    Ok(())
}

async fn cmd_post_list(
    service: &CadenceService,
    posted: Option<bool>,
    limit: usize,
    format: &str,
) -> Result<()> {
    validate_format(format)?;

    let posts = service.database().list_posts(posted, limit).await?;

    if format == "json" {
        print_json(&posts)
    } else {
        output_posts_text(&posts);
        Ok(())
    }
}

fn output_posts_text(posts: &[ScheduledPost]) {
    let now = Utc::now().timestamp();

    for post in posts {
        let state = match (&post.post_id, &post.last_error) {
            (Some(post_id), _) if post.posted => format!("posted as {}", post_id),
            _ if post.posted => "posted".to_string(),
            (_, Some(error)) => format!(
                "{} (last error: {})",
                format_time_until(now, post.scheduled_time),
                error
            ),
            _ => format_time_until(now, post.scheduled_time),
        };
        println!(
            "{} | {} | {} | {}",
            post.id,
            post.platform,
            truncate_content(&post.content, 50),
            state
        );
    }
}

/// Recompute the rollup for `day` and print it
async fn cmd_stats(service: &CadenceService, day: &str, format: &str) -> Result<()> {
    validate_format(format)?;
    let day = parse_day(day)?;

    let rollup = service
        .database()
        .roll_up_daily(day, Utc::now().timestamp())
        .await?;

    if format == "json" {
        return print_json(&rollup);
    }

    println!("Day:              {}", rollup.day);
    println!("Tasks completed:  {}", rollup.tasks_completed);
    println!("Tasks failed:     {}", rollup.tasks_failed);
    println!("Rate limited:     {}", rollup.rate_limited);
    println!("Posts published:  {}", rollup.posts_published);
    Ok(())
}

fn parse_day(day: &str) -> Result<NaiveDate> {
    let today = Utc::now().date_naive();
    match day.trim() {
        "today" => Ok(today),
        "yesterday" => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| invalid("Date out of range".to_string())),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            invalid(format!(
                "Invalid day '{}'. Use YYYY-MM-DD, 'today' or 'yesterday'",
                other
            ))
        }),
    }
}

/// Post text from the argument, falling back to stdin
fn read_content(content: Option<String>) -> Result<String> {
    match content {
        Some(content) if content != "-" => Ok(content),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| invalid(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer.trim_end().to_string())
        }
    }
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(invalid(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| invalid(format!("Failed to encode JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Truncate to `max_chars` characters with an ellipsis
fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let head: String = content.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Human-readable distance to a future timestamp
fn format_time_until(now: i64, at: i64) -> String {
    let diff = at - now;
    if diff < 0 {
        return "overdue".to_string();
    }
    match humanize(diff) {
        Some(span) => format!("in {}", span),
        None => "in <1 minute".to_string(),
    }
}

fn format_time_since(now: i64, at: i64) -> String {
    match humanize((now - at).max(0)) {
        Some(span) => format!("{} ago", span),
        None => "just now".to_string(),
    }
}

fn humanize(seconds: i64) -> Option<String> {
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let (count, unit) = if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        return None;
    };

    Some(format!("{} {}{}", count, unit, if count == 1 { "" } else { "s" }))
}

fn invalid(message: String) -> CadenceError {
    CadenceError::InvalidInput(message)
}
