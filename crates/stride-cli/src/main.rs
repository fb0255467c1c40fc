use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use stride_core::analytics::{ClientReport, Scope, ScopedView, TrainerReport};
use stride_core::catalog::{CourseQuery, CourseSort};
use stride_core::config::StrideConfig;
use stride_core::dispatch::Dispatcher;
use stride_core::model::*;
use stride_core::seed;
use stride_core::store::{Command, Outcome, Store};

#[derive(Parser)]
#[command(name = "stride", about = "Stride: fitness course catalog and progress reports", version)]
enum Cli {
    /// Browse the course catalog
    Courses {
        /// Case-insensitive match on title or description
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by difficulty (Beginner, Intermediate, Advanced)
        #[arg(short, long)]
        difficulty: Option<String>,
        /// Filter by trainer ID
        #[arg(short, long)]
        trainer: Option<String>,
        /// Sort by title, difficulty or enrollment
        #[arg(long, default_value = "title")]
        sort: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Progress and attendance reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// List the users of the seed data
    Users {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a JSON array of commands to the seed store
    Apply {
        /// File holding `[{"type": "...", "payload": ...}, ...]`
        path: String,
        /// Write the resulting store to this file
        #[arg(short, long)]
        output: Option<String>,
        /// Acting user ID recorded in the command history
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Export the seed store as JSON (stdout unless --output is given)
    Export {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum ReportKind {
    /// Course, enrollment and attendance stats for a trainer
    Trainer {
        /// Trainer ID (default: first trainer in the user list)
        #[arg(short, long)]
        user: Option<String>,
        #[command(flatten)]
        filter: ReportFilter,
    },
    /// Progress and attendance for a client
    Client {
        /// Client ID (default: first client in the user list)
        #[arg(short, long)]
        user: Option<String>,
        #[command(flatten)]
        filter: ReportFilter,
        /// Date treated as today for upcoming sessions (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(clap::Args)]
struct ReportFilter {
    /// Restrict to one course
    #[arg(short, long)]
    course: Option<String>,
    /// Only sessions and records on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Only sessions and records on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

impl ReportFilter {
    fn scope(&self, base: Scope) -> Scope {
        let scope = base.between(self.from, self.to);
        match &self.course {
            Some(course) => scope.with_course(course),
            None => scope,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = StrideConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| StrideConfig::default_config());

    run(cli, config).await
}

async fn run(cli: Cli, config: StrideConfig) -> Result<()> {
    if let Cli::Config = cli {
        return cmd_config(config);
    }

    let store = seed::load_seed(&config.seed).context("failed to load seed data")?;
    match cli {
        Cli::Courses {
            search,
            difficulty,
            trainer,
            sort,
            json,
        } => cmd_courses(&store, search, difficulty, trainer, &sort, json),
        Cli::Report { kind } => cmd_report(&store, &config, kind),
        Cli::Users { json } => cmd_users(&store, json),
        Cli::Apply {
            path,
            output,
            actor,
        } => cmd_apply(store, &config, &path, output.as_deref(), &actor).await,
        Cli::Export { output } => cmd_export(&store, output.as_deref()),
        Cli::Config => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// courses
// ---------------------------------------------------------------------------

fn cmd_courses(
    store: &Store,
    search: Option<String>,
    difficulty: Option<String>,
    trainer: Option<String>,
    sort: &str,
    json: bool,
) -> Result<()> {
    let mut query = CourseQuery::new().with_sort(
        sort.parse::<CourseSort>()
            .map_err(|e: String| anyhow::anyhow!("{}", e))?,
    );
    if let Some(s) = search {
        query = query.with_search(s);
    }
    if let Some(d) = difficulty {
        let d: Difficulty = d.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
        query = query.with_difficulty(d);
    }
    if let Some(t) = trainer {
        query = query.with_trainer(t);
    }

    let courses = query.run(store.courses());

    if json {
        println!("{}", serde_json::to_string_pretty(&courses)?);
        return Ok(());
    }
    if courses.is_empty() {
        println!("{}", "No courses found.".dimmed());
        return Ok(());
    }

    println!(
        "{:<6} {:<34} {:<14} {:<10} {}",
        "ID".dimmed(),
        "Title".dimmed(),
        "Difficulty".dimmed(),
        "Enrolled".dimmed(),
        "Schedule".dimmed()
    );
    for c in &courses {
        let enrolled = format!("{}/{}", c.current_enrollment, c.max_capacity);
        let enrolled = if c.is_full() {
            format!("{enrolled:<10}").red().to_string()
        } else if c.is_almost_full() {
            format!("{enrolled:<10}").yellow().to_string()
        } else {
            format!("{enrolled:<10}").green().to_string()
        };
        println!(
            "{:<6} {:<34} {:<14} {} {}",
            c.id.cyan(),
            truncate(&c.title, 32),
            c.difficulty.to_string().magenta(),
            enrolled,
            c.schedule.dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

fn cmd_report(store: &Store, config: &StrideConfig, kind: ReportKind) -> Result<()> {
    match kind {
        ReportKind::Trainer { user, filter } => {
            let trainer = pick_user(store, user, Role::Trainer)?;
            let view = ScopedView::new(store, &filter.scope(Scope::trainer(&trainer.id)));
            let report = TrainerReport::build(&view, &config.analytics);
            if filter.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_trainer_report(store, &trainer, &report);
            }
        }
        ReportKind::Client {
            user,
            filter,
            today,
        } => {
            let client = pick_user(store, user, Role::Client)?;
            let view = ScopedView::new(store, &filter.scope(Scope::client(&client.id)));
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let report = ClientReport::build(&view, today, &config.analytics);
            if filter.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_client_report(store, &client, &report);
            }
        }
    }
    Ok(())
}

/// The named user, or the first user holding `role`.
fn pick_user(store: &Store, id: Option<String>, role: Role) -> Result<User> {
    let user = match id {
        Some(id) => store
            .user(&id)
            .with_context(|| format!("user {id} not found"))?,
        None => store
            .users()
            .iter()
            .find(|u| u.role == role)
            .with_context(|| format!("no {role} in the user list"))?,
    };
    Ok(user.clone())
}

fn print_trainer_report(store: &Store, trainer: &User, report: &TrainerReport) {
    println!("{} {}", "Trainer report:".bold(), trainer.name.cyan());
    println!(
        "  {} {}  {} {}  {} {}",
        "Courses:".dimmed(),
        report.course_count,
        "Students:".dimmed(),
        report.enrollment_count,
        "Sessions:".dimmed(),
        report.session_count
    );
    println!(
        "  {} {} per session ({}%)",
        "Attendance:".dimmed(),
        report.average_attendance,
        report.attendance_rate
    );
    println!(
        "  {} {}%  {} {}%",
        "Avg progress:".dimmed(),
        report.average_progress,
        "Completion:".dimmed(),
        report.completion_rate
    );

    println!();
    println!("{}", "--- Performance distribution ---".dimmed());
    for (label, count) in report.distribution.buckets() {
        println!("  {:<8} {}", label, "#".repeat(count).green());
    }

    if !report.courses.is_empty() {
        println!();
        println!(
            "{:<34} {:<10} {:<10} {:<12} {:<12} {}",
            "Course".dimmed(),
            "Enrolled".dimmed(),
            "Progress".dimmed(),
            "Performance".dimmed(),
            "Completion".dimmed(),
            "Attendance".dimmed()
        );
        for c in &report.courses {
            println!(
                "{:<34} {:<10} {:<10} {:<12} {:<12} {}%",
                truncate(&c.title, 32),
                format!("{}/{}", c.enrollment, c.capacity),
                format!("{}%", c.average_progress),
                format!("{}/100", c.average_performance),
                format!("{}%", c.completion_rate),
                c.attendance_rate
            );
        }
    }

    if !report.at_risk.is_empty() {
        println!();
        println!("{}", "--- At risk ---".dimmed());
        for e in &report.at_risk {
            println!(
                "  {} {} {}",
                display_name(store, &e.client_id),
                course_title(store, &e.course_id).dimmed(),
                format!("{}%", e.progress).red()
            );
        }
    }
}

fn print_client_report(store: &Store, client: &User, report: &ClientReport) {
    println!("{} {}", "Client report:".bold(), client.name.cyan());
    println!(
        "  {} {} ({} completed)",
        "Courses:".dimmed(),
        report.enrolled_courses,
        report.completed_courses
    );
    println!(
        "  {} {}%  {} {}%",
        "Avg progress:".dimmed(),
        report.average_progress,
        "Avg performance:".dimmed(),
        report.average_performance
    );
    println!(
        "  {} {}/{} sessions ({}%)",
        "Attendance:".dimmed(),
        report.sessions_attended,
        report.total_sessions,
        report.attendance_rate
    );

    if !report.upcoming_sessions.is_empty() {
        println!();
        println!("{}", "--- Upcoming ---".dimmed());
        for s in &report.upcoming_sessions {
            println!(
                "  {} {} {}",
                s.date.to_string().cyan(),
                s.time.format("%H:%M"),
                course_title(store, &s.course_id)
            );
        }
    }

    if !report.recent_progress.is_empty() {
        println!();
        println!("{}", "--- Recent progress ---".dimmed());
        for r in &report.recent_progress {
            println!(
                "  {} {:<32} {}%",
                r.date.to_string().cyan(),
                truncate(&course_title(store, &r.course_id), 30),
                r.performance
            );
        }
    }
}

// ---------------------------------------------------------------------------
// users
// ---------------------------------------------------------------------------

fn cmd_users(store: &Store, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(store.users())?);
        return Ok(());
    }
    println!(
        "{:<6} {:<20} {:<10} {}",
        "ID".dimmed(),
        "Name".dimmed(),
        "Role".dimmed(),
        "Email".dimmed()
    );
    for u in store.users() {
        println!(
            "{:<6} {:<20} {:<10} {}",
            u.id.cyan(),
            u.name,
            u.role.to_string().magenta(),
            u.email.dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

async fn cmd_apply(
    store: Store,
    config: &StrideConfig,
    path: &str,
    output: Option<&str>,
    actor: &str,
) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let commands: Vec<Command> =
        serde_json::from_str(&raw).with_context(|| format!("invalid command file {path}"))?;
    tracing::info!(count = commands.len(), actor, "applying commands");

    // Commands run back to back; the simulated latency only matters to a UI.
    let dispatcher = Dispatcher::new(store, config).with_latency(std::time::Duration::ZERO);

    let mut failed = 0;
    for command in commands {
        let label = format!("{} {}", command.kind(), command.target_id());
        if let Err(e) = command.validate() {
            failed += 1;
            println!("  {} {}: {}", "invalid".red(), label, e);
            continue;
        }
        match dispatcher.dispatch_as(command, actor).await {
            Ok(Outcome::Applied) => println!("  {} {}", "applied".green(), label),
            Ok(Outcome::Unchanged) => println!("  {} {}", "unchanged".dimmed(), label),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "failed".red(), label, e);
            }
        }
    }

    if let Some(out) = output {
        write_store(&dispatcher.snapshot(), out)?;
    }
    if failed > 0 {
        anyhow::bail!("{failed} command(s) failed");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// export / config
// ---------------------------------------------------------------------------

fn cmd_export(store: &Store, output: Option<&str>) -> Result<()> {
    match output {
        Some(out) => write_store(store, out),
        None => {
            println!("{}", store.to_json()?);
            Ok(())
        }
    }
}

fn write_store(store: &Store, output: &str) -> Result<()> {
    std::fs::write(Path::new(output), store.to_json()?)
        .with_context(|| format!("failed to write {output}"))?;
    eprintln!(
        "{} {} courses, {} enrollments to {}",
        "Wrote".green(),
        store.courses().len(),
        store.enrollments().len(),
        output
    );
    Ok(())
}

fn cmd_config(mut config: StrideConfig) -> Result<()> {
    let warnings = config.validate();
    println!("{}", toml::to_string_pretty(&config)?);
    for w in &warnings {
        eprintln!("{} {}", "warning:".yellow(), w);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn display_name(store: &Store, user_id: &str) -> String {
    store
        .user(user_id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| user_id.to_string())
}

fn course_title(store: &Store, course_id: &str) -> String {
    store
        .course(course_id)
        .map(|c| c.title.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_report_subcommand() {
        let cli = Cli::try_parse_from([
            "stride", "report", "client", "--user", "3", "--from", "2026-01-01", "--json",
        ])
        .unwrap();
        match cli {
            Cli::Report {
                kind: ReportKind::Client { user, filter, .. },
            } => {
                assert_eq!(user.as_deref(), Some("3"));
                assert!(filter.json);
                assert_eq!(filter.from, NaiveDate::from_ymd_opt(2026, 1, 1));
            }
            _ => panic!("expected report client"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["stride", "report", "trainer", "--to", "soon"]).is_err());
    }

    #[test]
    fn test_pick_user_defaults_by_role() {
        let store = seed::fixture().unwrap();
        assert_eq!(pick_user(&store, None, Role::Trainer).unwrap().id, "2");
        assert_eq!(pick_user(&store, Some("3".into()), Role::Trainer).unwrap().id, "3");
        assert!(pick_user(&store, Some("99".into()), Role::Client).is_err());
    }

    #[test]
    fn test_filter_scope() {
        let filter = ReportFilter {
            course: Some("1".into()),
            from: None,
            to: NaiveDate::from_ymd_opt(2026, 2, 1),
            json: false,
        };
        let scope = filter.scope(Scope::trainer("2"));
        assert_eq!(scope.trainer_id.as_deref(), Some("2"));
        assert_eq!(scope.course_id.as_deref(), Some("1"));
        assert!(scope.to.is_some());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Yoga", 10), "Yoga");
        assert_eq!(truncate("Strength Training Fundamentals", 10), "Strengt...");
    }

    #[tokio::test]
    async fn test_apply_writes_resulting_store() {
        let dir = std::env::temp_dir().join(format!("stride-apply-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let commands = dir.join("commands.json");
        let out = dir.join("out.json");
        std::fs::write(
            &commands,
            r#"[{"type": "DELETE_ENROLLMENT", "payload": "3"}]"#,
        )
        .unwrap();

        let store = seed::fixture().unwrap();
        cmd_apply(
            store,
            &StrideConfig::default_config(),
            commands.to_str().unwrap(),
            Some(out.to_str().unwrap()),
            "tester",
        )
        .await
        .unwrap();

        let written = Store::load(&out).unwrap();
        assert_eq!(written.enrollments().len(), 3);
        assert_eq!(written.course("1").unwrap().current_enrollment, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_apply_skips_invalid_payloads() {
        let dir = std::env::temp_dir().join(format!("stride-apply-invalid-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let commands = dir.join("commands.json");
        let out = dir.join("out.json");
        std::fs::write(
            &commands,
            r#"[
                {"type": "UPDATE_ENROLLMENT", "payload": {
                    "id": "1", "clientId": "1", "courseId": "1",
                    "enrolledAt": "2025-12-15T09:00:00Z",
                    "progress": 250, "sessionsAttended": 2, "totalSessions": 24
                }},
                {"type": "DELETE_ENROLLMENT", "payload": "3"}
            ]"#,
        )
        .unwrap();

        let result = cmd_apply(
            seed::fixture().unwrap(),
            &StrideConfig::default_config(),
            commands.to_str().unwrap(),
            Some(out.to_str().unwrap()),
            "tester",
        )
        .await;
        assert!(result.is_err());

        let written = Store::load(&out).unwrap();
        assert_eq!(written.enrollment("1").unwrap().progress, 65);
        assert!(written.enrollment("3").is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
