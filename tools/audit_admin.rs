use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use travel_audit::{
    capture::ManualAuditHelper,
    entities::AuditRecord,
    infrastructure::persistence::PostgresAuditRecordRepository,
    ports::AuditRecordRepository,
    use_cases::AuditQueryService,
    value_objects::{Actor, ActorContext, AuditAction},
};

#[derive(Parser)]
#[command(name = "audit-admin", about = "Inspect and prune the activity log")]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Newest records first
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long)]
        user_id: Option<i64>,
    },
    /// Case-insensitive search over action, type, description, name and email
    Search {
        term: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Record counts per action and entity type
    Stats,
    /// Full history of one entity
    Entity { entity_type: String, entity_id: i64 },
    /// Delete records older than the given number of days
    Prune {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
    /// Write one record by hand
    Log {
        action: String,
        entity_type: String,
        #[arg(long)]
        entity_id: Option<i64>,
        #[arg(long)]
        entity_name: Option<String>,
        #[arg(long)]
        description: String,
        /// Acting user as `<id>:<email>`
        #[arg(long)]
        actor: Option<String>,
    },
}

fn print_records(records: &[AuditRecord]) {
    println!("{} record(s)", records.len());
    for record in records {
        println!(
            "#{:<6} {} {:<12} {:<12} {:<8} {:<28} {}",
            record.id().unwrap_or_default(),
            record.created_at().format("%Y-%m-%d %H:%M:%S"),
            record.action(),
            record.entity_type(),
            record
                .entity_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.user_email().unwrap_or("-"),
            record.description().unwrap_or("")
        );
    }
}

fn parse_actor(value: &str) -> anyhow::Result<Actor> {
    let (id, email) = value
        .split_once(':')
        .context("--actor must look like <id>:<email>")?;
    let id: i64 = id.parse().context("--actor id must be numeric")?;
    Ok(Actor::new(id, email))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await
        .context("connecting to DATABASE_URL")?;

    let repository: Arc<dyn AuditRecordRepository> =
        Arc::new(PostgresAuditRecordRepository::new(pool));
    let queries = AuditQueryService::new(Arc::clone(&repository));

    match cli.command {
        Command::Recent {
            limit,
            entity_type,
            user_id,
        } => {
            let records = queries
                .recent_activity(limit, user_id, entity_type.as_deref())
                .await?;
            print_records(&records);
        }
        Command::Search { term, limit } => {
            let records = queries.search_logs(&term, limit).await?;
            print_records(&records);
        }
        Command::Stats => {
            let stats = queries.activity_stats().await?;
            for stat in stats {
                println!("{:<14} {:<14} {}", stat.action, stat.entity_type, stat.count);
            }
        }
        Command::Entity {
            entity_type,
            entity_id,
        } => {
            let records = queries.entity_activity(&entity_type, entity_id).await?;
            print_records(&records);
        }
        Command::Prune { days } => {
            let deleted = queries.clean_old_logs(days).await?;
            println!("Deleted {} record(s) older than {} days", deleted, days);
        }
        Command::Log {
            action,
            entity_type,
            entity_id,
            entity_name,
            description,
            actor,
        } => {
            let identity = actor.as_deref().map(parse_actor).transpose()?;
            let ctx = ActorContext::new(identity, None);
            ManualAuditHelper::new(repository)
                .log_activity(
                    AuditAction::from(action),
                    &entity_type,
                    entity_id,
                    entity_name.as_deref(),
                    &description,
                    &ctx,
                )
                .await?;
            println!("Recorded");
        }
    }

    Ok(())
}
