//! wayform - dynamic survey and feedback forms
//!
//! Imports form definitions, drives response sessions from answer files and
//! prints form analytics.

mod report;
mod respond;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use wayform_core::{Config, Database, FormDefinition, ServiceConfig, SurveyService};

#[derive(Parser)]
#[command(name = "wayform")]
#[command(about = "Dynamic survey and feedback forms")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a form from a JSON or TOML definition
    Import {
        file: PathBuf,

        /// Open the form for responses right away
        #[arg(long)]
        publish: bool,
    },

    /// List forms with their status and question counts
    Forms {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Open a draft form for responses
    Publish { form_id: String },

    /// Stop accepting responses for a form
    Archive { form_id: String },

    /// Answer a form from a JSON file mapping question ids to values
    Respond {
        form_id: String,

        #[arg(short, long)]
        answers: PathBuf,
    },

    /// Print response analytics for a form
    Analytics {
        form_id: String,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct FormRow {
    id: String,
    title: String,
    status: &'static str,
    questions: usize,
    milestones: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        wayform_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = config.resolved_database_path();
    tracing::debug!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let service = SurveyService::new(Arc::new(db), ServiceConfig::from(&config));

    match args.command {
        Command::Import { file, publish } => {
            let definition = FormDefinition::from_path(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            let form = service.create_form(definition)?;
            let questions = service.form_questions(&form.id)?.len();
            println!("Imported form {} ({} questions)", form.id, questions);
            if publish {
                service.publish_form(&form.id)?;
                println!("Published {}", form.id);
            }
        }
        Command::Forms { format } => {
            let mut rows = Vec::new();
            for form in service.list_forms()? {
                rows.push(FormRow {
                    questions: service.form_questions(&form.id)?.len(),
                    id: form.id,
                    title: form.title,
                    status: form.status.as_str(),
                    milestones: form.milestones,
                });
            }
            if format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No forms found.");
                println!("Run 'wayform import <file>' to create one.");
            } else {
                for row in &rows {
                    println!(
                        "{:<38} {:<9} {:>3} questions  {}",
                        row.id, row.status, row.questions, row.title
                    );
                }
            }
        }
        Command::Publish { form_id } => {
            service.publish_form(&form_id)?;
            println!("Published {}", form_id);
        }
        Command::Archive { form_id } => {
            service.archive_form(&form_id)?;
            println!("Archived {}", form_id);
        }
        Command::Respond { form_id, answers } => {
            let answers = respond::load_answers(&answers)?;
            let summary = respond::run(&service, &form_id, &answers).await?;
            respond::print_summary(&summary);
        }
        Command::Analytics { form_id, format } => {
            let analytics = service.get_analytics(&form_id)?;
            if format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                report::print_analytics(&analytics);
            }
        }
    }

    Ok(())
}
