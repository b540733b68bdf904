///
/// This module implements the full CLI interface for elh-admin: command
/// parsing, credential resolution, client construction and dispatch to the
/// content operations in [`elh-admin-core`].
///
/// ## Flow
/// `run` resolves the key path (`--key-path`, then
/// `FIREBASE_SERVICE_ACCOUNT_KEY_PATH`), builds the Firestore client once via
/// [`ClientFactory`], wraps it in an [`AppContext`] and hands that to the
/// selected command. Any error propagates out of `run`; `main` maps it to
/// exit code 1.
///
/// ## Extending
/// Add a variant to [`Commands`], a handler taking `&AppContext`, and keep
/// validation and document shapes inside `elh-admin-core`.
///
/// [`elh-admin-core`]: ../../elh-admin-core/
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elh_admin_core::activity::NewListeningActivity;
use elh_admin_core::admin::{self, read_text_file};
use elh_admin_core::article::{parse_publication_date, parse_tags, NewArticle};
use elh_admin_core::contract::DocumentStore;
use elh_admin_core::credentials::{resolve_key_path, SERVICE_ACCOUNT_KEY_ENV_VAR};
use elh_admin_core::question::parse_question_inputs;

use crate::factory::ClientFactory;
use crate::load_config::load_config;
use crate::render;

/// Manage English Language Helper content in Firestore.
#[derive(Parser)]
#[clap(
    name = "elh-admin",
    version,
    about = "A CLI tool to manage English Language Helper data in Firestore"
)]
pub struct Cli {
    /// Path to the Firebase service account key JSON file.
    /// Falls back to the FIREBASE_SERVICE_ACCOUNT_KEY_PATH environment variable.
    #[clap(long, global = true, value_name = "PATH")]
    pub key_path: Option<PathBuf>,

    /// Optional YAML settings file (database id, emulator host, timeouts)
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the database connection works by performing a test read
    CheckDbConnection,

    /// Add or overwrite a reading article in the 'articles' collection
    AddArticle {
        /// Unique identifier, used as the document key
        article_id: String,
        /// Article title
        title: String,
        /// File containing the article content (empty content if omitted)
        #[clap(long)]
        content_file: Option<PathBuf>,
        /// Target reading level, 1-18
        #[clap(long, allow_negative_numbers = true)]
        level: i64,
        /// Comma-separated tags (e.g. history,science)
        #[clap(long)]
        tags: Option<String>,
        /// The original URL of the article
        #[clap(long, default_value = "")]
        source_url: String,
        /// The name of the website or publication
        #[clap(long, default_value = "")]
        source_name: String,
        /// Original publication date (YYYY-MM-DD)
        #[clap(long)]
        publication_date: Option<String>,
        /// Author of the article
        #[clap(long, default_value = "")]
        author: String,
        /// A brief English summary
        #[clap(long, default_value = "")]
        summary_english: String,
        /// A brief Traditional Chinese summary
        #[clap(long, default_value = "")]
        summary_traditional_chinese: String,
        /// Estimated reading time in minutes
        #[clap(long, allow_negative_numbers = true)]
        estimated_reading_time: Option<i64>,
        /// Set if the article has comprehension questions
        #[clap(long)]
        has_comprehension_questions: bool,
    },

    /// List all comprehension questions for an article
    ListArticleQuestions {
        article_id: String,
    },

    /// Import multiple-choice questions from a JSON file into an existing article,
    /// replacing the questions it already has
    AddQuestions {
        article_id: String,
        /// JSON array of {question, choices: [{id, text}], correct_choice_id, explanation?}
        questions_file: PathBuf,
    },

    /// Add a listening activity to the 'activities' collection
    AddListeningActivity {
        /// URL of the audio file
        audio_url: String,
        /// Activity title
        title: String,
        /// Target difficulty level, 1-18
        #[clap(long, allow_negative_numbers = true)]
        level: i64,
        /// File containing the audio transcript
        #[clap(long)]
        transcript_file: Option<PathBuf>,
        /// Comma-separated tags (e.g. podcast,news)
        #[clap(long)]
        tags: Option<String>,
    },
}

/// Everything a command handler needs. Built once per process.
pub struct AppContext {
    pub store: Arc<dyn DocumentStore>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let settings = load_config(cli.config.as_deref())?;
    let key_path = resolve_key_path(cli.key_path.as_deref(), SERVICE_ACCOUNT_KEY_ENV_VAR)?;

    let factory = ClientFactory::new(settings);
    let client = factory
        .client(&key_path)
        .await
        .context("Failed to initialize Firestore")?;
    let ctx = AppContext { store: client };

    dispatch(&ctx, cli.command).await
}

/// Routes a parsed subcommand to its handler.
pub async fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::CheckDbConnection => check_db_connection(ctx).await,
        Commands::AddArticle {
            article_id,
            title,
            content_file,
            level,
            tags,
            source_url,
            source_name,
            publication_date,
            author,
            summary_english,
            summary_traditional_chinese,
            estimated_reading_time,
            has_comprehension_questions,
        } => {
            let content = match &content_file {
                Some(path) => read_text_file(path).context("Error reading content file")?,
                None => String::new(),
            };
            let article = NewArticle {
                id: article_id,
                title,
                content,
                level,
                tags: parse_tags(tags.as_deref()),
                has_comprehension_questions,
                source_url,
                source_name,
                author,
                publication_date: parse_publication_date(publication_date.as_deref()),
                summary_english,
                summary_traditional_chinese,
                estimated_reading_time_minutes: estimated_reading_time,
            };
            add_article(ctx, &article).await
        }
        Commands::ListArticleQuestions { article_id } => {
            let listing = admin::list_article_questions(ctx.store.as_ref(), &article_id).await?;
            println!("{}", render::question_listing(&listing));
            Ok(())
        }
        Commands::AddQuestions {
            article_id,
            questions_file,
        } => {
            let raw = read_text_file(&questions_file).context("Error reading questions file")?;
            let inputs = parse_question_inputs(&raw)?;
            let questions = admin::add_questions(ctx.store.as_ref(), &article_id, &inputs).await?;
            println!(
                "Added {} questions to article '{}':",
                questions.len(),
                article_id
            );
            for q in &questions {
                println!("  {} (order {}): {}", q.id, q.order, q.text_english);
            }
            Ok(())
        }
        Commands::AddListeningActivity {
            audio_url,
            title,
            level,
            transcript_file,
            tags,
        } => {
            let transcript = match &transcript_file {
                Some(path) => read_text_file(path).context("Error reading transcript file")?,
                None => String::new(),
            };
            let activity = NewListeningActivity {
                audio_url,
                title,
                level,
                transcript,
                tags: parse_tags(tags.as_deref()),
            };
            println!(
                "Adding listening activity: '{}' from {} for level {}...",
                activity.title, activity.audio_url, activity.level
            );
            let report = admin::add_listening_activity(ctx.store.as_ref(), &activity).await?;
            println!(
                "Listening activity '{}' added successfully with ID '{}' in the 'activities' collection.",
                activity.title, report.id
            );
            Ok(())
        }
    }
}

async fn check_db_connection(ctx: &AppContext) -> Result<()> {
    match admin::check_connection(ctx.store.as_ref()).await {
        Ok(_) => {
            println!("Successfully connected to Firestore and can perform reads.");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "check-db-connection", error = %e, "Test read failed");
            eprintln!(
                "Please ensure your service account has the necessary permissions (e.g., 'roles/datastore.user')."
            );
            Err(anyhow::Error::new(e)
                .context("Connected to Firestore, but encountered an error performing a test read"))
        }
    }
}

async fn add_article(ctx: &AppContext, article: &NewArticle) -> Result<()> {
    let report = admin::add_article(ctx.store.as_ref(), article)
        .await
        .context("Error processing article")?;
    print!("{}", render::article_written(&article.title, &report));
    Ok(())
}
