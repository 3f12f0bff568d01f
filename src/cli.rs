use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::genai;
use crate::model::backlog::BacklogBatch;
use crate::model::review::Review;
use crate::pipeline::classify::{apply_classifications, SentimentClassifier};
use crate::pipeline::extract::BacklogExtractor;
use crate::pipeline::normalize::normalize_reviews;
use crate::pipeline::plan::plan_sprints;
use crate::pipeline::summarize::SentimentSummarizer;
use crate::pipeline::Generated;
use crate::stores::{self, Storefront};
use crate::tracker::jira::JiraClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search { query: String, limit: usize },
    AppInfo { app_id: String },
    Reviews { app_id: String, count: usize },
    Classify { text: String },
    Analyze { app_id: String, app_name: String, limit: Option<usize> },
    Sentiment { app_id: String, app_name: String, limit: Option<usize> },
    PushJira { batch_path: String, project_key: Option<String> },
    JiraProjects,
    Help,
}

/// Parse CLI arguments into a command.
///
/// Supported forms:
///   storepulse search "banking app" [--limit 10]
///   storepulse app 123456789
///   storepulse reviews 123456789 [--count 100]
///   storepulse classify "trava muito, app ruim"
///   storepulse analyze 123456789 --name "My App" [--limit 100]
///   storepulse sentiment 123456789 --name "My App" [--limit 100]
///   storepulse push-jira backlog.json --project PROJ
///   storepulse jira-projects
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    let rest = &args[1..];
    match command.as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "search" => {
            let (positional, flags) = split_flags(rest)?;
            let query = positional.join(" ");
            if query.is_empty() {
                bail!("Usage: storepulse search <query> [--limit N]");
            }
            Ok(Command::Search {
                query,
                limit: parse_count(&flags, "--limit", 10)?,
            })
        }
        "app" => {
            let (positional, _) = split_flags(rest)?;
            let app_id = single_positional(&positional, "storepulse app <app_id>")?;
            Ok(Command::AppInfo { app_id })
        }
        "reviews" => {
            let (positional, flags) = split_flags(rest)?;
            let app_id = single_positional(&positional, "storepulse reviews <app_id> [--count N]")?;
            Ok(Command::Reviews {
                app_id,
                count: parse_count(&flags, "--count", 100)?,
            })
        }
        "classify" => {
            let (positional, _) = split_flags(rest)?;
            let text = positional.join(" ");
            if text.trim().is_empty() {
                bail!("Usage: storepulse classify <review text>");
            }
            Ok(Command::Classify { text })
        }
        "analyze" => {
            let (app_id, app_name, limit) = parse_analysis_args(rest, "analyze")?;
            Ok(Command::Analyze { app_id, app_name, limit })
        }
        "sentiment" => {
            let (app_id, app_name, limit) = parse_analysis_args(rest, "sentiment")?;
            Ok(Command::Sentiment { app_id, app_name, limit })
        }
        "push-jira" => {
            let (positional, flags) = split_flags(rest)?;
            let batch_path =
                single_positional(&positional, "storepulse push-jira <batch.json> --project KEY")?;
            Ok(Command::PushJira {
                batch_path,
                project_key: flags
                    .iter()
                    .find(|(name, _)| name == "--project")
                    .map(|(_, value)| value.clone()),
            })
        }
        "jira-projects" => Ok(Command::JiraProjects),
        other => bail!("Unknown command: {other}. Run `storepulse help` for usage."),
    }
}

fn parse_analysis_args(args: &[String], command: &str) -> Result<(String, String, Option<usize>)> {
    let usage = format!("storepulse {command} <app_id> --name <app_name> [--limit N]");
    let (positional, flags) = split_flags(args)?;
    let app_id = single_positional(&positional, &usage)?;
    let app_name = flags
        .iter()
        .find(|(name, _)| name == "--name")
        .map(|(_, value)| value.clone())
        .with_context(|| format!("Missing --name. Usage: {usage}"))?;
    if app_name.trim().is_empty() {
        bail!("App name cannot be empty");
    }
    let limit = parse_optional_count(&flags, "--limit")?;
    Ok((app_id, app_name, limit))
}

fn split_flags(args: &[String]) -> Result<(Vec<String>, Vec<(String, String)>)> {
    let mut positional = Vec::new();
    let mut flags = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg.starts_with("--") {
            i += 1;
            let Some(value) = args.get(i) else {
                bail!("Missing value for {arg} flag");
            };
            flags.push((arg.clone(), value.clone()));
        } else {
            positional.push(arg.clone());
        }
        i += 1;
    }

    Ok((positional, flags))
}

fn single_positional(positional: &[String], usage: &str) -> Result<String> {
    match positional {
        [one] if !one.trim().is_empty() => Ok(one.clone()),
        _ => bail!("Usage: {usage}"),
    }
}

fn parse_count(flags: &[(String, String)], name: &str, default: usize) -> Result<usize> {
    Ok(parse_optional_count(flags, name)?.unwrap_or(default))
}

fn parse_optional_count(flags: &[(String, String)], name: &str) -> Result<Option<usize>> {
    let Some((_, value)) = flags.iter().find(|(flag, _)| flag == name) else {
        return Ok(None);
    };
    let parsed: usize = value
        .parse()
        .with_context(|| format!("{name} expects a number, got '{value}'"))?;
    if parsed == 0 {
        bail!("{name} must be at least 1");
    }
    Ok(Some(parsed))
}

pub async fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Search { query, limit } => handle_search(config, &query, limit).await,
        Command::AppInfo { app_id } => handle_app_info(config, &app_id).await,
        Command::Reviews { app_id, count } => handle_reviews(config, &app_id, count).await,
        Command::Classify { text } => handle_classify(config, &text).await,
        Command::Analyze { app_id, app_name, limit } => {
            handle_analyze(config, &app_id, &app_name, limit).await
        }
        Command::Sentiment { app_id, app_name, limit } => {
            handle_sentiment(config, &app_id, &app_name, limit).await
        }
        Command::PushJira { batch_path, project_key } => {
            handle_push_jira(config, &batch_path, project_key).await
        }
        Command::JiraProjects => handle_jira_projects(config).await,
    }
}

async fn fetch_reviews(
    storefront: &dyn Storefront,
    app_id: &str,
    count: usize,
) -> Result<Vec<Review>> {
    let raw = storefront.get_app_reviews(app_id, count).await?;
    let reviews = normalize_reviews(app_id, storefront.store(), raw);
    info!(app_id, count = reviews.len(), "fetched and normalized reviews");
    Ok(reviews)
}

async fn handle_search(config: &AppConfig, query: &str, limit: usize) -> Result<()> {
    let storefront = stores::create_storefront(config);
    let apps = storefront.search_apps(query, limit).await?;
    println!("{}", serde_json::to_string_pretty(&apps)?);
    Ok(())
}

async fn handle_app_info(config: &AppConfig, app_id: &str) -> Result<()> {
    let storefront = stores::create_storefront(config);
    match storefront.get_app_details(app_id).await? {
        Some(details) => println!("{}", serde_json::to_string_pretty(&details)?),
        None => println!("{}", serde_json::json!({ "error": "app not found", "app_id": app_id })),
    }
    Ok(())
}

async fn handle_reviews(config: &AppConfig, app_id: &str, count: usize) -> Result<()> {
    let storefront = stores::create_storefront(config);
    let reviews = fetch_reviews(storefront.as_ref(), app_id, count).await?;
    println!("{}", serde_json::to_string_pretty(&reviews)?);
    Ok(())
}

async fn handle_classify(config: &AppConfig, text: &str) -> Result<()> {
    let generator = genai::create_generator(config);
    let classifier = SentimentClassifier::new(generator, &config.analysis);
    let outcome = classifier.classify(text).await;

    let degraded = outcome.is_degraded();
    let degraded_reason = outcome.degrade_reason().map(String::from);
    let classification = outcome.into_inner();

    let output = serde_json::json!({
        "sentiment": classification.sentiment,
        "score": classification.score,
        "reasoning": classification.reasoning,
        "degraded": degraded,
        "degraded_reason": degraded_reason,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn handle_analyze(
    config: &AppConfig,
    app_id: &str,
    app_name: &str,
    limit: Option<usize>,
) -> Result<()> {
    let storefront = stores::create_storefront(config);
    let generator = genai::create_generator(config);

    let limit = limit.unwrap_or(config.analysis.review_limit);
    let mut reviews = fetch_reviews(storefront.as_ref(), app_id, limit).await?;

    let classifier = SentimentClassifier::new(generator.clone(), &config.analysis);
    let results = classifier.classify_batch(&reviews).await?;
    apply_classifications(&mut reviews, &results);

    let extractor = BacklogExtractor::new(generator, config.analysis.mock_seed);
    let batch = extractor.extract(&reviews, app_name).await;
    let plan = plan_sprints(&batch);

    let output = serde_json::json!({
        "app_id": app_id,
        "backlog": batch,
        "sprint_plan": plan,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn handle_sentiment(
    config: &AppConfig,
    app_id: &str,
    app_name: &str,
    limit: Option<usize>,
) -> Result<()> {
    let storefront = stores::create_storefront(config);
    let generator = genai::create_generator(config);

    let limit = limit.unwrap_or(config.analysis.review_limit);
    let mut reviews = fetch_reviews(storefront.as_ref(), app_id, limit).await?;

    let classifier = SentimentClassifier::new(generator.clone(), &config.analysis);
    let results = classifier.classify_batch(&reviews).await?;
    apply_classifications(&mut reviews, &results);

    let summarizer = SentimentSummarizer::new(generator, &config.analysis);
    let (summary, degraded_reason) = match summarizer.summarize(app_name, &reviews).await {
        Generated::Primary(summary) => (summary, None),
        Generated::Degraded(summary, reason) => (summary, Some(reason)),
    };

    let output = serde_json::json!({
        "app_id": app_id,
        "app_name": app_name,
        "reviews_analyzed": reviews.len(),
        "summary": summary,
        "degraded": degraded_reason.is_some(),
        "degraded_reason": degraded_reason,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn handle_push_jira(
    config: &AppConfig,
    batch_path: &str,
    project_key: Option<String>,
) -> Result<()> {
    let Some(jira_config) = &config.jira else {
        bail!("No Jira credentials configured. Add a [jira] section to ~/.storepulse/config.toml");
    };
    let project_key = project_key
        .or_else(|| jira_config.project_key.clone())
        .context("No project key. Pass --project or set jira.project_key in the config")?;

    let contents = std::fs::read_to_string(batch_path)
        .with_context(|| format!("Failed to read backlog batch from {batch_path}"))?;
    let batch: BacklogBatch =
        serde_json::from_str(&contents).context("Failed to parse backlog batch JSON")?;

    let jira = JiraClient::new(jira_config);
    let user = jira.test_connection().await?;
    info!(
        user = user.display_name.as_deref().unwrap_or("unknown"),
        account_id = user.account_id.as_deref().unwrap_or("unknown"),
        "Jira connection verified"
    );

    // A grouping epic is best effort; issue creation proceeds without it.
    let epic = match jira
        .create_epic(&project_key, &batch.summary.app_name, &batch.summary)
        .await
    {
        Ok(epic) => Some(epic),
        Err(err) => {
            warn!(error = %err, "epic creation failed, continuing without it");
            None
        }
    };

    let report = jira.create_backlog_issues(&project_key, &batch).await;
    let output = serde_json::json!({ "epic": epic, "report": &report });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.success {
        bail!("No issues could be created in {project_key}");
    }
    Ok(())
}

async fn handle_jira_projects(config: &AppConfig) -> Result<()> {
    let Some(jira_config) = &config.jira else {
        bail!("No Jira credentials configured. Add a [jira] section to ~/.storepulse/config.toml");
    };
    let jira = JiraClient::new(jira_config);
    let projects = jira.get_projects().await?;
    println!("{}", serde_json::to_string_pretty(&projects)?);
    Ok(())
}

pub fn print_help() {
    println!("storepulse — storefront review aggregation and backlog synthesis\n");
    println!("USAGE:");
    println!("  storepulse search <query> [--limit N]       Search the app store");
    println!("  storepulse app <app_id>                     Show app details");
    println!("  storepulse reviews <app_id> [--count N]     Fetch and normalize reviews");
    println!("  storepulse classify <text>                  Classify one review text");
    println!("  storepulse analyze <app_id> --name <name>   Generate a backlog and sprint plan");
    println!("  storepulse sentiment <app_id> --name <name> Classify reviews and summarize sentiment");
    println!("  storepulse push-jira <batch.json> --project KEY");
    println!("                                              Create Jira issues from a saved backlog");
    println!("  storepulse jira-projects                    List Jira projects");
    println!();
    println!("OPTIONS:");
    println!("  --limit N   Max reviews to analyze (default 100)");
    println!("  --count N   Max reviews to fetch (default 100)");
    println!("  --name S    App display name used in prompts and summaries");
    println!();
    println!("Set GEMINI_API_KEY (or [gemini] in ~/.storepulse/config.toml) to enable");
    println!("the generative backend; without it every analysis runs on the");
    println!("deterministic fallbacks.");
}
