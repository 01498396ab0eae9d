use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

use finhot::api::query::DEFAULT_LIMIT;
use finhot::{
    ApiClient, ApiError, Bookmarks, ClientConfig, Confirmation, CriteriaPatch, DraftWorkflow, Event,
    EventApi, FeedController, FileStore, GenerateOutcome, HealthMonitor, KeyValueStore, OpenOutcome,
    RefreshOutcome, SourceType,
};

/// One-shot commands that run a single operation and print the result.
#[derive(Debug)]
pub enum FeedCommands {
    List {
        query: String,
        min_hotness: f64,
        confirmed: Confirmation,
        types: Vec<SourceType>,
        limit: u32,
        starred: bool,
        event_type: Option<String>,
        impact_side: Option<String>,
        min_materiality: f64,
    },
    Show {
        id: String,
    },
    Generate {
        id: String,
    },
    Export {
        id: String,
    },
    Star {
        id: String,
    },
    Stars,
    Health,
}

pub fn build_client(config: &ClientConfig) -> Result<Arc<dyn EventApi>> {
    let client = ApiClient::new(&config.api_url, config.timeout_secs)?.with_lang(config.lang.clone());
    Ok(Arc::new(client))
}

pub async fn load_bookmarks(config: &ClientConfig) -> Bookmarks {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir.clone()));
    Bookmarks::load(store).await
}

pub async fn handle_command(cmd: FeedCommands, config: &ClientConfig) -> Result<()> {
    let api = build_client(config)?;

    match cmd {
        FeedCommands::List {
            query,
            min_hotness,
            confirmed,
            types,
            limit,
            starred,
            event_type,
            impact_side,
            min_materiality,
        } => {
            let bookmarks = load_bookmarks(config).await;
            let feed = FeedController::new(api);
            let types: BTreeSet<SourceType> = if types.is_empty() {
                SourceType::ALL.into_iter().collect()
            } else {
                types.into_iter().collect()
            };
            feed.set_criteria(CriteriaPatch {
                query: Some(query),
                min_hotness: Some(min_hotness),
                confirmation: Some(confirmed),
                types: Some(types),
                starred_only: Some(starred),
                limit: Some(Some(if limit == 0 { DEFAULT_LIMIT } else { limit })),
                event_type: Some(event_type),
                impact_side: Some(impact_side),
                min_materiality_ai: Some(min_materiality),
            });

            match feed.refresh().await {
                RefreshOutcome::Loaded { .. } => {}
                RefreshOutcome::Failed(err) => bail!("Failed to fetch events: {}", err),
                RefreshOutcome::Stale => bail!("Event list request was superseded"),
            }

            let events = feed.visible_events(&bookmarks);
            if events.is_empty() {
                println!("📂 No events match the filters.");
                return Ok(());
            }

            println!("🔥 Events ({}):", events.len());
            println!("{}", "─".repeat(100));
            println!(
                "{:<2} {:<6} {:<5} {:<60} {:<24}",
                "★", "Hot", "Conf", "Headline", "Sources"
            );
            println!("{}", "─".repeat(100));
            for event in &events {
                print_row(event, bookmarks.contains(&event.id));
            }
            println!("{}", "─".repeat(100));
        }

        FeedCommands::Show { id } => {
            let drafts = DraftWorkflow::new(Arc::clone(&api), FeedController::new(api));
            let event = open_event(&drafts, &id).await?;
            let bookmarks = load_bookmarks(config).await;
            print_detail(&event, bookmarks.contains(&event.id));
        }

        FeedCommands::Generate { id } => {
            let drafts = DraftWorkflow::new(Arc::clone(&api), FeedController::new(api));
            open_event(&drafts, &id).await?;

            println!("Generating draft for {}...", id);
            println!();
            match drafts.generate()?.await {
                GenerateOutcome::Generated(_) => {
                    print!("{}", drafts.export_draft_as_text()?);
                }
                GenerateOutcome::Failed(err) => bail!("Draft generation failed: {}", err),
                GenerateOutcome::Stale => bail!("Draft generation was superseded"),
            }
        }

        FeedCommands::Export { id } => {
            let drafts = DraftWorkflow::new(Arc::clone(&api), FeedController::new(api));
            open_event(&drafts, &id).await?;

            let text = drafts
                .export_draft_as_text()
                .with_context(|| format!("Event {} has no draft yet; run `generate {}` first", id, id))?;
            print!("{}", text);
        }

        FeedCommands::Star { id } => {
            let mut bookmarks = load_bookmarks(config).await;
            let starred = bookmarks
                .toggle(&id)
                .await
                .context("Failed to save bookmarks")?;

            if starred {
                println!("⭐ Starred {}", id);
            } else {
                println!("☆ Unstarred {}", id);
            }
        }

        FeedCommands::Stars => {
            let bookmarks = load_bookmarks(config).await;
            if bookmarks.is_empty() {
                println!("📂 No bookmarks.");
                return Ok(());
            }

            println!("⭐ Bookmarks ({}):", bookmarks.len());
            for id in bookmarks.all() {
                println!("   {}", id);
            }
        }

        FeedCommands::Health => {
            let monitor = HealthMonitor::new(api);
            monitor.poll_once().await;

            match monitor.snapshot() {
                Some(health) => {
                    let status = if health.ok { "\x1b[32mOK\x1b[0m" } else { "\x1b[31mDEGRADED\x1b[0m" };
                    println!("🩺 Service Health");
                    println!("{}", "─".repeat(40));
                    println!("   Status:       {}", status);
                    println!("   Events:       {}", health.events);
                    println!("   Sources:      {}", health.sources);
                    println!("   Last source:  {}", health.last_source_display());
                    println!("{}", "─".repeat(40));
                }
                None => println!("🩺 Service health unavailable ({})", config.api_url),
            }
        }
    }

    Ok(())
}

async fn open_event(drafts: &DraftWorkflow, id: &str) -> Result<Event> {
    match drafts.open(id).await {
        OpenOutcome::Opened(event) => Ok(event),
        OpenOutcome::Failed(err) if err.is_not_found() => Err(anyhow!("Event {} not found", id)),
        OpenOutcome::Failed(ApiError::Transport(msg)) => {
            Err(anyhow!("Could not reach the event service: {}", msg))
        }
        OpenOutcome::Failed(err) => Err(anyhow!("Failed to load event {}: {}", id, err)),
        OpenOutcome::Stale => Err(anyhow!("Request for event {} was superseded", id)),
    }
}

fn print_row(event: &Event, starred: bool) {
    let star = if starred { "★" } else { " " };
    let confirmed = if event.confirmed {
        "\x1b[32myes\x1b[0m  "
    } else {
        "\x1b[33mno\x1b[0m   "
    };
    println!(
        "{:<2} {:<6} {} {:<60} {:<24}",
        star,
        event.hotness_display(),
        confirmed,
        truncate(&event.headline, 60),
        event.source_hosts(3).join(", ")
    );
}

fn print_detail(event: &Event, starred: bool) {
    println!("{}{}", if starred { "★ " } else { "" }, event.headline);
    println!("{}", "─".repeat(80));
    println!("   ID:         {}", event.id);
    println!("   Hotness:    {}", event.hotness_display());
    println!("   Confirmed:  {}", if event.confirmed { "yes" } else { "pending" });
    if let Some(kind) = &event.event_type {
        println!("   Type:       {}", kind);
    }
    if let Some(side) = &event.impact_side {
        println!("   Impact:     {}", side);
    }
    if let Some(score) = event.materiality_display() {
        println!("   Materiality: {} (AI)", score);
    }
    if !event.risk_flags.is_empty() {
        println!("   Risk flags: {}", event.risk_flags.join(", "));
    }
    let entities = event.entity_labels();
    if !entities.is_empty() {
        println!("   Entities:   {}", entities.join(", "));
    }
    println!();
    println!("   {}", event.why_now_display());
    println!();

    if !event.timeline.is_empty() {
        println!("🕒 Timeline:");
        for item in &event.timeline {
            println!("   {}", item);
        }
        println!();
    }

    match &event.draft {
        Some(draft) => {
            println!("📝 Draft: {}", draft.title);
            println!("   {}", draft.lede);
            for bullet in &draft.bullets {
                println!("   • {}", bullet);
            }
            if !draft.quote.is_empty() {
                println!("   > {}", draft.quote);
            }
        }
        None => println!("📝 No draft yet."),
    }

    println!();
    println!("Sources:");
    for source in &event.sources {
        println!(
            "   [{}] {} (first seen {})",
            source.kind,
            source.url,
            source.first_seen.format("%Y-%m-%d %H:%M UTC")
        );
    }
    println!("{}", "─".repeat(80));
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
