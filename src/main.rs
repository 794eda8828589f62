use std::sync::{Arc, RwLock};

use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;

mod bookmarks;
mod cli;
mod config;
mod eid;
mod reminders;
mod search;
mod storage;
mod web;

use bookmarks::{BookmarkCreate, BookmarkStore, BookmarkUpdate};
use chrono::Utc;
use cli::RemindArgs;
use config::Config;
use reminders::{ReminderAction, ReminderEngine};
use search::AiRanker;

fn base_path() -> String {
    std::env::var("RELINK_BASE_PATH").unwrap_or_else(|_| {
        format!(
            "{}/.local/share/relink",
            homedir::my_home()
                .expect("couldnt find home dir")
                .expect("couldnt find home dir")
                .to_string_lossy()
        )
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = base_path();
    let config = Arc::new(RwLock::new(Config::load_with(&base_path)?));
    let store: Arc<dyn BookmarkStore> =
        Arc::new(bookmarks::BackendCsv::load(&format!("{base_path}/bookmarks.csv"))?);

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(store, config);
            Ok(())
        }

        cli::Command::Add {
            url,
            title,
            category,
            description,
            user_args,
        } => {
            let bmark = store.create(BookmarkCreate {
                user_id: user_args.user,
                url,
                title,
                category,
                description,
            })?;
            println!("{}", serde_json::to_string_pretty(&bmark)?);
            Ok(())
        }

        cli::Command::Search {
            query,
            count,
            user_args,
        } => {
            let bookmarks = store.list(&user_args.user)?;

            let ranker = config.read().unwrap().ai_search.ranker();
            let results = search::search_with_ranker(
                &query,
                &bookmarks,
                ranker.as_ref().map(|r| r as &dyn AiRanker),
            );

            if count {
                println!("{} bookmarks found", results.len());
                return Ok(());
            }

            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }

        cli::Command::Update {
            id,
            title,
            category,
            description,
            url,
            enable_reminders,
            disable_reminders,
            user_args,
        } => {
            let bmark_update = BookmarkUpdate {
                title,
                category,
                description,
                url,
                reminder_dismissed: if enable_reminders {
                    Some(false)
                } else if disable_reminders {
                    Some(true)
                } else {
                    None
                },
            };

            let bmark = store.update(id, &user_args.user, bmark_update)?;
            println!("{}", serde_json::to_string_pretty(&bmark)?);
            Ok(())
        }

        cli::Command::Delete { id, yes, user_args } => {
            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Are you sure you want to delete bookmark {id}?"
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            store.delete(id, &user_args.user)?;
            println!("bookmark {id} removed");
            Ok(())
        }

        cli::Command::Categories { user_args } => {
            for category in store.categories(&user_args.user)? {
                println!("{category}");
            }
            Ok(())
        }

        cli::Command::Remind { action } => {
            let schedule = config.read().unwrap().reminders.clone();
            let mut engine = ReminderEngine::with_schedule(
                store.clone(),
                schedule.interval_days,
                schedule.cooldown_days,
            );

            match action {
                RemindArgs::Next { user_args } => {
                    let bookmarks = store.list(&user_args.user)?;
                    match engine.evaluate(&bookmarks, Utc::now()) {
                        Some(bmark) => println!("{}", serde_json::to_string_pretty(&bmark)?),
                        None => println!("No bookmarks due for a revisit"),
                    }
                    Ok(())
                }

                RemindArgs::List { user_args } => {
                    let bookmarks = store.list(&user_args.user)?;
                    let mut due = engine.pending(&bookmarks, Utc::now());
                    due.sort_by_key(|b| b.created_at);
                    println!("{}", serde_json::to_string_pretty(&due)?);
                    Ok(())
                }

                RemindArgs::Open { user_args } => {
                    resolve_due(&store, &mut engine, &user_args.user, ReminderAction::OpenAndSnooze)
                }

                RemindArgs::Later { user_args } => {
                    resolve_due(&store, &mut engine, &user_args.user, ReminderAction::CheckLater)
                }

                RemindArgs::Dismiss { user_args } => resolve_due(
                    &store,
                    &mut engine,
                    &user_args.user,
                    ReminderAction::DismissPermanently,
                ),
            }
        }
    }
}

/// Run one evaluation pass and apply `action` to whatever is due.
fn resolve_due(
    store: &Arc<dyn BookmarkStore>,
    engine: &mut ReminderEngine,
    user: &str,
    action: ReminderAction,
) -> anyhow::Result<()> {
    let bookmarks = store.list(user)?;

    let Some(bmark) = engine.evaluate(&bookmarks, Utc::now()) else {
        println!("No bookmarks due for a revisit");
        return Ok(());
    };

    if action == ReminderAction::OpenAndSnooze {
        // Opening the url is the caller's side effect; print it so a shell
        // pipeline (or the user) can act on it.
        println!("{}", bmark.url);
    } else {
        println!("{} ({})", bmark.title, bmark.url);
    }

    engine.resolve(user, action, Utc::now())?;
    Ok(())
}
