//! Interactive multi-turn refinement.
//!
//! Each line is one turn. Refining turns are folded into the session's
//! cumulative profile; `search` runs the aggregate search for it.

use calclub_config::Config;
use calclub_core::{PartialProfile, SearchProfile, resolve_window};
use calclub_session::{Session, SessionError, SessionManager};
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use uuid::Uuid;

use super::{build_aggregator, print_events};

const HELP: &str = "\
Commands:
  category <name>[, <name>...]   add categories
  keyword <word>[, <word>...]    add keywords
  when <phrase>                  today, tonight, this weekend, friday, 2026-01-15, anytime
  in <location>                  search somewhere else
  within <miles>                 limit distance
  free [on|off]                  only free events
  show                           print the current profile
  search                         run the search
  exit                           quit";

/// Input parameters for the Session command strategy.
#[derive(Debug, Clone)]
pub struct SessionInput {
    /// Optional session id; a new one is generated if not provided
    pub session_id: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Turn {
    Refine(PartialProfile),
    Search,
    Show,
    Help,
    Exit,
}

fn split_list(rest: &str) -> std::collections::BTreeSet<String> {
    rest.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parse one input line into a turn.
fn parse_turn(line: &str, now: NaiveDateTime) -> Result<Turn, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let partial = match verb.to_lowercase().as_str() {
        "search" | "go" => return Ok(Turn::Search),
        "show" => return Ok(Turn::Show),
        "help" | "?" => return Ok(Turn::Help),
        "exit" | "quit" => return Ok(Turn::Exit),
        "category" | "categories" => PartialProfile {
            categories: split_list(rest),
            ..PartialProfile::default()
        },
        "keyword" | "keywords" => PartialProfile {
            keywords: split_list(rest),
            ..PartialProfile::default()
        },
        "when" => {
            let window = resolve_window(rest, now).ok_or_else(|| format!("Don't know when '{rest}' is."))?;
            PartialProfile {
                time_window: Some(window),
                ..PartialProfile::default()
            }
        }
        "in" | "location" => PartialProfile {
            location: Some(rest.to_string()).filter(|l| !l.is_empty()),
            ..PartialProfile::default()
        },
        "within" => {
            let miles: f64 = rest
                .trim_end_matches("miles")
                .trim_end_matches("mi")
                .trim()
                .parse()
                .map_err(|_| format!("Not a distance: '{rest}'"))?;
            PartialProfile {
                max_distance_miles: Some(miles),
                ..PartialProfile::default()
            }
        }
        "free" => {
            let free_only = match rest.to_lowercase().as_str() {
                "" | "on" | "yes" | "only" => true,
                "off" | "no" => false,
                other => return Err(format!("Expected 'free on' or 'free off', got '{other}'")),
            };
            PartialProfile {
                free_only: Some(free_only),
                ..PartialProfile::default()
            }
        }
        other => return Err(format!("Unknown command '{other}'. Type 'help' for the list.")),
    };

    if partial.is_empty() {
        return Err(format!("Nothing to add from '{line}'."));
    }
    Ok(Turn::Refine(partial))
}

fn describe(profile: &SearchProfile) -> String {
    let join = |items: &std::collections::BTreeSet<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let when = profile.time_window.map_or_else(
        || "anytime".to_string(),
        |w| {
            let fmt = |t: Option<NaiveDateTime>| {
                t.map_or_else(|| "open".to_string(), |t| t.format("%a %b %-d %H:%M").to_string())
            };
            format!("{} .. {}", fmt(w.start), fmt(w.end))
        },
    );
    let distance = profile
        .max_distance_miles
        .map_or_else(|| "-".to_string(), |d| format!("{d} mi"));

    format!(
        "  location:   {}\n  when:       {when}\n  categories: {}\n  keywords:   {}\n  within:     {distance}\n  free only:  {}",
        profile.location,
        join(&profile.categories),
        join(&profile.keywords),
        profile.free_only
    )
}

/// Strategy for the interactive refinement loop.
#[derive(Debug, Clone, Copy)]
pub struct SessionStrategy;

impl SessionStrategy {
    fn start(sessions: &SessionManager, session_id: &str, location: &str) -> Result<Session, SessionError> {
        sessions.create(session_id);
        sessions.merge(
            session_id,
            PartialProfile {
                location: Some(location.to_string()),
                ..PartialProfile::default()
            },
        )
    }
}

impl super::CommandStrategy for SessionStrategy {
    type Input = SessionInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let location = config.search.default_location.clone();

        let aggregator = build_aggregator(&config)?;
        let cache_sweeper = Arc::clone(aggregator.cache()).spawn_sweeper(config.cache.sweep_interval());

        let sessions = Arc::new(SessionManager::new(config.session.idle_timeout()));
        let session_sweeper = Arc::clone(&sessions).spawn_sweeper(config.session.sweep_interval());

        let session_id = input.session_id.unwrap_or_else(|| Uuid::now_v7().to_string());
        Self::start(&sessions, &session_id, &location)?;
        info!("Starting search session: {session_id}");

        println!("calclub session {session_id}. Type 'help' for commands, 'exit' to quit.\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let turn = match parse_turn(&line, Local::now().naive_local()) {
                Ok(turn) => turn,
                Err(message) => {
                    eprintln!("{message}");
                    continue;
                }
            };

            let searching = turn == Turn::Search;
            let session = match turn {
                Turn::Exit => break,
                Turn::Help => {
                    println!("{HELP}\n");
                    continue;
                }
                Turn::Refine(partial) => sessions.merge(&session_id, partial),
                Turn::Search | Turn::Show => sessions.get(&session_id),
            };

            let session = match session {
                Ok(session) => session,
                Err(SessionError::NotFound(_)) => {
                    println!("Session expired after inactivity, starting over.");
                    Self::start(&sessions, &session_id, &location)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if searching {
                let events = aggregator.aggregate(&session.profile).await?;
                print_events(&events, false)?;
                println!();
            } else {
                println!("{}\n", describe(&session.profile));
            }
        }

        cache_sweeper.abort();
        session_sweeper.abort();
        Ok(())
    }
}
