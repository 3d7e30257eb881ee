//! eventhub command-line entry point.
//!
//! Restores the stored session (or logs in with `EVENTHUB_EMAIL` and
//! `EVENTHUB_PASSWORD`), then prints one listing:
//!
//! ```text
//! eventhub [events [TEXT] | mine | subscribed | pending | logout]
//! ```

use anyhow::Context;
use chrono::Local;
use tracing_subscriber::EnvFilter;

use eventhub_client::config::ClientConfig;
use eventhub_client::domain::{Credentials, Event, EventFilter};
use eventhub_client::service::PlatformService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(api_url = %config.api_url, "starting eventhub client");

    let service = PlatformService::from_config(&config)?;

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "events".to_string());

    if command == "logout" {
        service.logout()?;
        println!("logged out");
        return Ok(());
    }

    if command == "events" {
        let mut filter = EventFilter::default();
        if let Some(text) = args.next() {
            filter = filter.with_text(text);
        }
        let events = service.search_events(&filter).await?;
        print_events(&events);
        return Ok(());
    }

    ensure_session(&service).await?;
    let events = match command.as_str() {
        "mine" => service.api().events_by_user(service.session().require_user()?).await?,
        "subscribed" => {
            service
                .api()
                .subscribed_events(service.session().require_user()?)
                .await?
        }
        "pending" => {
            service
                .api()
                .pending_requested_events(service.session().require_user()?)
                .await?
        }
        other => anyhow::bail!("unknown command: {other}"),
    };
    print_events(&events);
    Ok(())
}

/// Uses the stored session, falling back to credentials from the
/// environment.
async fn ensure_session(service: &PlatformService) -> anyhow::Result<()> {
    if let Some(session) = service.restore_session()? {
        service.session().refresh()?;
        tracing::debug!(user_id = %session.user_id, "using stored session");
        return Ok(());
    }
    let email = std::env::var("EVENTHUB_EMAIL").context("no session; set EVENTHUB_EMAIL")?;
    let password =
        std::env::var("EVENTHUB_PASSWORD").context("no session; set EVENTHUB_PASSWORD")?;
    let session = service.login(&Credentials::new(email, password)?).await?;
    println!("logged in as user {}", session.user_id);
    Ok(())
}

fn print_events(events: &[Event]) {
    let now = Local::now().naive_local();
    if events.is_empty() {
        println!("no events");
    }
    for event in events {
        println!(
            "#{:<5} {:<30} {} {}  {:>3}/{:<3} {:<10} {:?}",
            event.id,
            event.name,
            event.date,
            event.time.format("%H:%M"),
            event.current_participants,
            event.max_participants,
            event.category,
            event.temporal_state(now),
        );
    }
}
