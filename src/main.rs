#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tourdesk::{
    api::HttpApiClient,
    auth::AuthClient,
    models::{Tour, TourStatus},
    notify::LogNotifier,
    resource::{FetchOutcome, ListFilters, ResourceController},
    session::SessionStore,
    settings::TourdeskSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings =
        TourdeskSettings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;
    let session = settings
        .session_store()
        .context("Failed to open session storage")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("session") | None => print_session(&session),
        Some("login") => {
            let (Some(email), Some(password)) = (args.get(1), args.get(2)) else {
                bail!("usage: tourdesk login <email> <password>");
            };
            login(&settings, session, email, password).await
        }
        Some("tours") => {
            let Some(provider_id) = args.get(1) else {
                bail!("usage: tourdesk tours <provider-id> [status]");
            };
            let status = args
                .get(2)
                .map(|s| s.parse::<TourStatus>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            list_tours(&settings, session, provider_id, status).await
        }
        Some("logout") => {
            session
                .clear_auth_data()
                .context("Failed to clear session")?;
            println!("✓ Signed out");
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("unknown command: {other}")
        }
    }
}

fn print_usage() {
    println!("tourdesk {}", tourdesk::VERSION);
    println!();
    println!("Commands:");
    println!("  session                     - Show the stored session");
    println!("  login <email> <password>    - Sign in and store the session");
    println!("  tours <provider-id> [status] - List a provider's tours");
    println!("  logout                      - Clear the stored session");
}

#[allow(clippy::unnecessary_wraps)]
fn print_session(session: &SessionStore) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    let token = session.access_token();
    let user = session.user();
    println!(
        "User:        {}",
        user.as_ref()
            .and_then(|u| u.name.as_deref().or(u.email.as_deref()))
            .unwrap_or("-")
    );
    println!(
        "Role:        {}",
        session
            .current_role()
            .map_or_else(|| "-".to_string(), |r| r.to_string())
    );
    println!(
        "Provider id: {}",
        session.current_provider_id().as_deref().unwrap_or("-")
    );
    match SessionStore::token_expiration(token.as_deref()) {
        Some(at) if session.has_live_session() => println!(
            "Expires:     {at} ({}s left)",
            SessionStore::time_until_expiration(token.as_deref())
        ),
        Some(at) => println!("Expired:     {at}"),
        None => println!("Expires:     unknown"),
    }
    Ok(())
}

async fn login(
    settings: &TourdeskSettings,
    session: SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    let api = HttpApiClient::new(&settings.api, session.clone())?;
    let auth = AuthClient::new(Arc::new(api), session);
    auth.login(email, password)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    println!("✓ Signed in as {email}");
    print_session(auth.session())
}

async fn list_tours(
    settings: &TourdeskSettings,
    session: SessionStore,
    provider_id: &str,
    status: Option<TourStatus>,
) -> Result<()> {
    let api = HttpApiClient::new(&settings.api, session)?;
    let tours: ResourceController<Tour> =
        ResourceController::new(Arc::new(api), Arc::new(LogNotifier));

    let filters = status.map(|s| ListFilters::new().with_status(s));
    if tours.fetch_all(provider_id, filters).await == FetchOutcome::Failed {
        bail!(tours
            .last_error()
            .unwrap_or_else(|| "Cannot load tour list".to_string()));
    }

    for tour in tours.items() {
        println!(
            "{:<12} {:<10} {}",
            tour.id,
            tour.status.map_or("-", TourStatus::as_str),
            tour.title
        );
    }
    println!();
    println!("Total: {}", tours.total());
    for status in TourStatus::ALL {
        let count = tours.count_by_status(&status);
        if count > 0 {
            println!("  {status}: {count}");
        }
    }
    Ok(())
}
