// Scheduled background jobs
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::meta::RefreshOutcome;
use crate::state::AppState;

/// Runs `tick` every `period`. Each tick is its own spawned task, so a slow
/// tick can overlap the next one.
pub fn schedule<F, Fut>(name: &'static str, period: Duration, tick: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        info!("Scheduled job '{}' every {:?}", name, period);
        loop {
            interval.tick().await;
            tokio::spawn(tick());
        }
    })
}

pub async fn refresh_token_tick(state: AppState) {
    match state.token_refresher().run_once(Utc::now()).await {
        Ok(RefreshOutcome::Refreshed { version, .. }) => {
            info!("Token refresh job renewed the access token (version {})", version);
        }
        Ok(_) => {}
        Err(e) => error!("Token refresh job failed: {}", e),
    }
}

pub async fn sweep_sessions_tick(state: AppState) {
    if let Err(e) = state.sessions().sweep(Utc::now()).await {
        error!("Session sweep job failed: {}", e);
    }
}

/// Start every periodic job for the server process.
pub fn spawn_all(state: &AppState) -> Vec<JoinHandle<()>> {
    let refresh_state = state.clone();
    let sweep_state = state.clone();

    vec![
        schedule("token-refresh", state.config.meta.refresh_interval(), move || {
            refresh_token_tick(refresh_state.clone())
        }),
        schedule(
            "session-sweep",
            Duration::from_secs(state.config.sessions.sweep_interval_secs),
            move || sweep_sessions_tick(sweep_state.clone()),
        ),
    ]
}
