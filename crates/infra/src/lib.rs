mod config;
mod repos;
mod services;
mod system;

pub use config::{Config, WebhookConfig};
pub use repos::{IReminderRepo, ReminderFindQuery, Repos};
pub use services::*;
use std::sync::Arc;
pub use system::{ControlledSys, ISys, RealSys};
use tracing::warn;

#[derive(Clone)]
pub struct TicklerContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub hub: Arc<ReminderHub>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl TicklerContext {
    fn new(repos: Repos, config: Config) -> Self {
        let hub = Arc::new(ReminderHub::new(config.notification_channel_capacity));
        Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            hub,
        }
    }

    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        Self::new(repos, Config::new())
    }

    pub fn create_inmemory() -> Self {
        Self::new(Repos::create_inmemory(), Config::new())
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> TicklerContext {
    match get_psql_connection_string() {
        Some(postgres_connection_string) => {
            TicklerContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
        }
        None => {
            warn!("DATABASE_URL is not set. Reminders will only be kept in memory.");
            TicklerContext::create_inmemory()
        }
    }
}

fn get_psql_connection_string() -> Option<String> {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING).ok()
}
