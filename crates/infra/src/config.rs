use std::{fmt::Display, str::FromStr};
use tickler_utils::{create_prefixed_secret, create_random_secret};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// Secret used to verify the HS256 signed bearer tokens of the users
    pub jwt_secret: String,
    /// How often the job that pushes due `Reminder`s to open sessions runs
    pub delivery_interval_secs: u64,
    /// Optional endpoint that receives due `Reminder`s of owners without an open session
    pub webhook: Option<WebhookConfig>,
    /// Attempts per webhook delivery before the claims are released again
    pub webhook_max_attempts: u32,
    /// Backoff before the second webhook attempt. Doubles for every attempt after that.
    pub webhook_initial_backoff_millis: u64,
    /// How long an active `Reminder` may be past its due time before it counts as overdue
    pub overdue_grace_millis: i64,
    pub note_max_length: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Maximum number of due `Reminder`s claimed per owner in one delivery run
    pub delivery_batch_size: usize,
    /// Buffered notifications per owner before slow sessions start to lag
    pub notification_channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Sent in the `tickler-webhook-key` header so the receiver can verify the sender
    pub key: String,
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let jwt_secret = match std::env::var("TICKLER_JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                info!("Did not find TICKLER_JWT_SECRET environment variable. Going to create one.");
                let secret = create_random_secret(32);
                info!("Secret for verifying user tokens was generated and set to: {}", secret);
                secret
            }
        };

        let webhook = std::env::var("REMINDER_WEBHOOK_URL").ok().map(|url| {
            let key = std::env::var("REMINDER_WEBHOOK_KEY").unwrap_or_else(|_| {
                let key = create_prefixed_secret("whk", 30);
                info!("Webhook key was generated and set to: {}", key);
                key
            });
            WebhookConfig { url, key }
        });

        Self {
            port: parse_env("PORT", 5000),
            jwt_secret,
            delivery_interval_secs: parse_env("REMINDER_DELIVERY_INTERVAL_SECS", 60),
            webhook,
            webhook_max_attempts: parse_env("REMINDER_WEBHOOK_MAX_ATTEMPTS", 3),
            webhook_initial_backoff_millis: parse_env("REMINDER_WEBHOOK_BACKOFF_MILLIS", 500),
            overdue_grace_millis: parse_env("REMINDER_OVERDUE_GRACE_MILLIS", 0),
            note_max_length: 2000,
            default_page_size: 20,
            max_page_size: 100,
            delivery_batch_size: 500,
            notification_channel_capacity: 64,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn falls_back_to_defaults_on_invalid_values() {
        std::env::set_var("REMINDER_DELIVERY_INTERVAL_SECS", "soon");
        std::env::set_var("REMINDER_OVERDUE_GRACE_MILLIS", "30000");

        let config = Config::new();
        assert_eq!(config.delivery_interval_secs, 60);
        assert_eq!(config.overdue_grace_millis, 30_000);

        std::env::remove_var("REMINDER_DELIVERY_INTERVAL_SECS");
        std::env::remove_var("REMINDER_OVERDUE_GRACE_MILLIS");
    }

    #[test]
    #[serial]
    fn webhook_is_only_configured_with_url() {
        std::env::remove_var("REMINDER_WEBHOOK_URL");
        std::env::remove_var("REMINDER_WEBHOOK_KEY");
        assert!(Config::new().webhook.is_none());

        std::env::set_var("REMINDER_WEBHOOK_URL", "https://crm.example.com/hooks/reminders");
        let webhook = Config::new().webhook.expect("Expected webhook config");
        assert_eq!(webhook.url, "https://crm.example.com/hooks/reminders");
        assert!(webhook.key.starts_with("whk_"));

        std::env::set_var("REMINDER_WEBHOOK_KEY", "shared-key");
        assert_eq!(Config::new().webhook.unwrap().key, "shared-key");

        std::env::remove_var("REMINDER_WEBHOOK_URL");
        std::env::remove_var("REMINDER_WEBHOOK_KEY");
    }

    #[test]
    #[serial]
    fn uses_given_jwt_secret() {
        std::env::set_var("TICKLER_JWT_SECRET", "top-secret");
        assert_eq!(Config::new().jwt_secret, "top-secret");
        std::env::remove_var("TICKLER_JWT_SECRET");
        assert_eq!(Config::new().jwt_secret.len(), 32);
    }
}
