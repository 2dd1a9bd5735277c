mod telemetry;

use telemetry::{get_subscriber, init_subscriber};
use tickler_api::Application;
use tickler_infra::setup_context;
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("tickler".into(), "info".into());
    init_subscriber(subscriber);

    let context = setup_context().await;
    let delivery = match &context.config.webhook {
        Some(webhook) => format!("open sessions and webhook {}", webhook.url),
        None => "open sessions".to_string(),
    };

    let app = Application::new(context).await?;
    info!(
        "Tickler listening on port {}, due reminders are delivered to {}",
        app.port(),
        delivery
    );
    app.start().await
}
