mod error;
mod job_schedulers;
mod reminder;
mod shared;
mod status;

use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
pub use error::TicklerError;
use job_schedulers::start_deliver_reminders_job;
pub use shared::auth::{Claims, Permission, Policy};
use std::net::TcpListener;
use tickler_infra::TicklerContext;
use tracing_actix_web::TracingLogger;

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    reminder::configure_routes(cfg);
    status::configure_routes(cfg);
}

/// Malformed bodies, paths and queries are answered with the same envelope
/// as every other validation error
fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|e, _| TicklerError::BadClientData(e.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|e, _| TicklerError::BadClientData(e.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|e, _| TicklerError::BadClientData(e.to_string()).into()),
    );
}

pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    pub async fn new(context: TicklerContext) -> Result<Self, std::io::Error> {
        let (server, port) = Application::configure_server(context.clone()).await?;
        Application::start_job_schedulers(context);

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_job_schedulers(context: TicklerContext) {
        start_deliver_reminders_job(context);
    }

    async fn configure_server(context: TicklerContext) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            let ctx = context.clone();

            App::new()
                .wrap(Cors::permissive())
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(ctx))
                .service(
                    web::scope("/api/v1")
                        .configure(configure_extractors)
                        .configure(configure_server_api),
                )
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}
