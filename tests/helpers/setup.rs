use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
use std::sync::Arc;
use tickler_api::{Application, Claims, Policy};
use tickler_infra::{setup_context, Config, ControlledSys};
use tickler_sdk::{TicklerSDK, ID};

/// Timestamp the controlled clock of every test app starts at
pub const START_TS: i64 = 1_800_000_000_000;

pub struct TestApp {
    pub config: Config,
    pub sys: Arc<ControlledSys>,
    pub address: String,
}

impl TestApp {
    /// Signs a token for the user that is accepted by the app
    pub fn token(&self, user_id: &ID, policy: Option<Policy>) -> String {
        let now = get_current_timestamp() as usize;
        let claims = Claims {
            exp: now + 3600,
            iat: now,
            user_id: user_id.to_string(),
            policy,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .expect("Expected to sign token")
    }

    /// SDK authenticated as a new user
    pub fn user_sdk(&self) -> (ID, TicklerSDK) {
        let user_id = ID::default();
        let sdk = TicklerSDK::new(self.address.clone(), self.token(&user_id, None));
        (user_id, sdk)
    }
}

// Launch the application as a background task
pub async fn spawn_app() -> TestApp {
    let mut ctx = setup_context().await;
    ctx.config.port = 0; // Random port
    ctx.config.webhook = None;
    let sys = Arc::new(ControlledSys::new(START_TS));
    ctx.sys = sys.clone();

    let config = ctx.config.clone();
    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        config,
        sys,
        address,
    }
}
