//! E-Clinic Server
//!
//! Serves the JSON API under `/api`, health probes and Swagger UI.
//!
//! ## Configuration
//!
//! Read by `ec_config::ConfigLoader` from `ECLINIC_CONFIG`, `./config.toml`,
//! `./eclinic.toml` or `/etc/eclinic/config.toml`, then overridden by
//! environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ECLINIC_HTTP_PORT` | `3000` | HTTP port |
//! | `MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `MONGODB_DATABASE` | `eclinic` | MongoDB database name |
//! | `JWT_SECRET` | dev secret | Session signing secret (required in production) |
//! | `ECLINIC_PRODUCTION` | `false` | Secure cookies, strict validation |
//! | `SMTP_HOST` | - | Enables email when set |
//! | `BLOB_ENDPOINT` | - | Enables uploads when set |
//! | `SEED_ADMIN_EMAIL` | - | Admin account created at startup |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa_swagger_ui::SwaggerUi;

use ec_config::{AppConfig, ConfigLoader, HttpConfig};
use ec_platform::shared::indexes::initialize_indexes;
use ec_platform::{
    build_app, AdminSeeder, Argon2Config, BlobStore, DisabledBlobStore, DispatchPolicy, EventDispatcher,
    HttpBlobStore, Mailer, MongoAppointmentRepository, MongoMedicineRepository, MongoNotificationRepository,
    MongoUserRepository, NoOpMailer, PasswordService, Platform, SessionConfig, SessionService, SmtpMailer,
};

#[tokio::main]
async fn main() -> Result<()> {
    ec_common::logging::init_logging("ec-server");

    info!("Starting E-Clinic Server");

    let config = ConfigLoader::new().load()?;

    // Connect to MongoDB
    info!(database = %config.mongodb.database, "Connecting to MongoDB");
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    if let Err(e) = initialize_indexes(&db).await {
        warn!(error = %e, "Index creation failed");
    }

    // Initialize repositories
    let users = Arc::new(MongoUserRepository::new(&db));
    let appointments = Arc::new(MongoAppointmentRepository::new(&db));
    let notifications = Arc::new(MongoNotificationRepository::new(&db));
    let medicines = Arc::new(MongoMedicineRepository::new(&db));
    info!("Repositories initialized");

    let passwords = Arc::new(PasswordService::new(Argon2Config::default())?);
    let sessions = Arc::new(SessionService::new(SessionConfig {
        secret: config.auth.jwt_secret.clone(),
        cookie_name: config.auth.cookie_name.clone(),
        ttl: chrono::Duration::days(config.auth.session_ttl_days),
        secure_cookie: config.production,
    }));

    // Seed the first admin account
    let seeder = AdminSeeder::new(users.clone(), passwords.clone());
    if let Err(e) = seeder.seed(&config.seed).await {
        warn!(error = %e, "Admin seeding skipped");
    }

    let dispatcher = Arc::new(
        EventDispatcher::new(notifications.clone(), users.clone(), mailer(&config), config.app_url.clone())
            .with_policy(DispatchPolicy {
                email_attempts: config.email.max_attempts.max(1),
                retry_delay: Duration::from_millis(config.email.retry_delay_ms),
            }),
    );

    let blobs: Arc<dyn BlobStore> = if config.blob.is_enabled() {
        info!(endpoint = %config.blob.endpoint, "Blob storage enabled");
        Arc::new(HttpBlobStore::new(config.blob.endpoint.clone(), config.blob.token.clone()))
    } else {
        warn!("Blob storage not configured, uploads will fail");
        Arc::new(DisabledBlobStore)
    };

    let platform = Platform {
        users,
        appointments,
        notifications,
        medicines,
        passwords,
        sessions,
        blobs,
        dispatcher,
    };

    let (router, openapi) = build_app(&platform);

    let app = router
        // OpenAPI / Swagger UI with auto-collected paths
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http));

    // Start API server
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error");
    }

    info!("E-Clinic Server shutdown complete");
    Ok(())
}

fn mailer(config: &AppConfig) -> Arc<dyn Mailer> {
    if !config.email.is_enabled() {
        warn!("SMTP not configured, emails will not be sent");
        return Arc::new(NoOpMailer);
    }

    match SmtpMailer::from_config(&config.email) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            error!(error = %e, "Invalid SMTP configuration, emails will not be sent");
            Arc::new(NoOpMailer)
        }
    }
}

/// Credentialed CORS for the configured origins; `*` allows any origin
/// without cookies.
fn cors_layer(http: &HttpConfig) -> CorsLayer {
    if http.cors_origins.is_empty() || http.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received...");
}
