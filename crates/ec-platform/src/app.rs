//! Application Assembly
//!
//! Wires repositories and services into the API routers. Shared by the
//! server binary and the HTTP tests.

use std::sync::Arc;

use axum::{http::Uri, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::admin::api::{admin_router, AdminState};
use crate::appointment::api::{appointments_router, AppointmentsState};
use crate::appointment::repository::AppointmentRepository;
use crate::auth::auth_api::{auth_router, AuthState};
use crate::auth::password_service::PasswordService;
use crate::auth::session_service::SessionService;
use crate::dispatch::blob::BlobStore;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::inventory::api::{inventory_router, InventoryState};
use crate::inventory::repository::MedicineRepository;
use crate::notification::api::{notifications_router, NotificationsState};
use crate::notification::repository::NotificationRepository;
use crate::shared::error::ClinicError;
use crate::shared::health_api::health_router;
use crate::shared::middleware::{page_guard, AppState, AuthLayer};
use crate::user::api::{users_router, UsersState};
use crate::user::repository::UserRepository;

/// Everything the HTTP layer needs
#[derive(Clone)]
pub struct Platform {
    pub users: Arc<dyn UserRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub medicines: Arc<dyn MedicineRepository>,
    pub passwords: Arc<PasswordService>,
    pub sessions: Arc<SessionService>,
    pub blobs: Arc<dyn BlobStore>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// All JSON endpoints, relative to `/api`
pub fn api_router(platform: &Platform) -> OpenApiRouter {
    let auth_state = AuthState {
        users: platform.users.clone(),
        passwords: platform.passwords.clone(),
        sessions: platform.sessions.clone(),
        dispatcher: platform.dispatcher.clone(),
    };
    let users_state = UsersState {
        users: platform.users.clone(),
        appointments: platform.appointments.clone(),
        blobs: platform.blobs.clone(),
    };
    let appointments_state = AppointmentsState {
        users: platform.users.clone(),
        appointments: platform.appointments.clone(),
        blobs: platform.blobs.clone(),
        dispatcher: platform.dispatcher.clone(),
    };
    let notifications_state = NotificationsState {
        notifications: platform.notifications.clone(),
    };
    let inventory_state = InventoryState {
        medicines: platform.medicines.clone(),
    };
    let admin_state = AdminState {
        users: platform.users.clone(),
        passwords: platform.passwords.clone(),
        dispatcher: platform.dispatcher.clone(),
    };

    OpenApiRouter::new()
        .merge(auth_router(auth_state))
        .merge(users_router(users_state))
        .merge(appointments_router(appointments_state))
        .merge(notifications_router(notifications_state))
        .merge(inventory_router(inventory_state))
        .merge(admin_router(admin_state))
}

async fn not_found(uri: Uri) -> ClinicError {
    ClinicError::not_found("Route", uri.path())
}

fn document(openapi: &mut OpenApi, cookie_name: &str) {
    openapi.info.title = "E-Clinic API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description =
        Some("Appointments, consultations, notifications and clinic administration".to_string());

    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "cookie_auth",
        SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(cookie_name))),
    );
}

/// Build the application router and its OpenAPI document.
///
/// The session layer is outermost so both the page guard and the
/// `Authenticated` extractor can reach the session service.
pub fn build_app(platform: &Platform) -> (Router, OpenApi) {
    let (api, mut openapi) = OpenApiRouter::new()
        .nest("/api", api_router(platform))
        .split_for_parts();

    document(&mut openapi, platform.sessions.cookie_name());

    let app_state = AppState {
        sessions: platform.sessions.clone(),
    };

    let router = Router::new()
        .merge(api)
        .merge(health_router())
        .fallback(not_found)
        .layer(axum::middleware::from_fn(page_guard))
        .layer(AuthLayer::new(app_state));

    (router, openapi)
}
