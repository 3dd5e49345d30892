//! Authentication API
//!
//! Login, logout, patient signup and the current-user profile.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::password_service::PasswordService;
use crate::auth::session_service::SessionService;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::dispatch::events::PatientRegistered;
use crate::shared::api_common::{lenient, non_empty, ok, Ack, ApiResponse, JsonBody};
use crate::shared::error::{ClinicError, Result};
use crate::shared::middleware::Authenticated;
use crate::user::api::UserResponse;
use crate::user::entity::{date_of_birth, normalize_email, Gender, Role, User};
use crate::user::repository::UserRepository;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub role: Role,
}

/// Patient signup form
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub terms: Option<bool>,
    pub gender: Option<String>,
    pub dob_year: Option<String>,
    pub dob_month: Option<String>,
    pub dob_day: Option<String>,
}

/// A signup form that passed validation
#[derive(Debug)]
struct Registration {
    email: String,
    password: String,
    name: String,
    contact_number: String,
    gender: Option<Gender>,
    date_of_birth: Option<chrono::NaiveDate>,
}

impl SignupRequest {
    fn validate(self) -> Result<Registration> {
        let (Some(email), Some(password)) = (non_empty(self.email), self.password.filter(|p| !p.is_empty())) else {
            return Err(ClinicError::validation("Email and password required"));
        };
        PasswordService::check_policy(&password)?;
        if self.confirm_password.is_some_and(|c| c != password) {
            return Err(ClinicError::validation("Passwords do not match"));
        }
        if self.terms == Some(false) {
            return Err(ClinicError::validation("You must accept the terms"));
        }

        let name = [non_empty(self.first_name), non_empty(self.last_name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Registration {
            email: normalize_email(&email),
            password,
            name,
            contact_number: non_empty(self.contact_number).unwrap_or_default(),
            gender: self.gender.as_deref().and_then(Gender::parse),
            date_of_birth: date_of_birth(
                self.dob_year.as_deref(),
                self.dob_month.as_deref(),
                self.dob_day.as_deref(),
            ),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: String,
    pub email_sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Auth service state
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserRepository>,
    pub passwords: Arc<PasswordService>,
    pub sessions: Arc<SessionService>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// Login and logout cookies share every attribute but value and max-age
fn session_cookie(sessions: &SessionService, token: String, max_age: time::Duration) -> Cookie<'static> {
    let config = sessions.config();
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

fn login_cookie(sessions: &SessionService, token: String) -> Cookie<'static> {
    let ttl = time::Duration::seconds(sessions.config().ttl.num_seconds());
    session_cookie(sessions, token, ttl)
}

fn logout_cookie(sessions: &SessionService) -> Cookie<'static> {
    session_cookie(sessions, String::new(), time::Duration::ZERO)
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postApiLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (Some(email), Some(password)) = (non_empty(req.email), req.password.filter(|p| !p.is_empty())) else {
        return Err(ClinicError::validation("Email and password required"));
    };

    let invalid = || ClinicError::unauthorized("Invalid credentials");

    let user = state
        .users
        .find_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(invalid)?;

    if !state.passwords.verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    let token = state.sessions.issue(&user)?;
    let jar = jar.add(login_cookie(&state.sessions, token));

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((jar, ok(LoginResponse { role: user.role })))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    operation_id = "postApiLogout",
    responses(
        (status = 200, description = "Session cookie cleared", body = Ack)
    )
)]
pub async fn logout(State(state): State<AuthState>, jar: CookieJar) -> impl IntoResponse {
    (jar.add(logout_cookie(&state.sessions)), ok(Ack::default()))
}

/// Register a patient account
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    operation_id = "postApiSignup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = SignupResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn signup(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<Json<ApiResponse<SignupResponse>>> {
    let registration = req.validate()?;

    if state.users.find_by_email(&registration.email).await?.is_some() {
        return Err(ClinicError::conflict("User already exists"));
    }

    let hash = state.passwords.hash_password(&registration.password)?;
    let mut user = User::new(&registration.email, hash, Role::User)
        .with_name(registration.name)
        .with_contact_number(registration.contact_number);
    user.gender = registration.gender;
    user.date_of_birth = registration.date_of_birth;

    // The unique index catches a concurrent signup with the same email
    state.users.insert(&user).await?;

    info!(user_id = %user.id, "Patient registered");

    let report = state
        .dispatcher
        .dispatch(
            &PatientRegistered {
                user_id: user.id.clone(),
                email: user.email.clone(),
                name: user.name.clone(),
            }
            .into(),
        )
        .await;

    Ok(ok(SignupResponse {
        user_id: user.id,
        email_sent: report.email_sent,
    }))
}

/// The caller's profile
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "getApiMe",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("cookie_auth" = []))
)]
pub async fn me(
    State(state): State<AuthState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<MeResponse>>> {
    let user = state
        .users
        .find_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| ClinicError::not_found("User", &auth.user_id))?;

    Ok(ok(MeResponse { user: user.into() }))
}

/// Create the auth router
pub fn auth_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(logout))
        .routes(routes!(signup))
        .routes(routes!(me))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session_service::SessionConfig;

    #[test]
    fn test_logout_cookie_matches_login_cookie() {
        let sessions = SessionService::new(SessionConfig {
            secure_cookie: true,
            ..Default::default()
        });

        let login = login_cookie(&sessions, "token".into());
        let logout = logout_cookie(&sessions);

        assert_eq!(logout.name(), login.name());
        assert_eq!(logout.value(), "");
        assert_eq!(logout.secure(), Some(true));
        assert_eq!(logout.http_only(), login.http_only());
        assert_eq!(logout.same_site(), Some(SameSite::Strict));
        assert_eq!(logout.path(), Some("/"));
        assert_eq!(logout.max_age(), Some(time::Duration::ZERO));
        assert_eq!(login.max_age(), Some(time::Duration::days(7)));
    }

    fn signup(json: &str) -> Result<Registration> {
        serde_json::from_str::<SignupRequest>(json).unwrap().validate()
    }

    #[test]
    fn test_signup_minimal() {
        let r = signup(r#"{"email":" Jane@Example.com ","password":"secret1"}"#).unwrap();
        assert_eq!(r.email, "jane@example.com");
        assert_eq!(r.name, "");
        assert_eq!(r.gender, None);
    }

    #[test]
    fn test_signup_profile_fields() {
        let r = signup(
            r#"{"firstName":"Jane","lastName":"Doe","email":"j@d.com","password":"secret1",
                "confirmPassword":"secret1","terms":"true","gender":"female",
                "dobYear":"1990","dobMonth":"2","dobDay":"14","contactNumber":" 0800 "}"#,
        )
        .unwrap();
        assert_eq!(r.name, "Jane Doe");
        assert_eq!(r.gender, Some(Gender::Female));
        assert_eq!(r.date_of_birth, chrono::NaiveDate::from_ymd_opt(1990, 2, 14));
        assert_eq!(r.contact_number, "0800");
    }

    #[test]
    fn test_signup_rejections() {
        assert!(signup(r#"{"password":"secret1"}"#).is_err());
        assert!(signup(r#"{"email":"a@b.c","password":"short"}"#).is_err());
        assert!(signup(r#"{"email":"a@b.c","password":"secret1","confirmPassword":"secret2"}"#).is_err());
        assert!(signup(r#"{"email":"a@b.c","password":"secret1","terms":false}"#).is_err());
    }

    #[test]
    fn test_unknown_gender_is_dropped() {
        let r = signup(r#"{"email":"a@b.c","password":"secret1","gender":"other"}"#).unwrap();
        assert_eq!(r.gender, None);
    }
}
