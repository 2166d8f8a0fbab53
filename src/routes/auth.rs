use axum::{extract::State, Json};
use diesel::{dsl::exists, prelude::*, result::DatabaseErrorKind, select};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser, ROLE_ADMIN},
    error::{AppError, AppResult},
    models::{NewUser, User},
    schema::users,
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserIdentity,
}

#[derive(Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserIdentity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            company_id: user.company_id,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::email.eq(payload.email.trim()))
        .first(&mut conn)
        .map_err(|_| AppError::unauthorized())?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;

    if !valid {
        warn!(email = %user.email, "login rejected: bad credentials");
        return Err(AppError::unauthorized());
    }

    let access_token = state.jwt.generate_token(&user).map_err(AppError::from)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_expiry_minutes * 60,
        user: user.into(),
    }))
}

#[derive(Deserialize)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
pub struct RegistrationOpenResponse {
    pub open: bool,
}

/// Bootstrap-only self-registration. A partial unique index on the users
/// table admits at most one admin row, so concurrent first registrations
/// collapse into one winner and one constraint violation.
pub async fn register_admin(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> AppResult<Json<UserIdentity>> {
    let email = payload.email.trim().to_string();
    if email.is_empty() {
        return Err(AppError::bad_request("email must not be empty"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        email,
        password_hash,
        role: ROLE_ADMIN.to_string(),
        company_id: None,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
    };

    let mut conn = state.db()?;
    match diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
            let message = if info.constraint_name() == Some("users_single_admin") {
                "admin registration is closed: an admin already exists"
            } else {
                "email already registered"
            };
            return Err(AppError::bad_request(message));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let user: User = users::table.find(new_user.id).first(&mut conn)?;
    info!(user_id = %user.id, email = %user.email, "bootstrap admin registered");
    Ok(Json(user.into()))
}

pub async fn registration_open(
    State(state): State<AppState>,
) -> AppResult<Json<RegistrationOpenResponse>> {
    let mut conn = state.db()?;
    let admin_exists: bool = select(exists(
        users::table.filter(users::role.eq(ROLE_ADMIN)),
    ))
    .get_result(&mut conn)?;

    Ok(Json(RegistrationOpenResponse {
        open: !admin_exists,
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
