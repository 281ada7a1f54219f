use crate::{
    credential,
    ensaluto::handlers::{valid_email, valid_password},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info_span, instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Deserialize, Debug)]
pub struct UserRegister {
    email: String,
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

#[utoipa::path(
    post,
    path= "/user/register",
    responses (
        (status = 201, description = "Registration successful", body = [UserRegister], content_type = "application/json"),
        (status = 409, description = "User with the specified email already exists", body = [UserRegister]),
    ),
    tag= "register"
)]
// axum handler for register
#[instrument(skip(pool, payload))]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()),
    };

    debug!("user: {:?}", user);

    let email = user.email.trim().to_lowercase();

    // if not valid email or password return 400
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string());
    }

    if !valid_password(user.password.expose_secret()) {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string());
    }

    // check if user exists
    match user_exists(&pool, &email).await {
        Ok(true) => {
            error!("User already exists");
            return (StatusCode::CONFLICT, "User already exists".to_string());
        }
        Ok(false) => (),
        Err(e) => {
            error!("Error checking if user exists: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error checking if user exists".to_string(),
            );
        }
    }

    // derive the credential record on the blocking pool, the KDF is CPU bound
    let password = user.password;
    let record = match tokio::task::spawn_blocking(move || {
        credential::hash(password.expose_secret())
    })
    .await
    {
        Ok(Ok(record)) => record,
        Ok(Err(e)) => {
            error!("Error hashing password: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            );
        }
        Err(e) => {
            error!("Hashing task failed: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            );
        }
    };

    // insert user into database
    let query = "INSERT INTO users (id, email, password) VALUES ($1, $2, $3)";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&record)
        .execute(&*pool)
        .instrument(span)
        .await
    {
        Ok(_) => (StatusCode::CREATED, "User created".to_string()),
        Err(e) => {
            error!("Error inserting user: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting user".to_string(),
            )
        }
    }
}

async fn user_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS exists";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(email)
        .fetch_one(pool)
        .instrument(span)
        .await
    {
        Ok(row) => Ok(row.get("exists")),
        Err(e) => Err(e),
    }
}
