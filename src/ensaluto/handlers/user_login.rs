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

#[derive(ToSchema, Deserialize, Debug)]
pub struct UserLogin {
    email: String,
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

#[utoipa::path(
    post,
    path= "/user/login",
    responses (
        (status = 200, description = "Login successful", body = [UserLogin], content_type = "application/json"),
        (status = 401, description = "Unauthorized", body = [UserLogin]),
    ),
    tag= "login"
)]
// axum handler for login
#[instrument(skip(pool, payload))]
pub async fn login(pool: Extension<PgPool>, payload: Option<Json<UserLogin>>) -> impl IntoResponse {
    let user: UserLogin = match payload {
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

    // get the stored credential record from the database
    let stored = match get_password(&pool, &email).await {
        Ok(stored) => stored,

        Err(sqlx::Error::RowNotFound) => {
            debug!("User not found");

            // burn a full derivation so an unknown account costs the same
            // wall clock as a wrong password
            let _ = tokio::task::spawn_blocking(|| {
                credential::verify("-", credential::DUMMY_RECORD)
            })
            .await;

            return (StatusCode::UNAUTHORIZED, String::from("Unauthorized"));
        }

        Err(e) => {
            error!("Error getting password from database: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Error getting password"),
            );
        }
    };

    // recompute the derived key on the blocking pool and compare
    let password = user.password;
    let is_valid = match tokio::task::spawn_blocking(move || {
        credential::verify(password.expose_secret(), &stored)
    })
    .await
    {
        Ok(is_valid) => is_valid,
        Err(e) => {
            error!("Verification task failed: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Error verifying password"),
            );
        }
    };

    if is_valid {
        debug!("Login successful");

        (StatusCode::OK, String::from("Login successful"))
    } else {
        debug!("Unauthorized");

        (StatusCode::UNAUTHORIZED, String::from("Unauthorized"))
    }
}

async fn get_password(pool: &PgPool, email: &str) -> Result<String, sqlx::Error> {
    let query = "SELECT password FROM users WHERE email = $1";
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
        Ok(row) => Ok(row.get(0)),
        Err(e) => Err(e),
    }
}
