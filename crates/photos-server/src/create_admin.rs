//! Provisions a login account in the photos database.
//!
//! Reads `SALT` and `PHOTOS_DB_PATH` like the server, plus `ADMIN_USERNAME`
//! (default `admin`) and `ADMIN_PW`. A random password is generated and
//! printed when `ADMIN_PW` is unset.

use anyhow::Context;
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use photos_api::credentials::CredentialVerifier;
use photos_db::{Database, timestamp};
use photos_server::config::Config;
use photos_types::models::User;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let (password, generated) = match std::env::var("ADMIN_PW") {
        Ok(pw) if !pw.is_empty() => (pw, false),
        _ => (generate_password(), true),
    };

    let credentials = CredentialVerifier::new(config.salt.clone())?;
    let password_hash = credentials.hash(&password)?;

    let db = Database::open(&config.db_path, config.pool)
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    let user = User {
        id: Uuid::now_v7(),
        username: username.clone(),
        password_hash,
        created_at: timestamp::truncate(Utc::now()),
    };
    db.insert_user(&user)
        .await
        .with_context(|| format!("creating user {username:?}"))?;
    db.close();

    println!("Created user {username}");
    if generated {
        println!("Password: {password}");
    }
    Ok(())
}

fn generate_password() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    hex::encode(bytes)
}
