//! Application configuration and the router.

use std::path::{Path, PathBuf};

use axum::{
    Router, middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::Key;
use diesel_migrations::MigrationHarness;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    MIGRATIONS,
    admin::admin_dashboard,
    auth::{
        User,
        login::{do_login, login_page, logout},
        register::{do_register, register_page},
    },
    participants::{
        create::{create_participant_page, do_create_participant},
        list::participants_list,
        profile::{do_edit_profile, profile_page_route},
    },
    permission::landing_for,
    report::view::report_page,
    responses::{
        export::export_responses,
        list::responses_list,
        survey::{
            do_own_survey, do_participant_survey, own_survey_page,
            participant_survey_page,
        },
    },
    state::{AppState, DbPool, IN_MEMORY, commit_transactions},
};

pub const DEFAULT_DATABASE_URL: &str = IN_MEMORY;
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Cookie keys are derived from at least this many bytes of secret.
pub const MIN_SECRET_LEN: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("secret_key must be at least {} bytes long", MIN_SECRET_LEN)]
    SecretKeyTooShort,
    #[error("database_url must name a database file; {} is lost on exit", IN_MEMORY)]
    InMemoryDatabase,
}

/// Settings read from an optional TOML file, then overridden by the
/// environment (`DATABASE_URL`, `SECRET_KEY`, `BIND`).
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind: Option<String>,
    pub secret_key: Option<String>,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<AppConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                AppConfig::from_toml(&text)?
            }
            None => AppConfig::default(),
        };
        Ok(config.with_overrides(|var| std::env::var(var).ok()))
    }

    /// Replaces settings for which `lookup` has a value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppConfig {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(key) = lookup("SECRET_KEY") {
            self.secret_key = Some(key);
        }
        if let Some(bind) = lookup("BIND") {
            self.bind = Some(bind);
        }
        self
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// The database URL, refusing the in-memory default for changes that
    /// must outlive the process.
    pub fn persistent_database_url(&self) -> Result<&str, ConfigError> {
        match self.database_url() {
            IN_MEMORY => Err(ConfigError::InMemoryDatabase),
            url => Ok(url),
        }
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    /// The cookie signing/encryption key. Without a configured secret a
    /// random key is used, so sessions end when the server restarts.
    pub fn key(&self) -> Result<Key, ConfigError> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes())
                .map_err(|_| ConfigError::SecretKeyTooShort),
            None => {
                tracing::warn!(
                    "no secret_key configured; using a random one (sessions will not survive a restart)"
                );
                Ok(Key::generate())
            }
        }
    }
}

pub fn run_migrations(
    pool: &DbPool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "applied migrations");
    }
    Ok(())
}

/// Anonymous visitors are sent to log in, everyone else to their landing
/// page.
pub async fn home(user: Option<User<false>>) -> Response {
    match user {
        Some(user) => Redirect::to(landing_for(user.role())).into_response(),
        None => Redirect::to("/login").into_response(),
    }
}

pub fn create_app(pool: DbPool, key: Key) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(do_login))
        .route("/logout", get(logout).post(logout))
        .route("/register", get(register_page).post(do_register))
        .route("/profile", get(profile_page_route).post(do_edit_profile))
        .route(
            "/new_participant",
            get(create_participant_page).post(do_create_participant),
        )
        .route("/survey", get(own_survey_page).post(do_own_survey))
        .route(
            "/survey/:participant_id",
            get(participant_survey_page).post(do_participant_survey),
        )
        .route("/admin-dashboard", get(admin_dashboard))
        .route("/participants", get(participants_list))
        .route("/responses", get(responses_list))
        .route("/responses/export.csv", get(export_responses))
        .route("/report", get(report_page))
        .layer(middleware::from_fn(commit_transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pool, key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_are_overridden_by_the_environment() {
        let config = AppConfig::from_toml(
            r#"
            database_url = "san.sqlite3"
            bind = "0.0.0.0:80"
            "#,
        )
        .unwrap()
        .with_overrides(|var| (var == "BIND").then(|| "[::1]:9000".to_string()));

        assert_eq!(config.database_url(), "san.sqlite3");
        assert_eq!(config.bind(), "[::1]:9000");
        assert_eq!(config.secret_key, None);
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::default().with_overrides(|_| None);
        assert_eq!(config.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(config.bind(), DEFAULT_BIND);
        assert!(config.key().is_ok());
    }

    #[test]
    fn bad_files_and_short_keys_are_rejected() {
        assert!(matches!(
            AppConfig::from_toml("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));

        let short = AppConfig {
            secret_key: Some("hunter2".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(short.key(), Err(ConfigError::SecretKeyTooShort)));

        let long = AppConfig {
            secret_key: Some("0".repeat(MIN_SECRET_LEN)),
            ..AppConfig::default()
        };
        assert!(long.key().is_ok());
    }

    #[test]
    fn persistent_changes_need_a_database_file() {
        assert!(matches!(
            AppConfig::default().persistent_database_url(),
            Err(ConfigError::InMemoryDatabase)
        ));

        let file = AppConfig {
            database_url: Some("san.sqlite3".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(file.persistent_database_url().unwrap(), "san.sqlite3");
    }
}
