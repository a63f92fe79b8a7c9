use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod admin;
pub mod auth;
pub mod config;
pub mod participants;
pub mod permission;
pub mod questionnaire;
pub mod report;
pub mod responses;
pub mod schema;
pub mod state;
pub mod template;
pub mod util_resp;
pub mod validation;
pub mod widgets;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
