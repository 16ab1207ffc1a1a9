//! Result engine for debate tournaments.
//!
//! Takes the scores entered for a single ballot submission and turns them into
//! the team and speaker score records that standings are computed from. See
//! [`tournaments::rounds::results`] for the entry point.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod config;
pub mod schema;
pub mod state;
pub mod tournaments;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
