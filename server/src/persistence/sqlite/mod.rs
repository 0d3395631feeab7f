//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**, so readers do not block the writer.
//! - **Foreign keys enabled**, which makes `session_players` rows vanish with
//!   their session.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   when [`Database::open`] is called.
//!
//! ## Repository types
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteSessionRepository`] | `SessionRepository` |
//! | [`SqliteProfileRepository`] | `ProfileRepository` |
//!
//! "One game per channel" and "one game per player" are primary keys, so the
//! registry never has to check before it writes.

mod database;
mod profile_repo;
mod session_repo;
pub(crate) mod helpers;

pub use database::Database;
pub use profile_repo::SqliteProfileRepository;
pub use session_repo::SqliteSessionRepository;
