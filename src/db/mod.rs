//! Database layer
//!
//! SQLite storage behind the `DatabasePool` trait, embedded migrations and
//! one repository per entity.
//!
//! ```ignore
//! use lostlibrary::config::DatabaseConfig;
//! use lostlibrary::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, sqlite, DatabasePool, DynDatabasePool, SqliteDatabase,
};
