//! SQLite backend for the Kohi order engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
