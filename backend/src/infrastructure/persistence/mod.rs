mod schema;
mod sqlite_radio_repository;

pub use schema::initialize_database;
pub use sqlite_radio_repository::{order_clause, SqliteRadioRepository};
