pub mod connection;
pub mod entity;
pub mod repository;

pub use connection::{establish_connection, establish_connection_with};

#[cfg(test)]
pub(crate) async fn memory_db() -> sea_orm::DatabaseConnection {
    establish_connection("sqlite::memory:")
        .await
        .expect("in-memory catalog store")
}
