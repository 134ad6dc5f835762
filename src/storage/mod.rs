//! Persistence collaborators implementing `ResourceModel`.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryModel;
pub use postgres::PostgresModel;
