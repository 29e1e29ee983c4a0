mod memory;
mod postgres;
mod r#trait;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{MessageStore, UserDirectory};
