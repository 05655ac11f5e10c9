pub mod consent;
pub mod memory;
pub mod user_data;

pub use consent::{ConsentRepository, ConsentStore};
pub use memory::{InMemoryConsentStore, InMemoryUserDataStore};
pub use user_data::{DeletionTransaction, UserDataRepository, UserDataStore};
