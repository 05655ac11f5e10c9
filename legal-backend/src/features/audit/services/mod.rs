pub mod hash_chain;

pub use hash_chain::{AuditChain, IntegrityReport};
