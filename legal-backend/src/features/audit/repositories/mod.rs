pub mod audit_log;
pub mod ledger;

pub use audit_log::AuditLogRepository;
pub use ledger::{InMemoryLedger, LedgerBackend};
