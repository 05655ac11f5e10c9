pub mod audit_log_tests;
pub mod consent_management_tests;
pub mod data_deletion_tests;
