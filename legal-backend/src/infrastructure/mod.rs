pub mod encryption;
pub mod rate_limit;
