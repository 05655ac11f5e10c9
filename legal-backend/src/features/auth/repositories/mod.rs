pub mod session;

pub use session::{ActiveSession, SessionLookup, SessionRepository};
