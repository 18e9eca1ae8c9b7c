pub mod intercept;
pub mod manager;

pub use intercept::{InterceptSession, Phase, SessionOptions};
pub use manager::SessionManager;
