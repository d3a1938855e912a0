pub mod channel;
pub mod event;
pub mod membership;
pub mod policy;
pub mod types;
