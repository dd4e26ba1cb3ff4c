mod config;
mod error;
mod events;
mod store;

pub use config::RtdbConfig;
pub use store::RtdbGameStore;
