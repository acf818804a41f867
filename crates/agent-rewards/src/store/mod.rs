//! Storage backends implementing every repository trait, plus in-process stand-ins
//! for the identity provider and the mail transport.

mod collaborators;
mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use collaborators::{MemoryIdentityProvider, MemoryOutbox};
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
