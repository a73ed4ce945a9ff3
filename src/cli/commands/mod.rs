//! CLI command implementations

pub mod access;
pub mod config;
pub mod list;
pub mod namespace;
pub mod serve;
pub mod sweep;

pub use access::execute as access;
pub use config::execute as config;
pub use list::execute as list;
pub use namespace::execute as namespace;
pub use serve::execute as serve;
pub use sweep::execute as sweep;
