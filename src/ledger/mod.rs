//! Durable record of pin state and expirations
//!
//! Access-tracked resources and namespace pins share one string keyspace:
//!
//! | Key | Entry | Written by | Removed by |
//! |-----|-------|------------|------------|
//! | `<hash>` | `ExpiringResource` | access tracker | reaper |
//! | `<network>:<app>` | `NamespacePin` | namespace pinner | never |

pub mod entry;
pub mod file;
pub mod locks;
pub mod store;

pub use entry::{LedgerEntry, NamespaceKey, ResourceKey};
pub use file::FileLedger;
pub use locks::{KeyGuard, KeyLocks};
pub use store::{LedgerStore, MemoryLedger};
