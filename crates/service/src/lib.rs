//! Service layer owning the user collection behind a narrow store interface.
//! - `store::UserStore` is the seam; handlers never touch the data directly.
//! - `memory::MemoryUserStore` is the only implementation today; a persistent
//!   backend would implement the same trait and be selected at startup.

pub mod errors;
pub mod memory;
pub mod store;
