//! CLI command implementations
//!
//! Every command works on a boxed [`RmiTransport`](rmiflash_core::transport::RmiTransport)
//! so the same code runs against any backend.

mod info;
mod list;
mod update;

pub use info::run_info;
pub use list::list_programmers;
pub use update::{load_images, run_update};
