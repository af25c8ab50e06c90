//! Flash programming primitives shared by every bootloader generation
//!
//! - [`chunk`] splits an image into blocks
//! - [`sync`] holds the idle and attention waits that gate every step
//! - [`program`] writes blocks and whole images

pub mod chunk;
pub mod program;
pub mod sync;

pub use chunk::{block_count, chunks, Block};
pub use program::{program_image, write_block, BlockCounter};
pub use sync::{poll_wait, wait_for_idle};
