//! List commands implementation

use crate::programmers;

/// List all available transports
pub fn list_programmers() {
    print!("{}", programmers::programmer_help());
}
