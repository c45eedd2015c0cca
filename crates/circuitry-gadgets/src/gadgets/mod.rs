//! Builtin gadget kinds.
//!
//! Each kind is a self-contained module. To add a new kind:
//! 1. Create a new file in this directory
//! 2. Implement the Gadget trait and a `construct` function
//! 3. Add `pub mod <name>;` here
//! 4. Register it in create_default_registry() in ../lib.rs

pub mod inlet;
pub mod outlet;
pub mod pass;
pub mod print;
