//! Command implementations
//!
//! Each command follows the same pattern:
//! - An `Args`/`Subcommand` type defining its CLI surface
//! - An `execute` function implementing the command logic
//!
//! Commands resolve the stack configuration through the shared
//! [`StackArgs`](stack_args::StackArgs) flags, so `cluster` and `kapps`
//! accept the same resolution surface.

pub mod cluster;
pub mod completions;
pub mod kapps;
pub mod stack_args;
