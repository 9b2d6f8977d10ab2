//! CLI command implementations

pub mod build;
pub mod children;
pub mod find;
pub mod tree;
pub mod watch;
