//! Workflow integration tests
//!
//! Each test runs the binary against a temp project.

pub mod commands;
