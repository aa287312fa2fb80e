//! Shared utilities for the file gateway services

pub mod observability;
