//! Configuration module for the catalog sync.
//! Defines and manages application-wide settings and dependencies.
mod dependencies;

pub use dependencies::Dependencies;
