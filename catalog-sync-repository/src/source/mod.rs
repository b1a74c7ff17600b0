//! ERP source connectors.

pub mod any_source;

pub use any_source::AnySource;
