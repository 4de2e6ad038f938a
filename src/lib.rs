pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod scan;
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}
