/// Database connection and schema creation
pub mod database;

/// Application settings loading from config.toml
pub mod settings;
