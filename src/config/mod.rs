/// Database connection and schema creation
pub mod database;

/// Portal settings loaded from portal.toml and the environment
pub mod portal;
