//! Error types for the ERP cache engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the cache and maintenance layers
///
/// None of these ever reach storefront users: the boolean cache operations
/// log them and degrade to a miss.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // Backing Store Errors
    // =========================================================================
    /// Backing store rejected an operation
    #[error("Backing store {operation} failed for key {key}: {reason}")]
    Store {
        operation: String,
        key: String,
        reason: String,
    },

    /// Backing store is full
    #[error("Backing store capacity exceeded: need {requested} bytes, {available} available")]
    StoreCapacity { requested: u64, available: u64 },

    /// Stored bytes could not be decoded
    #[error("Corrupt cache entry at {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    // =========================================================================
    // Record Cache Errors
    // =========================================================================
    /// Price outside the accepted bound
    #[error("Invalid price {price} for SKU {sku}: must be within [0, {max}]")]
    InvalidPrice { sku: String, price: f64, max: f64 },

    /// Empty or malformed record identifier
    #[error("Invalid record identifier: {0:?}")]
    InvalidIdentifier(String),

    // =========================================================================
    // Compression Errors
    // =========================================================================
    /// Compression failed
    #[error("Compression with {algorithm} failed: {reason}")]
    CompressionFailed { algorithm: String, reason: String },

    /// Decompression failed
    #[error("Decompression with {algorithm} failed: {reason}")]
    DecompressionFailed { algorithm: String, reason: String },

    // =========================================================================
    // Maintenance Errors
    // =========================================================================
    /// A maintenance action failed
    #[error("Maintenance action {action} failed: {reason}")]
    MaintenanceFailed { action: String, reason: String },

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a backing store error
    pub fn store(operation: &str, key: &str, reason: impl Into<String>) -> Self {
        Error::Store {
            operation: operation.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether a retry on the next pass could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Store { .. } | Error::StoreCapacity { .. } | Error::Io(_)
        )
    }
}
