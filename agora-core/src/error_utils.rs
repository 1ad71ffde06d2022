use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Cache(e) => {
                error!("Cache error details: {:?}", e);
            }
            CoreError::Database(e) => {
                error!("Database error details: {:?}", e);
            }
            CoreError::Search(e) => {
                error!("Search index error details: {:?}", e);
            }
            CoreError::Event(e) => {
                error!("Event error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Cache(e) => e.is_retryable(),
            CoreError::Database(e) => e.is_retryable(),
            CoreError::Search(e) => e.is_retryable(),
            CoreError::Event(e) => e.is_retryable(),
            CoreError::Timeout { .. } => true,
            CoreError::Io(_) => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Cache(e) => e.retry_after(),
            CoreError::Database(e) => e.retry_after(),
            CoreError::Search(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Cache(_) => "Cache is temporarily unavailable.".to_string(),
            CoreError::Database(e) => e.user_friendly_message(),
            CoreError::Search(_) => "Search index is temporarily unavailable.".to_string(),
            CoreError::Event(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Cache(_) => "CACHE".to_string(),
            CoreError::Database(_) => "DATABASE".to_string(),
            CoreError::Search(_) => "SEARCH".to_string(),
            CoreError::Event(_) => "EVENT".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Cancelled { .. } => "CANCELLED".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for CacheError {
    fn log_error(&self) -> &Self {
        error!("CacheError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CacheError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CacheError::Unavailable { .. } | CacheError::PipelineFailed { .. } => true,
            CacheError::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_millis(200))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        "Cache is temporarily unavailable.".to_string()
    }

    fn error_code(&self) -> String {
        match self {
            CacheError::Unavailable { .. } => "CACHE_UNAVAILABLE".to_string(),
            CacheError::WrongType { .. } => "CACHE_WRONG_TYPE".to_string(),
            CacheError::Decode { .. } => "CACHE_DECODE".to_string(),
            CacheError::PipelineFailed { .. } => "CACHE_PIPELINE_FAILED".to_string(),
            CacheError::Redis(_) => "CACHE_REDIS".to_string(),
        }
    }
}

impl ErrorExt for DatabaseError {
    fn log_error(&self) -> &Self {
        error!("DatabaseError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DatabaseError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::DatabaseLocked | DatabaseError::ConnectionFailed { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            DatabaseError::DatabaseLocked => Some(Duration::from_millis(100)),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => {
                "Database connection failed. Please try again.".to_string()
            }
            DatabaseError::DatabaseLocked => {
                "Database is temporarily busy. Please try again.".to_string()
            }
            DatabaseError::RowNotFound { entity } => format!("Could not find: {}", entity),
            _ => "Database error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => "DB_CONNECTION_FAILED".to_string(),
            DatabaseError::MigrationFailed { .. } => "DB_MIGRATION_FAILED".to_string(),
            DatabaseError::RowNotFound { .. } => "DB_ROW_NOT_FOUND".to_string(),
            DatabaseError::CorruptRow { .. } => "DB_CORRUPT_ROW".to_string(),
            DatabaseError::DatabaseLocked => "DB_LOCKED".to_string(),
            DatabaseError::Sql(_) => "DB_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for SearchError {
    fn log_error(&self) -> &Self {
        error!("SearchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SearchError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            SearchError::Unavailable { .. } => true,
            SearchError::Rejected { status_code, .. } => *status_code >= 500,
            SearchError::Network(e) => e.is_timeout() || e.is_connect(),
            SearchError::InvalidUrl { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(2))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        "Search index is temporarily unavailable.".to_string()
    }

    fn error_code(&self) -> String {
        match self {
            SearchError::Unavailable { .. } => "SEARCH_UNAVAILABLE".to_string(),
            SearchError::Rejected { .. } => "SEARCH_REJECTED".to_string(),
            SearchError::InvalidUrl { .. } => "SEARCH_INVALID_URL".to_string(),
            SearchError::Network(_) => "SEARCH_NETWORK".to_string(),
        }
    }
}

impl ErrorExt for EventError {
    fn log_error(&self) -> &Self {
        error!("EventError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("EventError (warning): {}", self);
        self
    }

    // Malformed payloads never become valid on redelivery.
    fn is_retryable(&self) -> bool {
        matches!(self, EventError::TransportClosed { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            EventError::MalformedPayload { topic, .. } => {
                format!("Received an unreadable event on '{}'.", topic)
            }
            EventError::UnknownTopic { topic } => format!("No handler for topic '{}'.", topic),
            EventError::TransportClosed { .. } => "Event transport is closed.".to_string(),
            EventError::PoolClosed => "Background workers are shutting down.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            EventError::MalformedPayload { .. } => "EVENT_MALFORMED_PAYLOAD".to_string(),
            EventError::UnknownTopic { .. } => "EVENT_UNKNOWN_TOPIC".to_string(),
            EventError::TransportClosed { .. } => "EVENT_TRANSPORT_CLOSED".to_string(),
            EventError::PoolClosed => "EVENT_POOL_CLOSED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors need operator intervention
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::UnknownAlgorithm { name } => format!(
                "Ranking algorithm '{}' is not supported. Use 'decay-by-sign' or 'gravity-decay'.",
                name
            ),
            ConfigError::UnknownCacheBackend { name } => format!(
                "Cache backend '{}' is not supported. Use 'memory' or 'redis'.",
                name
            ),
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::UnknownAlgorithm { .. } => "CONFIG_UNKNOWN_ALGORITHM".to_string(),
            ConfigError::UnknownCacheBackend { .. } => "CONFIG_UNKNOWN_CACHE_BACKEND".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            if error.is_retryable() {
                if let Some(retry_after) = error.retry_after() {
                    info!("Error is retryable. Retry after: {:?}", retry_after);
                }
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
