use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Search index error: {0}")]
    Search(#[from] SearchError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        CoreError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound { .. } | CoreError::Database(DatabaseError::RowNotFound { .. })
        )
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache key holds the wrong kind of value: {key}")]
    WrongType { key: String },

    #[error("Cached value could not be decoded for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// `operations` is an upper bound when the backend cannot report per-operation results.
    #[error("Pipeline of {operations} operations failed: {reason}")]
    PipelineFailed { operations: usize, reason: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Row not found: {entity}")]
    RowNotFound { entity: String },

    #[error("Corrupt row in {table}: {details}")]
    CorruptRow { table: String, details: String },

    #[error("Database locked")]
    DatabaseLocked,

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search index unavailable: {endpoint}")]
    Unavailable { endpoint: String },

    #[error("Search index rejected update for post {post_id}: status {status_code}")]
    Rejected { post_id: i64, status_code: u16 },

    #[error("Invalid search index URL: {url}")]
    InvalidUrl { url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Malformed payload on topic {topic}: {reason}")]
    MalformedPayload { topic: String, reason: String },

    #[error("Unknown topic: {topic}")]
    UnknownTopic { topic: String },

    #[error("Event transport closed: {topic}")]
    TransportClosed { topic: String },

    #[error("Worker pool is shut down")]
    PoolClosed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unknown ranking algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("Unknown cache backend: {name}")]
    UnknownCacheBackend { name: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
