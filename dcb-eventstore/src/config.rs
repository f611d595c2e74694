//! Event store configuration (§3).
use std::time::Duration;

/// The transaction isolation level used for append transactions (§3, §5).
///
/// Callers that need cross-aggregate invariants without advisory locks should use
/// `Serializable`; callers that need scoped serialization cheaply should use
/// `ReadCommitted` plus `lock:` tags and conditions (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The literal fragment for a `SET TRANSACTION ISOLATION LEVEL ...` statement.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Recognized event store configuration options (§3).
///
/// Construct with [`EventStoreConfig::default`] and override fields with the fluent
/// `with_*` methods, mirroring the builder style used throughout the teacher crate's
/// `StreamQuery`/criteria builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStoreConfig {
    max_batch_size: usize,
    stream_buffer: usize,
    default_append_isolation: IsolationLevel,
    query_timeout: Option<Duration>,
    append_timeout: Option<Duration>,
    lock_timeout: Option<Duration>,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            stream_buffer: 1000,
            default_append_isolation: IsolationLevel::ReadCommitted,
            query_timeout: None,
            append_timeout: None,
            lock_timeout: None,
        }
    }
}

impl EventStoreConfig {
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    pub fn with_default_append_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.default_append_isolation = isolation;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_append_timeout(mut self, timeout: Duration) -> Self {
        self.append_timeout = Some(timeout);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn stream_buffer(&self) -> usize {
        self.stream_buffer
    }

    pub fn default_append_isolation(&self) -> IsolationLevel {
        self.default_append_isolation
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    pub fn append_timeout(&self) -> Option<Duration> {
        self.append_timeout
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EventStoreConfig::default();
        assert_eq!(config.max_batch_size(), 1000);
        assert_eq!(config.stream_buffer(), 1000);
        assert_eq!(config.default_append_isolation(), IsolationLevel::ReadCommitted);
        assert_eq!(config.query_timeout(), None);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = EventStoreConfig::default()
            .with_max_batch_size(50)
            .with_default_append_isolation(IsolationLevel::Serializable);
        assert_eq!(config.max_batch_size(), 50);
        assert_eq!(config.default_append_isolation(), IsolationLevel::Serializable);
    }
}
