//! Runtime configuration (C7, added).
//!
//! Bundles the pluggable handlers and constants a caller can customize —
//! an unknown-option acceptability predicate, an error sink, and
//! per-command handlers — into one struct plus a small builder, in a
//! plain-struct-with-defaults idiom.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ErrorKind;

/// A boxed, owned future, for callback signatures that must return
/// `'static` work without introducing an associated type per callback.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler invoked when a registered command byte is received.
///
/// A callable trait object, not a type hierarchy: one tagged field rather
/// than a tree of handler types.
pub type CommandHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Predicate deciding whether an option not present in the registry
/// should be treated as acceptable.
pub type UnknownOptionHandler = Arc<dyn Fn(u8) -> bool + Send + Sync>;

/// A handler invoked with a completed subnegotiation's payload for a
/// specific option. Its return value, if any, is the raw reply payload
/// to wrap and send back as that option's own subnegotiation.
pub type SubnegotiationHandler = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// Sink for non-fatal errors surfaced during stream processing.
///
/// Deliberately a plain injectable callback rather than a `tracing`/`log`
/// dependency: no hidden global logging state, direct diagnostics only.
pub type ErrorLogger = Arc<dyn Fn(&ErrorKind, &str) + Send + Sync>;

/// Default AYT response text.
pub const DEFAULT_AYT_RESPONSE: &str = "Telnet system is active.";

/// Default subnegotiation size bound applied when an option's own
/// descriptor does not specify one.
pub const DEFAULT_MAX_SUBNEG_BYTES: usize = 1024;

/// Runtime configuration for a [`crate::stream::TelnetStream`].
#[derive(Clone)]
pub struct Configuration {
    /// Whether to accept an option the registry has no descriptor for.
    pub unknown_option_handler: UnknownOptionHandler,
    /// Sink invoked with every non-fatal error the stream encounters.
    pub error_logger: ErrorLogger,
    /// Handlers dispatched on receipt of specific bare command bytes.
    pub command_handlers: HashMap<u8, CommandHandler>,
    /// Handlers dispatched with a completed subnegotiation's payload, by
    /// option id.
    pub subneg_handlers: HashMap<u8, SubnegotiationHandler>,
    /// The text sent in response to an inbound `IAC AYT`.
    pub ayt_response: String,
    /// Fallback subnegotiation byte limit for options without their own.
    pub default_max_subneg_bytes: usize,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("ayt_response", &self.ayt_response)
            .field("default_max_subneg_bytes", &self.default_max_subneg_bytes)
            .field("command_handlers", &self.command_handlers.keys().collect::<Vec<_>>())
            .field("subneg_handlers", &self.subneg_handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            unknown_option_handler: Arc::new(|_| false),
            error_logger: Arc::new(|_, _| {}),
            command_handlers: HashMap::new(),
            subneg_handlers: HashMap::new(),
            ayt_response: DEFAULT_AYT_RESPONSE.to_string(),
            default_max_subneg_bytes: DEFAULT_MAX_SUBNEG_BYTES,
        }
    }
}

/// Builder for [`Configuration`], for callers who only want to override a
/// couple of fields.
#[derive(Clone, Default)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-option acceptability predicate.
    #[must_use]
    pub fn with_unknown_option_handler(mut self, handler: UnknownOptionHandler) -> Self {
        self.config.unknown_option_handler = handler;
        self
    }

    /// Set the error sink.
    #[must_use]
    pub fn with_error_logger(mut self, logger: ErrorLogger) -> Self {
        self.config.error_logger = logger;
        self
    }

    /// Register a handler for a specific command byte.
    #[must_use]
    pub fn with_command_handler(mut self, cmd: u8, handler: CommandHandler) -> Self {
        self.config.command_handlers.insert(cmd, handler);
        self
    }

    /// Register a handler for a specific option's subnegotiation payload.
    #[must_use]
    pub fn with_subneg_handler(mut self, opt: u8, handler: SubnegotiationHandler) -> Self {
        self.config.subneg_handlers.insert(opt, handler);
        self
    }

    /// Override the AYT response text.
    #[must_use]
    pub fn with_ayt_response(mut self, response: impl Into<String>) -> Self {
        self.config.ayt_response = response.into();
        self
    }

    /// Override the default subnegotiation byte limit.
    #[must_use]
    pub fn with_default_max_subneg_bytes(mut self, max: usize) -> Self {
        self.config.default_max_subneg_bytes = max;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Configuration {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive_and_empty() {
        let config = Configuration::default();
        assert_eq!(config.ayt_response, "Telnet system is active.");
        assert_eq!(config.default_max_subneg_bytes, 1024);
        assert!(config.command_handlers.is_empty());
        assert!(config.subneg_handlers.is_empty());
        assert!(!(config.unknown_option_handler)(99));
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let config = ConfigurationBuilder::new()
            .with_ayt_response("hi")
            .with_unknown_option_handler(Arc::new(|_| true))
            .with_default_max_subneg_bytes(64)
            .build();
        assert_eq!(config.ayt_response, "hi");
        assert_eq!(config.default_max_subneg_bytes, 64);
        assert!((config.unknown_option_handler)(7));
    }

    #[test]
    fn command_handler_registration() {
        let handler: CommandHandler = Arc::new(|| Box::pin(async {}));
        let config = ConfigurationBuilder::new().with_command_handler(1, handler).build();
        assert!(config.command_handlers.contains_key(&1));
    }

    #[test]
    fn subneg_handler_registration() {
        let handler: SubnegotiationHandler = Arc::new(|payload| Some(payload.to_vec()));
        let config = ConfigurationBuilder::new().with_subneg_handler(31, handler).build();
        assert!(config.subneg_handlers.contains_key(&31));
        assert_eq!((config.subneg_handlers[&31])(&[1, 2, 3]), Some(vec![1, 2, 3]));
    }
}
