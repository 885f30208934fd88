//! Logging seam
//!
//! The client logs at exactly four points: before dispatch, before writing a
//! body, on completion, and on transport error. The capability is a trait so
//! hosts can route those lines wherever they like; the default forwards to
//! `tracing`.

/// Observational logging capability consumed by [`crate::RequestClient`]
pub trait Logger: Send + Sync {
    /// Debug line, tagged with the emitting component
    fn debug(&self, tag: &str, message: &str);

    /// Error line
    fn error(&self, message: &str);
}

/// Default [`Logger`] backed by the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, tag: &str, message: &str) {
        tracing::debug!(tag, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}
