//! Correlation id stage.
//!
//! Reads the correlation id from a designated request header. When the header
//! is absent, untrusted, or not a usable identifier, the id generated when the
//! context was created is kept (UUID v7). The pipeline echoes the id on every
//! response.

use crate::context::MiddlewareContext;
use crate::stage::{Stage, StageKind};
use daedalus_core::{ApiError, CorrelationId};
use http::header::HeaderName;

/// Default correlation header.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Stage that adopts an inbound correlation id.
#[derive(Debug, Clone)]
pub struct CorrelationStage {
    header: HeaderName,
    trust_incoming: bool,
}

impl Default for CorrelationStage {
    fn default() -> Self {
        Self::new(HeaderName::from_static(CORRELATION_ID_HEADER))
    }
}

impl CorrelationStage {
    /// Creates a stage reading `header`, trusting inbound ids.
    #[must_use]
    pub fn new(header: HeaderName) -> Self {
        Self {
            header,
            trust_incoming: true,
        }
    }

    /// Sets whether inbound ids are adopted.
    #[must_use]
    pub fn trust_incoming(mut self, trust: bool) -> Self {
        self.trust_incoming = trust;
        self
    }

    /// The header this stage reads.
    #[must_use]
    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl Stage for CorrelationStage {
    fn kind(&self) -> StageKind {
        StageKind::Correlation
    }

    fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), ApiError> {
        if !self.trust_incoming {
            return Ok(());
        }
        let inbound = ctx
            .header(&self.header)
            .and_then(CorrelationId::from_inbound);
        if let Some(id) = inbound {
            ctx.set_correlation_id(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn ctx_with_header(value: Option<&str>) -> MiddlewareContext {
        let mut builder = http::Request::builder().uri("/x");
        if let Some(value) = value {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        MiddlewareContext::from_request(builder.body(Bytes::new()).unwrap())
    }

    #[test]
    fn test_adopts_inbound_id() {
        let mut ctx = ctx_with_header(Some("trace-abc-123"));
        CorrelationStage::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.correlation_id().as_str(), "trace-abc-123");
    }

    #[test]
    fn test_keeps_generated_id_when_missing() {
        let mut ctx = ctx_with_header(None);
        let generated = ctx.correlation_id().clone();
        CorrelationStage::default().apply(&mut ctx).unwrap();
        assert_eq!(ctx.correlation_id(), &generated);
        assert!(uuid_like(generated.as_str()));
    }

    #[test]
    fn test_ignores_inbound_when_untrusted() {
        let mut ctx = ctx_with_header(Some("trace-abc-123"));
        CorrelationStage::default()
            .trust_incoming(false)
            .apply(&mut ctx)
            .unwrap();
        assert_ne!(ctx.correlation_id().as_str(), "trace-abc-123");
    }

    #[test]
    fn test_rejects_unusable_inbound_id() {
        let long = "a".repeat(500);
        let mut ctx = ctx_with_header(Some(&long));
        CorrelationStage::default().apply(&mut ctx).unwrap();
        assert_ne!(ctx.correlation_id().as_str(), long);
    }

    #[test]
    fn test_custom_header() {
        let stage = CorrelationStage::new(HeaderName::from_static("x-request-id"));
        let request = http::Request::builder()
            .header("x-request-id", "req-1")
            .body(Bytes::new())
            .unwrap();
        let mut ctx = MiddlewareContext::from_request(request);
        stage.apply(&mut ctx).unwrap();
        assert_eq!(ctx.correlation_id().as_str(), "req-1");
        assert_eq!(stage.name(), "correlation");
    }

    fn uuid_like(s: &str) -> bool {
        s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
    }
}
