//! Embedded-payload source: one attribute holding the whole list as JSON.

use async_trait::async_trait;
use listharvest_core::{decode_payload, HarvestError, HarvestResult, PayloadFields, RawEntry};
use serde::{Deserialize, Serialize};

use super::EntrySource;
use crate::renderer::RenderContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPayloadSource {
    /// Element carrying the payload; the first match is used.
    pub element: String,
    pub attribute: String,
    pub fields: PayloadFields,
}

#[async_trait]
impl EntrySource for EmbeddedPayloadSource {
    fn name(&self) -> &'static str {
        "embedded-payload"
    }

    async fn read_entries(&self, ctx: &dyn RenderContext) -> HarvestResult<Vec<RawEntry>> {
        let Some(&element) = ctx.query_all(&self.element).await?.first() else {
            return Err(HarvestError::payload(format!(
                "no element matched `{}`",
                self.element
            )));
        };
        let text = ctx
            .get_attribute(element, &self.attribute)
            .await?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                HarvestError::payload(format!("attribute `{}` is missing or empty", self.attribute))
            })?;
        tracing::debug!(bytes = text.len(), "decoding embedded payload");
        decode_payload(&text, &self.fields)
    }
}
