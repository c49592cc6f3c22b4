//! Extraction of raw entries from a stabilized page.
//!
//! Two source adapters produce `RawEntry` lists behind the same
//! [`EntrySource`] trait: a DOM walk over the located section, and a decoder
//! for a serialized payload embedded in an element attribute. Both feed the
//! same normalization in `listharvest_core`.

pub mod dom;
pub mod payload;

use async_trait::async_trait;
use listharvest_core::{ExtractionResult, HarvestResult, RawEntry};

use crate::renderer::RenderContext;

pub use dom::DomWalkSource;
pub use payload::EmbeddedPayloadSource;

/// A way of reading raw entries off a page.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;
    /// Read every entry. Entry-level problems are left to normalization.
    async fn read_entries(&self, ctx: &dyn RenderContext) -> HarvestResult<Vec<RawEntry>>;
}

/// Read and normalize all entries. Any source error aborts with no records.
pub async fn extract(
    ctx: &dyn RenderContext,
    source: &dyn EntrySource,
) -> HarvestResult<ExtractionResult> {
    let raw = source.read_entries(ctx).await?;
    let read = raw.len();
    let result = ExtractionResult::from_raw(raw);
    tracing::info!(
        source = source.name(),
        read,
        records = result.count,
        dropped = result.dropped,
        "extraction finished"
    );
    Ok(result)
}
