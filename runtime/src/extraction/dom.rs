//! DOM-walk source: read entries element by element.

use async_trait::async_trait;
use listharvest_core::{HarvestError, HarvestResult, RawEntry};
use serde::{Deserialize, Serialize};

use super::EntrySource;
use crate::acquisition::TargetSection;
use crate::renderer::{ElementHandle, RenderContext};

/// Selectors for the fields of one entry, relative to the entry element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomWalkSource {
    /// The section and its entry selector (`items`).
    pub section: TargetSection,
    pub title: String,
    pub tags: Option<String>,
    pub alt_title: Option<String>,
}

impl DomWalkSource {
    async fn first_text(
        ctx: &dyn RenderContext,
        entry: ElementHandle,
        selector: &str,
    ) -> HarvestResult<Option<String>> {
        match ctx.query_within(entry, selector).await?.first() {
            Some(&el) => Ok(Some(ctx.get_text(el).await?)),
            None => Ok(None),
        }
    }

    async fn read_entry(
        &self,
        ctx: &dyn RenderContext,
        entry: ElementHandle,
    ) -> HarvestResult<RawEntry> {
        let title = Self::first_text(ctx, entry, &self.title).await?;
        let alt_title = match &self.alt_title {
            Some(selector) => Self::first_text(ctx, entry, selector).await?,
            None => None,
        };
        let mut tags = Vec::new();
        if let Some(selector) = &self.tags {
            for el in ctx.query_within(entry, selector).await? {
                tags.push(ctx.get_text(el).await?);
            }
        }
        Ok(RawEntry {
            title,
            alt_title,
            tags,
            start_date: None,
            end_date: None,
        })
    }
}

#[async_trait]
impl EntrySource for DomWalkSource {
    fn name(&self) -> &'static str {
        "dom-walk"
    }

    async fn read_entries(&self, ctx: &dyn RenderContext) -> HarvestResult<Vec<RawEntry>> {
        let section = self
            .section
            .locate(ctx)
            .await?
            .ok_or_else(|| HarvestError::section_not_found(self.section.describe()))?;

        let entries = ctx.query_within(section, &self.section.items).await?;
        let mut raw = Vec::with_capacity(entries.len());
        for entry in entries {
            raw.push(self.read_entry(ctx, entry).await?);
        }
        Ok(raw)
    }
}
