//! Describe and locate the list section being harvested.

use crate::renderer::{ElementHandle, RenderContext};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A heading whose trimmed text identifies the right section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingMatch {
    /// Heading selector, relative to a candidate section.
    pub selector: String,
    /// Expected heading text, compared after trimming.
    pub label: String,
}

impl HeadingMatch {
    pub fn matches(&self, text: &str) -> bool {
        text.trim() == self.label.trim()
    }
}

/// Where the items live on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSection {
    /// Candidate section containers. Also the root the driver waits for.
    pub container: String,
    /// Picks one container by heading; the first container wins when `None`.
    pub heading: Option<HeadingMatch>,
    /// Item selector, relative to the located section.
    pub items: String,
}

impl TargetSection {
    /// Find the section among all candidates, or `None` if it has not rendered.
    pub async fn locate(&self, ctx: &dyn RenderContext) -> Result<Option<ElementHandle>> {
        let candidates = ctx.query_all(&self.container).await?;
        let Some(heading) = &self.heading else {
            return Ok(candidates.first().copied());
        };
        for candidate in candidates {
            let found = ctx.query_within(candidate, &heading.selector).await?;
            let Some(&first) = found.first() else {
                continue;
            };
            if heading.matches(&ctx.get_text(first).await?) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// A human-readable description for logs and errors.
    pub fn describe(&self) -> String {
        match &self.heading {
            Some(h) => format!("{} with {} \"{}\"", self.container, h.selector, h.label),
            None => self.container.clone(),
        }
    }
}
