//! Incremental-content acquisition.
//!
//! Drives a dynamic list page until its item count stops growing (or the
//! step budget runs out) before anything is extracted from it.

pub mod driver;
pub mod section;

pub use driver::{acquire, DomGrower, GrowReport, PageGrower};
pub use section::{HeadingMatch, TargetSection};
