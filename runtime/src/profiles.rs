//! Site presets: where a user's list lives and how to read it.

use clap::ValueEnum;
use listharvest_core::{HarvestError, HarvestResult, PayloadFields};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::acquisition::{HeadingMatch, TargetSection};
use crate::extraction::{DomWalkSource, EmbeddedPayloadSource, EntrySource};

/// Which partition of the list to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ListStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    Planning,
    All,
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::OnHold => "on-hold",
            Self::Dropped => "dropped",
            Self::Planning => "planning",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

/// Supported list sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Site {
    /// AniList, read entry by entry from the rendered sections.
    Anilist,
    /// MyAnimeList, read from the JSON embedded in the list table.
    Myanimelist,
    /// MyAnimeList, read from the rendered table rows.
    MyanimelistDom,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Anilist => "anilist",
            Self::Myanimelist => "myanimelist",
            Self::MyanimelistDom => "myanimelist-dom",
        };
        f.write_str(s)
    }
}

/// How entries are read once the page is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    DomWalk(DomWalkSource),
    Payload(EmbeddedPayloadSource),
}

impl SourceKind {
    pub fn as_source(&self) -> &dyn EntrySource {
        match self {
            Self::DomWalk(s) => s,
            Self::Payload(s) => s,
        }
    }
}

/// Everything needed to harvest one list view of one site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: Site,
    pub status: ListStatus,
    pub target: TargetSection,
    pub load_more: Option<String>,
    /// Consent banner button to dismiss after navigation.
    pub consent: Option<String>,
    pub source: SourceKind,
}

fn anilist_label(status: ListStatus) -> HarvestResult<&'static str> {
    Ok(match status {
        ListStatus::Watching => "Watching",
        ListStatus::Completed => "Completed",
        ListStatus::OnHold => "Paused",
        ListStatus::Dropped => "Dropped",
        ListStatus::Planning => "Planning",
        ListStatus::All => {
            return Err(HarvestError::InvalidInput(
                "anilist has no combined list view; pick a single status".into(),
            ))
        }
    })
}

/// MyAnimeList `status` query value and list-unit class.
fn mal_status(status: ListStatus) -> (u8, &'static str) {
    match status {
        ListStatus::Watching => (1, "watching"),
        ListStatus::Completed => (2, "completed"),
        ListStatus::OnHold => (3, "onhold"),
        ListStatus::Dropped => (4, "dropped"),
        ListStatus::Planning => (6, "plantowatch"),
        ListStatus::All => (7, "all_anime"),
    }
}

impl Site {
    /// Build the profile for one list view.
    pub fn profile(self, status: ListStatus) -> HarvestResult<SiteProfile> {
        match self {
            Site::Anilist => {
                let label = anilist_label(status)?;
                let target = TargetSection {
                    container: "div.list-wrap".into(),
                    heading: Some(HeadingMatch {
                        selector: "h3.section-name".into(),
                        label: label.into(),
                    }),
                    items: "div.list-entries div.entry.row".into(),
                };
                Ok(SiteProfile {
                    site: self,
                    status,
                    load_more: Some("button.load-more".into()),
                    consent: Some(r#"button[aria-label="Accept cookies"]"#.into()),
                    source: SourceKind::DomWalk(DomWalkSource {
                        section: target.clone(),
                        title: "div.title a".into(),
                        tags: None,
                        alt_title: None,
                    }),
                    target,
                })
            }
            Site::Myanimelist | Site::MyanimelistDom => {
                let (_, class) = mal_status(status);
                let table = format!("div.list-block div.list-unit.{class} table[data-items]");
                let target = TargetSection {
                    container: table.clone(),
                    heading: None,
                    items: "tbody.list-item".into(),
                };
                let source = if self == Site::Myanimelist {
                    SourceKind::Payload(EmbeddedPayloadSource {
                        element: table,
                        attribute: "data-items".into(),
                        fields: PayloadFields::default(),
                    })
                } else {
                    SourceKind::DomWalk(DomWalkSource {
                        section: target.clone(),
                        title: "td.data.title.clearfix a.link.sort".into(),
                        tags: Some("td.data.genre span a".into()),
                        alt_title: None,
                    })
                };
                Ok(SiteProfile {
                    site: self,
                    status,
                    target,
                    load_more: None,
                    consent: None,
                    source,
                })
            }
        }
    }
}

impl SiteProfile {
    /// The list page URL for `username`, percent-encoded.
    pub fn list_url(&self, username: &str) -> HarvestResult<Url> {
        let username = username.trim();
        if username.is_empty() {
            return Err(HarvestError::InvalidInput("username is empty".into()));
        }
        let base = match self.site {
            Site::Anilist => "https://anilist.co/",
            Site::Myanimelist | Site::MyanimelistDom => "https://myanimelist.net/",
        };
        let mut url = Url::parse(base).map_err(|e| HarvestError::Engine(e.into()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| HarvestError::InvalidInput(format!("{base} cannot have a path")))?;
            match self.site {
                Site::Anilist => {
                    segments.pop_if_empty().extend([
                        "user",
                        username,
                        "animelist",
                        anilist_label(self.status)?,
                    ]);
                }
                Site::Myanimelist | Site::MyanimelistDom => {
                    segments.pop_if_empty().extend(["animelist", username]);
                }
            }
        }
        if self.site != Site::Anilist {
            let (code, _) = mal_status(self.status);
            url.query_pairs_mut().append_pair("status", &code.to_string());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anilist_urls() {
        let p = Site::Anilist.profile(ListStatus::Completed).unwrap();
        assert_eq!(
            p.list_url("someone").unwrap().as_str(),
            "https://anilist.co/user/someone/animelist/Completed"
        );
        let p = Site::Anilist.profile(ListStatus::OnHold).unwrap();
        assert_eq!(
            p.list_url("a b/c").unwrap().as_str(),
            "https://anilist.co/user/a%20b%2Fc/animelist/Paused"
        );
        assert!(Site::Anilist.profile(ListStatus::All).is_err());
    }

    #[test]
    fn myanimelist_urls_and_selectors() {
        let p = Site::Myanimelist.profile(ListStatus::Completed).unwrap();
        assert_eq!(
            p.list_url(" someone ").unwrap().as_str(),
            "https://myanimelist.net/animelist/someone?status=2"
        );
        assert_eq!(
            p.target.container,
            "div.list-block div.list-unit.completed table[data-items]"
        );
        assert!(matches!(p.source, SourceKind::Payload(_)));

        let p = Site::MyanimelistDom.profile(ListStatus::All).unwrap();
        assert!(p.list_url("x").unwrap().as_str().ends_with("?status=7"));
        assert!(p.target.container.contains("list-unit.all_anime"));
        assert_eq!(p.source.as_source().name(), "dom-walk");
    }

    #[test]
    fn empty_username_rejected() {
        let p = Site::Myanimelist.profile(ListStatus::Completed).unwrap();
        assert!(matches!(
            p.list_url("  "),
            Err(HarvestError::InvalidInput(_))
        ));
    }
}
