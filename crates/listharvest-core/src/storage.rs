//! Storage port for harvested records, plus file and in-memory adapters.
//!
//! The core never decides where data lives. Callers hand a [`RecordStore`]
//! to [`persist`], and only the adapter flattens records into lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::oldest::{merge_oldest, oldest_in, OldestMarker};
use crate::types::{ExtractionResult, HarvestResult};

/// Titles, one per line, appended each run.
pub const TITLES_FILE: &str = "titles.txt";
/// Tags, one per line, appended each run.
pub const TAGS_FILE: &str = "tags.txt";
/// A single `<title> <date>` line, overwritten when a new oldest is found.
pub const OLDEST_FILE: &str = "oldest.txt";

/// Where harvested records end up.
pub trait RecordStore {
    /// Append every record of a result.
    fn append_records(&mut self, result: &ExtractionResult) -> HarvestResult<()>;
    /// The stored oldest marker, if any.
    fn read_oldest(&self) -> HarvestResult<Option<OldestMarker>>;
    /// Replace the stored oldest marker.
    fn write_oldest(&mut self, marker: &OldestMarker) -> HarvestResult<()>;
}

/// What [`persist`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub appended: usize,
    pub oldest: Option<OldestMarker>,
    pub oldest_updated: bool,
}

/// Append a result and fold its oldest record into the stored marker.
pub fn persist<S: RecordStore + ?Sized>(
    store: &mut S,
    result: &ExtractionResult,
) -> HarvestResult<PersistSummary> {
    store.append_records(result)?;

    let stored = store.read_oldest()?;
    let merged = merge_oldest(stored.clone(), oldest_in(result));
    let oldest_updated = merged.is_some() && merged != stored;
    if oldest_updated {
        if let Some(marker) = &merged {
            tracing::info!(%marker, "new oldest record");
            store.write_oldest(marker)?;
        }
    }

    Ok(PersistSummary {
        appended: result.count,
        oldest: merged,
        oldest_updated,
    })
}

/// Plain-text files in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> HarvestResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(&self, name: &str) -> HarvestResult<BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        Ok(BufWriter::new(file))
    }
}

impl RecordStore for FileStore {
    fn append_records(&mut self, result: &ExtractionResult) -> HarvestResult<()> {
        let mut titles = self.append(TITLES_FILE)?;
        let mut tags = self.append(TAGS_FILE)?;
        for record in &result.records {
            writeln!(titles, "{}", record.title)?;
            for tag in &record.tags {
                writeln!(tags, "{tag}")?;
            }
        }
        titles.flush()?;
        tags.flush()?;
        Ok(())
    }

    fn read_oldest(&self) -> HarvestResult<Option<OldestMarker>> {
        let path = self.dir.join(OLDEST_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        match text.parse() {
            Ok(marker) => Ok(Some(marker)),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable oldest marker: {e}");
                Ok(None)
            }
        }
    }

    fn write_oldest(&mut self, marker: &OldestMarker) -> HarvestResult<()> {
        std::fs::write(self.dir.join(OLDEST_FILE), marker.to_string())?;
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub titles: Vec<String>,
    pub tags: Vec<String>,
    pub oldest: Option<OldestMarker>,
}

impl RecordStore for MemoryStore {
    fn append_records(&mut self, result: &ExtractionResult) -> HarvestResult<()> {
        for record in &result.records {
            self.titles.push(record.title.clone());
            self.tags.extend(record.tags.iter().cloned());
        }
        Ok(())
    }

    fn read_oldest(&self) -> HarvestResult<Option<OldestMarker>> {
        Ok(self.oldest.clone())
    }

    fn write_oldest(&mut self, marker: &OldestMarker) -> HarvestResult<()> {
        self.oldest = Some(marker.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawEntry;
    use chrono::NaiveDate;

    fn result() -> ExtractionResult {
        ExtractionResult::from_raw(vec![
            RawEntry {
                tags: vec!["Action".into(), "Sci-Fi".into()],
                start_date: Some("04-03-98".into()),
                ..RawEntry::titled("Cowboy Bebop")
            },
            RawEntry {
                tags: vec!["Drama".into()],
                ..RawEntry::titled("Monster")
            },
        ])
    }

    #[test]
    fn memory_store_persist() {
        let mut store = MemoryStore::default();
        let summary = persist(&mut store, &result()).unwrap();
        assert_eq!(summary.appended, 2);
        assert!(summary.oldest_updated);
        assert_eq!(store.titles, ["Cowboy Bebop", "Monster"]);
        assert_eq!(store.tags, ["Action", "Sci-Fi", "Drama"]);
        assert_eq!(
            store.oldest,
            Some(OldestMarker::new(
                "Cowboy Bebop",
                NaiveDate::from_ymd_opt(1998, 4, 3).unwrap()
            ))
        );

        // Same data again: appended, but the marker is a tie and stays.
        let summary = persist(&mut store, &result()).unwrap();
        assert!(!summary.oldest_updated);
        assert_eq!(store.titles.len(), 4);
    }

    #[test]
    fn file_store_missing_oldest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        assert_eq!(store.read_oldest().unwrap(), None);
    }
}
