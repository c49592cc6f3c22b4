//! `listharvest oldest` — show the stored oldest record.

use anyhow::Result;
use listharvest_core::{FileStore, RecordStore};
use std::path::Path;

use super::output::{print_json, Output};
use crate::config::resolve_data_dir;

pub fn run(data_dir: Option<&Path>, out: Output) -> Result<()> {
    let dir = resolve_data_dir(data_dir);
    let store = FileStore::open(&dir)?;
    let marker = store.read_oldest()?;

    if out.json {
        print_json(&serde_json::json!({
            "data_dir": dir,
            "oldest": marker,
        }));
        return Ok(());
    }
    match marker {
        Some(marker) => println!("{marker}"),
        None if !out.quiet => println!("No oldest record stored in {}", dir.display()),
        None => {}
    }
    Ok(())
}
