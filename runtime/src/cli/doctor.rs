//! Environment readiness check.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::output::{print_json, Output};
use crate::config::resolve_data_dir;
use crate::renderer::chromium::find_chromium;

#[derive(Debug, Serialize)]
struct DoctorReport {
    os: &'static str,
    arch: &'static str,
    chromium: Option<PathBuf>,
    data_dir: PathBuf,
    data_dir_writable: bool,
    ready: bool,
}

/// Check Chromium availability and the data directory.
pub fn run(data_dir: Option<&Path>, out: Output) -> Result<()> {
    let chromium = find_chromium();
    let data_dir = resolve_data_dir(data_dir);
    let data_dir_writable = check_writable(&data_dir);
    let report = DoctorReport {
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        ready: chromium.is_some() && data_dir_writable,
        chromium,
        data_dir,
        data_dir_writable,
    };

    if out.json {
        print_json(&report);
        return Ok(());
    }

    println!("Listharvest Doctor");
    println!("==================");
    println!();
    println!("OS:   {}", report.os);
    println!("Arch: {}", report.arch);
    println!();

    match &report.chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set LISTHARVEST_CHROMIUM_PATH; \
             saved pages still work with --from-html."
        ),
    }
    if report.data_dir_writable {
        println!("[OK] Data directory {} is writable", report.data_dir.display());
    } else {
        println!("[!!] Data directory {} is not writable", report.data_dir.display());
    }

    println!();
    if report.ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}

fn check_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".doctor-probe");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}
