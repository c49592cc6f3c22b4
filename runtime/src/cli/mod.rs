//! CLI subcommand implementations for the `listharvest` binary.

pub mod doctor;
pub mod harvest_cmd;
pub mod oldest_cmd;
pub mod output;
pub mod spinner;
