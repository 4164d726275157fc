pub mod config;
pub mod project;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use focusloop_core::{Database, Store};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the SQLite store in the data directory.
pub fn open_store() -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    Ok(Arc::new(Database::open()?))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
