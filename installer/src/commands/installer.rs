use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::app::App;

/// Lists or extracts the embedded installer tarball.
pub fn run(app: &App, list: bool, extract: Option<&Path>) -> Result<()> {
    if list {
        for path in app.fs.embedded().paths()? {
            println!("{path}");
        }
        return Ok(());
    }
    if let Some(dir) = extract {
        app.fs.extract_embedded(dir)?;
        info!(dir = %dir.display(), "embedded tarball extracted");
        return Ok(());
    }
    bail!("pass one of --list or --extract DIR");
}
