pub mod completions;
pub mod config;
pub mod encrypt;

use std::io::Write;
use std::path::Path;

use crate::errors::Result;

/// Write `content` to `output`, or to stdout when no path is given.
pub(crate) fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(Path::new(path), content)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
        }
    }
    Ok(())
}
