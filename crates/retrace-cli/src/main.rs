use std::io;

use anyhow::Result;
use retrace_cli::{build_command, run, CliOptions};
use retrace_core::init_tracing;

fn main() -> Result<()> {
    // Parse command line arguments
    let matches = build_command().get_matches();
    let options = CliOptions::from_matches(&matches)?;

    // Initialize logging
    init_tracing(options.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&options, &mut out)?;

    Ok(())
}
