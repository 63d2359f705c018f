pub mod config;
pub mod focus;
pub mod prefs;
pub mod reset;
pub mod stats;
pub mod task;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

/// Write a completion script for `C` to stdout.
pub fn completions<C: CommandFactory>(shell: Shell) {
    let mut cmd = C::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
