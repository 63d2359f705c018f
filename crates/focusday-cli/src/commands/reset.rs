use clap::Subcommand;

use crate::common::{open_app, CmdResult};

#[derive(Subcommand)]
pub enum ResetAction {
    /// Clear today's MIT and close any open session; tasks are kept
    Daily,
    /// Delete every task and session and restore default preferences
    All {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: ResetAction) -> CmdResult {
    match action {
        ResetAction::Daily => {
            let mut app = open_app()?;
            app.reset_daily_data();
            println!("daily data reset");
        }
        ResetAction::All { yes } => {
            if !yes {
                return Err("refusing to wipe all data without --yes".into());
            }
            let mut app = open_app()?;
            app.reset_all_data();
            println!("all data wiped");
        }
    }
    Ok(())
}
