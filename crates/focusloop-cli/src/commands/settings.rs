use clap::Subcommand;
use focusloop_core::{SettingsPatch, SettingsStore};

use super::{open_store, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings as JSON
    Show,
    /// Change one or more settings
    Set {
        /// Work interval length in minutes
        #[arg(long)]
        pomodoro: Option<u32>,
        /// Short break length in minutes
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Start a break automatically after a work interval
        #[arg(long)]
        auto_start_breaks: Option<bool>,
        /// Start work automatically after a break
        #[arg(long)]
        auto_start_pomodoros: Option<bool>,
        /// Every Nth work interval is followed by a long break (0 disables)
        #[arg(long)]
        long_break_interval: Option<u32>,
    },
}

pub fn run(action: SettingsAction) -> CmdResult {
    let settings = SettingsStore::new(open_store()?);

    match action {
        SettingsAction::Show => print_json(&settings.get()?),
        SettingsAction::Set {
            pomodoro,
            short_break,
            long_break,
            auto_start_breaks,
            auto_start_pomodoros,
            long_break_interval,
        } => {
            let patch = SettingsPatch {
                pomodoro_length: pomodoro,
                short_break_length: short_break,
                long_break_length: long_break,
                auto_start_breaks,
                auto_start_pomodoros,
                long_break_interval,
            };
            print_json(&settings.update(&patch)?)
        }
    }
}
