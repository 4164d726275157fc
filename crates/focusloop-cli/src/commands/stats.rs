use focusloop_core::StatsAggregator;

use super::{open_store, print_json, CmdResult};

pub fn run() -> CmdResult {
    let stats = StatsAggregator::new(open_store()?).refresh()?;
    print_json(&stats)
}
