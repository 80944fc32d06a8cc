use super::{build_queue, load_config, SelectionArgs};
use crate::output::{print_json, print_targets};
use std::path::Path;

pub fn run(config_path: Option<&Path>, selection: &SelectionArgs, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    selection.apply(&mut config);
    config.validate()?;

    let queue = build_queue(&config, selection.at)?;
    if json {
        return print_json(&queue);
    }
    print_targets(&queue);
    Ok(())
}
