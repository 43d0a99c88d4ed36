//! Config command

use anyhow::Result;
use camino::Utf8Path;

use crate::cli::{ConfigCommands, ConfigShowArgs};

pub fn run(cmd: ConfigCommands, config: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config),
    }
}

fn show(args: ConfigShowArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config)?.redacted();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", serde_yaml_ng::to_string(&config)?);
    }

    Ok(())
}
