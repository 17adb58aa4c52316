use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();
    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    let port = config
        .http_port()
        .map_or_else(|| "off".to_string(), |p| p.to_string());
    let password = if config.password().is_some() { "set" } else { "none" };
    let transitions = config
        .transitions_dir()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());

    println!("{}", "defaults".green().bold());
    println!("  windowed:        {}", config.windowed());
    println!("  transitions_dir: {transitions}");
    println!("{}", "remote".green().bold());
    println!("  http_port:       {port}");
    println!("  password:        {password}");
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!("{} {key} = {value}", "Saved".green());
    println!("{}", format!("  in {}", path.display()).dimmed());
    Ok(())
}
