use std::io::{Read, Write};
use std::process::{Command, Stdio};

use color_eyre::eyre::{eyre, Result};

use minato::Config;

const KNOWN_SELECTORS: &[&str] = &["fzf", "peco"];

/// Let the user pick one item, either through an external selector command
/// (fzf/peco style: candidates on stdin, choice on stdout) or through a
/// numbered prompt.
pub fn select(config: &Config, items: Vec<String>) -> Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    match selector_command(config) {
        Some(command) => select_with_command(&command, &items),
        None => select_with_prompt(&items),
    }
}

fn selector_command(config: &Config) -> Option<String> {
    if let Some(command) = &config.selector_command {
        return Some(command.clone());
    }
    KNOWN_SELECTORS
        .iter()
        .copied()
        .find(|&command| which::which(command).is_ok())
        .map(String::from)
}

fn format_items(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}: {}", index + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn select_with_command(command: &str, items: &[String]) -> Result<Option<String>> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| eyre!("empty selector command"))?;
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(format_items(items).as_bytes())?;
    }

    let mut output = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_string(&mut output)?;
    }
    child.wait()?;

    let line = output.trim();
    if line.is_empty() {
        return Ok(None);
    }
    // Strip the "<index>: " prefix we fed in.
    let choice = line.splitn(2, ": ").last().unwrap_or(line);
    Ok(Some(choice.to_string()))
}

fn select_with_prompt(items: &[String]) -> Result<Option<String>> {
    let selection = dialoguer::Select::new()
        .with_prompt("select a cache")
        .items(items)
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|index| items[index].clone()))
}
