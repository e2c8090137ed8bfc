//! Node selection CLI.
//!
//! Reads a node inventory (`nodes.json`) and a selection configuration
//! (`nodeset.toml`), then prints the names of the selected nodes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nodeset::exit_codes;
use nodeset::filter::filter_from_files;
use nodeset::io::config::{SelectionOverrides, load_node_set};
use nodeset::logging;

#[derive(Parser)]
#[command(
    name = "nodeset",
    version,
    about = "Select nodes from an inventory with include/exclude filters"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the names of the selected nodes, one per line.
    Filter {
        /// Inventory file: JSON array of nodes.
        #[arg(long)]
        inventory: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
        /// Print selected and excluded node names as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate the selection configuration and print the resulting filters.
    Check {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Selection configuration (TOML). A missing file configures no filters.
    #[arg(long, default_value = "nodeset.toml")]
    config: PathBuf,
    /// Include filter, e.g. `tags=web+prod`. Repeatable.
    #[arg(long = "include", value_name = "KEY=VALUE", value_parser = parse_filter)]
    include: Vec<(String, String)>,
    /// Exclude filter, e.g. `os-family=windows`. Repeatable.
    #[arg(long = "exclude", value_name = "KEY=VALUE", value_parser = parse_filter)]
    exclude: Vec<(String, String)>,
    /// Keep nodes matched by the include filter even if the exclude filter matches.
    #[arg(long)]
    dominant: bool,
    /// Select only this node, ignoring include/exclude filters.
    #[arg(long)]
    node: Option<String>,
}

impl SelectionArgs {
    fn overrides(&self) -> SelectionOverrides {
        SelectionOverrides {
            node: self.node.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            dominant: self.dominant,
        }
    }
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing filter key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Filter {
            inventory,
            selection,
            json,
        } => cmd_filter(&inventory, &selection, json),
        Command::Check { selection } => cmd_check(&selection),
    }
}

fn cmd_filter(inventory: &Path, selection: &SelectionArgs, json: bool) -> Result<i32> {
    let report = filter_from_files(&selection.config, inventory, &selection.overrides())?;
    if json {
        let payload = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{}", payload);
    } else {
        for name in &report.selected {
            println!("{}", name);
        }
    }
    if report.selected.is_empty() {
        return Ok(exit_codes::EMPTY);
    }
    Ok(exit_codes::OK)
}

fn cmd_check(selection: &SelectionArgs) -> Result<i32> {
    let set = load_node_set(&selection.config, &selection.overrides())
        .with_context(|| format!("load selection {}", selection.config.display()))?;
    println!("{}", set);
    Ok(exit_codes::OK)
}
