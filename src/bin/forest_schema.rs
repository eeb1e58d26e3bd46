#![cfg(feature = "json_schema")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filterkit::core::models::Forest;
use jsonschema::{Draft, JSONSchema};
use schemars::schema_for;
use std::{fs, path::PathBuf};

/// Generate the JSON Schema for a saved filter or validate a filter file against it.
#[derive(Parser, Debug)]
#[command(name = "forest-schema", about = "Filter forest schema generator and validator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the forest JSON schema (or write it to a file)
    Schema {
        /// Optional output path for the schema JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a saved filter JSON file against the schema
    Validate {
        /// Path to the JSON file to validate
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Schema { output } => {
            let schema = schema_for!(Forest);
            let json = serde_json::to_string_pretty(&schema)?;

            if let Some(path) = output {
                fs::write(&path, json)?;
                eprintln!("Wrote schema to {}", path.display());
            } else {
                println!("{json}");
            }
        }
        Command::Validate { file } => {
            let schema_json = serde_json::to_value(schema_for!(Forest))?;
            // the compiled schema borrows its source for 'static
            let schema_ref: &'static serde_json::Value = Box::leak(Box::new(schema_json));
            let compiled = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(schema_ref)
                .context("failed to compile forest schema")?;

            let text = fs::read_to_string(&file).context("failed to read filter file")?;
            let raw: serde_json::Value =
                serde_json::from_str(&text).context("filter file is not JSON")?;

            if let Err(errors) = compiled.validate(&raw) {
                eprintln!("Validation errors for {}:", file.display());
                for err in errors {
                    eprintln!("- {} at {}", err, err.instance_path);
                }
                std::process::exit(1);
            }

            // schema-valid is not enough: ids must also be unique across the tree
            let forest: Forest =
                serde_json::from_value(raw).context("failed to deserialize filter")?;
            let mut ids: Vec<_> = forest
                .pre_order()
                .into_iter()
                .flat_map(|(_, g)| std::iter::once(g.id).chain(g.conditions.iter().map(|c| c.id)))
                .collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            if ids.len() != total {
                eprintln!("{} contains duplicate node ids", file.display());
                std::process::exit(1);
            }
            println!(
                "{} is a valid filter ({} groups, {} conditions)",
                file.display(),
                forest.group_count(),
                forest.condition_count()
            );
        }
    }

    Ok(())
}
