// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "ember-image")]
#[command(about = "Firmware image preparation tool for the ember bootloader")]
pub struct Cli {
    /// TOML file overriding the default STM32L476 flash layout
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show image size and checksum information
    Info {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Pad an image and append the checksum word the bootloader verifies
    Prepare {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file for the prepared application-region artifact
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate a prepared artifact (stack-pointer signature and checksum)
    Check {
        /// Prepared artifact file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let layout = commands::load_layout(cli.layout.as_deref())?;

    match cli.command {
        Commands::Info { file } => commands::info(&file, &layout),
        Commands::Prepare { file, output } => commands::prepare(&file, &output, &layout),
        Commands::Check { file } => commands::check(&file, &layout),
    }
}
