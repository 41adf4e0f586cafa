// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware image preparation tool for the ember bootloader.
//!
//! Usage:
//!   ember-image info firmware.bin
//!   ember-image prepare firmware.bin -o firmware-signed.bin
//!   ember-image check firmware-signed.bin
//!
//! `prepare` pads the image to the flash programming word size, fills the
//! rest of the application region with the erased pattern and appends the
//! checksum word the bootloader verifies before booting.

mod cli;
mod commands;
mod image;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
