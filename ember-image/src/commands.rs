// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Subcommand implementations.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use ember_core::FlashLayout;

use crate::image;

/// Load the flash layout, from a TOML override file when given, otherwise
/// the built-in STM32L476 map.
pub fn load_layout(path: Option<&Path>) -> Result<FlashLayout> {
    let layout = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse layout file {}", path.display()))?
        }
        None => FlashLayout::default(),
    };

    ensure!(layout.validate(), "flash layout is inconsistent");
    Ok(layout)
}

/// Report image size, padding and checksum without writing anything.
pub fn info(file: &Path, layout: &FlashLayout) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let padded = image::padded_len(data.len());
    let region = layout.app_size as usize;

    println!("Image:              {}", file.display());
    println!("Size:               {} bytes ({padded} padded)", data.len());
    println!(
        "Application region: 0x{:08x}..0x{:08x} ({region} bytes)",
        layout.app_address,
        layout.app_end()
    );

    if padded > region {
        println!("Fit:                NO, exceeds region by {} bytes", padded - region);
    } else {
        println!("Fit:                yes, {} bytes to spare", region - padded);
    }

    match layout.crc_address {
        Some(addr) => {
            let artifact = image::prepare(&data, layout)?;
            let crc_offset = (addr - layout.app_address) as usize;
            let crc = u32::from_le_bytes(artifact[crc_offset..crc_offset + 4].try_into().unwrap());
            println!("Checksum:           0x{crc:08x} at 0x{addr:08x}");
        }
        None => println!("Checksum:           disabled by layout"),
    }

    Ok(())
}

/// Pad an image, append the checksum word and write the prepared artifact.
pub fn prepare(file: &Path, output: &Path, layout: &FlashLayout) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let artifact = image::prepare(&data, layout)?;

    fs::write(output, &artifact)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Prepared {} ({} bytes) -> {} ({} bytes)",
        file.display(),
        data.len(),
        output.display(),
        artifact.len()
    );
    Ok(())
}

/// Validate a prepared artifact the way the bootloader will.
pub fn check(file: &Path, layout: &FlashLayout) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    image::check(&data, layout)
        .with_context(|| format!("{} failed validation", file.display()))?;

    println!("{}: OK", file.display());
    Ok(())
}
