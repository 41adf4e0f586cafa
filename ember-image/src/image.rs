// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image padding, checksum computation and artifact assembly.
//!
//! A prepared artifact covers the application region from its base through
//! the checksum word: the padded image, erased-pattern fill, then the
//! 32-bit CRC computed exactly as the device's CRC engine computes it.

use anyhow::{bail, Result};
use crc::{Crc, CRC_32_MPEG_2};
use ember_core::{FlashLayout, STACK_POINTER_MASK, STACK_POINTER_PATTERN};

/// Flash programming word size; images are padded to this boundary.
pub const WORD_ALIGN: usize = ember_core::PROGRAM_WORD_SIZE as usize;

const HW_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC-32 as the device's CRC engine computes it over 32-bit words:
/// default polynomial 0x04C11DB7, init 0xFFFFFFFF, no inversion, each
/// little-endian memory word fed most-significant byte first.
pub fn hardware_crc(data: &[u8]) -> u32 {
    debug_assert!(data.len() % 4 == 0);
    let mut digest = HW_CRC.digest();
    for word in data.chunks_exact(4) {
        let w = u32::from_le_bytes(word.try_into().unwrap());
        digest.update(&w.to_be_bytes());
    }
    digest.finalize()
}

pub fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD_ALIGN) * WORD_ALIGN
}

/// Pad an image with the erased pattern to the programming word boundary.
pub fn pad(image: &[u8]) -> Vec<u8> {
    let mut padded = image.to_vec();
    padded.resize(padded_len(image.len()), 0xFF);
    padded
}

fn checksum_offset(layout: &FlashLayout) -> Result<usize> {
    let Some(crc_address) = layout.crc_address else {
        bail!("flash layout stores no checksum word");
    };
    if crc_address < layout.app_end() {
        bail!(
            "checksum word at 0x{:08x} lies inside the checksummed region 0x{:08x}..0x{:08x}",
            crc_address,
            layout.app_address,
            layout.app_end()
        );
    }
    Ok((crc_address - layout.app_address) as usize)
}

/// Assemble the application-region artifact for a raw firmware image.
pub fn prepare(image: &[u8], layout: &FlashLayout) -> Result<Vec<u8>> {
    let crc_offset = checksum_offset(layout)?;
    let padded = pad(image);
    let region_len = layout.app_size as usize;

    if padded.len() > region_len {
        bail!(
            "image is too large: {} bytes padded, application region holds {} bytes",
            padded.len(),
            region_len
        );
    }

    let mut artifact = vec![0xFF; crc_offset + 4];
    artifact[..padded.len()].copy_from_slice(&padded);

    let crc = hardware_crc(&artifact[..region_len]);
    artifact[crc_offset..crc_offset + 4].copy_from_slice(&crc.to_le_bytes());

    Ok(artifact)
}

/// Validate a prepared artifact: exact length, a plausible initial stack
/// pointer in the first word, and a matching trailing checksum.
pub fn check(artifact: &[u8], layout: &FlashLayout) -> Result<()> {
    let crc_offset = checksum_offset(layout)?;
    let expected_len = crc_offset + 4;

    if artifact.len() != expected_len {
        bail!(
            "unexpected artifact size: {} bytes, expected {}",
            artifact.len(),
            expected_len
        );
    }

    let first_word = u32::from_le_bytes(artifact[..4].try_into().unwrap());
    if first_word & STACK_POINTER_MASK != STACK_POINTER_PATTERN {
        bail!("first word 0x{first_word:08x} is not a plausible initial stack pointer");
    }

    let region_len = layout.app_size as usize;
    let stored = u32::from_le_bytes(artifact[crc_offset..crc_offset + 4].try_into().unwrap());
    let computed = hardware_crc(&artifact[..region_len]);
    if stored != computed {
        bail!("checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}");
    }

    Ok(())
}
