// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protection status decoding.
//!
//! Each option-byte descriptor is decoded against the application region:
//! a protection counts only when it could cover application flash. The
//! page-offset to address translation comes entirely from the
//! [`FlashLayout`], never from hardwired device constants.

use crate::hal::{ObConfig, RdpLevel, WrpArea};
use crate::layout::{Bank, FlashLayout};

bitflags::bitflags! {
    /// Combined flash protection summary for the application region.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Protection: u32 {
        /// Write protection overlaps the application region.
        const WRP = 1 << 0;
        /// Proprietary code readout protection overlaps the application
        /// region.
        const PCROP = 1 << 1;
        /// Readout protection is set to a non-default level.
        const RDP = 1 << 2;
    }
}

/// Decode one option-byte descriptor into the flags it contributes.
pub fn decode(area: WrpArea, config: &ObConfig, layout: &FlashLayout) -> Protection {
    let mut protection = Protection::empty();

    if area.is_area_a()
        && config.pcrop_end > config.pcrop_start
        && config.pcrop_start >= layout.app_address
    {
        protection |= Protection::PCROP;
    }

    if config.wrp.is_live() && wrp_start_address(area, config, layout) >= layout.app_address {
        protection |= Protection::WRP;
    }

    if config.rdp_level != RdpLevel::Level0 {
        protection |= Protection::RDP;
    }

    protection
}

/// Absolute start address of a WRP page-offset range. Bank 2 offsets count
/// from the second bank's base.
fn wrp_start_address(area: WrpArea, config: &ObConfig, layout: &FlashLayout) -> u32 {
    let bank_offset = match area.bank() {
        Bank::Bank1 => 0,
        Bank::Bank2 => layout.pages_per_bank * layout.page_size,
    };
    layout.flash_base + bank_offset + config.wrp.start * layout.page_size
}
