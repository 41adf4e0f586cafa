// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Capability traits for the hardware collaborators.
//!
//! The update controller owns no registers. It drives three collaborators
//! through these traits: the flash controller, the CRC engine and the
//! system reset/jump primitive. Hardware ports implement them over the
//! device PAC/HAL; the integration tests implement them over plain RAM.

use crate::layout::Bank;

/// Readout protection level reported by the option bytes.
///
/// Anything other than [`RdpLevel::Level0`] counts as readout-protected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdpLevel {
    #[default]
    Level0,
    Level1,
    Level2,
}

/// The four write-protection option-byte areas of a dual-bank part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WrpArea {
    Bank1AreaA,
    Bank1AreaB,
    Bank2AreaA,
    Bank2AreaB,
}

impl WrpArea {
    /// All areas, in the order the protection status query reads them.
    pub const ALL: [WrpArea; 4] = [
        WrpArea::Bank1AreaA,
        WrpArea::Bank1AreaB,
        WrpArea::Bank2AreaA,
        WrpArea::Bank2AreaB,
    ];

    pub const fn bank(self) -> Bank {
        match self {
            WrpArea::Bank1AreaA | WrpArea::Bank1AreaB => Bank::Bank1,
            WrpArea::Bank2AreaA | WrpArea::Bank2AreaB => Bank::Bank2,
        }
    }

    /// PCROP is reported per bank; only the "A" descriptor of each bank
    /// carries it, the "B" descriptor duplicates it.
    pub const fn is_area_a(self) -> bool {
        matches!(self, WrpArea::Bank1AreaA | WrpArea::Bank2AreaA)
    }
}

/// Bank-relative page-offset range held in a WRP option-byte area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WrpRange {
    pub start: u32,
    pub end: u32,
}

impl WrpRange {
    /// Inverted empty range: the hardware encoding for "protect nothing".
    pub const fn none() -> Self {
        Self {
            start: 0xFF,
            end: 0x00,
        }
    }

    /// Range covering every page of one bank.
    pub const fn whole_bank(pages_per_bank: u32) -> Self {
        Self {
            start: 0,
            end: pages_per_bank - 1,
        }
    }

    /// A range protects something only when end exceeds start.
    pub const fn is_live(&self) -> bool {
        self.end > self.start
    }
}

impl Default for WrpRange {
    fn default() -> Self {
        Self::none()
    }
}

/// Option-byte configuration snapshot for one WRP area.
///
/// PCROP addresses are absolute; the WRP range is in bank-relative page
/// offsets. The readout protection level is global but reported with every
/// descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObConfig {
    pub wrp: WrpRange,
    pub pcrop_start: u32,
    pub pcrop_end: u32,
    pub rdp_level: RdpLevel,
}

/// Flash controller collaborator.
///
/// Lock and unlock are plain register writes and cannot fail; programming,
/// erase and option-byte programming report hardware status through the
/// associated error type. Reads go through the controller because device
/// flash is memory-mapped behind it.
pub trait FlashControl {
    type Error: core::fmt::Debug;

    fn unlock(&mut self);
    fn lock(&mut self);
    fn ob_unlock(&mut self);
    fn ob_lock(&mut self);

    /// Clear stale end-of-operation and error status flags.
    fn clear_status_flags(&mut self);

    /// Program one 64-bit word at `address`.
    fn program_dword(&mut self, address: u32, value: u64) -> Result<(), Self::Error>;

    /// Erase `page_count` pages of `bank` starting at bank-relative page
    /// `first_page`.
    fn erase_pages(&mut self, bank: Bank, first_page: u32, page_count: u32)
        -> Result<(), Self::Error>;

    /// Read the option-byte configuration of one WRP area.
    fn read_protection(&mut self, area: WrpArea) -> ObConfig;

    /// Program the WRP range of one area. The change is pending until
    /// [`FlashControl::launch_option_bytes`] latches it.
    fn program_protection(&mut self, area: WrpArea, range: WrpRange) -> Result<(), Self::Error>;

    /// Latch pending option-byte changes (option-byte launch). Triggers an
    /// option-byte reload on real hardware.
    fn launch_option_bytes(&mut self) -> Result<(), Self::Error>;

    fn read_word(&self, address: u32) -> u32;
    fn read_dword(&self, address: u32) -> u64;
}

/// CRC engine configuration.
///
/// The default is the engine's fixed default polynomial and initial value
/// with no input or output inversion, fed 32-bit words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrcConfig {
    pub polynomial: u32,
    pub initial_value: u32,
    pub reflect_input: bool,
    pub reflect_output: bool,
}

impl Default for CrcConfig {
    fn default() -> Self {
        Self {
            polynomial: 0x04C1_1DB7,
            initial_value: 0xFFFF_FFFF,
            reflect_input: false,
            reflect_output: false,
        }
    }
}

/// CRC engine collaborator.
pub trait CrcEngine {
    type Error: core::fmt::Debug;

    /// Enable the peripheral clock.
    fn enable(&mut self);

    fn configure(&mut self, config: CrcConfig) -> Result<(), Self::Error>;

    /// Compute the CRC over `word_count` 32-bit words starting at `address`.
    fn compute(&mut self, address: u32, word_count: u32) -> u32;

    /// Force-reset the peripheral.
    fn reset(&mut self);
}

/// System reset and control-transfer collaborator.
///
/// `jump` never returns: once the stack pointer and program counter belong
/// to the target image there is nothing left to come back to. The
/// system-memory path's defensive halt on an impossible return is the
/// implementation's obligation behind the never type.
pub trait SystemControl {
    /// Tear down clocks and peripherals to their reset state.
    fn deinit(&mut self);

    /// Zero the system timer's control, reload and current-value registers
    /// so no stale tick fires mid-transfer.
    fn reset_systick(&mut self);

    /// Point the vector table base at `address`.
    fn set_vector_table(&mut self, address: u32);

    /// Remap the address space so reads at address zero source from system
    /// memory.
    fn remap_system_memory(&mut self);

    /// Load `stack_pointer` into MSP and transfer control to
    /// `reset_handler`.
    fn jump(&mut self, stack_pointer: u32, reset_handler: u32) -> !;
}
