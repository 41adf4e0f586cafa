// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash memory map configuration.
//!
//! Everything address-shaped lives here: the device flash geometry, the
//! application region, the system-memory entry point and the checksum word
//! location. The update controller never hardcodes an address or a
//! page-offset translation constant; a port for different hardware supplies
//! a different [`FlashLayout`].

use serde::{Deserialize, Serialize};

/// Size of one flash programming word in bytes (doubleword programming).
pub const PROGRAM_WORD_SIZE: u32 = 8;

/// Physical flash bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    Bank1,
    Bank2,
}

/// One page-erase pass issued to the flash controller.
///
/// Page numbers are bank-relative, matching the erase interface of the
/// flash driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErasePass {
    pub bank: Bank,
    pub first_page: u32,
    pub page_count: u32,
}

/// Device memory map for a dual-bank flash part.
///
/// The default corresponds to an STM32L476-class device: 1 MiB of flash in
/// two banks of 256 x 2 KiB pages, bootloader in the first 32 KiB,
/// application checksum stored in the last word of the application region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashLayout {
    /// Base address of device flash.
    pub flash_base: u32,
    /// Total device flash size in bytes (both banks).
    pub flash_size: u32,
    /// Erase page size in bytes.
    pub page_size: u32,
    /// Number of pages per physical bank.
    pub pages_per_bank: u32,
    /// Base address of the application region.
    pub app_address: u32,
    /// Application region size in bytes; the checksum is computed over
    /// exactly this many bytes.
    pub app_size: u32,
    /// Base address of the vendor system-level recovery firmware.
    pub sysmem_address: u32,
    /// Address of the stored application checksum word, conventionally the
    /// word following the application region. `None` disables checksum
    /// verification.
    pub crc_address: Option<u32>,
    /// Whether the jump to the application relocates the vector table to
    /// the application base.
    pub relocate_vector_table: bool,
}

impl FlashLayout {
    /// STM32L476-class default memory map.
    pub const STM32L476: FlashLayout = FlashLayout {
        flash_base: 0x0800_0000,
        flash_size: 0x0010_0000,
        page_size: 0x800,
        pages_per_bank: 256,
        app_address: 0x0800_8000,
        app_size: 0x000F_7FF8,
        sysmem_address: 0x1FFF_0000,
        crc_address: Some(0x080F_FFF8),
        relocate_vector_table: true,
    };

    /// First address past the end of device flash.
    pub const fn flash_end(&self) -> u32 {
        self.flash_base + self.flash_size
    }

    /// First address past the end of the application region.
    pub const fn app_end(&self) -> u32 {
        self.app_address + self.app_size
    }

    /// Whether an image of `size` bytes fits between the application base
    /// and the end of device flash.
    pub const fn check_size(&self, size: u32) -> bool {
        size <= self.flash_end() - self.app_address
    }

    /// Highest address at which a programming word may start.
    pub const fn last_programmable(&self) -> u32 {
        self.flash_end() - PROGRAM_WORD_SIZE
    }

    /// Application region length in 32-bit words, as fed to the CRC engine.
    pub const fn crc_word_count(&self) -> u32 {
        self.app_size / 4
    }

    /// Number of pages spanning `[app_address, flash_end)`.
    pub const fn pages_to_erase(&self) -> u32 {
        (self.flash_end() - self.app_address) / self.page_size
    }

    /// Sanity checks on the memory map itself.
    pub const fn validate(&self) -> bool {
        let flash_end = self.flash_end();
        self.app_address >= self.flash_base
            && self.app_address < flash_end
            && (self.app_address - self.flash_base) % self.page_size == 0
            && self.flash_size == 2 * self.pages_per_bank * self.page_size
            && self.app_end() <= flash_end
            && match self.crc_address {
                Some(addr) => addr >= self.app_address && addr <= flash_end - 4,
                None => true,
            }
    }

    /// Page-erase passes covering `[app_address, flash_end)`, at most one
    /// per physical bank.
    ///
    /// When the page count exceeds one bank's capacity, the first pass
    /// erases the tail of bank 1 and the second the whole of bank 2;
    /// otherwise a single pass erases the tail of bank 2. A pass that would
    /// cover zero pages is omitted.
    pub fn erase_passes(&self) -> heapless::Vec<ErasePass, 2> {
        let mut passes = heapless::Vec::new();
        let total = self.pages_to_erase();

        if total > self.pages_per_bank {
            let tail = total % self.pages_per_bank;
            if tail > 0 {
                passes
                    .push(ErasePass {
                        bank: Bank::Bank1,
                        first_page: self.pages_per_bank - tail,
                        page_count: tail,
                    })
                    .ok();
            }
            passes
                .push(ErasePass {
                    bank: Bank::Bank2,
                    first_page: 0,
                    page_count: self.pages_per_bank,
                })
                .ok();
        } else if total > 0 {
            passes
                .push(ErasePass {
                    bank: Bank::Bank2,
                    first_page: self.pages_per_bank - total,
                    page_count: total,
                })
                .ok();
        }

        passes
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::STM32L476
    }
}

// Compile-time checks on the default memory map
const _: () = assert!(FlashLayout::STM32L476.validate());
const _: () = assert!(FlashLayout::STM32L476.app_size % PROGRAM_WORD_SIZE == 0);
