// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The flash update controller.
//!
//! A sequential state machine over the three hardware collaborators:
//! size check, protection query, two-phase write-protection programming,
//! bank-aware erase, the programming session with its write cursor and
//! read-after-write verification, checksum verification, application
//! presence check, and the two never-returning control transfers.
//!
//! Every `unlock` of the flash controller is paired with a `lock` on every
//! exit path, including error paths. Flash programming is blocking and must
//! not be interleaved with interrupt-driven flash access; all operations
//! run to completion before returning.

use crate::hal::{CrcConfig, CrcEngine, FlashControl, SystemControl, WrpArea, WrpRange};
use crate::layout::{FlashLayout, PROGRAM_WORD_SIZE};
use crate::protection::{self, Protection};

/// Mask applied to the application's first word before matching it against
/// [`STACK_POINTER_PATTERN`].
pub const STACK_POINTER_MASK: u32 = 0x2FFE_0000;

/// Top bits of a plausible initial stack pointer: somewhere in RAM.
pub const STACK_POINTER_PATTERN: u32 = 0x2000_0000;

/// Update result codes. Callers branch only on these; collaborator status
/// values never cross this boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Image would overrun device flash.
    Size,
    /// Option-byte programming or launch failed.
    Protection,
    /// A page-erase pass failed.
    Erase,
    /// Out-of-range cursor, programming failure, or read-back mismatch.
    Write,
    /// Stored checksum does not match the recomputed CRC.
    Checksum,
    /// No plausible application image in flash.
    NoApp,
}

/// Commit state of option-byte changes.
///
/// Write-protection programming is two-phase: the new value is written
/// first and latched by an explicit [`FlashUpdater::commit_option_bytes`]
/// (or the next reset), so a caller can batch several option changes before
/// committing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObCommitState {
    Committed,
    Pending,
}

/// Flash update controller.
///
/// Owns the write cursor and the option-byte commit state; borrows the
/// collaborators for the session so tests and ports keep ownership of their
/// peripherals.
pub struct FlashUpdater<'a, F, C, S> {
    flash: &'a mut F,
    crc: &'a mut C,
    system: &'a mut S,
    layout: FlashLayout,
    cursor: u32,
    ob_state: ObCommitState,
}

impl<'a, F, C, S> FlashUpdater<'a, F, C, S>
where
    F: FlashControl,
    C: CrcEngine,
    S: SystemControl,
{
    pub fn new(flash: &'a mut F, crc: &'a mut C, system: &'a mut S, layout: FlashLayout) -> Self {
        Self {
            flash,
            crc,
            system,
            cursor: layout.app_address,
            layout,
            ob_state: ObCommitState::Committed,
        }
    }

    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Next programmable address. Advances by [`PROGRAM_WORD_SIZE`] on each
    /// successful write, never decreases within a session.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn option_bytes_state(&self) -> ObCommitState {
        self.ob_state
    }

    /// Check that an image of `size` bytes fits into user flash. Pure, no
    /// side effects; guards against accepting an image that would overrun
    /// flash before anything destructive starts.
    pub fn check_size(&self, size: u32) -> Result<(), Error> {
        if self.layout.check_size(size) {
            Ok(())
        } else {
            Err(Error::Size)
        }
    }

    /// Read the combined protection status of the application region.
    ///
    /// Purely observational, but the controller acquire/release is still
    /// paired around the descriptor reads.
    pub fn protection_status(&mut self) -> Protection {
        self.flash.unlock();

        let mut status = Protection::empty();
        for area in WrpArea::ALL {
            let config = self.flash.read_protection(area);
            status |= protection::decode(area, &config, &self.layout);
        }

        self.flash.lock();
        status
    }

    /// Program write protection for the application bank: whole bank when
    /// enabling, the inverted empty range when disabling. The secondary
    /// area is left cleared either way.
    ///
    /// The new value does not take effect until
    /// [`FlashUpdater::commit_option_bytes`] (or a reset) latches it.
    pub fn set_write_protection(&mut self, enable: bool) -> Result<(), Error> {
        self.flash.unlock();
        self.flash.ob_unlock();

        let result = self.program_write_protection(enable);

        self.flash.ob_lock();
        self.flash.lock();

        if result.is_ok() {
            self.ob_state = ObCommitState::Pending;
        }
        result
    }

    fn program_write_protection(&mut self, enable: bool) -> Result<(), Error> {
        let range = if enable {
            WrpRange::whole_bank(self.layout.pages_per_bank)
        } else {
            WrpRange::none()
        };

        self.flash
            .program_protection(WrpArea::Bank2AreaA, range)
            .map_err(|_| Error::Protection)?;

        // Area B is not used; keep it cleared.
        self.flash
            .program_protection(WrpArea::Bank2AreaB, WrpRange::none())
            .map_err(|_| Error::Protection)?;

        Ok(())
    }

    /// Latch pending option-byte changes.
    pub fn commit_option_bytes(&mut self) -> Result<(), Error> {
        self.flash.unlock();
        self.flash.ob_unlock();

        let result = self
            .flash
            .launch_option_bytes()
            .map_err(|_| Error::Protection);

        self.flash.ob_lock();
        self.flash.lock();

        if result.is_ok() {
            self.ob_state = ObCommitState::Committed;
        }
        result
    }

    /// Erase the application region, one pass per physical bank. A failing
    /// pass aborts without issuing the rest. Idempotent: erasing erased
    /// pages is not an error.
    pub fn erase(&mut self) -> Result<(), Error> {
        self.flash.unlock();

        let mut result = Ok(());
        for pass in self.layout.erase_passes() {
            if self
                .flash
                .erase_pages(pass.bank, pass.first_page, pass.page_count)
                .is_err()
            {
                result = Err(Error::Erase);
                break;
            }
        }

        self.flash.lock();
        result
    }

    /// Open a programming session: clear stale status flags, reset the
    /// write cursor to the application base and leave the controller
    /// unlocked for writes.
    pub fn flash_init(&mut self) {
        self.flash.unlock();
        self.flash.clear_status_flags();
        self.flash.lock();

        self.cursor = self.layout.app_address;

        self.flash.unlock();
    }

    /// Program one 64-bit word at the cursor and advance.
    ///
    /// The just-written location is read back and compared against the
    /// input; a mismatch is a [`Error::Write`]. This is the only defense
    /// against silent programming corruption the controller itself did not
    /// flag. Any failure locks the flash controller, closing the session.
    ///
    /// Precondition: a session opened by [`FlashUpdater::flash_init`] and
    /// not yet closed by [`FlashUpdater::flash_end`]. Programming outside a
    /// session is rejected by the controller hardware; only the address
    /// window is re-checked here.
    pub fn flash_next(&mut self, value: u64) -> Result<(), Error> {
        if self.cursor < self.layout.app_address || self.cursor > self.layout.last_programmable() {
            self.flash.lock();
            return Err(Error::Write);
        }

        if self.flash.program_dword(self.cursor, value).is_err() {
            self.flash.lock();
            return Err(Error::Write);
        }

        if self.flash.read_dword(self.cursor) != value {
            // Flash content does not match what was just programmed
            self.flash.lock();
            return Err(Error::Write);
        }

        self.cursor += PROGRAM_WORD_SIZE;
        Ok(())
    }

    /// Close the programming session.
    pub fn flash_end(&mut self) {
        self.flash.lock();
    }

    /// Verify the stored application checksum against a CRC recomputed
    /// over the application region. Trivially Ok when the layout stores no
    /// checksum.
    ///
    /// Advisory integrity verification: detects incomplete transfers and
    /// corruption, not tampering.
    pub fn verify_checksum(&mut self) -> Result<(), Error> {
        let Some(crc_address) = self.layout.crc_address else {
            return Ok(());
        };

        self.crc.enable();
        if self.crc.configure(CrcConfig::default()).is_err() {
            return Err(Error::Checksum);
        }

        let calculated = self
            .crc
            .compute(self.layout.app_address, self.layout.crc_word_count());
        self.crc.reset();

        if self.flash.read_word(crc_address) != calculated {
            return Err(Error::Checksum);
        }
        Ok(())
    }

    /// Heuristic presence check: the application's first word must look
    /// like an initial stack pointer in RAM. Rejects erased flash; cannot
    /// reject a corrupted-but-plausible image, which is what
    /// [`FlashUpdater::verify_checksum`] is for.
    pub fn check_for_application(&self) -> Result<(), Error> {
        let first_word = self.flash.read_word(self.layout.app_address);
        if first_word & STACK_POINTER_MASK == STACK_POINTER_PATTERN {
            Ok(())
        } else {
            Err(Error::NoApp)
        }
    }

    /// Transfer control to the application. Never returns.
    pub fn jump_to_application(&mut self) -> ! {
        let stack_pointer = self.flash.read_word(self.layout.app_address);
        let reset_handler = self.flash.read_word(self.layout.app_address + 4);

        self.system.deinit();
        self.system.reset_systick();

        if self.layout.relocate_vector_table {
            self.system.set_vector_table(self.layout.app_address);
        }

        self.system.jump(stack_pointer, reset_handler)
    }

    /// Transfer control to the vendor system-level recovery firmware.
    /// Never returns.
    pub fn jump_to_system_memory(&mut self) -> ! {
        let stack_pointer = self.flash.read_word(self.layout.sysmem_address);
        let reset_handler = self.flash.read_word(self.layout.sysmem_address + 4);

        self.system.deinit();
        self.system.reset_systick();
        self.system.remap_system_memory();

        self.system.jump(stack_pointer, reset_handler)
    }
}
