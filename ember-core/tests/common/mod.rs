// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reference fake collaborators for the integration tests.
//!
//! `FakeFlash` backs device flash with a RAM buffer and supports fault
//! injection (refused programming, silent corruption, per-bank erase
//! failure, option-byte failures). `FakeCrc` computes the same CRC the
//! STM32 hardware engine would. `FakeSystem` records the teardown steps and
//! traps the control transfer with a panic so tests can observe it.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use crc::{Crc, CRC_32_MPEG_2};
use ember_core::hal::{
    CrcConfig, CrcEngine, FlashControl, ObConfig, SystemControl, WrpArea, WrpRange,
};
use ember_core::layout::{Bank, FlashLayout};

pub type SharedMem = Rc<RefCell<Vec<u8>>>;

/// Small dual-bank map for the tests: 128 KiB in 2 x 32 pages of 2 KiB,
/// bootloader in the first 16 pages, checksum word at the region's tail.
pub const TEST_LAYOUT: FlashLayout = FlashLayout {
    flash_base: 0x0800_0000,
    flash_size: 0x0002_0000,
    page_size: 0x800,
    pages_per_bank: 32,
    app_address: 0x0800_8000,
    app_size: 0x0001_7FF8,
    sysmem_address: 0x1FFF_0000,
    crc_address: Some(0x0801_FFF8),
    relocate_vector_table: true,
};

const SYSMEM_SIZE: usize = 64;

/// Error type reported by the fakes' fallible operations.
#[derive(Debug)]
pub struct FakeFault;

fn area_index(area: WrpArea) -> usize {
    match area {
        WrpArea::Bank1AreaA => 0,
        WrpArea::Bank1AreaB => 1,
        WrpArea::Bank2AreaA => 2,
        WrpArea::Bank2AreaB => 3,
    }
}

pub struct FakeFlash {
    pub layout: FlashLayout,
    pub mem: SharedMem,
    pub sysmem: Vec<u8>,

    pub locked: bool,
    pub ob_locked: bool,
    pub unlock_count: u32,
    pub lock_count: u32,
    pub ob_unlock_count: u32,
    pub ob_lock_count: u32,
    pub status_flags_cleared: u32,

    /// Committed option bytes, as the hardware reports them.
    pub active_ob: [ObConfig; 4],
    /// Programmed-but-not-launched option bytes.
    pub pending_ob: [ObConfig; 4],

    pub erase_calls: Vec<(Bank, u32, u32)>,

    // Fault injection
    /// XORed into every programmed value: silent corruption the controller
    /// itself does not flag.
    pub program_xor: u64,
    pub fail_program: bool,
    pub fail_erase_bank: Option<Bank>,
    pub fail_ob_program: bool,
    pub fail_ob_launch: bool,
}

impl FakeFlash {
    pub fn new(layout: FlashLayout) -> Self {
        let mut sysmem = vec![0u8; SYSMEM_SIZE];
        // System memory carries a valid vector table from the factory.
        sysmem[0..4].copy_from_slice(&0x2000_3000u32.to_le_bytes());
        sysmem[4..8].copy_from_slice(&(layout.sysmem_address + 0x101).to_le_bytes());

        Self {
            layout,
            mem: Rc::new(RefCell::new(vec![0xFF; layout.flash_size as usize])),
            sysmem,
            locked: true,
            ob_locked: true,
            unlock_count: 0,
            lock_count: 0,
            ob_unlock_count: 0,
            ob_lock_count: 0,
            status_flags_cleared: 0,
            active_ob: [ObConfig::default(); 4],
            pending_ob: [ObConfig::default(); 4],
            erase_calls: Vec::new(),
            program_xor: 0,
            fail_program: false,
            fail_erase_bank: None,
            fail_ob_program: false,
            fail_ob_launch: false,
        }
    }

    /// Set the committed (and pending) option bytes of one area, as if the
    /// device came out of the factory that way.
    pub fn preload_protection(&mut self, area: WrpArea, config: ObConfig) {
        self.active_ob[area_index(area)] = config;
        self.pending_ob[area_index(area)] = config;
    }

    /// Write bytes directly into the flash buffer, bypassing the
    /// controller. Test setup only.
    pub fn poke(&mut self, address: u32, bytes: &[u8]) {
        let offset = (address - self.layout.flash_base) as usize;
        self.mem.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn read_region(&self, address: u32, len: usize) -> Vec<u8> {
        let offset = (address - self.layout.flash_base) as usize;
        self.mem.borrow()[offset..offset + len].to_vec()
    }

    fn flash_offset(&self, address: u32) -> Option<usize> {
        if address >= self.layout.flash_base && address < self.layout.flash_end() {
            Some((address - self.layout.flash_base) as usize)
        } else {
            None
        }
    }

    fn sysmem_offset(&self, address: u32) -> Option<usize> {
        let end = self.layout.sysmem_address + self.sysmem.len() as u32;
        if address >= self.layout.sysmem_address && address < end {
            Some((address - self.layout.sysmem_address) as usize)
        } else {
            None
        }
    }

    fn bank_base_offset(&self, bank: Bank) -> usize {
        match bank {
            Bank::Bank1 => 0,
            Bank::Bank2 => (self.layout.pages_per_bank * self.layout.page_size) as usize,
        }
    }
}

impl FlashControl for FakeFlash {
    type Error = FakeFault;

    fn unlock(&mut self) {
        self.locked = false;
        self.unlock_count += 1;
    }

    fn lock(&mut self) {
        self.locked = true;
        self.lock_count += 1;
    }

    fn ob_unlock(&mut self) {
        self.ob_locked = false;
        self.ob_unlock_count += 1;
    }

    fn ob_lock(&mut self) {
        self.ob_locked = true;
        self.ob_lock_count += 1;
    }

    fn clear_status_flags(&mut self) {
        self.status_flags_cleared += 1;
    }

    fn program_dword(&mut self, address: u32, value: u64) -> Result<(), FakeFault> {
        if self.locked || self.fail_program {
            return Err(FakeFault);
        }
        let offset = self.flash_offset(address).ok_or(FakeFault)?;
        let stored = value ^ self.program_xor;
        self.mem.borrow_mut()[offset..offset + 8].copy_from_slice(&stored.to_le_bytes());
        Ok(())
    }

    fn erase_pages(
        &mut self,
        bank: Bank,
        first_page: u32,
        page_count: u32,
    ) -> Result<(), FakeFault> {
        if self.locked {
            return Err(FakeFault);
        }
        self.erase_calls.push((bank, first_page, page_count));
        if self.fail_erase_bank == Some(bank) {
            return Err(FakeFault);
        }

        let page_size = self.layout.page_size as usize;
        let start = self.bank_base_offset(bank) + first_page as usize * page_size;
        let len = page_count as usize * page_size;
        self.mem.borrow_mut()[start..start + len].fill(0xFF);
        Ok(())
    }

    fn read_protection(&mut self, area: WrpArea) -> ObConfig {
        self.active_ob[area_index(area)]
    }

    fn program_protection(&mut self, area: WrpArea, range: WrpRange) -> Result<(), FakeFault> {
        if self.ob_locked || self.fail_ob_program {
            return Err(FakeFault);
        }
        self.pending_ob[area_index(area)].wrp = range;
        Ok(())
    }

    fn launch_option_bytes(&mut self) -> Result<(), FakeFault> {
        if self.ob_locked || self.fail_ob_launch {
            return Err(FakeFault);
        }
        self.active_ob = self.pending_ob;
        Ok(())
    }

    fn read_word(&self, address: u32) -> u32 {
        let bytes = if let Some(offset) = self.flash_offset(address) {
            let mem = self.mem.borrow();
            [mem[offset], mem[offset + 1], mem[offset + 2], mem[offset + 3]]
        } else if let Some(offset) = self.sysmem_offset(address) {
            let s = &self.sysmem;
            [s[offset], s[offset + 1], s[offset + 2], s[offset + 3]]
        } else {
            return 0xFFFF_FFFF;
        };
        u32::from_le_bytes(bytes)
    }

    fn read_dword(&self, address: u32) -> u64 {
        let low = self.read_word(address);
        let high = self.read_word(address + 4);
        (low as u64) | ((high as u64) << 32)
    }
}

const HW_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC-32 exactly as the STM32 CRC unit computes it over 32-bit words:
/// default polynomial 0x04C11DB7, init 0xFFFFFFFF, no inversion, each
/// little-endian memory word fed most-significant byte first.
pub fn stm32_crc(bytes: &[u8]) -> u32 {
    assert!(bytes.len() % 4 == 0);
    let mut digest = HW_CRC.digest();
    for word in bytes.chunks_exact(4) {
        let w = u32::from_le_bytes(word.try_into().unwrap());
        digest.update(&w.to_be_bytes());
    }
    digest.finalize()
}

pub struct FakeCrc {
    pub mem: SharedMem,
    pub flash_base: u32,
    pub enabled: bool,
    pub configured: Option<CrcConfig>,
    pub reset_count: u32,
    pub fail_configure: bool,
}

impl FakeCrc {
    pub fn new(mem: SharedMem, flash_base: u32) -> Self {
        Self {
            mem,
            flash_base,
            enabled: false,
            configured: None,
            reset_count: 0,
            fail_configure: false,
        }
    }
}

impl CrcEngine for FakeCrc {
    type Error = FakeFault;

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn configure(&mut self, config: CrcConfig) -> Result<(), FakeFault> {
        if self.fail_configure {
            return Err(FakeFault);
        }
        self.configured = Some(config);
        Ok(())
    }

    fn compute(&mut self, address: u32, word_count: u32) -> u32 {
        let mem = self.mem.borrow();
        let offset = (address - self.flash_base) as usize;
        stm32_crc(&mem[offset..offset + word_count as usize * 4])
    }

    fn reset(&mut self) {
        self.reset_count += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeSystem {
    pub deinit_count: u32,
    pub systick_reset: bool,
    pub vector_table: Option<u32>,
    pub sysmem_remapped: bool,
    pub jumped_to: Option<(u32, u32)>,
}

impl SystemControl for FakeSystem {
    fn deinit(&mut self) {
        self.deinit_count += 1;
    }

    fn reset_systick(&mut self) {
        self.systick_reset = true;
    }

    fn set_vector_table(&mut self, address: u32) {
        self.vector_table = Some(address);
    }

    fn remap_system_memory(&mut self) {
        self.sysmem_remapped = true;
    }

    fn jump(&mut self, stack_pointer: u32, reset_handler: u32) -> ! {
        self.jumped_to = Some((stack_pointer, reset_handler));
        panic!("control transferred");
    }
}

/// Everything a test needs, wired to [`TEST_LAYOUT`].
pub struct Rig {
    pub flash: FakeFlash,
    pub crc: FakeCrc,
    pub system: FakeSystem,
}

pub fn rig() -> Rig {
    let flash = FakeFlash::new(TEST_LAYOUT);
    let crc = FakeCrc::new(flash.mem.clone(), TEST_LAYOUT.flash_base);
    Rig {
        flash,
        crc,
        system: FakeSystem::default(),
    }
}

/// Plant a structurally plausible application image header at the
/// application base: an in-RAM initial stack pointer and a thumb reset
/// handler.
pub fn plant_application(flash: &mut FakeFlash) {
    let app = flash.layout.app_address;
    flash.poke(app, &0x2000_4000u32.to_le_bytes());
    flash.poke(app + 4, &(app + 0x201).to_le_bytes());
}

/// Recompute the region CRC from the current flash contents and store it
/// at the layout's checksum address.
pub fn store_region_checksum(flash: &mut FakeFlash) {
    let layout = flash.layout;
    let crc = stm32_crc(&flash.read_region(layout.app_address, layout.app_size as usize));
    flash.poke(layout.crc_address.unwrap(), &crc.to_le_bytes());
}
