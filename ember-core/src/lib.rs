// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash update core for the ember bootloader.
//!
//! This crate is the hardware-independent heart of an STM32L4-class
//! bootloader: it validates, erases, programs and verifies an application
//! image in internal flash, then transfers execution to the application or
//! to the vendor's system-level recovery firmware. The flash controller,
//! CRC engine and reset primitive are collaborators reached through the
//! traits in [`hal`], so the whole state machine runs against fakes on the
//! host.
//!
//! - Default: `no_std` mode for embedded ports
//! - `std` feature: enables `std` support for host tools
//! - `defmt` feature: `defmt::Format` derives for embedded diagnostics

#![cfg_attr(not(feature = "std"), no_std)]

pub mod hal;
pub mod layout;
pub mod protection;
pub mod updater;

// Re-export commonly used types
pub use layout::{Bank, ErasePass, FlashLayout, PROGRAM_WORD_SIZE};
pub use protection::Protection;
pub use updater::{Error, FlashUpdater, ObCommitState};
pub use updater::{STACK_POINTER_MASK, STACK_POINTER_PATTERN};
