//! Driver for the MFRC522 contactless reader talking to MIFARE Classic tags.
//!
//! The chip is reached through a register-addressed bus ([`Com`]), a reset
//! line, an optional IRQ line ([`IrqLine`]) and a [`Clock`]. On top of the
//! register file the driver implements the CRC coprocessor handshake, the
//! FIFO command executor, ISO14443-3 anti-collision and selection, MIFARE
//! key authentication and 16-byte block read/write.
//!
//! Every authenticated entry point selects the card again, authenticates
//! against the sector trailer, performs the transfer and stops the crypto
//! unit before returning, so no session state survives between calls.

pub mod clock;
pub mod com;
pub mod com_spi;
#[cfg(feature = "spidev")]
pub mod com_spidev;
pub mod config;
pub mod error;
pub mod irq;
pub mod mfrc522;
pub mod picc;
pub mod register;
#[cfg(test)]
mod sim;
mod util;

pub use clock::{Clock, StdClock};
pub use com::Com;
pub use com_spi::ComSpi;
#[cfg(feature = "spidev")]
pub use com_spidev::ComSpidev;
pub use config::{Config, Poll};
pub use error::{Error, InitError, ProtocolError, Result, WritePhase};
pub use irq::{Edge, IrqLine, IrqNotifier, NoIrq};
pub use mfrc522::{AuthStatus, Completion, Mfrc522, Presence, Response};
pub use picc::{AuthMode, BlockAddress, Key, TagBlock, Uid};
pub use register::{ChipCommand, Register, RegisterWrite};
