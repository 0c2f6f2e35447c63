//! Tag-side (PICC) vocabulary: ISO14443-3 and MIFARE Classic commands, UIDs,
//! SAK decoding and block addressing.

use crate::error::Error;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    REQA = 0x26, // REQuest command, Type A. Moves PICCs from IDLE to READY. 7 bit frame.
    WUPA = 0x52, // Wake-UP command, Type A. Also wakes PICCs in state HALT. 7 bit frame.
    CT = 0x88,   // Cascade Tag. Not really a command, but used during anti collision.
    SelCl1 = 0x93, // Anti collision/Select, Cascade Level 1
    SelCl2 = 0x95, // Anti collision/Select, Cascade Level 2
    SelCl3 = 0x97, // Anti collision/Select, Cascade Level 3
    HLTA = 0x50, // HaLT command, Type A.
    // MIFARE Classic (MF1S503x, section 9). Authenticate first, then read/write inside the sector.
    MfAuthKeyA = 0x60, // Perform authentication with Key A
    MfAuthKeyB = 0x61, // Perform authentication with Key B
    MfRead = 0x30,     // Reads one 16 byte block from the authenticated sector.
    MfWrite = 0xA0,    // Writes one 16 byte block to the authenticated sector.
}

impl From<Command> for u8 {
    #[inline(always)]
    fn from(variant: Command) -> Self {
        variant as _
    }
}

/// NVB of an anti-collision frame carrying only SEL and NVB.
pub const NVB_ANTICOLLISION: u8 = 0x20;
/// NVB of a select frame: seven whole bytes.
pub const NVB_SELECT: u8 = 0x70;
/// Low nibble of a MIFARE ACK.
pub const ACK: u8 = 0x0A;

pub type Key = [u8; 6];
pub type TagBlock = [u8; 16];

/// Default transport key of blank MIFARE Classic tags.
pub const DEFAULT_KEY: Key = [0xFF; 6];

/// Which sector key to authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    KeyA,
    KeyB,
}

impl From<AuthMode> for u8 {
    fn from(mode: AuthMode) -> Self {
        match mode {
            AuthMode::KeyA => Command::MfAuthKeyA as u8,
            AuthMode::KeyB => Command::MfAuthKeyB as u8,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Type {
    Unknown,
    Iso14443_4,    // PICC compliant with ISO/IEC 14443-4
    Iso18092,      // PICC compliant with ISO/IEC 18092 (NFC)
    MifareMini,    // MIFARE Classic protocol, 320 bytes
    Mifare1k,      // MIFARE Classic protocol, 1KB
    Mifare4k,      // MIFARE Classic protocol, 4KB
    MifareUL,      // MIFARE Ultralight or Ultralight C
    MifarePlus,    // MIFARE Plus
    TNP3XXX,       // Only mentioned in NXP AN 10833 MIFARE Type Identification Procedure
    NotComplete,   // SAK indicates UID is not complete.
}

pub fn get_type(sak: u8) -> Type {
    // http://www.nxp.com/documents/application_note/AN10833.pdf
    // 3.2 Coding of Select Acknowledge (SAK)
    // ignore 8-bit (iso14443 starts with LSBit = bit 1)
    // fixes wrong type for manufacturer Infineon (http://nfc-tools.org/index.php?title=ISO14443A)
    match sak & 0x7F {
        0x04 => Type::NotComplete,
        0x09 => Type::MifareMini,
        0x08 => Type::Mifare1k,
        0x18 => Type::Mifare4k,
        0x00 => Type::MifareUL,
        0x10 | 0x11 => Type::MifarePlus,
        0x01 => Type::TNP3XXX,
        0x20 => Type::Iso14443_4,
        0x40 => Type::Iso18092,
        _ => Type::Unknown,
    }
}

/// XOR of the four UID bytes.
pub fn bcc(uid: &[u8; 4]) -> u8 {
    uid.iter().fold(0, |acc, b| acc ^ b)
}

/// Whether the fifth byte of an anti-collision frame checks the first four.
pub fn is_valid_uid(frame: &[u8; 5]) -> bool {
    frame[4] == frame[0] ^ frame[1] ^ frame[2] ^ frame[3]
}

/// A single-size (cascade level 1) UID of a selected card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uid {
    bytes: [u8; 4],
    sak: u8,
}

impl Uid {
    pub fn new(bytes: [u8; 4], sak: u8) -> Self {
        Self { bytes, sak }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.bytes
    }

    /// The SAK (Select acknowledge) byte returned after selection.
    pub fn sak(&self) -> u8 {
        self.sak
    }

    pub fn card_type(&self) -> Type {
        get_type(self.sak)
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.bytes)
    }
}

/// Block address inside the 4-block sectors (0..=31) of a MIFARE Classic tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddress(u8);

impl BlockAddress {
    pub const MAX_SECTOR: u8 = 31;

    /// Data block `block % 3` of `sector`; block 3 is never addressed as data.
    pub fn data<E>(sector: u8, block: u8) -> Result<Self, Error<E>> {
        Self::check(sector)?;
        Ok(Self(sector * 4 + block % 3))
    }

    /// The trailer block holding the sector's keys and access bits.
    pub fn trailer<E>(sector: u8) -> Result<Self, Error<E>> {
        Self::check(sector)?;
        Ok(Self(sector * 4 + 3))
    }

    fn check<E>(sector: u8) -> Result<(), Error<E>> {
        if sector > Self::MAX_SECTOR {
            return Err(Error::InvalidSector(sector));
        }
        Ok(())
    }

    pub fn sector(self) -> u8 {
        self.0 / 4
    }

    pub fn is_trailer(self) -> bool {
        self.0 % 4 == 3
    }
}

impl From<BlockAddress> for u8 {
    fn from(addr: BlockAddress) -> Self {
        addr.0
    }
}
