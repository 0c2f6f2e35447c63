use core::fmt::Debug;

use crate::mfrc522::AuthStatus;
use crate::register::Register;
use thiserror::Error;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// ErrorReg bit raised on a bit collision in the field.
pub(crate) const COLL_ERR: u8 = 1 << 3;

/// Which half of a MIFARE write the tag refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// The `WRITE addr` command frame.
    Command,
    /// The 16 data bytes plus CRC.
    Data,
}

/// A well-formed exchange whose content violates the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// ErrorReg had BufferOvfl, CollErr, ParityErr or ProtocolErr set.
    #[error("chip reported error status {0:#04x}")]
    ErrorStatus(u8),
    /// Timer interrupt enabled and reported alongside ProtocolErr.
    #[error("invalid interrupt request (error status {0:#04x})")]
    InvalidInterrupt(u8),
    #[error("expected {expected} response bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    /// Acknowledgement nibble other than 0x0A.
    #[error("tag refused {phase:?} phase of write (nibble {nibble:#03x})")]
    Nak { phase: WritePhase, nibble: u8 },
    #[error("tag sent an empty response")]
    EmptyResponse,
}

/// Driver errors, generic over the bus error `E`.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// Bus exchange failed.
    #[error("bus transfer failed: {0:?}")]
    Transport(E),
    /// The bus returned fewer bytes than were clocked out.
    #[error("read of {register:?} returned {actual} of {expected} bytes")]
    ShortRead {
        register: Register,
        expected: usize,
        actual: usize,
    },
    /// Write number `index` of a register script failed; earlier writes stay
    /// applied.
    #[error("register script failed at write {index} ({register:?}): {cause:?}")]
    Sequence {
        index: usize,
        register: Register,
        cause: E,
    },
    /// A polling budget ran out.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// UID check byte mismatch.
    #[error("BCC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Bcc { expected: u8, actual: u8 },
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("authentication failed: {0:?}")]
    Auth(AuthStatus),
    #[error("sector {0} is outside the 4-block sector range")]
    InvalidSector(u8),
    /// Arming the IRQ line failed.
    #[error("IRQ line error: {0:?}")]
    Irq(Box<dyn Debug + Send + Sync>),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl<E> Error<E> {
    /// Whether repeating the whole operation may succeed: timeouts, BCC
    /// mismatches and collisions depend on what is in the field.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Bcc { .. } => true,
            Error::Protocol(ProtocolError::ErrorStatus(status)) => status & COLL_ERR != 0,
            _ => false,
        }
    }
}

/// Failures of [`Mfrc522::initialize`](crate::Mfrc522::initialize).
#[derive(Debug, Error)]
pub enum InitError<E, P> {
    #[error("reset line error: {0:?}")]
    ResetPin(P),
    #[error("chip setup failed: {0}")]
    Driver(Error<E>),
}

impl<E, P> From<Error<E>> for InitError<E, P> {
    fn from(error: Error<E>) -> Self {
        InitError::Driver(error)
    }
}
