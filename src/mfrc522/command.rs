use log::{debug, warn};

use super::{Mfrc522, FLUSH_BUFFER, SET1, START_SEND, TIMER_IRQ};
use crate::clock::Clock;
use crate::com::Com;
use crate::error::{ProtocolError, Result};
use crate::irq::IrqLine;
use crate::register::{ChipCommand, Register};

/// BufferOvfl | CollErr | ParityErr | ProtocolErr in ErrorReg.
const ERROR_MASK: u8 = 0x1B;
/// RxLastBits in ControlReg.
const RX_LAST_BITS: u8 = 0x07;
/// FIFOLevel proper, without the FlushBuffer bit.
const FIFO_LEVEL: u8 = 0x7F;
/// Most bytes pulled out of the FIFO per response.
const MAX_READ: u8 = 16;

/// Chip commands that move data through the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoCommand {
    Transceive,
    Authenticate,
}

/// Interrupt sources a command enables, and the subset that ends the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqMasks {
    pub enable: u8,
    pub wait: u8,
}

impl FifoCommand {
    pub const fn masks(self) -> IrqMasks {
        match self {
            // ErrIEn | IdleIEn, done on IdleIRq
            FifoCommand::Authenticate => IrqMasks {
                enable: 0x12,
                wait: 0x10,
            },
            // TxIEn | RxIEn | IdleIEn | LoAlertIEn | ErrIEn | TimerIEn, done on RxIRq or IdleIRq
            FifoCommand::Transceive => IrqMasks {
                enable: 0x77,
                wait: 0x30,
            },
        }
    }

    pub const fn chip_command(self) -> ChipCommand {
        match self {
            FifoCommand::Authenticate => ChipCommand::MFAuthent,
            FifoCommand::Transceive => ChipCommand::Transceive,
        }
    }
}

/// How the completion wait of a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The command's wait bit or the timer bit came up.
    Signalled,
    /// The poll budget ran out first. This is a soft timeout: the command
    /// still proceeds to read ErrorReg and the FIFO, whose contents may be
    /// stale.
    Exhausted,
}

/// Data returned by a transceive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub data: Vec<u8>,
    /// Exact received length in bits.
    pub bits: usize,
    pub completion: Completion,
}

impl Response {
    fn empty(completion: Completion) -> Self {
        Self {
            data: Vec::new(),
            bits: 0,
            completion,
        }
    }
}

/// Received length derived from FIFOLevelReg and RxLastBits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoLength {
    pub bits: usize,
    /// Bytes to read back, clamped to 1..=16.
    pub bytes: usize,
}

pub fn decode_fifo_length(fifo_bytes: u8, last_bits: u8) -> FifoLength {
    let last_bits = last_bits & RX_LAST_BITS;
    let bits = if last_bits != 0 {
        usize::from(fifo_bytes).saturating_sub(1) * 8 + usize::from(last_bits)
    } else {
        usize::from(fifo_bytes) * 8
    };
    FifoLength {
        bits,
        bytes: usize::from(fifo_bytes.clamp(1, MAX_READ)),
    }
}

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Loads `payload` into the FIFO, runs `command` and collects the reply.
    ///
    /// Every FIFO-based exchange with a tag goes through here. Running out of
    /// completion polls is not an error (see [`Completion::Exhausted`]).
    pub fn execute(
        &mut self,
        command: FifoCommand,
        payload: &[u8],
    ) -> Result<Response, COM::Error> {
        let IrqMasks { enable, wait } = command.masks();

        self.write_register(Register::ComIEnReg, enable | SET1)?;
        self.clear_bitmask(Register::ComIrqReg, SET1)?;
        self.set_bitmask(Register::FIFOLevelReg, FLUSH_BUFFER)?;
        self.write_register(Register::CommandReg, ChipCommand::Idle.into())?;
        self.write_register_bytes(Register::FIFODataReg, payload)?;
        self.write_register(Register::CommandReg, command.chip_command().into())?;
        if command == FifoCommand::Transceive {
            self.set_bitmask(Register::BitFramingReg, START_SEND)?;
        }

        let signalled = self.poll(self.config.command_poll, |mfrc| {
            let irq = mfrc.read_register(Register::ComIrqReg)?;
            Ok((irq & (wait | TIMER_IRQ) != 0).then_some(()))
        })?;
        let completion = match signalled {
            Some(()) => Completion::Signalled,
            None => {
                warn!("{:?} never signalled completion, reading FIFO anyway", command);
                Completion::Exhausted
            }
        };

        self.clear_bitmask(Register::BitFramingReg, START_SEND)?;

        let status = self.read_register(Register::ErrorReg)?;
        if status & enable & TIMER_IRQ != 0 {
            return Err(ProtocolError::InvalidInterrupt(status).into());
        }
        if status & ERROR_MASK != 0 {
            return Err(ProtocolError::ErrorStatus(status).into());
        }

        if command != FifoCommand::Transceive {
            return Ok(Response::empty(completion));
        }

        let level = self.read_register(Register::FIFOLevelReg)? & FIFO_LEVEL;
        let last_bits = self.read_register(Register::ControlReg)?;
        let length = decode_fifo_length(level, last_bits);
        let data = self.read_register_bytes(Register::FIFODataReg, length.bytes)?;
        debug!("{:?} {:02x?} -> {:02x?} ({} bits)", command, payload, data, length.bits);

        Ok(Response {
            data,
            bits: length.bits,
            completion,
        })
    }
}
