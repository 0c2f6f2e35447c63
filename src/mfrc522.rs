use std::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use log::{debug, trace, warn};

use crate::clock::Clock;
use crate::com::Com;
use crate::config::{Config, Poll};
use crate::error::{Error, InitError, Result};
use crate::irq::IrqLine;
use crate::register::{ChipCommand, Register, RegisterWrite, INIT_SEQUENCE};

mod command;
mod crc;
mod mifare;
mod presence;
mod select;

pub use command::{decode_fifo_length, Completion, FifoCommand, FifoLength, IrqMasks, Response};
pub use mifare::{AuthStatus, Session};
pub use presence::Presence;

/// Set1 in ComIrqReg/DivIrqReg, IRqInv in ComIEnReg.
pub(crate) const SET1: u8 = 0x80;
/// FlushBuffer in FIFOLevelReg.
pub(crate) const FLUSH_BUFFER: u8 = 0x80;
/// StartSend in BitFramingReg.
pub(crate) const START_SEND: u8 = 0x80;
/// TimerIRq in ComIrqReg.
pub(crate) const TIMER_IRQ: u8 = 0x01;
/// CRCIRq in DivIrqReg.
pub(crate) const CRC_IRQ: u8 = 0x04;
/// PowerDown in CommandReg.
pub(crate) const POWER_DOWN: u8 = 1 << 4;
/// MFCrypto1On in Status2Reg.
pub(crate) const MF_CRYPTO1_ON: u8 = 0x08;
/// Tx1RFEn | Tx2RFEn in TxControlReg.
pub(crate) const ANTENNA_ON: u8 = 0x03;

/// MFRC522 driver.
///
/// Owns the bus, the reset line, the IRQ line and the clock. All operations
/// are blocking and must not be interleaved; wrap the driver in a lock if
/// several threads need it.
pub struct Mfrc522<COM, RST, IRQ, CLK> {
    com: COM,
    reset: RST,
    irq: IRQ,
    clock: CLK,
    config: Config,
}

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Brings the chip out of reset, applies the timer/modulation setup and
    /// turns the antenna on.
    ///
    /// `config.irq_timeout` is the default time card selection waits for a
    /// tag.
    pub fn initialize<P>(
        com: COM,
        reset: RST,
        irq: IRQ,
        clock: CLK,
        config: Config,
    ) -> core::result::Result<Self, InitError<COM::Error, P>>
    where
        RST: InputPin<Error = P> + OutputPin<Error = P>,
    {
        let mut mfrc = Self {
            com,
            reset,
            irq,
            clock,
            config,
        };
        if let Err(e) = mfrc.hard_reset() {
            return Err(InitError::ResetPin(e));
        }
        mfrc.reset()?;
        mfrc.write_sequence(&INIT_SEQUENCE)?;
        mfrc.antenna_on()?;
        debug!("MFRC522 initialized");
        Ok(mfrc)
    }

    fn hard_reset<P>(&mut self) -> core::result::Result<(), P>
    where
        RST: InputPin<Error = P> + OutputPin<Error = P>,
    {
        // A chip held in power-down by a low reset line needs a pulse to wake.
        if self.reset.is_low()? {
            self.reset.set_low()?;
            self.clock.sleep(Duration::from_micros(2));
            self.reset.set_high()?;
            self.clock.sleep(Duration::from_micros(50));
        }
        Ok(())
    }

    /// Turns the antenna off. A failure is logged and otherwise ignored.
    /// The driver stays usable; call [`antenna_on`](Self::antenna_on) to
    /// resume.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.antenna_off() {
            warn!("turning the antenna off at shutdown failed: {:?}", e);
        }
    }

    /// Gives back the bus, the pins and the clock.
    pub fn release(self) -> (COM, RST, IRQ, CLK) {
        (self.com, self.reset, self.irq, self.clock)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn version(&mut self) -> Result<u8, COM::Error> {
        self.read_register(Register::VersionReg)
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u8, COM::Error> {
        let values = self.read_register_bytes(reg, 1)?;
        values.first().copied().ok_or(Error::ShortRead {
            register: reg,
            expected: 1,
            actual: 0,
        })
    }

    /// Reads `count` bytes from `reg`, one address byte per value plus a
    /// trailing zero; the byte clocked in during the first address is junk.
    pub fn read_register_bytes(
        &mut self,
        reg: Register,
        count: usize,
    ) -> Result<Vec<u8>, COM::Error> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut tx = vec![reg.read_address(); count];
        tx.push(0);
        let rx = self.com.exchange(&tx).map_err(Error::Transport)?;
        if rx.len() != tx.len() {
            return Err(Error::ShortRead {
                register: reg,
                expected: count,
                actual: rx.len().saturating_sub(1),
            });
        }
        let values: Vec<u8> = rx.into_iter().skip(1).collect();
        trace!("read {:02x?} from {:?}", values, reg);
        Ok(values)
    }

    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), COM::Error> {
        self.write_register_bytes(reg, &[value])
    }

    pub fn write_register_bytes(&mut self, reg: Register, values: &[u8]) -> Result<(), COM::Error> {
        let tx = [&[reg.write_address()], values].concat();
        self.com.write(&tx).map_err(Error::Transport)?;
        trace!("wrote {:02x?} to {:?}", values, reg);
        Ok(())
    }

    /// Applies `script` in order, stopping at the first failed write. Writes
    /// before the failure are not undone; a soft reset is the only recovery.
    pub fn write_sequence(&mut self, script: &[RegisterWrite]) -> Result<(), COM::Error> {
        for (index, write) in script.iter().enumerate() {
            if let Err(cause) = self
                .com
                .write(&[write.register.write_address(), write.value])
            {
                return Err(Error::Sequence {
                    index,
                    register: write.register,
                    cause,
                });
            }
            trace!("wrote {:#04x} to {:?}", write.value, write.register);
        }
        Ok(())
    }

    /// Read-modify-write; not atomic against other users of the chip.
    pub fn set_bitmask(&mut self, reg: Register, mask: u8) -> Result<(), COM::Error> {
        let tmp = self.read_register(reg)?;
        self.write_register(reg, tmp | mask)
    }

    /// Read-modify-write; not atomic against other users of the chip.
    pub fn clear_bitmask(&mut self, reg: Register, mask: u8) -> Result<(), COM::Error> {
        let tmp = self.read_register(reg)?;
        self.write_register(reg, tmp & !mask)
    }

    /// Soft reset: all registers return to their reset values.
    pub fn reset(&mut self) -> Result<(), COM::Error> {
        self.write_register(Register::CommandReg, ChipCommand::SoftReset.into())?;
        let poll = self.config.reset_poll;
        self.clock.sleep(poll.delay);
        let awake = self.poll(poll, |mfrc| {
            let command = mfrc.read_register(Register::CommandReg)?;
            Ok((command & POWER_DOWN == 0).then_some(()))
        })?;
        if awake.is_none() {
            warn!("PowerDown still set after soft reset");
        }
        Ok(())
    }

    pub fn antenna_on(&mut self) -> Result<(), COM::Error> {
        let control_reg = self.read_register(Register::TxControlReg)?;
        if (control_reg & ANTENNA_ON) != ANTENNA_ON {
            self.write_register(Register::TxControlReg, control_reg | ANTENNA_ON)?;
        }
        Ok(())
    }

    pub fn antenna_off(&mut self) -> Result<(), COM::Error> {
        self.clear_bitmask(Register::TxControlReg, ANTENNA_ON)
    }

    pub fn set_antenna_gain(&mut self, _gain: u8) -> Result<(), COM::Error> {
        Err(Error::Unsupported("antenna gain control"))
    }

    pub fn antenna_gain(&mut self) -> Result<u8, COM::Error> {
        Err(Error::Unsupported("antenna gain control"))
    }

    pub fn self_test(&mut self) -> Result<bool, COM::Error> {
        Err(Error::Unsupported("digital self-test"))
    }

    pub fn power_down(&mut self) -> Result<(), COM::Error> {
        Err(Error::Unsupported("power-down mode"))
    }

    pub fn power_up(&mut self) -> Result<(), COM::Error> {
        Err(Error::Unsupported("power-down mode"))
    }

    /// Runs `probe` up to `poll.attempts` times, sleeping `poll.delay` after
    /// every miss. `Ok(None)` means the budget ran out.
    fn poll<T>(
        &mut self,
        poll: Poll,
        mut probe: impl FnMut(&mut Self) -> Result<Option<T>, COM::Error>,
    ) -> Result<Option<T>, COM::Error> {
        for _ in 0..poll.attempts {
            if let Some(value) = probe(self)? {
                return Ok(Some(value));
            }
            self.clock.sleep(poll.delay);
        }
        Ok(None)
    }
}
