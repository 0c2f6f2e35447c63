use log::{debug, warn};

use super::command::FifoCommand;
use super::Mfrc522;
use crate::clock::Clock;
use crate::com::Com;
use crate::error::{Error, ProtocolError, Result};
use crate::irq::IrqLine;
use crate::picc::{self, Command, Uid, NVB_ANTICOLLISION, NVB_SELECT};
use crate::register::Register;

/// Reply length at which the SAK byte is not trusted.
const OVERSIZED_SELECT_REPLY: usize = 24;

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Waits for a tag, runs cascade-level-1 anti-collision and selects it.
    ///
    /// Interrupt state is cleared again on every exit path. Tags with a
    /// cascade tag in their first UID byte are refused.
    pub fn select_card(&mut self) -> Result<Uid, COM::Error> {
        let result = self.try_select_card();
        if let Err(e) = self.clear_irq() {
            warn!("clearing IRQ state after selection failed: {:?}", e);
        }
        result
    }

    fn try_select_card(&mut self) -> Result<Uid, COM::Error> {
        self.wait_for_card(self.config.irq_timeout)?;
        // Only run for its bit framing and FIFO side effects.
        self.request_probe()?;

        let frame = self.anticollision()?;
        let sak = self.select_uid(&frame)?;
        if frame[0] == Command::CT as u8 {
            return Err(Error::Unsupported("cascade level 2/3 UID"));
        }

        let uid = Uid::new([frame[0], frame[1], frame[2], frame[3]], sak);
        debug!("selected {:02x?}, SAK {:#04x}", uid.as_bytes(), sak);
        Ok(uid)
    }

    /// Sends a 7-bit REQA and returns how many bytes came back (2 for the
    /// ATQA of a tag in the field).
    pub fn request_probe(&mut self) -> Result<usize, COM::Error> {
        self.write_register(Register::BitFramingReg, 0x07)?;
        let response = self.execute(FifoCommand::Transceive, &[Command::REQA as u8])?;
        Ok(response.data.len())
    }

    /// Cascade level 1 anti-collision: returns the four UID bytes followed
    /// by their BCC.
    pub fn anticollision(&mut self) -> Result<[u8; 5], COM::Error> {
        self.write_register(Register::BitFramingReg, 0x00)?;
        let response = self.execute(
            FifoCommand::Transceive,
            &[Command::SelCl1 as u8, NVB_ANTICOLLISION],
        )?;

        let frame =
            <[u8; 5]>::try_from(response.data.as_slice()).map_err(|_| ProtocolError::Length {
                expected: 5,
                actual: response.data.len(),
            })?;
        if !picc::is_valid_uid(&frame) {
            return Err(Error::Bcc {
                expected: picc::bcc(&[frame[0], frame[1], frame[2], frame[3]]),
                actual: frame[4],
            });
        }
        Ok(frame)
    }

    /// Cascade levels 2 and 3 (7 and 10 byte UIDs) are not implemented.
    pub fn anticollision_cascade(&mut self, level: u8) -> Result<[u8; 5], COM::Error> {
        match level {
            1 => self.anticollision(),
            _ => Err(Error::Unsupported("cascade level 2/3 UID")),
        }
    }

    /// Selects the tag answering to `frame` (UID + BCC) and returns its SAK.
    pub fn select_uid(&mut self, frame: &[u8; 5]) -> Result<u8, COM::Error> {
        let mut data = Vec::with_capacity(9);
        data.push(Command::SelCl1 as u8);
        data.push(NVB_SELECT);
        data.extend_from_slice(frame);
        let crc = self.compute_crc(&data)?;
        data.extend_from_slice(&crc);

        let response = self.execute(FifoCommand::Transceive, &data)?;
        if response.data.len() == OVERSIZED_SELECT_REPLY {
            return Ok(0);
        }
        response
            .data
            .first()
            .copied()
            .ok_or_else(|| ProtocolError::EmptyResponse.into())
    }
}
