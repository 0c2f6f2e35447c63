use super::{Mfrc522, CRC_IRQ, FLUSH_BUFFER};
use crate::clock::Clock;
use crate::com::Com;
use crate::error::{Error, Result};
use crate::irq::IrqLine;
use crate::register::{ChipCommand, Register, RegisterWrite};

use super::command::{FifoCommand, Response};

const CRC_SETUP: [RegisterWrite; 4] = [
    RegisterWrite::new(Register::CommandReg, ChipCommand::Idle as u8),
    RegisterWrite::new(Register::DivIEnReg, CRC_IRQ),
    // Set1 clear: drops a CRCIRq left over from the previous calculation.
    RegisterWrite::new(Register::DivIrqReg, CRC_IRQ),
    RegisterWrite::new(Register::FIFOLevelReg, FLUSH_BUFFER),
];

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// CRC_A of `data` computed by the chip's coprocessor, low byte first.
    pub fn compute_crc(&mut self, data: &[u8]) -> Result<[u8; 2], COM::Error> {
        self.write_sequence(&CRC_SETUP)?;
        self.write_register_bytes(Register::FIFODataReg, data)?;
        self.write_register(Register::CommandReg, ChipCommand::CalcCRC.into())?;

        let done = self.poll(self.config.crc_poll, |mfrc| {
            let irq = mfrc.read_register(Register::DivIrqReg)?;
            Ok((irq & CRC_IRQ != 0).then_some(()))
        })?;
        if done.is_none() {
            return Err(Error::Timeout("CRC coprocessor"));
        }

        self.write_register(Register::CommandReg, ChipCommand::Idle.into())?;
        let res_low = self.read_register(Register::CRCResultRegLow)?;
        let res_high = self.read_register(Register::CRCResultRegHigh)?;
        Ok([res_low, res_high])
    }

    /// Sends `cmd addr CRC_A`, the framing of every MIFARE block command.
    pub fn verify_crc(&mut self, cmd: u8, addr: u8) -> Result<Response, COM::Error> {
        let crc = self.compute_crc(&[cmd, addr])?;
        self.execute(FifoCommand::Transceive, &[cmd, addr, crc[0], crc[1]])
    }
}
