use log::debug;

use crate::clock::Clock;
use crate::com::Com;
use crate::error::Result;
use crate::irq::IrqLine;
use crate::mfrc522::Mfrc522;
use crate::register::Register;

/// Registers worth looking at when the chip misbehaves. FIFODataReg is left
/// out since reading it consumes FIFO contents.
const DUMPED: [Register; 38] = [
    Register::CommandReg,
    Register::ComIEnReg,
    Register::DivIEnReg,
    Register::ComIrqReg,
    Register::DivIrqReg,
    Register::ErrorReg,
    Register::Status1Reg,
    Register::Status2Reg,
    Register::FIFOLevelReg,
    Register::WaterLevelReg,
    Register::ControlReg,
    Register::BitFramingReg,
    Register::CollReg,
    Register::ModeReg,
    Register::TxModeReg,
    Register::RxModeReg,
    Register::TxControlReg,
    Register::TxASKReg,
    Register::TxSelReg,
    Register::RxSelReg,
    Register::RxThresholdReg,
    Register::DemodReg,
    Register::MfTxReg,
    Register::MfRxReg,
    Register::SerialSpeedReg,
    Register::CRCResultRegHigh,
    Register::CRCResultRegLow,
    Register::ModWidthReg,
    Register::RFCfgReg,
    Register::GsNReg,
    Register::CWGsPReg,
    Register::ModGsPReg,
    Register::TModeReg,
    Register::TPrescalerReg,
    Register::TReloadRegHigh,
    Register::TReloadRegLow,
    Register::TCounterValRegHigh,
    Register::TCounterValRegLow,
];

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Snapshot of the configuration and status registers.
    pub fn dump_registers(&mut self) -> Result<Vec<(Register, u8)>, COM::Error> {
        let mut dump = Vec::with_capacity(DUMPED.len());
        for &reg in DUMPED.iter() {
            let value = self.read_register(reg)?;
            debug!("{:?}: {:02x?}", reg, value);
            dump.push((reg, value));
        }
        Ok(dump)
    }
}
