use std::time::Duration;

use log::debug;

use super::Mfrc522;
use crate::clock::Clock;
use crate::com::Com;
use crate::error::{Error, Result};
use crate::irq::{self, Edge, IrqLine, IrqReceiver};
use crate::picc;
use crate::register::{ChipCommand, Register, RegisterWrite};

/// Outcome of [`Mfrc522::wait_for_card`]. Neither variant is an error; a
/// quiet field is the common case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// A tag answered a REQA.
    Detected,
    /// The timeout elapsed without an answer.
    Quiet,
}

/// RxIRq in ComIrqReg.
const RX_IRQ: u8 = 0x20;

const ARM_IRQ: [RegisterWrite; 2] = [
    // Set1 clear of every flag, so a stale RxIRq cannot count as a tag.
    RegisterWrite::new(Register::ComIrqReg, 0x7F),
    // IRqInv | RxIEn
    RegisterWrite::new(Register::ComIEnReg, 0xA0),
];

const SEND_REQA: [RegisterWrite; 3] = [
    RegisterWrite::new(Register::FIFODataReg, picc::Command::REQA as u8),
    RegisterWrite::new(Register::CommandReg, ChipCommand::Transceive as u8),
    // StartSend, 7-bit short frame
    RegisterWrite::new(Register::BitFramingReg, 0x87),
];

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Sends REQA repeatedly until a tag answers or `timeout` elapses.
    ///
    /// Each REQA gets `config.presence_window` to be answered, checked every
    /// `config.presence_poll` through an IRQ edge or RxIRq in ComIrqReg. With
    /// [`NoIrq`](crate::NoIrq) only the register check applies.
    pub fn wait_for_card(&mut self, timeout: Duration) -> Result<Presence, COM::Error> {
        let (notifier, events) = irq::channel();
        self.irq
            .arm(Edge::Toggle, notifier)
            .map_err(|e| Error::<COM::Error>::Irq(Box::new(e)))?;
        self.write_sequence(&ARM_IRQ)?;

        let start = self.clock.now();
        while self.clock.elapsed(start) < timeout {
            self.write_sequence(&SEND_REQA)?;
            if self.await_answer(&events)? {
                debug!("card entered the field");
                return Ok(Presence::Detected);
            }
        }
        Ok(Presence::Quiet)
    }

    fn await_answer(&mut self, events: &IrqReceiver) -> Result<bool, COM::Error> {
        let window = self.config.presence_window;
        let start = self.clock.now();
        loop {
            if events.take() {
                return Ok(true);
            }
            if self.read_register(Register::ComIrqReg)? & RX_IRQ != 0 {
                return Ok(true);
            }
            let waited = self.clock.elapsed(start);
            if waited >= window {
                return Ok(false);
            }
            self.clock.sleep(self.config.presence_poll.min(window - waited));
        }
    }

    /// Resets the interrupt state without waiting for a card.
    pub fn clear_irq(&mut self) -> Result<(), COM::Error> {
        self.wait_for_card(Duration::ZERO).map(drop)
    }
}
