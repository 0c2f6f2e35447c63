use log::{debug, warn};

use super::command::{FifoCommand, Response};
use super::{Mfrc522, MF_CRYPTO1_ON};
use crate::clock::Clock;
use crate::com::Com;
use crate::error::{Error, ProtocolError, Result, WritePhase};
use crate::irq::IrqLine;
use crate::picc::{AuthMode, BlockAddress, Command, Key, TagBlock, Uid, ACK};
use crate::register::Register;

/// Result of an MFAuthent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// MFCrypto1On is set.
    Ok,
    /// Status2Reg could not be read back.
    ReadFailure,
    /// MFCrypto1On stayed clear.
    Failure,
}

/// An authenticated sector of the selected card.
///
/// Only handed out inside [`Mfrc522::with_session`], which stops the crypto
/// unit once the closure returns.
pub struct Session<'a, COM, RST, IRQ, CLK> {
    mfrc: &'a mut Mfrc522<COM, RST, IRQ, CLK>,
    uid: Uid,
}

impl<'a, COM, RST, IRQ, CLK> Session<'a, COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn read(&mut self, addr: BlockAddress) -> Result<TagBlock, COM::Error> {
        self.mfrc.read_tag(addr.into())
    }

    pub fn write(&mut self, addr: BlockAddress, data: &TagBlock) -> Result<(), COM::Error> {
        self.mfrc.write_tag(addr.into(), data)
    }
}

fn check_ack<E>(response: &Response, phase: WritePhase) -> Result<(), E> {
    let first = response
        .data
        .first()
        .ok_or(ProtocolError::EmptyResponse)?;
    let nibble = first & 0x0F;
    if nibble != ACK {
        return Err(ProtocolError::Nak { phase, nibble }.into());
    }
    Ok(())
}

impl<COM, RST, IRQ, CLK> Mfrc522<COM, RST, IRQ, CLK>
where
    COM: Com,
    IRQ: IrqLine,
    CLK: Clock,
{
    /// Runs MFAuthent for block `addr` of the selected card and reports
    /// whether the crypto unit came up.
    pub fn authenticate(
        &mut self,
        mode: AuthMode,
        addr: u8,
        key: &Key,
        uid: &Uid,
    ) -> Result<AuthStatus, COM::Error> {
        let mut data = Vec::with_capacity(12);
        data.push(mode.into());
        data.push(addr);
        data.extend_from_slice(key);
        data.extend_from_slice(uid.as_bytes());
        self.execute(FifoCommand::Authenticate, &data)?;

        let status = match self.read_register(Register::Status2Reg) {
            Ok(status2) if status2 & MF_CRYPTO1_ON != 0 => AuthStatus::Ok,
            Ok(_) => AuthStatus::Failure,
            Err(e) => {
                warn!("reading Status2Reg after MFAuthent failed: {:?}", e);
                AuthStatus::ReadFailure
            }
        };
        debug!("{:?} authentication of block {} -> {:?}", mode, addr, status);
        Ok(status)
    }

    /// Leaves the authenticated state. Harmless when no session is open.
    pub fn stop_crypto(&mut self) -> Result<(), COM::Error> {
        self.clear_bitmask(Register::Status2Reg, MF_CRYPTO1_ON)
    }

    /// Reads block `addr` of the authenticated sector.
    pub fn read_tag(&mut self, addr: u8) -> Result<TagBlock, COM::Error> {
        let response = self.verify_crc(Command::MfRead as u8, addr)?;
        let block =
            TagBlock::try_from(response.data.as_slice()).map_err(|_| ProtocolError::Length {
                expected: 16,
                actual: response.data.len(),
            })?;
        Ok(block)
    }

    /// Writes block `addr` of the authenticated sector. The tag must ACK both
    /// the command frame and the data frame.
    pub fn write_tag(&mut self, addr: u8, data: &TagBlock) -> Result<(), COM::Error> {
        let response = self.verify_crc(Command::MfWrite as u8, addr)?;
        check_ack::<COM::Error>(&response, WritePhase::Command)?;

        let crc = self.compute_crc(data)?;
        let mut frame = Vec::with_capacity(18);
        frame.extend_from_slice(data);
        frame.extend_from_slice(&crc);
        let response = self.execute(FifoCommand::Transceive, &frame)?;
        check_ack(&response, WritePhase::Data)
    }

    /// Selects the card, authenticates the trailer of `sector` and runs `op`
    /// inside the session.
    ///
    /// The crypto unit is stopped exactly once afterwards, whatever happened.
    /// If `op` (or selection, or authentication) failed, that error wins and
    /// a failing stop is only logged; otherwise a failing stop is returned.
    pub fn with_session<T>(
        &mut self,
        mode: AuthMode,
        sector: u8,
        key: &Key,
        op: impl FnOnce(&mut Session<'_, COM, RST, IRQ, CLK>) -> Result<T, COM::Error>,
    ) -> Result<T, COM::Error> {
        let trailer = BlockAddress::trailer::<COM::Error>(sector)?;
        let primary = match self.open_session(mode, trailer, key) {
            Ok(uid) => op(&mut Session {
                mfrc: &mut *self,
                uid,
            }),
            Err(e) => Err(e),
        };
        self.finish(primary)
    }

    fn open_session(
        &mut self,
        mode: AuthMode,
        trailer: BlockAddress,
        key: &Key,
    ) -> Result<Uid, COM::Error> {
        let uid = self.select_card()?;
        match self.authenticate(mode, trailer.into(), key, &uid)? {
            AuthStatus::Ok => Ok(uid),
            status => Err(Error::Auth(status)),
        }
    }

    fn finish<T>(&mut self, primary: Result<T, COM::Error>) -> Result<T, COM::Error> {
        let cleanup = self.stop_crypto();
        match (primary, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(stop)) => {
                warn!("stopping crypto unit after {:?} failed too: {:?}", e, stop);
                Err(e)
            }
        }
    }

    /// UID of the card in the field.
    pub fn read_uid(&mut self) -> Result<Uid, COM::Error> {
        let primary = self.select_card();
        self.finish(primary)
    }

    /// Reads the trailer block (keys and access bits) of `sector`.
    pub fn read_sector_trailer(
        &mut self,
        mode: AuthMode,
        sector: u8,
        key: &Key,
    ) -> Result<TagBlock, COM::Error> {
        let trailer = BlockAddress::trailer::<COM::Error>(sector)?;
        self.with_session(mode, sector, key, |session| session.read(trailer))
    }

    /// Reads data block `block % 3` of `sector`.
    pub fn read_block(
        &mut self,
        mode: AuthMode,
        sector: u8,
        block: u8,
        key: &Key,
    ) -> Result<TagBlock, COM::Error> {
        let addr = BlockAddress::data::<COM::Error>(sector, block)?;
        self.with_session(mode, sector, key, |session| session.read(addr))
    }

    /// Writes data block `block % 3` of `sector`.
    pub fn write_block(
        &mut self,
        mode: AuthMode,
        sector: u8,
        block: u8,
        data: &TagBlock,
        key: &Key,
    ) -> Result<(), COM::Error> {
        let addr = BlockAddress::data::<COM::Error>(sector, block)?;
        self.with_session(mode, sector, key, |session| session.write(addr, data))
    }
}
