//! Register-level stand-in for an MFRC522 with one MIFARE Classic tag in
//! front of the antenna, plus a manually driven clock.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::clock::Clock;
use crate::com::Com;
use crate::config::Config;
use crate::error::WritePhase;
use crate::irq::{Edge, IrqLine, IrqNotifier, NoIrq};
use crate::mfrc522::Mfrc522;
use crate::picc::{Key, TagBlock, DEFAULT_KEY};
use crate::register::{ChipCommand, Register};

/// CRC_A (ISO14443-3 annex B), low byte first.
pub(crate) fn crc_a(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &b in data {
        let mut ch = b ^ (crc as u8);
        ch ^= ch << 4;
        let ch = u16::from(ch);
        crc = (crc >> 8) ^ (ch << 8) ^ (ch << 3) ^ (ch >> 4);
    }
    [crc as u8, (crc >> 8) as u8]
}

const NAK: u8 = 0x04;
const ACK: u8 = 0x0A;
const BLOCKS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SimError;

struct Card {
    uid: [u8; 4],
    key: Key,
    blocks: [TagBlock; BLOCKS],
    pending_write: Option<u8>,
}

fn trailer_template() -> TagBlock {
    let mut trailer = [0xFF; 16];
    trailer[6..10].copy_from_slice(&[0xFF, 0x07, 0x80, 0x69]);
    trailer
}

#[derive(Default)]
struct State {
    regs: Vec<u8>,
    fifo: VecDeque<u8>,
    card: Option<Card>,
    notifier: Option<IrqNotifier>,

    error_status: u8,
    suppress_completion: bool,
    stall_crc: bool,
    corrupt_bcc: bool,
    nak: Option<WritePhase>,
    truncate_reads: Option<usize>,
    fail_write_at: Option<usize>,
    writes_since: usize,
    fail_reads: HashSet<u8>,
    fail_writes: HashSet<u8>,
    fail_irq_arm: bool,

    reads: HashMap<u8, usize>,
    transceives: usize,
    last_frame: Vec<u8>,
    last_auth: Option<(u8, u8)>,
    status2_writes: usize,
    soft_resets: usize,
}

impl State {
    fn new() -> Self {
        Self {
            regs: vec![0; 64],
            ..Self::default()
        }
    }

    fn read(&mut self, reg: u8) -> Result<u8, SimError> {
        if self.fail_reads.contains(&reg) {
            return Err(SimError);
        }
        *self.reads.entry(reg).or_default() += 1;
        let value = match reg {
            r if r == Register::FIFODataReg as u8 => self.fifo.pop_front().unwrap_or(0),
            r if r == Register::FIFOLevelReg as u8 => self.fifo.len().min(0x7F) as u8,
            r if r == Register::ErrorReg as u8 => self.error_status,
            r if r == Register::VersionReg as u8 => 0x92,
            r => self.regs[usize::from(r)],
        };
        Ok(value)
    }

    fn write(&mut self, reg: u8, value: u8) {
        let idx = usize::from(reg);
        match reg {
            r if r == Register::CommandReg as u8 => {
                self.regs[idx] = value;
                self.command(value & 0x0F);
            }
            r if r == Register::ComIrqReg as u8 || r == Register::DivIrqReg as u8 => {
                if value & 0x80 != 0 {
                    self.regs[idx] |= value & 0x7F;
                } else {
                    self.regs[idx] &= !(value & 0x7F);
                }
            }
            r if r == Register::FIFOLevelReg as u8 => {
                if value & 0x80 != 0 {
                    self.fifo.clear();
                }
            }
            r if r == Register::FIFODataReg as u8 => self.fifo.push_back(value),
            r if r == Register::BitFramingReg as u8 => {
                self.regs[idx] = value;
                let transceiving = self.regs[Register::CommandReg as usize] & 0x0F
                    == ChipCommand::Transceive as u8;
                if value & 0x80 != 0 && transceiving {
                    self.transceive(value & 0x07 == 7);
                }
            }
            r if r == Register::Status2Reg as u8 => {
                self.status2_writes += 1;
                self.regs[idx] = value;
            }
            _ => self.regs[idx] = value,
        }
    }

    fn command(&mut self, command: u8) {
        if command == ChipCommand::CalcCRC as u8 {
            if !self.stall_crc {
                let data: Vec<u8> = self.fifo.drain(..).collect();
                let crc = crc_a(&data);
                self.regs[Register::CRCResultRegLow as usize] = crc[0];
                self.regs[Register::CRCResultRegHigh as usize] = crc[1];
                self.regs[Register::DivIrqReg as usize] |= 0x04;
            }
        } else if command == ChipCommand::MFAuthent as u8 {
            self.authenticate();
        } else if command == ChipCommand::SoftReset as u8 {
            self.soft_resets += 1;
            self.regs = vec![0; 64];
            self.fifo.clear();
            self.regs[Register::CommandReg as usize] = 0x20;
        }
    }

    fn complete(&mut self, bits: u8) {
        if !self.suppress_completion {
            self.regs[Register::ComIrqReg as usize] |= bits;
        }
    }

    fn authenticate(&mut self) {
        let frame: Vec<u8> = self.fifo.drain(..).collect();
        if frame.len() == 12 {
            self.last_auth = Some((frame[0], frame[1]));
            if let Some(card) = &self.card {
                if frame[2..8] == card.key[..] && frame[8..12] == card.uid[..] {
                    self.regs[Register::Status2Reg as usize] |= 0x08;
                }
            }
        }
        self.complete(0x10);
    }

    fn transceive(&mut self, short_frame: bool) {
        let mut frame: Vec<u8> = self.fifo.drain(..).collect();
        if short_frame {
            // Only the last byte goes out as a 7-bit frame.
            frame = frame.last().copied().into_iter().collect();
        }
        self.transceives += 1;
        self.last_frame = frame.clone();

        match self.reply(&frame) {
            Some((reply, last_bits)) => {
                self.fifo.extend(reply);
                self.regs[Register::ControlReg as usize] = last_bits;
                self.complete(0x30);
                if short_frame {
                    if let Some(notifier) = &self.notifier {
                        notifier.notify();
                    }
                }
            }
            None => {
                self.regs[Register::ControlReg as usize] = 0;
                self.complete(0x01);
            }
        }
    }

    fn reply(&mut self, frame: &[u8]) -> Option<(Vec<u8>, u8)> {
        let crypto = self.regs[Register::Status2Reg as usize] & 0x08 != 0;
        let corrupt_bcc = self.corrupt_bcc;
        let nak = self.nak;
        let truncate = self.truncate_reads;
        let card = self.card.as_mut()?;
        let crc_ok = |f: &[u8]| f.len() >= 2 && crc_a(&f[..f.len() - 2])[..] == f[f.len() - 2..];

        match frame {
            [0x26] | [0x52] => Some((vec![0x04, 0x00], 0)),
            [0x93, 0x20] => {
                let uid = card.uid;
                let mut bcc = uid.iter().fold(0, |acc, b| acc ^ b);
                if corrupt_bcc {
                    bcc ^= 0x01;
                }
                Some((vec![uid[0], uid[1], uid[2], uid[3], bcc], 0))
            }
            [0x93, 0x70, ..] if frame.len() == 9 && crc_ok(frame) => {
                if frame[2..6] != card.uid[..] {
                    return None;
                }
                let sak = 0x08;
                let crc = crc_a(&[sak]);
                Some((vec![sak, crc[0], crc[1]], 0))
            }
            [0x30, addr, _, _] if crc_ok(frame) => {
                if !crypto {
                    return Some((vec![NAK], 4));
                }
                let block = card.blocks[usize::from(*addr) % BLOCKS];
                let crc = crc_a(&block);
                let mut reply = block.to_vec();
                reply.extend_from_slice(&crc);
                if let Some(len) = truncate {
                    reply.truncate(len);
                }
                Some((reply, 0))
            }
            [0xA0, addr, _, _] if crc_ok(frame) => {
                if !crypto || nak == Some(WritePhase::Command) {
                    return Some((vec![NAK], 4));
                }
                card.pending_write = Some(*addr);
                Some((vec![ACK], 4))
            }
            _ if frame.len() == 18 && card.pending_write.is_some() && crc_ok(frame) => {
                let addr = card.pending_write.take()?;
                if nak == Some(WritePhase::Data) {
                    return Some((vec![NAK], 4));
                }
                card.blocks[usize::from(addr) % BLOCKS].copy_from_slice(&frame[..16]);
                Some((vec![ACK], 4))
            }
            _ => None,
        }
    }
}

/// Handle for scripting the simulated chip and inspecting what it saw.
#[derive(Clone)]
pub(crate) struct SimChip {
    state: Rc<RefCell<State>>,
    now: Rc<Cell<Duration>>,
    step: Rc<Cell<Duration>>,
}

pub(crate) struct SimCom {
    state: Rc<RefCell<State>>,
}

pub(crate) struct SimIrq {
    state: Rc<RefCell<State>>,
}

/// Reset line that always reads high.
pub(crate) struct SimPin;

/// Clock that only moves when slept on, or by `step` whenever elapsed time is
/// queried.
#[derive(Clone)]
pub(crate) struct FakeClock {
    now: Rc<Cell<Duration>>,
    step: Rc<Cell<Duration>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            step: Rc::new(Cell::new(Duration::from_millis(1))),
        }
    }
}

impl Clock for FakeClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.now.get()
    }

    fn elapsed(&self, since: Duration) -> Duration {
        self.now.set(self.now.get() + self.step.get());
        self.now.get() - since
    }

    fn sleep(&mut self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Com for SimCom {
    type Error = SimError;

    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, SimError> {
        let first = match tx.first() {
            Some(first) => *first,
            None => return Ok(Vec::new()),
        };
        if first & 0x80 == 0 {
            self.write(tx)?;
            return Ok(vec![0; tx.len()]);
        }
        let mut state = self.state.borrow_mut();
        let mut rx = vec![0];
        for addr in &tx[..tx.len() - 1] {
            rx.push(state.read((addr >> 1) & 0x3F)?);
        }
        Ok(rx)
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        let index = state.writes_since;
        state.writes_since += 1;
        if state.fail_write_at == Some(index) {
            return Err(SimError);
        }
        let reg = match tx.first() {
            Some(addr) => (addr >> 1) & 0x3F,
            None => return Ok(()),
        };
        if state.fail_writes.contains(&reg) {
            return Err(SimError);
        }
        for &value in &tx[1..] {
            state.write(reg, value);
        }
        Ok(())
    }
}

impl IrqLine for SimIrq {
    type Error = SimError;

    fn arm(&mut self, _edge: Edge, notifier: IrqNotifier) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        if state.fail_irq_arm {
            return Err(SimError);
        }
        state.notifier = Some(notifier);
        Ok(())
    }
}

impl InputPin for SimPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(true)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(false)
    }
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

pub(crate) type SimDriver = Mfrc522<SimCom, SimPin, SimIrq, FakeClock>;
pub(crate) type PollModeDriver = Mfrc522<SimCom, SimPin, NoIrq, FakeClock>;

impl SimChip {
    pub(crate) fn new() -> Self {
        let clock = FakeClock::default();
        Self {
            state: Rc::new(RefCell::new(State::new())),
            now: clock.now,
            step: clock.step,
        }
    }

    /// An initialized driver wired to a fresh simulated chip.
    pub(crate) fn driver(config: Config) -> (SimDriver, SimChip) {
        let sim = SimChip::new();
        let mfrc = Mfrc522::initialize(sim.com(), SimPin, sim.irq(), sim.clock(), config)
            .expect("simulated chip initializes");
        (mfrc, sim)
    }

    /// Like [`SimChip::driver`] but wired without an IRQ line.
    pub(crate) fn poll_mode_driver(config: Config) -> (PollModeDriver, SimChip) {
        let sim = SimChip::new();
        let mfrc = Mfrc522::initialize(sim.com(), SimPin, NoIrq, sim.clock(), config)
            .expect("simulated chip initializes");
        (mfrc, sim)
    }

    pub(crate) fn com(&self) -> SimCom {
        SimCom {
            state: self.state.clone(),
        }
    }

    pub(crate) fn irq(&self) -> SimIrq {
        SimIrq {
            state: self.state.clone(),
        }
    }

    pub(crate) fn clock(&self) -> FakeClock {
        FakeClock {
            now: self.now.clone(),
            step: self.step.clone(),
        }
    }

    pub(crate) fn clock_now(&self) -> Duration {
        self.now.get()
    }

    pub(crate) fn set_clock_step(&self, step: Duration) {
        self.step.set(step);
    }

    pub(crate) fn insert_card(&self, uid: [u8; 4]) {
        let mut blocks = [[0u8; 16]; BLOCKS];
        for trailer in blocks.iter_mut().skip(3).step_by(4) {
            *trailer = trailer_template();
        }
        self.state.borrow_mut().card = Some(Card {
            uid,
            key: DEFAULT_KEY,
            blocks,
            pending_write: None,
        });
    }

    pub(crate) fn register(&self, reg: Register) -> u8 {
        self.state.borrow().regs[reg as usize]
    }

    pub(crate) fn block(&self, addr: u8) -> TagBlock {
        let state = self.state.borrow();
        state.card.as_ref().expect("card inserted").blocks[usize::from(addr)]
    }

    pub(crate) fn trailer_template(&self) -> TagBlock {
        trailer_template()
    }

    pub(crate) fn crypto_on(&self) -> bool {
        self.register(Register::Status2Reg) & 0x08 != 0
    }

    /// Fails write number `index`, counting from now.
    pub(crate) fn fail_write_at(&self, index: usize) {
        let mut state = self.state.borrow_mut();
        state.writes_since = 0;
        state.fail_write_at = Some(index);
    }

    pub(crate) fn fail_reads_of(&self, reg: Register, fail: bool) {
        let mut state = self.state.borrow_mut();
        if fail {
            state.fail_reads.insert(reg as u8);
        } else {
            state.fail_reads.remove(&(reg as u8));
        }
    }

    pub(crate) fn fail_writes_of(&self, reg: Register, fail: bool) {
        let mut state = self.state.borrow_mut();
        if fail {
            state.fail_writes.insert(reg as u8);
        } else {
            state.fail_writes.remove(&(reg as u8));
        }
    }

    pub(crate) fn fail_irq_arm(&self, fail: bool) {
        self.state.borrow_mut().fail_irq_arm = fail;
    }

    pub(crate) fn set_error_status(&self, status: u8) {
        self.state.borrow_mut().error_status = status;
    }

    pub(crate) fn suppress_completion(&self, suppress: bool) {
        self.state.borrow_mut().suppress_completion = suppress;
    }

    pub(crate) fn stall_crc(&self, stall: bool) {
        self.state.borrow_mut().stall_crc = stall;
    }

    pub(crate) fn corrupt_bcc(&self, corrupt: bool) {
        self.state.borrow_mut().corrupt_bcc = corrupt;
    }

    pub(crate) fn nak_write(&self, phase: WritePhase) {
        self.state.borrow_mut().nak = Some(phase);
    }

    pub(crate) fn truncate_reads(&self, len: usize) {
        self.state.borrow_mut().truncate_reads = Some(len);
    }

    pub(crate) fn reads_of(&self, reg: Register) -> usize {
        self.state
            .borrow()
            .reads
            .get(&(reg as u8))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn transceives(&self) -> usize {
        self.state.borrow().transceives
    }

    pub(crate) fn last_frame(&self) -> Vec<u8> {
        self.state.borrow().last_frame.clone()
    }

    pub(crate) fn last_auth(&self) -> Option<(u8, u8)> {
        self.state.borrow().last_auth
    }

    pub(crate) fn stop_crypto_writes(&self) -> usize {
        self.state.borrow().status2_writes
    }

    pub(crate) fn soft_resets(&self) -> usize {
        self.state.borrow().soft_resets
    }
}
