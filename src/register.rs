/// Registers of the MFRC522 register file (datasheet chapter 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    // Reserved         = 0x00,
    CommandReg = 0x01,
    ComIEnReg = 0x02,
    DivIEnReg = 0x03,
    ComIrqReg = 0x04,
    DivIrqReg = 0x05,
    ErrorReg = 0x06,
    Status1Reg = 0x07,
    Status2Reg = 0x08,
    FIFODataReg = 0x09,
    FIFOLevelReg = 0x0A,
    WaterLevelReg = 0x0B,
    ControlReg = 0x0C,
    BitFramingReg = 0x0D,
    CollReg = 0x0E,
    // Reserved         = 0x0F,
    // Reserved         = 0x10,
    ModeReg = 0x11,
    TxModeReg = 0x12,
    RxModeReg = 0x13,
    TxControlReg = 0x14,
    TxASKReg = 0x15,
    TxSelReg = 0x16,
    RxSelReg = 0x17,
    RxThresholdReg = 0x18,
    DemodReg = 0x19,
    // Reserved         = 0x1A,
    // Reserved         = 0x1B,
    MfTxReg = 0x1C,
    MfRxReg = 0x1D,
    // Reserved         = 0x1E,
    SerialSpeedReg = 0x1F,
    // Reserved         = 0x20,
    CRCResultRegHigh = 0x21,
    CRCResultRegLow = 0x22,
    // Reserved         = 0x23,
    ModWidthReg = 0x24,
    // Reserved         = 0x25,
    RFCfgReg = 0x26,
    GsNReg = 0x27,
    CWGsPReg = 0x28,
    ModGsPReg = 0x29,
    TModeReg = 0x2A,
    TPrescalerReg = 0x2B,
    TReloadRegHigh = 0x2C,
    TReloadRegLow = 0x2D,
    TCounterValRegHigh = 0x2E,
    TCounterValRegLow = 0x2F,
    // Reserved         = 0x30,
    TestSel1Reg = 0x31,
    TestSel2Reg = 0x32,
    TestPinEnReg = 0x33,
    TestPinValueReg = 0x34,
    TestBusReg = 0x35,
    AutoTestReg = 0x36,
    VersionReg = 0x37,
    AnalogTestReg = 0x38,
    TestDAC1Reg = 0x39,
    TestDAC2Reg = 0x3A,
    TestADCReg = 0x3B,
    // Reserved         = 0x3C-0x3F,
}

impl From<Register> for u8 {
    #[inline(always)]
    fn from(variant: Register) -> Self {
        variant as _
    }
}

const R: u8 = 1 << 7;
const W: u8 = 0 << 7;

impl Register {
    /// SPI address byte for reading this register. Bit 0 is always clear.
    pub fn read_address(self) -> u8 {
        ((self as u8) << 1) | R
    }

    /// SPI address byte for writing this register.
    pub fn write_address(self) -> u8 {
        ((self as u8) << 1) | W
    }
}

/// Commands understood by the chip's command register (datasheet chapter 10).
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChipCommand {
    Idle = 0b0000,
    Mem = 0b0001,
    GenerateRandomId = 0b0010,
    CalcCRC = 0b0011,
    Transmit = 0b0100,
    NoCmdChange = 0b0111,
    Receive = 0b1000,
    Transceive = 0b1100,
    MFAuthent = 0b1110,
    SoftReset = 0b1111,
}

impl From<ChipCommand> for u8 {
    #[inline(always)]
    fn from(variant: ChipCommand) -> Self {
        variant as _
    }
}

/// A single step of a register script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub register: Register,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(register: Register, value: u8) -> Self {
        Self { register, value }
    }
}

/// Timer and modulation setup applied after a soft reset.
///
/// TAuto with a prescaler of 0x0D3E and a reload of 30 gives the receiver a
/// timeout of roughly 25 ms; TxASKReg forces 100% ASK and ModeReg presets the
/// CRC coprocessor to 0x6363 as ISO14443-3 requires.
pub const INIT_SEQUENCE: [RegisterWrite; 6] = [
    RegisterWrite::new(Register::TModeReg, 0x8D),
    RegisterWrite::new(Register::TPrescalerReg, 0x3E),
    RegisterWrite::new(Register::TReloadRegHigh, 30),
    RegisterWrite::new(Register::TReloadRegLow, 0),
    RegisterWrite::new(Register::TxASKReg, 0x40),
    RegisterWrite::new(Register::ModeReg, 0x3D),
];
