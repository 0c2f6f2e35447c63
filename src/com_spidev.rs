use super::com::Com;
use spidev::{Spidev, SpidevOptions, SpidevTransfer, SpiModeFlags};
use std::io;
use std::io::prelude::*;

/// [`Com`] straight over a Linux `/dev/spidevX.Y` node.
pub struct ComSpidev {
    spi: Spidev,
}

impl ComSpidev {
    pub fn new(spi: Spidev) -> Self {
        Self { spi }
    }

    /// Opens `path` in SPI mode 0, 8 bits per word, at `max_speed_hz`.
    pub fn open(path: &str, max_speed_hz: u32) -> io::Result<Self> {
        let mut spi = Spidev::open(path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(max_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;
        Ok(Self { spi })
    }
}

impl Com for ComSpidev {
    type Error = io::Error;

    fn exchange(&mut self, tx: &[u8]) -> io::Result<Vec<u8>> {
        let mut rx = vec![0u8; tx.len()];
        {
            let mut transfer = SpidevTransfer::read_write(tx, &mut rx);
            self.spi.transfer(&mut transfer)?;
        }
        Ok(rx)
    }

    fn write(&mut self, tx: &[u8]) -> io::Result<()> {
        self.spi.write_all(tx)
    }
}
