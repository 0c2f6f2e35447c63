use super::com::Com;
use embedded_hal::blocking::spi;

/// [`Com`] over an `embedded-hal` SPI peripheral with chip select handled
/// by the HAL.
pub struct ComSpi<SPI> {
    com: SPI,
}

impl<SPI> ComSpi<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { com: spi }
    }

    pub fn release(self) -> SPI {
        self.com
    }
}

impl<SPI, E> Com for ComSpi<SPI>
where
    SPI: spi::Transfer<u8, Error = E> + spi::Write<u8, Error = E>,
    E: core::fmt::Debug,
{
    type Error = E;

    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, E> {
        let mut buf = tx.to_vec();
        self.com.transfer(&mut buf)?;
        Ok(buf)
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), E> {
        self.com.write(tx)
    }
}
