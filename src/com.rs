use core::fmt::Debug;

/// Byte exchange with the chip over its host bus.
pub trait Com {
    type Error: Debug;

    /// Clocks `tx` out and returns the equal-length buffer clocked in.
    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Clocks `tx` out, discarding whatever comes back.
    fn write(&mut self, tx: &[u8]) -> Result<(), Self::Error> {
        self.exchange(tx).map(drop)
    }
}

impl<C: Com + ?Sized> Com for &mut C {
    type Error = C::Error;

    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>, Self::Error> {
        (**self).exchange(tx)
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), Self::Error> {
        (**self).write(tx)
    }
}
