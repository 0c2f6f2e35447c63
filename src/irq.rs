//! Delivery of IRQ-line edges into the presence loop.
//!
//! The producer side runs in whatever context the platform calls edge
//! handlers from, so [`IrqNotifier::notify`] never blocks: the channel holds a
//! single pending event and further edges are dropped until it is consumed.
//! The consumer never blocks either; the presence loop paces itself through
//! the driver's [`Clock`](crate::Clock).

use core::fmt::Debug;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Which transitions of the IRQ line count as an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Toggle,
}

/// Producer half handed to the platform's edge handler.
#[derive(Debug, Clone)]
pub struct IrqNotifier {
    tx: Sender<()>,
}

impl IrqNotifier {
    /// Records one edge. Returns `false` if the event was dropped because one
    /// is already pending or nobody is waiting any more.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Consumer half owned by the waiting driver call.
#[derive(Debug)]
pub(crate) struct IrqReceiver {
    rx: Receiver<()>,
}

impl IrqReceiver {
    /// Consumes a pending edge, if any. A line that dropped its notifier
    /// (see [`NoIrq`]) never has one.
    pub(crate) fn take(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

pub(crate) fn channel() -> (IrqNotifier, IrqReceiver) {
    let (tx, rx) = bounded(1);
    (IrqNotifier { tx }, IrqReceiver { rx })
}

/// An IRQ input capable of one-shot edge notification.
pub trait IrqLine {
    type Error: Debug + Send + Sync + 'static;

    /// Arms the line so that the next `edge` calls `notifier.notify()`.
    /// Re-arming replaces any previous notifier.
    fn arm(&mut self, edge: Edge, notifier: IrqNotifier) -> Result<(), Self::Error>;
}

/// Wiring without an IRQ pin. The notifier is dropped and presence
/// detection relies on polling RxIRq in ComIrqReg.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIrq;

impl IrqLine for NoIrq {
    type Error = core::convert::Infallible;

    fn arm(&mut self, _edge: Edge, _notifier: IrqNotifier) -> Result<(), Self::Error> {
        Ok(())
    }
}
