use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A bounded retry loop: up to `attempts` probes with `delay` after each
/// unsuccessful one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Poll {
    pub attempts: u32,
    pub delay: Duration,
}

impl Poll {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Timing knobs of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// How long card selection waits for a tag to enter the field.
    pub irq_timeout: Duration,
    /// How long each REQA of the presence loop waits for the tag to answer.
    pub presence_window: Duration,
    /// Sleep between checks for an IRQ edge or RxIRq inside one
    /// `presence_window`.
    pub presence_poll: Duration,
    /// CalcCRC completion polling.
    pub crc_poll: Poll,
    /// Transceive/MFAuthent completion polling.
    pub command_poll: Poll,
    /// PowerDown bit polling after a soft reset.
    pub reset_poll: Poll,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            irq_timeout: Duration::from_secs(10),
            presence_window: Duration::from_millis(100),
            presence_poll: Duration::from_millis(10),
            crc_poll: Poll::new(100, Duration::from_millis(1)),
            command_poll: Poll::new(2000, Duration::ZERO),
            reset_poll: Poll::new(3, Duration::from_micros(50)),
        }
    }
}

impl Config {
    pub fn with_irq_timeout(mut self, timeout: Duration) -> Self {
        self.irq_timeout = timeout;
        self
    }

    pub fn with_presence_window(mut self, window: Duration) -> Self {
        self.presence_window = window;
        self
    }

    pub fn with_presence_poll(mut self, interval: Duration) -> Self {
        self.presence_poll = interval;
        self
    }

    pub fn with_crc_poll(mut self, poll: Poll) -> Self {
        self.crc_poll = poll;
        self
    }

    pub fn with_command_poll(mut self, poll: Poll) -> Self {
        self.command_poll = poll;
        self
    }

    pub fn with_reset_poll(mut self, poll: Poll) -> Self {
        self.reset_poll = poll;
        self
    }
}
