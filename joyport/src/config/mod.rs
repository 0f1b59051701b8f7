use embassy_time::Duration;

/// Tunable configurations of the controller port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortConfig {
    /// Time the analog front-end needs to settle after the control line changes
    pub settle_delay: Duration,
    /// Both released-phase axes must be strictly above this to be a joystick
    pub joystick_threshold: u8,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(16),
            joystick_threshold: 220,
        }
    }
}

impl PortConfig {
    /// Settle delay in whole microseconds, saturated to what a `DelayNs` call accepts
    pub(crate) fn settle_delay_us(&self) -> u32 {
        u32::try_from(self.settle_delay.as_micros()).unwrap_or(u32::MAX)
    }
}
