use embassy_rp::gpio::{Flex, Pull};

use crate::driver::flex_pin::FlexPin;

impl<'d> FlexPin for Flex<'d> {
    fn release(&mut self) {
        self.set_pull(Pull::None);
        self.set_as_input();
    }

    fn release_pull_up(&mut self) {
        self.set_pull(Pull::Up);
        self.set_as_input();
    }

    fn drive_low(&mut self) {
        self.set_low();
        self.set_as_output();
    }

    fn drive_high(&mut self) {
        self.set_high();
        self.set_as_output();
    }
}
