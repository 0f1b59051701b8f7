#![no_main]
#![no_std]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Flex, Input, Pull};
use embassy_rp::uart::{self, UartTx};
use embassy_time::Delay;
use joyport::{DeadlineClock, Port, PortConfig, run_port};
use panic_probe as _;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Joyport start!");
    // Initialize peripherals
    let p = embassy_rp::init(Default::default());

    // The comparators are external, their reference sits at ~2.29V
    let port = Port {
        pot_x: Flex::new(p.PIN_26),
        pot_y: Flex::new(p.PIN_27),
        comparator_x: Input::new(p.PIN_2, Pull::None),
        comparator_y: Input::new(p.PIN_3, Pull::None),
        rows: [
            Flex::new(p.PIN_6),
            Flex::new(p.PIN_7),
            Flex::new(p.PIN_8),
            Flex::new(p.PIN_9),
        ],
        columns: [
            Input::new(p.PIN_10, Pull::Up),
            Input::new(p.PIN_11, Pull::Up),
            Input::new(p.PIN_12, Pull::Up),
            Input::new(p.PIN_13, Pull::Up),
        ],
        cav: Flex::new(p.PIN_14),
        top_button: Input::new(p.PIN_15, Pull::Up),
        bottom_button: Input::new(p.PIN_16, Pull::Up),
    };

    // 9600 8N1 status output
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = 9600;
    let serial = UartTx::new_blocking(p.UART0, p.PIN_0, uart_config);

    // Start serving
    run_port(port, DeadlineClock::new(Delay), Delay, serial, PortConfig::default())
}
