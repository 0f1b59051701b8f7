use core::cell::RefCell;

use joyport::config::PortConfig;
use joyport::driver::sim::{self, SimBoard, SimButton, SimClock, SimColumn, SimComparator, SimDelay, SimLine, SimSerial};
use joyport::sequencer::Sequencer;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub type SimSequencer<'a> = Sequencer<
    SimLine<'a>,
    SimComparator<'a>,
    SimColumn<'a>,
    SimButton<'a>,
    SimClock<'a>,
    SimDelay<'a>,
    SimSerial<'a>,
>;

/// Wire a sequencer with the default config to every line of `board`
pub fn wire(board: &RefCell<SimBoard>) -> SimSequencer<'_> {
    wire_with_config(board, PortConfig::default())
}

pub fn wire_with_config(board: &RefCell<SimBoard>, config: PortConfig) -> SimSequencer<'_> {
    Sequencer::new(
        sim::port(board),
        SimClock::new(board),
        SimDelay::new(board),
        SimSerial::new(board),
        config,
    )
}

/// Run `cycles` full cycles and return the status text they produced
pub fn run_cycles(board: &RefCell<SimBoard>, sequencer: &mut SimSequencer<'_>, cycles: usize) -> String {
    board.borrow_mut().clear_serial();
    for _ in 0..cycles {
        sequencer.run_cycle();
    }
    board.borrow().serial_text().to_string()
}
