mod common;
pub(crate) use crate::common::*;

mod port_test {
    use core::cell::RefCell;

    use embassy_time::Duration;
    use joyport::axis::AxisSample;
    use joyport::config::PortConfig;
    use joyport::driver::ControlLineState;
    use joyport::driver::sim::{Line, SimAxis, SimBoard};
    use joyport::sequencer::Phase;
    use joyport::state::DeviceClass;
    use joyport::timing::{LAST_TICK, PASS_CYCLES};

    use super::*;

    #[test]
    fn test_idle_joystick_report() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::joystick(200); 2];
        let mut sequencer = wire(&board);

        let text = run_cycles(&board, &mut sequencer, 1);
        assert_eq!(text, "[Joystick]PotX:200 PotY:200 Top:0 Bot:0 Keys:\n\r");
    }

    #[test]
    fn test_single_key_report() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::joystick(200); 2];
        board.borrow_mut().set_key(0, 2, true);
        let mut sequencer = wire(&board);

        let text = run_cycles(&board, &mut sequencer, 1);
        assert_eq!(text, "[Joystick]PotX:200 PotY:200 Top:0 Bot:0 Keys:7\n\r");
    }

    #[test]
    fn test_keypad_and_buttons_report() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::joystick(0), SimAxis::joystick(LAST_TICK)];
        {
            let mut board = board.borrow_mut();
            // Start, 0, 9 and Pause
            board.set_key(3, 0, true);
            board.set_key(1, 3, true);
            board.set_key(2, 2, true);
            board.set_key(3, 1, true);
            board.buttons = [true, true];
        }
        let mut sequencer = wire(&board);

        let text = run_cycles(&board, &mut sequencer, 1);
        assert_eq!(text, "[Joystick]PotX:000 PotY:227 Top:1 Bot:1 Keys:09PS\n\r");
    }

    #[test]
    fn test_classification_examples() {
        let cases = [
            ((221, 225), DeviceClass::Joystick),
            ((150, 90), DeviceClass::TrackBall),
            ((220, 221), DeviceClass::TrackBall),
        ];
        for ((x, y), expected) in cases {
            let board = RefCell::new(SimBoard::new());
            board.borrow_mut().axes = [SimAxis::trackball(x, 5), SimAxis::trackball(y, 6)];
            let mut sequencer = wire(&board);
            sequencer.step();
            sequencer.step();
            assert_eq!(sequencer.state().axes, AxisSample::new(x, y));
            assert_eq!(sequencer.step(), Phase::Classify);
            assert_eq!(sequencer.state().device, expected);

            let tag = format!("[{}]", expected);
            assert_eq!(board.borrow().serial_text(), tag);
        }
    }

    #[test]
    fn test_threshold_is_configurable() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::trackball(150, 1), SimAxis::trackball(160, 2)];
        let config = PortConfig {
            joystick_threshold: 100,
            ..Default::default()
        };
        let mut sequencer = wire_with_config(&board, config);

        let text = run_cycles(&board, &mut sequencer, 1);
        assert_eq!(text, "[Joystick]PotX:001 PotY:002 Top:0 Bot:0 Keys:\n\r");
    }

    #[test]
    fn test_cycle_duration_independent_of_inputs() {
        let settle_cycles = 16_000;
        let scan_cycles = 4 * 128;
        let expected = 2 * scan_cycles + 2 * PASS_CYCLES as u64 + 2 * settle_cycles;

        let setups: [fn(&mut SimBoard); 3] = [
            |_| {},
            |board| {
                board.axes = [SimAxis::trackball(0, 0); 2];
                board.keys = [[true; 4]; 4];
                board.buttons = [true; 2];
            },
            |board| board.axes = [SimAxis::joystick(LAST_TICK), SimAxis::trackball(12, 200)],
        ];
        for setup in setups {
            let board = RefCell::new(SimBoard::new());
            setup(&mut board.borrow_mut());
            let mut sequencer = wire(&board);
            sequencer.run_cycle();
            assert_eq!(board.borrow().cycles, expected);
        }
    }

    #[test]
    fn test_settle_delay_precedes_each_measurement() {
        let board = RefCell::new(SimBoard::new());
        let config = PortConfig {
            settle_delay: Duration::from_millis(2),
            ..Default::default()
        };
        let mut sequencer = wire_with_config(&board, config);

        sequencer.step();
        assert_eq!(board.borrow().delayed_ns, 0);
        sequencer.step();
        assert_eq!(board.borrow().delayed_ns, 2_000_000);
        sequencer.step();
        sequencer.step();
        assert_eq!(board.borrow().delayed_ns, 4_000_000);
        sequencer.step();
        sequencer.step();
        assert_eq!(board.borrow().delayed_ns, 4_000_000);
    }

    #[test]
    fn test_matrix_rows_mutually_exclusive() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().keys = [[true, false, true, false]; 4];
        let mut sequencer = wire(&board);
        run_cycles(&board, &mut sequencer, 4);

        let board = board.borrow();
        assert_eq!(board.max_rows_driven(), 1);
        assert_eq!(board.non_exclusive_reads(), 0);
        assert_eq!(board.column_reads(), 4 * 2 * 4 * 4);
    }

    #[test]
    fn test_lines_after_a_cycle() {
        let board = RefCell::new(SimBoard::new());
        let mut sequencer = wire(&board);
        sequencer.run_cycle();

        let board = board.borrow();
        assert!(board.line(Line::Pot(0)).is_driven_low());
        assert!(board.line(Line::Pot(1)).is_driven_low());
        assert_eq!(board.cav_state(), ControlLineState::Asserted);
        assert_eq!(sequencer.state().control_line, ControlLineState::Asserted);
    }

    #[test]
    fn test_continuous_reporting() {
        let board = RefCell::new(SimBoard::new());
        board.borrow_mut().axes = [SimAxis::joystick(50); 2];
        let mut sequencer = wire(&board);

        let text = run_cycles(&board, &mut sequencer, 3);
        assert_eq!(text, "[Joystick]PotX:050 PotY:050 Top:0 Bot:0 Keys:\n\r".repeat(3));

        board.borrow_mut().axes = [SimAxis::trackball(10, 70); 2];
        board.borrow_mut().set_key(2, 3, true);
        let text = run_cycles(&board, &mut sequencer, 1);
        assert_eq!(text, "[TrackBall]PotX:070 PotY:070 Top:0 Bot:0 Keys:#\n\r");
    }
}
