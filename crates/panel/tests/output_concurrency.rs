//! One output shared between an "interrupt" thread signalling TEs and the
//! display paths (frame updates, brightness, ESD).
//!
//! Host threads need a `Sync` mutex; the std critical-section impl makes
//! `CriticalSectionRawMutex` a plain mutex here.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects, clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};

use dsi::regs::*;
use dsi::{DsiError, DsiLink, DsrConfig, DsrLevel, DsrState, PacketSender, Pipe, SenderConfig};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
use panel::profiles::CMD_720P;
use panel::{CommandModePanel, DsiOutput, EsdOutcome, PanelError};
use platform::mocks::{MockPowerManager, MockRegisterFile};
use platform::{PollConfig, PowerIsland};

type Output = DsiOutput<CriticalSectionRawMutex, MockRegisterFile, NoopDelay, MockPowerManager, CommandModePanel<PinMock>>;

fn output(level: DsrLevel) -> (Output, MockRegisterFile, MockPowerManager, PinMock) {
    let regs = MockRegisterFile::new();
    regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
    regs.write_one_to_clear(INTR_STAT);
    let cfg = SenderConfig {
        fifo_poll: PollConfig::new(4, 1),
        read_poll: PollConfig::new(4, 1),
        dbi_ready_poll: PollConfig::new(4, 1),
        ..SenderConfig::default()
    };
    let sender = PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, cfg);
    let pm = MockPowerManager::new();
    let link = DsiLink::new(sender, pm.clone());

    // One bring-up: reset pulse plus deep-standby pulse.
    let pin = PinMock::new(&[
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]);
    let panel = CommandModePanel::new(CMD_720P, pin.clone());
    let dsr = DsrConfig {
        idle_threshold: 2,
        level,
        enabled: true,
    };
    (DsiOutput::new(link, panel, Some(dsr)), regs, pm, pin)
}

// ---------------------------------------------------------------------------
// TE racing frame updates
// ---------------------------------------------------------------------------

/// Updates are accepted at most once per TE, self refresh entered by the TE
/// thread never leaks into a failed update, and no forbid reference is left
/// behind.
#[test]
fn te_and_frame_updates_interleave() {
    const TES: u32 = 200;

    let (output, regs, pm, mut pin) = output(DsrLevel::Level1);
    output.power_on().unwrap();

    let te_done = AtomicBool::new(false);
    let accepted = std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..TES {
                output.signal_tearing_effect();
                std::thread::yield_now();
            }
            te_done.store(true, Ordering::Release);
        });

        let updater = scope.spawn(|| {
            let mut accepted = 0u32;
            while !te_done.load(Ordering::Acquire) {
                match output.update_frame() {
                    Ok(()) => {
                        accepted += 1;
                        // Command buffer consumed by the controller.
                        regs.set(CMD_ADDRESS, 0);
                    }
                    Err(PanelError::Dsi(DsiError::Again)) => std::thread::yield_now(),
                    Err(e) => panic!("frame update failed: {e:?}"),
                }
            }
            accepted
        });
        updater.join().unwrap()
    });

    assert!(accepted <= TES, "{accepted} updates for {TES} TEs");
    output.service_tearing_effects().unwrap();
    assert_eq!(output.pending_tearing_effects(), 0);
    output
        .lock(|s| {
            assert_eq!(s.link.sender_ref().te_seq(), TES);
            assert_eq!(s.dsr.as_ref().map(dsi::Dsr::ref_count), Some(0));
            Ok(())
        })
        .unwrap();

    // One more TE always admits one more frame, whatever state the TE
    // thread left the gate in.
    output.on_tearing_effect().unwrap();
    output.update_frame().unwrap();
    assert_eq!(output.dsr_state().unwrap(), Some(DsrState::Exited));
    assert!(pm.powered(PowerIsland::DisplayA));
    pin.done();
}

// ---------------------------------------------------------------------------
// Panel paths racing TE
// ---------------------------------------------------------------------------

/// Brightness writes issued while TEs keep pushing the output into self
/// refresh all reach the panel.
#[test]
fn brightness_survives_concurrent_dsr_entry() {
    let (output, regs, _pm, mut pin) = output(DsrLevel::Level1);
    output.power_on().unwrap();
    regs.clear_writes();

    let stop = AtomicBool::new(false);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                output.signal_tearing_effect();
                output.service_tearing_effects().unwrap();
                std::thread::yield_now();
            }
        });

        for level in 0..=0x3Fu8 {
            output.set_brightness(level).unwrap();
        }
        stop.store(true, Ordering::Release);
    });

    let brightness: Vec<u32> = regs
        .writes_to(HS_GEN_CTRL)
        .into_iter()
        .filter(|w| (w & 0xFFFF) == 0x5115)
        .map(|w| w >> 16)
        .collect();
    assert_eq!(brightness, (0..=0x3Fu32).collect::<Vec<_>>());
    pin.done();
}

#[test]
fn esd_check_while_in_self_refresh() {
    let (output, regs, pm, mut pin) = output(DsrLevel::Level1);
    output.power_on().unwrap();
    for _ in 0..3 {
        output.on_tearing_effect().unwrap();
    }
    assert_eq!(output.dsr_state().unwrap(), Some(DsrState::EnteredLevel1));

    regs.script_reads(INTR_STAT, &[0, INTR_GEN_READ_DATA_AVAIL]);
    regs.script_reads(LP_GEN_DATA, &[0x9C]);
    assert_eq!(output.esd_check(), Ok(EsdOutcome::Healthy));
    assert!(pm.powered(PowerIsland::DisplayA), "ESD read powered the link up");
    pin.done();
}

// ---------------------------------------------------------------------------
// Locking
// ---------------------------------------------------------------------------

#[test]
fn nested_call_under_critical_section_is_busy() {
    let (output, _regs, _pm, mut pin) = output(DsrLevel::Level0);
    output.power_on().unwrap();
    let nested = output.lock(|_| Ok(output.on_tearing_effect()));
    assert_eq!(nested, Ok(Err(PanelError::Dsi(DsiError::Busy))));
    pin.done();
}

/// Signalling never waits for the lock: a TE raised while another thread
/// sits inside a locked panel path is counted at once.
#[test]
fn te_signal_does_not_wait_for_the_lock() {
    let (output, _regs, _pm, mut pin) = output(DsrLevel::Level0);
    output.power_on().unwrap();

    let held = AtomicBool::new(false);
    let signalled = AtomicBool::new(false);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !held.load(Ordering::Acquire) {
                std::thread::yield_now();
            }
            output.signal_tearing_effect();
            signalled.store(true, Ordering::Release);
        });

        output
            .lock(|_| {
                held.store(true, Ordering::Release);
                while !signalled.load(Ordering::Acquire) {
                    std::thread::yield_now();
                }
                Ok(())
            })
            .unwrap();
    });

    assert_eq!(output.pending_tearing_effects(), 1);
    assert_eq!(output.service_tearing_effects(), Ok(1));
    pin.done();
}

#[test]
fn teardown_after_self_refresh() {
    let (output, _regs, pm, mut pin) = output(DsrLevel::Level1);
    output.power_on().unwrap();
    for _ in 0..3 {
        output.on_tearing_effect().unwrap();
    }
    assert!(!pm.powered(PowerIsland::DisplayA));

    output.teardown().unwrap();
    assert_eq!(output.dsr_state().unwrap(), None);
    assert!(pm.powered(PowerIsland::DisplayA));
    output.power_off().unwrap();
    pin.done();
}
