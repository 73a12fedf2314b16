//! DSI link: sender, power islands and controller image of one output
//!
//! [`DsiLink`] owns everything the DSR gate needs to power the output down
//! and back up, and implements [`DsrHardware`] on top of it.

use embedded_hal::delay::DelayNs;
use platform::{PowerIsland, PowerIslandManager, RegisterFile};

use crate::controller::DsiControllerContext;
use crate::dsr::DsrHardware;
use crate::error::DsiError;
use crate::regs::{self, Pipe};
use crate::sender::PacketSender;

/// Time the D-PHY needs to settle after a ULPS request, in microseconds.
const ULPS_SETTLE_US: u32 = 1_000;

/// Display island powering the controller of `pipe`.
pub const fn display_island(pipe: Pipe) -> PowerIsland {
    match pipe {
        Pipe::Primary => PowerIsland::DisplayA,
        Pipe::Secondary => PowerIsland::DisplayC,
    }
}

/// One DSI output's link.
pub struct DsiLink<R, D, P> {
    sender: PacketSender<R, D>,
    power: P,
    controller: DsiControllerContext,
    panel_on: bool,
}

impl<R, D, P> DsiLink<R, D, P>
where
    R: RegisterFile,
    D: DelayNs,
    P: PowerIslandManager,
{
    /// Bundle a sender with its power manager. The controller image starts
    /// empty until the panel driver fills it.
    pub fn new(sender: PacketSender<R, D>, power: P) -> Self {
        Self {
            sender,
            power,
            controller: DsiControllerContext::default(),
            panel_on: false,
        }
    }

    /// The packet sender
    pub fn sender(&mut self) -> &mut PacketSender<R, D> {
        &mut self.sender
    }

    /// Read-only view of the sender
    pub fn sender_ref(&self) -> &PacketSender<R, D> {
        &self.sender
    }

    /// The platform power manager
    pub fn power(&mut self) -> &mut P {
        &mut self.power
    }

    /// Controller image restored on every power-up
    pub fn controller(&self) -> &DsiControllerContext {
        &self.controller
    }

    /// Mutable controller image, filled by the panel driver
    pub fn controller_mut(&mut self) -> &mut DsiControllerContext {
        &mut self.controller
    }

    /// Whether the panel is powered on
    pub fn is_panel_on(&self) -> bool {
        self.panel_on
    }

    /// Record the panel power state.
    pub fn set_panel_on(&mut self, on: bool) {
        self.panel_on = on;
    }

    /// Display island of this output
    pub fn island(&self) -> PowerIsland {
        display_island(self.sender.pipe())
    }

    /// Run `f` inside a `using_hw_begin` / `using_hw_end` bracket on `island`.
    ///
    /// Fails with [`DsiError::PowerTransitionDenied`] if the island is gated
    /// and `force_on` is false (or the platform cannot power it). `f` may
    /// return any error a [`DsiError`] converts into.
    pub fn with_hw<T, E, F>(&mut self, island: PowerIsland, force_on: bool, f: F) -> Result<T, E>
    where
        E: From<DsiError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        if !self.power.using_hw_begin(island, force_on) {
            warn!("hardware access refused, island {:?} gated", island);
            return Err(DsiError::PowerTransitionDenied.into());
        }
        let result = f(self);
        self.power.using_hw_end(island);
        result
    }

    /// Program the controller from the current image and set device-ready.
    ///
    /// An EOT workaround enabled by the sender's error handler is replayed
    /// on top of the image.
    pub fn program_controller(&mut self) -> Result<(), DsiError> {
        if !self.controller.is_valid() {
            return Err(DsiError::InvalidArgument);
        }
        let mut image = self.controller;
        if self.sender.eot_workaround() {
            image.eot_disable |= regs::EOT_CONTENTION_WORKAROUND;
        }
        let map = self.sender.register_map();
        let regs = self.sender.registers();
        image.apply(regs, &map);
        regs.set_bits32(map.device_ready, regs::DEVICE_READY_BIT);
        Ok(())
    }

    fn request_phy(&mut self, on: bool) -> Result<(), DsiError> {
        self.power.power_island_request(PowerIsland::Mipi, on).map_err(|_| {
            warn!("MIPI PHY power {} refused", if on { "on" } else { "off" });
            DsiError::PowerTransitionDenied
        })
    }

    fn wake_link(&mut self) {
        self.set_ulps(regs::ULPS_EXIT);
        self.set_ulps(0);
    }

    fn set_ulps(&mut self, request: u32) {
        let map = self.sender.register_map();
        let regs = self.sender.registers();
        let value = (regs.read32(map.device_ready) & !regs::ULPS_MASK) | request;
        regs.write32(map.device_ready, value);
        self.sender.delay().delay_us(ULPS_SETTLE_US);
    }
}

impl<R, D, P> DsrHardware for DsiLink<R, D, P>
where
    R: RegisterFile,
    D: DelayNs,
    P: PowerIslandManager,
{
    fn link_off(&mut self) -> Result<(), DsiError> {
        self.sender.wait_dbi_fifo_empty()?;
        self.set_ulps(regs::ULPS_ENTER);
        let map = self.sender.register_map();
        self.sender
            .registers()
            .clear_bits32(map.device_ready, regs::DEVICE_READY_BIT);

        if let Err(e) = self.request_phy(false) {
            // PHY stays powered: put the link back the way it was.
            self.wake_link();
            self.sender
                .registers()
                .set_bits32(map.device_ready, regs::DEVICE_READY_BIT);
            return Err(e);
        }
        trace!("DSI link off");
        Ok(())
    }

    fn link_on(&mut self) -> Result<(), DsiError> {
        self.request_phy(true)?;
        let island = self.island();
        let result = self.with_hw(island, true, |link| {
            link.program_controller()?;
            link.wake_link();
            Ok::<(), DsiError>(())
        });
        if let Err(e) = result {
            // Link stays down: gate the PHY again.
            if self.request_phy(false).is_err() {
                error!("MIPI PHY left powered after failed link on");
            }
            return Err(e);
        }
        trace!("DSI link on");
        Ok(())
    }

    fn island_off(&mut self) -> Result<(), DsiError> {
        self.sender.wait_fifos_empty()?;
        let island = self.island();
        self.power.power_island_request(island, false).map_err(|_| {
            warn!("power-off of {:?} refused", island);
            DsiError::PowerTransitionDenied
        })
    }

    fn island_on(&mut self) -> Result<(), DsiError> {
        let island = self.island();
        self.power.power_island_request(island, true).map_err(|_| {
            error!("power-on of {:?} refused", island);
            DsiError::PowerTransitionDenied
        })
    }

    fn panel_on(&self) -> bool {
        self.panel_on
    }
}
