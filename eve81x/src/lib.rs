//! A driver library for FT81x and BT81x "EVE" display controllers.
//!
//! These chips pair a display, touch, and audio engine with a command
//! coprocessor, all driven over SPI from a small host. This library
//! covers the host side: the addressed register transport, the
//! circular command FIFO (including fault recovery), touch screen
//! calibration, and the attached-flash lifecycle on BT81x parts.
//!
//! The core crate is `no_std` and speaks to hardware only through the
//! [`Interface`](interface::Interface) trait, so it can run anywhere
//! from a microcontroller to a desktop test harness. Companion crates
//! bind it to real transports, such as `embedded-hal` SPI devices.
//!
//! A typical startup sequence looks like:
//!
//! ```rust
//! use eve81x::EVE;
//! # use eve81x::interface::fake::Fake;
//! # fn example() -> Result<(), eve81x::commands::Error<<Fake as eve81x::interface::Interface>::Error>> {
//! # let ei = Fake::new();
//! # let timings = eve81x::screen::Timings {
//! #     hcycle: 548, hoffset: 43, hsync0: 0, hsync1: 41,
//! #     vcycle: 292, voffset: 12, vsync0: 0, vsync1: 10,
//! #     width: 480, height: 272,
//! #     swizzle: 0, pclk_pol: 1, cspread: 1, dither: 1, pclk_div: 5,
//! # };
//! let mut eve = EVE::new(ei);
//! eve.start_system_clock(eve81x::init::ClockSource::External)
//!     .map_err(eve81x::commands::Error::Interface)?;
//! eve.poll_for_boot(250).map_err(eve81x::commands::Error::Interface)?;
//! eve.start_video(&timings).map_err(eve81x::commands::Error::Interface)?;
//! let mut cp = eve.coprocessor_polling()?;
//! cp.start_display_list()?;
//! // ...draw things...
//! cp.display_list_swap()?;
//! # Ok(())
//! # }
//! ```

#![no_std]

pub mod commands;
pub mod display_list;
pub mod flash;
pub mod host_commands;
pub mod init;
pub mod interface;
pub mod low_level;
pub mod registers;
pub mod screen;
pub mod touch;

use commands::{Coprocessor, PollingWaiter, Waiter};
use interface::Interface;
use low_level::LowLevel;
use screen::Timings;

/// The top-level facade for bringing up a chip.
///
/// `EVE` walks the chip through its boot sequence and then converts
/// into a [`Coprocessor`](commands::Coprocessor) for the steady-state
/// work of submitting commands.
pub struct EVE<I: Interface> {
    ll: LowLevel<I>,
}

impl<I: Interface> EVE<I> {
    pub fn new(ei: I) -> Self {
        Self {
            ll: LowLevel::new(ei),
        }
    }

    /// Resets the chip (if the reset line is wired) and starts its
    /// system clock from the given source.
    pub fn start_system_clock(&mut self, source: init::ClockSource) -> Result<(), I::Error> {
        init::activate(&mut self.ll, source)
    }

    /// Waits for the chip to prove it has booted. Returns `false` if it
    /// never does, which usually means a wiring problem.
    pub fn poll_for_boot(&mut self, poll_limit: u32) -> Result<bool, I::Error> {
        init::poll_for_boot(&mut self.ll, poll_limit)
    }

    /// Configures the panel timings and touch engine and starts video
    /// output, showing a blank screen.
    pub fn start_video(&mut self, timings: &Timings) -> Result<(), I::Error> {
        init::apply_timings(&mut self.ll, timings)?;
        init::configure_touch(&mut self.ll)?;
        init::start_video(&mut self.ll, timings)
    }

    /// Direct register access, for needs this facade doesn't cover.
    pub fn low_level(&mut self) -> &mut LowLevel<I> {
        &mut self.ll
    }

    /// Consumes the facade and returns a FIFO engine that waits on the
    /// coprocessor with the given waiter.
    pub fn coprocessor<W: Waiter<I>>(
        self,
        waiter: W,
    ) -> Result<Coprocessor<I, W>, commands::Error<I::Error>> {
        Coprocessor::new(self.ll.take_interface(), waiter)
    }

    /// Consumes the facade and returns a FIFO engine that busy-polls.
    pub fn coprocessor_polling(
        self,
    ) -> Result<Coprocessor<I, PollingWaiter>, commands::Error<I::Error>> {
        Coprocessor::new_polling(self.ll.take_interface())
    }
}
