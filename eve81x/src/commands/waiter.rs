//! Strategies for waiting until the coprocessor is ready for more work.

use super::coprocessor::{free_space, FAULT_SENTINEL};
use crate::interface::Interface;
use crate::low_level::LowLevel;
use crate::registers::Register;

/// The ways a wait can end other than successfully.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WaiterError<E> {
    /// The underlying interface failed while polling.
    Comm(E),
    /// The coprocessor reported a fault, so the awaited condition can
    /// never arrive until it has been reset.
    Fault,
    /// The waiter gave up before the condition arrived.
    Timeout,
}

/// A `Waiter` decides how the driver blocks on the coprocessor: busy
/// polling, sleeping between polls, or waiting for an interrupt line.
///
/// Both methods must watch for the fault sentinel in the read offset
/// register and return [`WaiterError::Fault`](WaiterError::Fault) when
/// they see it, since a faulted coprocessor stops consuming and any
/// other outcome would otherwise never arrive.
pub trait Waiter<I: Interface> {
    /// Blocks until at least `need` bytes of FIFO space are free,
    /// returning the actual free space.
    fn wait_for_space(
        &mut self,
        ll: &mut LowLevel<I>,
        write_offset: u16,
        need: u16,
    ) -> Result<u16, WaiterError<I::Error>>;

    /// Blocks until the coprocessor has consumed everything up to the
    /// given write offset.
    fn wait_for_drain(
        &mut self,
        ll: &mut LowLevel<I>,
        write_offset: u16,
    ) -> Result<(), WaiterError<I::Error>>;
}

/// A [`Waiter`](Waiter) that busy-polls the read offset register, with
/// an upper bound on the number of polls so that a wedged chip cannot
/// hang the host forever.
pub struct PollingWaiter {
    poll_limit: u32,
}

impl PollingWaiter {
    pub fn new(poll_limit: u32) -> Self {
        Self {
            poll_limit: poll_limit,
        }
    }
}

impl Default for PollingWaiter {
    fn default() -> Self {
        Self::new(50_000)
    }
}

impl<I: Interface> Waiter<I> for PollingWaiter {
    fn wait_for_space(
        &mut self,
        ll: &mut LowLevel<I>,
        write_offset: u16,
        need: u16,
    ) -> Result<u16, WaiterError<I::Error>> {
        for _ in 0..self.poll_limit {
            let rd = ll.rd16r(Register::CMD_READ).map_err(WaiterError::Comm)?;
            if rd == FAULT_SENTINEL {
                return Err(WaiterError::Fault);
            }
            let space = free_space(write_offset, rd);
            if space >= need {
                return Ok(space);
            }
        }
        Err(WaiterError::Timeout)
    }

    fn wait_for_drain(
        &mut self,
        ll: &mut LowLevel<I>,
        write_offset: u16,
    ) -> Result<(), WaiterError<I::Error>> {
        for _ in 0..self.poll_limit {
            let rd = ll.rd16r(Register::CMD_READ).map_err(WaiterError::Comm)?;
            if rd == FAULT_SENTINEL {
                return Err(WaiterError::Fault);
            }
            if rd == write_offset {
                return Ok(());
            }
        }
        Err(WaiterError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::interface::fake::Fake;

    #[test]
    fn test_wait_for_space_timeout() {
        // A stalled coprocessor with a nearly-full FIFO never frees
        // enough space, so the waiter must give up.
        let mut fake = Fake::new_stalled();
        fake.set_reg16(0xfc, 4088);
        fake.set_reg16(0xf8, 0);
        let mut ll = crate::low_level::LowLevel::new(fake);
        let mut waiter = PollingWaiter::new(10);
        assert_eq!(
            waiter.wait_for_space(&mut ll, 4088, 512),
            Err(WaiterError::Timeout)
        );
    }

    #[test]
    fn test_wait_reports_fault() {
        let mut fake = Fake::new();
        fake.set_reg16(0xf8, FAULT_SENTINEL);
        let mut ll = crate::low_level::LowLevel::new(fake);
        let mut waiter = PollingWaiter::new(10);
        assert_eq!(
            waiter.wait_for_drain(&mut ll, 0),
            Err(WaiterError::Fault)
        );
    }
}
