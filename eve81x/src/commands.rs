//! Interacting with the EVE coprocessor via its circular command FIFO.

pub mod command_word;
pub mod coprocessor;
pub mod options;
pub mod waiter;

pub use coprocessor::{Coprocessor, Error, FaultMessage};
pub use waiter::{PollingWaiter, Waiter, WaiterError};
