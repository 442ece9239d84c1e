//! The command FIFO engine: streaming work to the coprocessor and
//! recovering it when it faults.

use super::command_word::{pack, text_word_count, TextWords};
use super::waiter::{PollingWaiter, Waiter, WaiterError};
use crate::display_list::DLCmd;
use crate::interface::{AddressRegion, Interface};
use crate::low_level::LowLevel;
use crate::registers::Register;

/// Total size of the circular command FIFO, in bytes.
pub const FIFO_SIZE: u16 = 4096;

/// All FIFO traffic is in whole 32-bit words.
pub const CMD_WORD_SIZE: u16 = 4;

/// The value the chip places in the read offset register when the
/// coprocessor has faulted. It is never a valid offset, because real
/// offsets are always word-aligned.
pub const FAULT_SENTINEL: u16 = 0xfff;

/// Largest burst written to the FIFO in one transaction. Bounding this
/// keeps flow control responsive and keeps the host's buffering needs
/// small and fixed.
pub const WORK_BUFFER_SIZE: usize = 512;

/// Size of the fault diagnostic text memory.
pub const ERR_REPORT_LEN: usize = 128;

const CMD_DLSTART: u32 = 0xffffff00;
const CMD_SWAP: u32 = 0xffffff01;
const CMD_TEXT: u32 = 0xffffff0c;

/// Returns how many bytes may be written to the FIFO without overtaking
/// the coprocessor's read offset.
///
/// One word of the FIFO is always left unused so that a completely full
/// FIFO remains distinguishable from a completely empty one.
pub const fn free_space(write_offset: u16, read_offset: u16) -> u16 {
    (FIFO_SIZE - CMD_WORD_SIZE) - (write_offset.wrapping_sub(read_offset) & (FIFO_SIZE - 1))
}

/// The diagnostic text the coprocessor left behind when it faulted.
#[derive(Clone, Copy)]
pub struct FaultMessage([u8; ERR_REPORT_LEN]);

impl FaultMessage {
    /// The message bytes up to but not including the terminating NUL.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|b| *b == 0).unwrap_or(self.0.len());
        &self.0[..len]
    }

    /// The message as text, if the chip produced valid UTF-8. The
    /// diagnostics are ASCII in practice.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }
}

impl core::fmt::Debug for FaultMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "FaultMessage(")?;
        for b in self.as_bytes() {
            for c in core::ascii::escape_default(*b) {
                write!(f, "{}", c as char)?;
            }
        }
        write!(f, ")")
    }
}

/// The errors the FIFO engine can return.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error<E> {
    /// The underlying interface failed.
    Interface(E),
    /// The waiter gave up before the coprocessor was ready.
    Timeout,
    /// The coprocessor faulted again immediately after a reset, so
    /// recovery is not making progress.
    Fault,
    /// A single command was larger than the FIFO can ever hold, so no
    /// amount of waiting would make room for it.
    CommandTooLarge,
}

impl<E> From<WaiterError<E>> for Error<E> {
    fn from(e: WaiterError<E>) -> Self {
        match e {
            WaiterError::Comm(e) => Error::Interface(e),
            WaiterError::Timeout => Error::Timeout,
            WaiterError::Fault => Error::Fault,
        }
    }
}

/// `Coprocessor` owns the host side of the circular command FIFO.
///
/// The chip never stores the host's write position: the engine tracks it
/// here and publishes it to the write offset register when a batch of
/// work is ready. All submissions therefore have to go through a single
/// `Coprocessor` value, which the borrow checker enforces for us.
pub struct Coprocessor<I: Interface, W: Waiter<I>> {
    ll: LowLevel<I>,
    waiter: W,
    write_offset: u16,
    known_space: u16,
    last_fault: Option<FaultMessage>,
}

impl<I: Interface> Coprocessor<I, PollingWaiter> {
    /// Consumes the given interface and returns an engine that waits by
    /// busy-polling, with a default poll budget.
    pub fn new_polling(ei: I) -> Result<Self, Error<I::Error>> {
        Self::new(ei, PollingWaiter::default())
    }
}

impl<I: Interface, W: Waiter<I>> Coprocessor<I, W> {
    /// Consumes the given interface and waiter and returns an engine
    /// synchronized with the chip's current FIFO state.
    pub fn new(ei: I, waiter: W) -> Result<Self, Error<I::Error>> {
        let mut ll = LowLevel::new(ei);
        let wo = ll.rd16r(Register::CMD_WRITE).map_err(Error::Interface)?
            & (FIFO_SIZE - 1)
            & !(CMD_WORD_SIZE - 1);
        let rd = ll.rd16r(Register::CMD_READ).map_err(Error::Interface)?;
        let known = if rd == FAULT_SENTINEL {
            0
        } else {
            free_space(wo, rd)
        };
        Ok(Self {
            ll: ll,
            waiter: waiter,
            write_offset: wo,
            known_space: known,
            last_fault: None,
        })
    }

    /// Consumes the engine and returns the interface it was created with.
    pub fn take_interface(self) -> I {
        self.ll.take_interface()
    }

    /// Direct access to single-register reads and writes, sharing the
    /// engine's interface. Callers must not write the FIFO registers
    /// through this, since that would desynchronize the engine.
    pub fn low_level(&mut self) -> &mut LowLevel<I> {
        &mut self.ll
    }

    /// The host-side write offset: where the next submitted word will go.
    pub fn write_offset(&self) -> u16 {
        self.write_offset
    }

    /// Reads the coprocessor's current read offset. Returns the raw
    /// register value, which is [`FAULT_SENTINEL`](FAULT_SENTINEL) when
    /// the coprocessor has faulted.
    pub fn read_offset(&mut self) -> Result<u16, Error<I::Error>> {
        self.ll.rd16r(Register::CMD_READ).map_err(Error::Interface)
    }

    /// Reads the coprocessor's read offset and returns how many bytes
    /// may currently be written without overtaking it. Reports zero
    /// while the coprocessor is faulted.
    pub fn free_space(&mut self) -> Result<u16, Error<I::Error>> {
        let rd = self.read_offset()?;
        if rd == FAULT_SENTINEL {
            return Ok(0);
        }
        let space = free_space(self.write_offset, rd);
        self.known_space = space;
        Ok(space)
    }

    /// Blocks until at least `need` bytes of FIFO space are free.
    ///
    /// If the coprocessor faults while we wait, it is reset and the wait
    /// is retried once; the diagnostic is kept for
    /// [`take_fault_report`](Self::take_fault_report).
    pub fn await_space(&mut self, need: u16) -> Result<(), Error<I::Error>> {
        if self.known_space >= need {
            return Ok(());
        }
        match self.waiter.wait_for_space(&mut self.ll, self.write_offset, need) {
            Ok(space) => {
                self.known_space = space;
                Ok(())
            }
            Err(WaiterError::Fault) => {
                self.recover()?;
                let space = self
                    .waiter
                    .wait_for_space(&mut self.ll, self.write_offset, need)?;
                self.known_space = space;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes one command word at the current write offset and advances
    /// the offset, without publishing it.
    ///
    /// The caller is responsible for having reserved space first, via
    /// [`await_space`](Self::await_space).
    pub fn submit_word(&mut self, word: u32) -> Result<(), Error<I::Error>> {
        let addr = AddressRegion::RAM_CMD.offset(self.write_offset as u32);
        self.ll.wr32(addr, word).map_err(Error::Interface)?;
        self.write_offset = (self.write_offset + CMD_WORD_SIZE) & (FIFO_SIZE - 1);
        self.known_space = self.known_space.saturating_sub(CMD_WORD_SIZE);
        Ok(())
    }

    /// Publishes the current write offset, handing everything submitted
    /// so far to the coprocessor.
    pub fn publish(&mut self) -> Result<(), Error<I::Error>> {
        self.ll
            .wr16r(Register::CMD_WRITE, self.write_offset)
            .map_err(Error::Interface)
    }

    /// Reserves space for the given words, submits them, and publishes.
    pub fn submit_words(&mut self, words: &[u32]) -> Result<(), Error<I::Error>> {
        self.await_space(words.len() as u16 * CMD_WORD_SIZE)?;
        for w in words {
            self.submit_word(*w)?;
        }
        self.publish()
    }

    /// Streams an arbitrarily large command buffer through the FIFO.
    ///
    /// The data is fed in bursts of at most
    /// [`WORK_BUFFER_SIZE`](WORK_BUFFER_SIZE) bytes, each published as
    /// soon as it is written so the coprocessor can start consuming
    /// while the rest is still in flight. A burst never crosses the
    /// wrap point of the FIFO, so each one is a single linear write.
    /// If the data is not a whole number of words, the final burst is
    /// padded with zero bytes.
    pub fn stream(&mut self, data: &[u8]) -> Result<(), Error<I::Error>> {
        const PAD: [u8; 3] = [0; 3];
        let mut remaining = data;
        while !remaining.is_empty() {
            let until_wrap = (FIFO_SIZE - self.write_offset) as usize;
            let take = remaining.len().min(WORK_BUFFER_SIZE).min(until_wrap);
            // Only the final burst can be unaligned, since the write
            // offset and the wrap point are both word-aligned.
            let padded = (take + 3) & !3;

            self.await_space(padded as u16)?;
            let addr = AddressRegion::RAM_CMD.offset(self.write_offset as u32);
            let ei = self.ll.borrow_interface();
            ei.begin_write(addr).map_err(Error::Interface)?;
            ei.continue_write(&remaining[..take])
                .map_err(Error::Interface)?;
            if padded > take {
                ei.continue_write(&PAD[..padded - take])
                    .map_err(Error::Interface)?;
            }
            ei.end_write().map_err(Error::Interface)?;

            self.write_offset = (self.write_offset + padded as u16) & (FIFO_SIZE - 1);
            self.known_space = self.known_space.saturating_sub(padded as u16);
            self.publish()?;
            remaining = &remaining[take..];
        }
        Ok(())
    }

    /// Blocks until the coprocessor has consumed everything published
    /// so far.
    ///
    /// If the coprocessor faults instead, it is reset and the fault
    /// diagnostic is returned; the FIFO is empty again either way.
    pub fn drain(&mut self) -> Result<Option<FaultMessage>, Error<I::Error>> {
        match self.waiter.wait_for_drain(&mut self.ll, self.write_offset) {
            Ok(()) => {
                self.known_space = FIFO_SIZE - CMD_WORD_SIZE;
                Ok(None)
            }
            Err(WaiterError::Fault) => {
                let msg = self.recover()?;
                Ok(Some(msg))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resets a faulted coprocessor and returns its diagnostic message.
    ///
    /// The reset loses any runtime patches the chip's firmware applied
    /// to the coprocessor, so the patch pointer is saved and restored
    /// around it. The host write offset is reset to zero along with the
    /// chip's FIFO registers, so the engine and the chip agree again
    /// afterwards.
    pub fn recover(&mut self) -> Result<FaultMessage, Error<I::Error>> {
        let msg = self.read_fault_report().map_err(Error::Interface)?;
        let patch_ptr = self
            .ll
            .rd16r(Register::COPRO_PATCH_PTR)
            .map_err(Error::Interface)?;

        self.ll
            .wr8r(Register::CPURESET, 1)
            .map_err(Error::Interface)?;
        self.ll
            .wr16r(Register::CMD_READ, 0)
            .map_err(Error::Interface)?;
        self.ll
            .wr16r(Register::CMD_WRITE, 0)
            .map_err(Error::Interface)?;
        self.ll
            .wr16r(Register::CMD_DL, 0)
            .map_err(Error::Interface)?;
        self.write_offset = 0;
        self.ll
            .wr8r(Register::CPURESET, 0)
            .map_err(Error::Interface)?;
        self.ll
            .wr16r(Register::COPRO_PATCH_PTR, patch_ptr)
            .map_err(Error::Interface)?;

        // The coprocessor needs a moment to come back up before it will
        // accept new work.
        self.ll
            .borrow_interface()
            .delay_ms(250)
            .map_err(Error::Interface)?;

        self.known_space = FIFO_SIZE - CMD_WORD_SIZE;
        self.last_fault = Some(msg);
        Ok(msg)
    }

    /// Returns and clears the most recent fault diagnostic, if a fault
    /// has been recovered from since this was last called.
    pub fn take_fault_report(&mut self) -> Option<FaultMessage> {
        self.last_fault.take()
    }

    fn read_fault_report(&mut self) -> Result<FaultMessage, I::Error> {
        let mut buf = [0; ERR_REPORT_LEN];
        self.ll
            .rd8s(AddressRegion::RAM_ERR_REPORT.offset(0), &mut buf)?;
        Ok(FaultMessage(buf))
    }

    /// Begins a new display list built by the coprocessor.
    pub fn start_display_list(&mut self) -> Result<(), Error<I::Error>> {
        self.submit_words(&[CMD_DLSTART])
    }

    /// Asks the coprocessor to swap in the display list it has built.
    pub fn display_list_swap(&mut self) -> Result<(), Error<I::Error>> {
        self.submit_words(&[CMD_SWAP])
    }

    /// Appends one drawing command to the display list under
    /// construction.
    pub fn append_display_list(&mut self, cmd: DLCmd) -> Result<(), Error<I::Error>> {
        self.submit_words(&[cmd.to_raw()])
    }

    /// Asks the coprocessor to draw text at the given coordinates using
    /// one of the builtin fonts.
    ///
    /// The string is packed directly from the borrowed slice into FIFO
    /// words, with no buffering on the host side. The whole command
    /// must fit in the FIFO at once, so strings longer than roughly the
    /// FIFO size are rejected with
    /// [`Error::CommandTooLarge`](Error::CommandTooLarge).
    pub fn cmd_text(
        &mut self,
        x: i16,
        y: i16,
        font: u16,
        options: u16,
        text: &str,
    ) -> Result<(), Error<I::Error>> {
        let total_words = 3 + text_word_count(text);
        let total_bytes = total_words * CMD_WORD_SIZE as usize;
        if total_bytes > (FIFO_SIZE - CMD_WORD_SIZE) as usize {
            return Err(Error::CommandTooLarge);
        }
        self.await_space(total_bytes as u16)?;
        self.submit_word(CMD_TEXT)?;
        self.submit_word(pack(x as u16, y as u16))?;
        self.submit_word(pack(font, options))?;
        for w in TextWords::new(text) {
            self.submit_word(w)?;
        }
        self.publish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use self::std::vec::Vec;
    use super::*;
    use crate::commands::options::OPT_CENTER;
    use crate::interface::fake::Fake;

    fn new_cp(fake: Fake) -> Coprocessor<Fake, PollingWaiter> {
        Coprocessor::new(fake, PollingWaiter::new(100)).unwrap()
    }

    #[test]
    fn test_free_space() {
        assert_eq!(free_space(0, 0), 4092);
        assert_eq!(free_space(4, 0), 4088);
        assert_eq!(free_space(0, 4), 0);
        assert_eq!(free_space(4092, 0), 0);
        assert_eq!(free_space(100, 2000), 1896);
    }

    #[test]
    fn test_submit_and_publish() {
        let mut cp = new_cp(Fake::new());
        cp.submit_words(&[0x11111111, 0x22222222]).unwrap();
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), 0x11111111);
        assert_eq!(fake.cmd_word(1), 0x22222222);
        assert_eq!(fake.reg16(0xfc), 8);
        assert_eq!(cp.write_offset(), 8);
    }

    #[test]
    fn test_write_offset_wraps() {
        let mut fake = Fake::new();
        fake.set_reg16(0xfc, 4092);
        fake.set_reg16(0xf8, 4092);
        let mut cp = new_cp(fake);
        cp.submit_words(&[0xdeadbeef]).unwrap();
        assert_eq!(cp.write_offset(), 0);
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(1023), 0xdeadbeef);
        assert_eq!(fake.reg16(0xfc), 0);
    }

    #[test]
    fn test_stream_chunking() {
        let data: Vec<u8> = (0..1300u32).map(|i| i as u8).collect();
        let mut cp = new_cp(Fake::new());
        cp.stream(&data).unwrap();
        assert_eq!(cp.write_offset(), 1300);
        let fake = cp.low_level().borrow_interface();
        // Flow control never lets more than one burst be outstanding.
        assert!(fake.max_in_flight() <= WORK_BUFFER_SIZE as u16);
        assert_eq!(fake.publish_count(), 3);
        assert_eq!(fake.cmd_word(0), 0x03020100);
    }

    #[test]
    fn test_stream_larger_than_fifo() {
        let len = 4096 * 3 + 7;
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let mut cp = new_cp(Fake::new());
        cp.stream(&data).unwrap();
        // Rounded up to a whole word, then wrapped.
        assert_eq!(cp.write_offset(), ((len + 3) & !3) as u16 % FIFO_SIZE);
        let fake = cp.low_level().borrow_interface();
        assert!(fake.max_in_flight() <= FIFO_SIZE - CMD_WORD_SIZE);
    }

    #[test]
    fn test_stream_pads_final_burst() {
        let mut cp = new_cp(Fake::new());
        cp.stream(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee]).unwrap();
        assert_eq!(cp.write_offset(), 8);
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), 0xddccbbaa);
        assert_eq!(fake.cmd_word(1), 0x000000ee);
    }

    #[test]
    fn test_stream_never_crosses_wrap() {
        let mut fake = Fake::new();
        fake.set_reg16(0xfc, 4000);
        fake.set_reg16(0xf8, 4000);
        let mut cp = new_cp(fake);
        let data: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        cp.stream(&data).unwrap();
        assert_eq!(cp.write_offset(), 104);
        let fake = cp.low_level().borrow_interface();
        // First burst stops exactly at the wrap point, second restarts
        // at the bottom of the FIFO.
        assert_eq!(fake.cmd_word(1000), 0x03020100);
        assert_eq!(fake.cmd_word(1023), 0x5f5e5d5c);
        assert_eq!(fake.cmd_word(0), 0x63626160);
    }

    #[test]
    fn test_fault_recovery() {
        let mut fake = Fake::new();
        fake.set_reg16(0x7162, 0x1234);
        fake.inject_fault("display list must be empty", 1);
        let mut cp = new_cp(fake);

        cp.submit_words(&[0xffffff01]).unwrap();
        let msg = cp.drain().unwrap();
        assert_eq!(
            msg.unwrap().as_str().unwrap(),
            "display list must be empty"
        );

        assert_eq!(cp.write_offset(), 0);
        let report = cp.take_fault_report().unwrap();
        assert_eq!(report.as_bytes(), b"display list must be empty");
        assert!(cp.take_fault_report().is_none());

        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.recovery_count(), 1);
        assert_eq!(fake.reg16(0xf8), 0);
        assert_eq!(fake.reg16(0xfc), 0);
        assert_eq!(fake.reg16(0x7162), 0x1234);
        assert!(fake.total_delay_ms() >= 250);
    }

    #[test]
    fn test_fault_during_await_space() {
        let mut fake = Fake::new();
        fake.inject_fault("overflow", 1);
        let mut cp = new_cp(fake);
        cp.submit_words(&[0x00000000]).unwrap();
        // The fake has now faulted; asking for the whole FIFO forces a
        // real wait, which must recover and then succeed.
        cp.await_space(FIFO_SIZE - CMD_WORD_SIZE).unwrap();
        assert_eq!(cp.write_offset(), 0);
        assert_eq!(
            cp.take_fault_report().unwrap().as_bytes(),
            b"overflow"
        );
    }

    #[test]
    fn test_cmd_text_packing() {
        let mut cp = new_cp(Fake::new());
        cp.cmd_text(100, 50, 27, OPT_CENTER, "abc").unwrap();
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.cmd_word(0), 0xffffff0c);
        assert_eq!(fake.cmd_word(1), (50 << 16) | 100);
        assert_eq!(fake.cmd_word(2), (1536 << 16) | 27);
        assert_eq!(fake.cmd_word(3), 0x00636261);
        assert_eq!(fake.reg16(0xfc), 16);
    }

    #[test]
    fn test_cmd_text_rejects_oversized_string() {
        let mut cp = new_cp(Fake::new());
        let too_long: std::string::String = core::iter::repeat('x').take(16 * 1024).collect();
        assert_eq!(
            cp.cmd_text(0, 0, 27, 0, &too_long),
            Err(Error::CommandTooLarge)
        );
        // Nothing may have been submitted or published.
        assert_eq!(cp.write_offset(), 0);
        let fake = cp.low_level().borrow_interface();
        assert_eq!(fake.publish_count(), 0);

        // The largest string whose command still fits goes through.
        let longest: std::string::String = core::iter::repeat('x').take(4079).collect();
        let mut cp = new_cp(Fake::new());
        cp.cmd_text(0, 0, 27, 0, &longest).unwrap();
        assert_eq!(cp.write_offset(), FIFO_SIZE - CMD_WORD_SIZE);
    }

    #[test]
    fn test_free_space_reads_chip_offset() {
        let mut fake = Fake::new_stalled();
        fake.set_reg16(0xf8, 2000);
        let mut cp = new_cp(fake);
        assert_eq!(cp.free_space().unwrap(), free_space(0, 2000));

        let mut fake = Fake::new();
        fake.set_reg16(0xf8, FAULT_SENTINEL);
        let mut cp = new_cp(fake);
        assert_eq!(cp.free_space().unwrap(), 0);
    }

    #[test]
    fn test_timeout_when_stalled_full() {
        let mut fake = Fake::new_stalled();
        fake.set_reg16(0xfc, 4092);
        let mut cp = new_cp(fake);
        // known space is 0 and the stalled coprocessor never consumes.
        assert_eq!(cp.submit_words(&[0]), Err(Error::Timeout));
    }
}
