//! Append-only telemetry log on a W25Qxx-style SPI NOR flash.
//!
//! The log occupies the chip from address zero. Records are ASCII, so the
//! first erased (`0xFF`) byte marks the end of the log; [`search_end`] finds it
//! with a binary search at startup. Appends are programmed page by page and
//! never cross a page boundary within one program command.
//!
//! Commands carry 3-byte addresses, so only the first 16 MiB of larger parts
//! is used.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use heapless::Vec;
use mppt_core::telemetry::{LogError, RECORD_CAPACITY};

/// Program granularity of the flash.
pub const PAGE_SIZE: u32 = 256;
/// Line terminator written after each record.
pub const TERMINATOR: &[u8] = b"\r\n";
/// Largest frame [`frame_record`] builds: a leading break, the line, and its
/// terminator.
pub const FRAME_CAPACITY: usize = RECORD_CAPACITY + 2 * TERMINATOR.len();
/// Bytes reachable with a 3-byte address.
pub const MAX_ADDRESSABLE: u32 = 1 << 24;

const ERASED: u8 = 0xFF;

/// Bytes programmed for one record.
pub type Frame = Vec<u8, FRAME_CAPACITY>;

/// Builds the bytes for `line` followed by its terminator.
///
/// With `leading_break` the frame starts with a terminator too, closing off
/// whatever a failed append left behind.
pub fn frame_record(line: &str, leading_break: bool) -> Result<Frame, LogError> {
    let mut frame = Frame::new();
    if leading_break {
        frame
            .extend_from_slice(TERMINATOR)
            .map_err(|_| LogError::RecordTooLong)?;
    }
    frame
        .extend_from_slice(line.as_bytes())
        .and_then(|()| frame.extend_from_slice(TERMINATOR))
        .map_err(|_| LogError::RecordTooLong)?;
    Ok(frame)
}

/// Bytes of `remaining` that fit in the page containing `address`.
#[must_use]
pub fn page_span(address: u32, remaining: usize) -> usize {
    let room = PAGE_SIZE - address % PAGE_SIZE;
    usize::try_from(room).map_or(remaining, |room| room.min(remaining))
}

/// Usable capacity in bytes from a JEDEC id, or `None` when nothing
/// answered. Parts above [`MAX_ADDRESSABLE`] are clamped to it.
#[must_use]
pub fn capacity_from_jedec(id: [u8; 3]) -> Option<u32> {
    let [manufacturer, _, capacity_code] = id;
    if manufacturer == 0x00 || manufacturer == ERASED {
        return None;
    }
    (0x10..=0x1F)
        .contains(&capacity_code)
        .then(|| (1u32 << capacity_code).min(MAX_ADDRESSABLE))
}

/// First address below `capacity` that reads as erased, or `capacity` when
/// the log fills the chip.
pub fn search_end<E>(
    capacity: u32,
    mut is_erased: impl FnMut(u32) -> Result<bool, E>,
) -> Result<u32, E> {
    let (mut low, mut high) = (0, capacity);
    while low < high {
        let mid = low + (high - low) / 2;
        if is_erased(mid)? {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    Ok(low)
}

#[cfg(target_os = "none")]
pub use self::target::SpiFlashLog;

#[cfg(target_os = "none")]
mod target {
    use embassy_stm32::gpio::Output;
    use embassy_stm32::mode::Blocking;
    use embassy_stm32::spi::{Error as SpiError, Spi};
    use mppt_core::telemetry::{LogError, LogPresence, RecordLog};

    use super::{ERASED, capacity_from_jedec, frame_record, page_span, search_end};

    const CMD_JEDEC_ID: u8 = 0x9F;
    const CMD_READ: u8 = 0x03;
    const CMD_WRITE_ENABLE: u8 = 0x06;
    const CMD_PAGE_PROGRAM: u8 = 0x02;
    const CMD_READ_STATUS: u8 = 0x05;

    const STATUS_BUSY: u8 = 0x01;
    /// Status polls before a program is treated as failed.
    const BUSY_POLL_LIMIT: u32 = 20_000;

    /// [`RecordLog`] backed by the external SPI flash.
    pub struct SpiFlashLog<'d> {
        spi: Spi<'d, Blocking>,
        cs: Output<'d>,
        capacity: u32,
        cursor: u32,
        /// A failed append left a partial line before `cursor`.
        needs_break: bool,
    }

    impl<'d> SpiFlashLog<'d> {
        /// `cs` must idle high.
        pub fn new(spi: Spi<'d, Blocking>, cs: Output<'d>) -> Self {
            Self {
                spi,
                cs,
                capacity: 0,
                cursor: 0,
                needs_break: false,
            }
        }

        fn selected<T>(
            &mut self,
            op: impl FnOnce(&mut Spi<'d, Blocking>) -> Result<T, SpiError>,
        ) -> Result<T, SpiError> {
            self.cs.set_low();
            let result = op(&mut self.spi);
            self.cs.set_high();
            result
        }

        fn read_id(&mut self) -> Result<[u8; 3], SpiError> {
            self.selected(|spi| {
                let mut id = [0u8; 3];
                spi.blocking_write(&[CMD_JEDEC_ID])?;
                spi.blocking_read(&mut id)?;
                Ok(id)
            })
        }

        fn read_byte(&mut self, address: u32) -> Result<u8, SpiError> {
            self.selected(|spi| {
                let mut byte = [0u8; 1];
                spi.blocking_write(&command(CMD_READ, address))?;
                spi.blocking_read(&mut byte)?;
                Ok(byte[0])
            })
        }

        fn read_status(&mut self) -> Result<u8, SpiError> {
            self.selected(|spi| {
                let mut status = [CMD_READ_STATUS, 0];
                spi.blocking_transfer_in_place(&mut status)?;
                Ok(status[1])
            })
        }

        fn program_page(&mut self, address: u32, bytes: &[u8]) -> Result<(), SpiError> {
            self.selected(|spi| spi.blocking_write(&[CMD_WRITE_ENABLE]))?;
            self.selected(|spi| {
                spi.blocking_write(&command(CMD_PAGE_PROGRAM, address))?;
                spi.blocking_write(bytes)
            })
        }

        fn wait_ready(&mut self) -> Result<(), LogError> {
            for _ in 0..BUSY_POLL_LIMIT {
                let status = self.read_status().map_err(|_| LogError::WriteFailed)?;
                if status & STATUS_BUSY == 0 {
                    return Ok(());
                }
            }
            Err(LogError::WriteFailed)
        }

        fn program(&mut self, mut bytes: &[u8]) -> Result<(), LogError> {
            while !bytes.is_empty() {
                let span = page_span(self.cursor, bytes.len());
                let (page, rest) = bytes.split_at(span);
                self.program_page(self.cursor, page)
                    .map_err(|_| LogError::WriteFailed)?;
                self.wait_ready()?;
                self.cursor += u32::try_from(span).map_err(|_| LogError::WriteFailed)?;
                bytes = rest;
            }
            Ok(())
        }

        /// Re-reads the end of the log after an append failed part way.
        fn resync(&mut self, start: u32) {
            let _ = self.wait_ready();
            let capacity = self.capacity;
            if let Ok(end) = search_end(capacity, |address| {
                self.read_byte(address).map(|byte| byte == ERASED)
            }) {
                self.cursor = end;
            }
            if self.cursor > start {
                self.needs_break = true;
            }
        }
    }

    impl RecordLog for SpiFlashLog<'_> {
        fn open_log(&mut self) -> Result<LogPresence, LogError> {
            let id = self.read_id().map_err(|_| LogError::Unavailable)?;
            let capacity = capacity_from_jedec(id).ok_or(LogError::Unavailable)?;
            let cursor = search_end(capacity, |address| {
                self.read_byte(address).map(|byte| byte == ERASED)
            })
            .map_err(|_| LogError::OpenFailed)?;
            self.capacity = capacity;
            self.cursor = cursor;

            Ok(if self.cursor == 0 {
                LogPresence::Absent
            } else {
                LogPresence::Existing
            })
        }

        fn append_line(&mut self, line: &str) -> Result<(), LogError> {
            let frame = frame_record(line, self.needs_break)?;
            let length = u32::try_from(frame.len()).map_err(|_| LogError::RecordTooLong)?;
            let fits = self
                .cursor
                .checked_add(length)
                .is_some_and(|end| end <= self.capacity);
            if !fits {
                return Err(LogError::WriteFailed);
            }

            let start = self.cursor;
            match self.program(&frame) {
                Ok(()) => {
                    self.needs_break = false;
                    Ok(())
                }
                Err(err) => {
                    self.resync(start);
                    Err(err)
                }
            }
        }
    }

    fn command(opcode: u8, address: u32) -> [u8; 4] {
        let [_, high, mid, low] = address.to_be_bytes();
        [opcode, high, mid, low]
    }
}
