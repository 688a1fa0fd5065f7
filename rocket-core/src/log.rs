use crate::types::Snapshot;
use core::fmt::Write;

// Longest possible CSV row: 8 fields of at most 46 chars (f32::MIN at four
// decimals), 7 separators and the newline.
pub const MAX_LOG_LINE_LEN: usize = 384;

/// Column names, in the order `write_record` emits the fields.
pub const CSV_HEADER: &str = "TIME,ALTITUDE,ACCEL_X,ACCEL_Y,ACCEL_Z,RATE_X,RATE_Y,RATE_Z";

/// Number of candidate dump files on the card.
pub const DUMP_SLOTS: u8 = 10;

/// Dump file written by the bench recorder.
pub const BENCH_FILE_NAME: &str = "RunTest.csv";

pub type DumpFileName = heapless::String<16>;

pub fn write_header<W: Write>(sink: &mut W) -> core::fmt::Result {
    writeln!(sink, "{}", CSV_HEADER)
}

// Fixed four decimals keep one dump byte-stable and are finer than any sensor.
pub fn write_record<W: Write>(snapshot: &Snapshot, sink: &mut W) -> core::fmt::Result {
    let a = &snapshot.acceleration;
    let r = &snapshot.angular_rate;
    writeln!(
        sink,
        "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}",
        snapshot.timestamp_s, snapshot.altitude_m, a[0], a[1], a[2], r[0], r[1], r[2]
    )
}

/// Picks the dump file name: the first of `Log_0.csv`..`Log_9.csv` that does
/// not exist yet, or `Log_0.csv` when all ten are taken.
pub fn select_dump_name<F: FnMut(&str) -> bool>(mut exists: F) -> DumpFileName {
    for slot in 0..DUMP_SLOTS {
        let name = dump_name(slot);
        if !exists(name.as_str()) {
            return name;
        }
    }
    dump_name(0)
}

fn dump_name(slot: u8) -> DumpFileName {
    let mut name = DumpFileName::new();
    // "Log_N.csv" always fits in 16 bytes.
    let _ = write!(name, "Log_{}.csv", slot);
    name
}

/// Fixed-capacity text sink that only ever holds whole CSV lines.
///
/// The dump formats each record here first and hands the card one complete
/// line, so a formatting failure never leaves half a row in the file.
pub struct LogBuffer<const SIZE: usize> {
    text: heapless::String<SIZE>,
}

impl<const SIZE: usize> Write for LogBuffer<SIZE> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.text.push_str(s).map_err(|_| core::fmt::Error)
    }
}

impl<const SIZE: usize> LogBuffer<SIZE> {
    pub const fn new() -> Self {
        Self {
            text: heapless::String::new(),
        }
    }

    /// Appends one record line and returns its length. On overflow the
    /// buffer is left as it was.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<usize, core::fmt::Error> {
        let start = self.text.len();
        if let Err(e) = write_record(snapshot, self) {
            self.text.truncate(start);
            return Err(e);
        }
        Ok(self.text.len() - start)
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

impl<const SIZE: usize> Default for LogBuffer<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
