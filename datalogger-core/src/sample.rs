//! Raw IMU samples and their CSV representation

use core::fmt::Write;

use heapless::String;

/// Column header written as the first line of every log file
pub const CSV_HEADER: &str = "sample_number,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z";

/// Longest possible data line: u32 index plus six i16 fields and separators
pub const CSV_LINE_CAPACITY: usize = 10 + 6 * (1 + 6);

/// One formatted CSV data line, without terminator
pub type CsvLine = String<CSV_LINE_CAPACITY>;

/// Longest record handed to the card in one write: the header or a data line plus `\n`
pub const CSV_RECORD_CAPACITY: usize = 64;

pub type CsvRecord = String<CSV_RECORD_CAPACITY>;

/// Appends the line terminator. `None` when the line does not fit one record.
pub fn terminated(line: &str) -> Option<CsvRecord> {
    let mut record = CsvRecord::new();
    record.push_str(line).ok()?;
    record.push('\n').ok()?;
    Some(record)
}

/// One raw reading of the 3-axis accelerometer and 3-axis gyroscope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl Sample {
    pub const fn new(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self { accel, gyro }
    }

    /// Formats the sample as a CSV data line carrying `sample_number` in the first column
    pub fn to_csv_line(&self, sample_number: u32) -> CsvLine {
        let mut line = CsvLine::new();
        // capacity covers the widest possible values, the write cannot overflow
        let _ = write!(
            line,
            "{},{},{},{},{},{},{}",
            sample_number,
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2]
        );
        line
    }
}
