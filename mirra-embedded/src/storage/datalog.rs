use alloc::vec::Vec;

use embedded_io::{Read, ReadExactError, Write};
use mirra_api::wire::{FrameFlags, MAX_MESSAGE_LENGTH};
use mirra_api::{Message, MessageType, wire};

use super::{FileSystem, OpenMode};
use crate::error::{Error, Result};

const NOT_UPLOADED: u8 = 0;
const UPLOADED: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub uploaded: bool,
    pub message: Message,
}

/// Append-only log of encoded `SENSOR_DATA` messages.
///
/// Each record is a length byte followed by the encoded message, whose first
/// byte (the frame flags) is replaced with the upload flag. Reads restore the
/// flags byte. A record cut short by power loss ends the scan.
pub struct SensorDataLog<'a, FS: FileSystem> {
    fs: &'a mut FS,
    path: &'a str,
    temp_path: &'a str,
}

impl<'a, FS: FileSystem> SensorDataLog<'a, FS> {
    pub fn new(fs: &'a mut FS, path: &'a str, temp_path: &'a str) -> Self {
        Self {
            fs,
            path,
            temp_path,
        }
    }

    pub fn size(&self) -> usize {
        self.fs.size(self.path)
    }

    pub fn append(&mut self, message: &Message) -> Result<()> {
        let mut frame = wire::encode(message);
        let length = u8::try_from(frame.len()).map_err(|_| Error::SerializationError)?;
        frame[0] = NOT_UPLOADED;

        let mut file = self.fs.open(self.path, OpenMode::Append)?;
        file.write_all(&[length]).map_err(|_| Error::StorageFault)?;
        file.write_all(&frame).map_err(|_| Error::StorageFault)?;
        file.flush().map_err(|_| Error::StorageFault)
    }

    pub fn read_all(&mut self) -> Result<Vec<LogRecord>> {
        let mut records = Vec::new();
        self.scan(|_, record| {
            records.push(decode_record(record)?);
            Ok(())
        })?;
        Ok(records)
    }

    /// Records not yet uploaded, with their position in the log. Records
    /// that no longer decode are skipped.
    pub fn pending(&mut self) -> Result<Vec<(usize, Message)>> {
        let mut pending = Vec::new();
        self.scan(|index, record| {
            if record[0] != NOT_UPLOADED {
                return Ok(());
            }
            match decode_record(record) {
                Ok(record) => pending.push((index, record.message)),
                Err(e) => log::warn!("Skipping unreadable record {}: {}", index, e),
            }
            Ok(())
        })?;
        Ok(pending)
    }

    /// Sets the upload flag on the records at `indices`.
    pub fn mark_uploaded(&mut self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        self.rewrite(|index, record| {
            if indices.contains(&index) {
                record[0] = UPLOADED;
            }
            true
        })
    }

    /// Drops the oldest records until the log fits in `max_size` bytes.
    pub fn prune(&mut self, max_size: usize) -> Result<()> {
        let mut size = self.size();
        if size <= max_size {
            return Ok(());
        }

        let mut lengths = Vec::new();
        self.scan(|_, record| {
            lengths.push(record.len() + 1);
            Ok(())
        })?;

        let mut dropped = 0;
        for length in lengths {
            if size <= max_size {
                break;
            }
            size = size.saturating_sub(length);
            dropped += 1;
        }

        log::info!("Pruning {} records from {}", dropped, self.path);
        self.rewrite(|index, _| index >= dropped)
    }

    /// Calls `visit` with the index and raw bytes of every complete record.
    fn scan<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, &[u8]) -> Result<()>,
    {
        if !self.fs.exists(self.path) {
            return Ok(());
        }

        let mut file = self.fs.open(self.path, OpenMode::Read)?;
        let mut buffer = [0u8; MAX_MESSAGE_LENGTH];
        let mut index = 0;

        while let Some(length) = read_record(&mut file, &mut buffer)? {
            visit(index, &buffer[..length])?;
            index += 1;
        }
        Ok(())
    }

    /// Copies the log through `transform` into the temp file, then swaps it
    /// in. Records for which `transform` returns false are dropped.
    fn rewrite<F>(&mut self, mut transform: F) -> Result<()>
    where
        F: FnMut(usize, &mut [u8]) -> bool,
    {
        if !self.fs.exists(self.path) {
            return Ok(());
        }

        {
            let mut source = self.fs.open(self.path, OpenMode::Read)?;
            let mut target = self.fs.open(self.temp_path, OpenMode::Write)?;
            let mut buffer = [0u8; MAX_MESSAGE_LENGTH];
            let mut index = 0;

            while let Some(length) = read_record(&mut source, &mut buffer)? {
                if transform(index, &mut buffer[..length]) {
                    target.write_all(&[length as u8]).map_err(|_| Error::StorageFault)?;
                    target
                        .write_all(&buffer[..length])
                        .map_err(|_| Error::StorageFault)?;
                }
                index += 1;
            }
            target.flush().map_err(|_| Error::StorageFault)?;
        }

        self.fs.remove(self.path)?;
        self.fs.rename(self.temp_path, self.path)
    }
}

/// Reads one record into `buffer`, returning its length. `None` marks the
/// end of the log or a truncated tail.
fn read_record<R: Read>(file: &mut R, buffer: &mut [u8]) -> Result<Option<usize>> {
    let mut length = [0u8; 1];
    match file.read_exact(&mut length) {
        Ok(()) => {}
        Err(ReadExactError::UnexpectedEof) => return Ok(None),
        Err(ReadExactError::Other(_)) => return Err(Error::StorageFault),
    }

    let length = length[0] as usize;
    if length == 0 {
        log::warn!("Empty record in data log, ignoring the rest");
        return Ok(None);
    }

    match file.read_exact(&mut buffer[..length]) {
        Ok(()) => Ok(Some(length)),
        Err(ReadExactError::UnexpectedEof) => {
            log::warn!("Truncated record at end of data log");
            Ok(None)
        }
        Err(ReadExactError::Other(_)) => Err(Error::StorageFault),
    }
}

fn decode_record(record: &[u8]) -> Result<LogRecord> {
    let mut frame = record.to_vec();
    let uploaded = frame[0] == UPLOADED;
    frame[0] = FrameFlags::new(MessageType::SensorData).as_u8();

    Ok(LogRecord {
        uploaded,
        message: wire::decode(&frame)?,
    })
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use mirra_api::{MacAddress, MessagePayload, SensorData, SensorValue};

    use super::*;
    use crate::storage::MemoryFileSystem;

    const NODE: MacAddress = MacAddress::new([0x10, 0, 0, 0, 0, 1]);
    const GATEWAY: MacAddress = MacAddress::new([0x20, 0, 0, 0, 0, 1]);
    const PATH: &str = "/data.dat";
    const TEMP: &str = "/data_temp.dat";

    fn reading(time: u32, values: usize) -> Message {
        let values = (0..values)
            .map(|i| SensorValue::with_type(1, i as u8, time as f32 + i as f32))
            .collect();
        Message::new(
            NODE,
            GATEWAY,
            MessagePayload::SensorData(SensorData::new(time, values)),
        )
    }

    fn fill(fs: &mut MemoryFileSystem, count: u32) {
        let mut log = SensorDataLog::new(fs, PATH, TEMP);
        for time in 0..count {
            log.append(&reading(time, 2)).unwrap();
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let mut fs = MemoryFileSystem::new();
        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        assert!(log.read_all().unwrap().is_empty());
        assert!(log.pending().unwrap().is_empty());
        log.prune(0).unwrap();
    }

    #[test]
    fn test_append_then_read() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 3);

        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.uploaded));
        assert_eq!(records[1].message, reading(1, 2));

        // length byte + 13 header + 5 + 2 values
        assert_eq!(log.size(), 3 * (1 + 13 + 5 + 12));
    }

    #[test]
    fn test_mark_uploaded() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 4);

        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        log.mark_uploaded(&[0, 2]).unwrap();

        let flags: Vec<bool> = log.read_all().unwrap().iter().map(|r| r.uploaded).collect();
        assert_eq!(flags, vec![true, false, true, false]);

        let pending: Vec<usize> = log.pending().unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(pending, vec![1, 3]);

        // Later appends leave earlier flags alone
        log.append(&reading(4, 2)).unwrap();
        let flags: Vec<bool> = log.read_all().unwrap().iter().map(|r| r.uploaded).collect();
        assert_eq!(flags, vec![true, false, true, false, false]);
        assert!(!fs.exists(TEMP));
    }

    #[test]
    fn test_pending_skips_undecodable_records() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 1);

        // A record too short to hold a frame header
        let mut contents = fs.read(PATH).unwrap();
        contents.extend_from_slice(&[4, 0, 1, 2, 3]);
        fs.write(PATH, &contents);
        SensorDataLog::new(&mut fs, PATH, TEMP)
            .append(&reading(2, 1))
            .unwrap();

        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        let pending = log.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0], (0, reading(0, 2)));
        assert_eq!(pending[1], (2, reading(2, 1)));
        assert!(log.read_all().is_err());
    }

    #[test]
    fn test_prune_drops_oldest_and_keeps_flags() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 10);

        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        log.mark_uploaded(&[8]).unwrap();
        let record_size = 1 + 13 + 5 + 12;
        log.prune(3 * record_size + 5).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].message, reading(7, 2));
        assert!(records[1].uploaded);
        assert!(!records[2].uploaded);
        assert!(log.size() <= 3 * record_size + 5);
    }

    #[test]
    fn test_prune_below_limit_is_noop() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 2);
        let before = fs.read(PATH).unwrap();

        SensorDataLog::new(&mut fs, PATH, TEMP).prune(1024).unwrap();
        assert_eq!(fs.read(PATH).unwrap(), before);
    }

    #[test]
    fn test_truncated_tail_ends_scan() {
        let mut fs = MemoryFileSystem::new();
        fill(&mut fs, 3);

        let mut contents = fs.read(PATH).unwrap();
        contents.truncate(contents.len() - 4);
        fs.write(PATH, &contents);

        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_full_frame_fits_in_record() {
        let mut fs = MemoryFileSystem::new();
        let message = reading(5, SensorData::MAX_VALUES);
        let mut log = SensorDataLog::new(&mut fs, PATH, TEMP);
        log.append(&message).unwrap();
        assert_eq!(log.read_all().unwrap()[0].message, message);
    }
}
