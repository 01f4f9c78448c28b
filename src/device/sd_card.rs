//! SD card storage
//!
//! FAT volume on an SD card in SPI mode, behind the [`Storage`] seam of the core.
//!
//! The card driver lives in a static so the health check can poke it while a volume
//! manager is mounted on top of it. The volume manager itself is built on every mount and
//! dropped on unmount, which keeps a half-open volume from surviving a card swap.

use core::fmt::Write as _;

use datalogger_core::error::StorageError;
use datalogger_core::interface::{EntryKind, FileInfo, SpaceInfo, Storage};
use datalogger_core::sample;
use defmt::{debug, info, warn, Debug2Format};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Block, BlockCount, BlockDevice, BlockIdx, Mode, RawDirectory, RawFile, RawVolume, SdCard,
    SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};
use static_cell::StaticCell;

use crate::system::resources::SdCardResources;

/// SPI clock during card initialization, cards must accept 400 kHz
const INIT_FREQUENCY_HZ: u32 = 400_000;

/// SPI clock once the card has answered, fast enough for one record per sample period
const DATA_FREQUENCY_HZ: u32 = 16_000_000;

/// Written lines between two explicit flushes
const FLUSH_EVERY: u32 = 100;

type SdSpiDevice = ExclusiveDevice<Spi<'static, SPI0, spi::Blocking>, Output<'static>, Delay>;
type SdCardDevice = SdCard<SdSpiDevice, Delay>;
type Volumes = VolumeManager<SharedCard, FixedClock>;

static SD_CARD: StaticCell<SdCardDevice> = StaticCell::new();

/// Shared reference to the card driver, usable as a block device
pub struct SharedCard(&'static SdCardDevice);

impl BlockDevice for SharedCard {
    type Error = SdCardError;

    fn read(&self, blocks: &mut [Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        self.0.read(blocks, start_block_idx)
    }

    fn write(&self, blocks: &[Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        self.0.write(blocks, start_block_idx)
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        self.0.num_blocks()
    }
}

/// The logger has no RTC, every file gets the same timestamp
pub struct FixedClock;

impl TimeSource for FixedClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

struct Mounted {
    volumes: Volumes,
    volume: RawVolume,
    root: RawDirectory,
}

/// Open log file
pub struct LogFile {
    raw: RawFile,
    unflushed: u32,
}

pub struct SdStorage {
    card: &'static SdCardDevice,
    mounted: Option<Mounted>,
}

impl SdStorage {
    pub fn new(r: SdCardResources) -> Self {
        let mut config = spi::Config::default();
        config.frequency = INIT_FREQUENCY_HZ;
        let bus = Spi::new_blocking(r.spi, r.sck, r.mosi, r.miso, config);
        let cs = Output::new(r.cs, Level::High);
        let device = ExclusiveDevice::new(bus, cs, Delay).unwrap();
        let card = SD_CARD.init(SdCard::new(device, Delay));
        Self {
            card,
            mounted: None,
        }
    }

    fn set_spi_frequency(&self, freq_hz: u32) {
        self.card.spi(|device| device.bus_mut().set_frequency(freq_hz));
    }

    fn mounted(&mut self) -> Result<&mut Mounted, StorageError> {
        self.mounted.as_mut().ok_or(StorageError::NotMounted)
    }
}

impl Storage for SdStorage {
    type File = LogFile;

    fn mount(&mut self) -> Result<(), StorageError> {
        if self.mounted.is_some() {
            return Ok(());
        }

        // force a fresh card handshake at the slow clock, the card may have been swapped
        self.set_spi_frequency(INIT_FREQUENCY_HZ);
        self.card.mark_card_uninit();
        let volumes = VolumeManager::new(SharedCard(self.card), FixedClock);

        let volume = volumes.open_raw_volume(VolumeIdx(0)).map_err(|e| {
            warn!("Opening volume failed: {:?}", e);
            StorageError::MountFailed
        })?;

        let root = match volumes.open_root_dir(volume) {
            Ok(root) => root,
            Err(e) => {
                warn!("Opening root directory failed: {:?}", e);
                let _ = volumes.close_volume(volume);
                return Err(StorageError::MountFailed);
            }
        };

        self.set_spi_frequency(DATA_FREQUENCY_HZ);
        info!("SD card volume opened, SPI at {} Hz", DATA_FREQUENCY_HZ);
        self.mounted = Some(Mounted {
            volumes,
            volume,
            root,
        });
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), StorageError> {
        let Some(mounted) = self.mounted.take() else {
            return Ok(());
        };

        let dir = mounted.volumes.close_dir(mounted.root);
        let volume = mounted.volumes.close_volume(mounted.volume);
        match (dir, volume) {
            (Ok(()), Ok(())) => Ok(()),
            (dir, volume) => {
                warn!(
                    "Closing volume failed: {:?} {:?}",
                    Debug2Format(&dir.err()),
                    Debug2Format(&volume.err())
                );
                Err(StorageError::Removed)
            }
        }
    }

    fn is_healthy(&mut self) -> bool {
        self.card.num_bytes().is_ok()
    }

    fn query_space(&mut self) -> Result<SpaceInfo, StorageError> {
        self.mounted()?;
        let bytes = self.card.num_bytes().map_err(|e| {
            warn!("Reading card size failed: {:?}", e);
            StorageError::ReadFailed
        })?;
        Ok(SpaceInfo {
            total_kib: bytes / 1024,
            free_kib: None,
        })
    }

    fn open_log(&mut self, name: &str) -> Result<LogFile, StorageError> {
        let mounted = self.mounted()?;
        let raw = mounted
            .volumes
            .open_file_in_dir(mounted.root, name, Mode::ReadWriteCreateOrTruncate)
            .map_err(|e| {
                warn!("Opening {} failed: {:?}", name, e);
                StorageError::OpenFailed
            })?;
        Ok(LogFile { raw, unflushed: 0 })
    }

    fn write_line(&mut self, file: &mut LogFile, line: &str) -> Result<(), StorageError> {
        let mounted = self.mounted()?;
        // one write per record, a failure never leaves a line without its terminator
        let Some(record) = sample::terminated(line) else {
            warn!("Record too long: {}", line);
            return Err(StorageError::WriteFailed);
        };
        if let Err(e) = mounted.volumes.write(file.raw, record.as_bytes()) {
            warn!("Write failed: {:?}", e);
            return Err(StorageError::WriteFailed);
        }

        file.unflushed += 1;
        if file.unflushed >= FLUSH_EVERY {
            file.unflushed = 0;
            mounted.volumes.flush_file(file.raw).map_err(|e| {
                warn!("Flush failed: {:?}", e);
                StorageError::WriteFailed
            })?;
        }
        Ok(())
    }

    fn close(&mut self, file: LogFile) -> Result<(), StorageError> {
        // without a volume manager the handle is already gone
        let Ok(mounted) = self.mounted() else {
            return Ok(());
        };
        mounted.volumes.close_file(file.raw).map_err(|e| {
            warn!("Closing file failed: {:?}", e);
            StorageError::WriteFailed
        })
    }

    fn list_files(&mut self, visit: &mut dyn FnMut(&FileInfo)) -> Result<(), StorageError> {
        let mounted = self.mounted()?;
        mounted
            .volumes
            .iterate_dir(mounted.root, |entry| {
                if entry.attributes.is_volume() {
                    return;
                }
                let mut name = heapless::String::new();
                if write!(name, "{}", entry.name).is_err() {
                    debug!("Truncated directory entry name");
                }
                let kind = if entry.attributes.is_directory() {
                    EntryKind::Directory
                } else if entry.attributes.is_read_only() {
                    EntryKind::ReadOnlyFile
                } else {
                    EntryKind::WritableFile
                };
                visit(&FileInfo {
                    name,
                    kind,
                    size: entry.size,
                });
            })
            .map_err(|e| {
                warn!("Listing root directory failed: {:?}", e);
                StorageError::ReadFailed
            })
    }
}
