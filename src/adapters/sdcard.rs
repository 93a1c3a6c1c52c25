//! Removable-storage adapter: SD card over SPI, FATFS-mounted.
//!
//! The reading log lives on the card so it survives reflashes and can be
//! pulled and read on any computer.  On device the card is mounted at
//! [`MOUNT_POINT`] through the ESP-IDF VFS, which makes plain `std::fs`
//! work against it; on the host a scratch directory stands in.
//!
//! A failed mount is not fatal: the monitor keeps running and every
//! storage operation degrades per-tick instead (lost appends, stale
//! window).

use std::path::{Path, PathBuf};

use crate::error::{Error, StorageError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    fs::fatfs::Fatfs,
    hal::gpio::{AnyIOPin, Gpio5, Gpio18, Gpio19, Gpio23},
    hal::spi::{config::DriverConfig, Dma, SpiDriver, SPI2},
    io::vfs::MountedFatfs,
    sd::{spi::SdSpiHostDriver, SdCardConfiguration, SdCardDriver},
};

pub const MOUNT_POINT: &str = "/sdcard";

#[cfg(target_os = "espidf")]
type SdMount = MountedFatfs<Fatfs<SdCardDriver<SdSpiHostDriver<'static, SpiDriver<'static>>>>>;

/// Holds the mount for its whole lifetime; dropping it unmounts the card.
pub struct SdCardStorage {
    root: PathBuf,
    #[cfg(target_os = "espidf")]
    _mount: Option<SdMount>,
}

impl SdCardStorage {
    /// Bring up the SPI bus, probe the card, and mount FATFS.
    ///
    /// Standard SD wiring on the classic VSPI pins: SCLK=18, MOSI=23,
    /// MISO=19, CS=5.
    #[cfg(target_os = "espidf")]
    pub fn mount_spi(
        spi: SPI2,
        sclk: Gpio18,
        mosi: Gpio23,
        miso: Gpio19,
        cs: Gpio5,
    ) -> Result<Self, Error> {
        fn mount_fail(stage: &'static str) -> impl FnOnce(esp_idf_svc::sys::EspError) -> Error {
            move |e| {
                log::error!("sdcard: {} failed: {}", stage, e);
                Error::Storage(StorageError::Unavailable)
            }
        }

        let spi_driver = SpiDriver::new(
            spi,
            sclk,
            mosi,
            Some(miso),
            &DriverConfig::default().dma(Dma::Auto(4096)),
        )
        .map_err(mount_fail("SPI driver init"))?;

        let host = SdSpiHostDriver::new(
            spi_driver,
            Some(cs),
            AnyIOPin::none(),
            AnyIOPin::none(),
            AnyIOPin::none(),
            None,
        )
        .map_err(mount_fail("SD SPI host init"))?;

        let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())
            .map_err(mount_fail("card probe"))?;

        let fatfs = Fatfs::new_sdcard(0, card).map_err(mount_fail("FATFS attach"))?;
        let mount =
            MountedFatfs::mount(fatfs, MOUNT_POINT, 4).map_err(mount_fail("FATFS mount"))?;

        log::info!("sdcard: mounted at {}", MOUNT_POINT);
        Ok(Self {
            root: PathBuf::from(MOUNT_POINT),
            _mount: Some(mount),
        })
    }

    /// Card-less fallback when the mount fails at boot.  The path still
    /// points at the mount point, so every log operation fails cleanly
    /// until a reboot with a working card.
    #[cfg(target_os = "espidf")]
    pub fn unmounted() -> Self {
        log::warn!("sdcard: running without a mounted card");
        Self {
            root: PathBuf::from(MOUNT_POINT),
            _mount: None,
        }
    }

    /// Host stand-in: a scratch directory under the system temp dir.
    #[cfg(not(target_os = "espidf"))]
    pub fn mount_sim() -> Result<Self, Error> {
        let root = std::env::temp_dir().join("templog-sdcard");
        std::fs::create_dir_all(&root).map_err(|e| {
            log::error!("sdcard(sim): scratch dir failed: {}", e);
            Error::Storage(StorageError::Unavailable)
        })?;
        log::info!("sdcard(sim): using {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a log file on the card.
    pub fn log_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_mount_creates_a_usable_root() {
        let storage = SdCardStorage::mount_sim().unwrap();
        assert!(storage.root().is_dir());
    }

    #[test]
    fn log_path_lands_under_the_root() {
        let storage = SdCardStorage::mount_sim().unwrap();
        let path = storage.log_path("temperature_log.txt");
        assert!(path.starts_with(storage.root()));
        assert!(path.ends_with("temperature_log.txt"));
    }
}
