//! ADC oneshot driver for the thermistor channel.
//!
//! Raw ESP-IDF sys calls, initialised once from `main()` before the event
//! loop or the HTTP server exist.  Unlike most peripherals the ADC is read
//! from two tasks — the tick loop and the HTTP on-demand path — so every
//! read takes a lock; the oneshot driver is not guaranteed reentrant.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::Error;
#[cfg(target_os = "espidf")]
use crate::error::SensorError;

#[cfg(target_os = "espidf")]
const THERMISTOR_CHANNEL: adc_channel_t = adc_channel_t_ADC_CHANNEL_8;

#[cfg(target_os = "espidf")]
static mut ADC_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
static ADC_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// SAFETY: `ADC_HANDLE` is written once in `init()` before the tick loop
/// and HTTP server start; afterwards it is only read, under `ADC_LOCK`.
#[cfg(target_os = "espidf")]
unsafe fn adc_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC_HANDLE }
}

#[cfg(target_os = "espidf")]
pub fn init() -> Result<(), Error> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC_HANDLE is only written here, once at boot, before any
    // reader task exists.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC_HANDLE) };
    if ret != ESP_OK {
        log::error!("adc: oneshot unit create failed (rc={})", ret);
        return Err(Error::Init("ADC unit create failed"));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: adc_handle() contract — still on the single init path here.
    let ret =
        unsafe { adc_oneshot_config_channel(adc_handle(), THERMISTOR_CHANNEL, &chan_cfg) };
    if ret != ESP_OK {
        log::error!("adc: channel config failed (rc={})", ret);
        return Err(Error::Init("ADC channel config failed"));
    }

    log::info!("adc: ADC1 configured (CH8=thermistor)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init() -> Result<(), Error> {
    log::info!("adc(sim): init skipped");
    Ok(())
}

/// Read one raw count (0..=4095).  Safe to call from any task.
#[cfg(target_os = "espidf")]
pub fn read_raw() -> Result<u16, SensorError> {
    let _guard = ADC_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    // SAFETY: adc_handle() contract — written once at init, read-only here.
    let handle = unsafe { adc_handle() };
    if handle.is_null() {
        return Err(SensorError::AdcReadFailed);
    }

    let mut raw: i32 = 0;
    // SAFETY: handle is a live oneshot unit; `raw` outlives the call.
    let ret = unsafe { adc_oneshot_read(handle, THERMISTOR_CHANNEL, &mut raw) };
    if ret != ESP_OK {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.clamp(0, 4095) as u16)
}
