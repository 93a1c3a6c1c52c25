//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates periodic timers that push events into the lock-free SPSC queue.
//! On simulation targets the main loop drives events from a sleep loop
//! instead.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event() which uses AtomicU8.

use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Status heartbeat period: one log line per minute.
#[cfg(target_os = "espidf")]
const STATUS_PERIOD_US: u64 = 60_000_000;

#[cfg(target_os = "espidf")]
static mut SAMPLE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut STATUS_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: SAMPLE_TIMER is written once in `start_timers()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn sample_timer() -> esp_timer_handle_t {
    unsafe { SAMPLE_TIMER }
}

/// SAFETY: Same invariants as `sample_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn status_timer() -> esp_timer_handle_t {
    unsafe { STATUS_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::SampleTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn status_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::StatusTick);
}

/// Start the hardware tick timers.
///
/// - sample timer at the configured tick interval (5000 ms by default)
/// - status heartbeat timer at 1/min
#[cfg(target_os = "espidf")]
pub fn start_timers(tick_interval_ms: u32) {
    // SAFETY: SAMPLE_TIMER and STATUS_TIMER are written here once at boot
    // from the single main-task context before any timer callbacks fire.
    // The callbacks themselves only call push_event(), which is ISR-safe.
    unsafe {
        let sample_args = esp_timer_create_args_t {
            callback: Some(sample_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"sample\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&sample_args, &raw mut SAMPLE_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: sample timer create failed (rc={}) — continuing without sample ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(SAMPLE_TIMER, u64::from(tick_interval_ms) * 1_000);
        if ret != ESP_OK {
            log::error!("hw_timer: sample timer start failed (rc={})", ret);
            return;
        }

        let status_args = esp_timer_create_args_t {
            callback: Some(status_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"status\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&status_args, &raw mut STATUS_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: status timer create failed (rc={}) — continuing without heartbeat",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(STATUS_TIMER, STATUS_PERIOD_US);
        if ret != ESP_OK {
            log::error!("hw_timer: status timer start failed (rc={})", ret);
            return;
        }

        info!(
            "hw_timer: sample@{}ms + status@60s started",
            tick_interval_ms
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_tick_interval_ms: u32) {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
}

/// Stop all hardware tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: SAMPLE_TIMER/STATUS_TIMER are valid handles if start_timers()
    // succeeded; null-check prevents double-free.
    unsafe {
        // SAFETY: sample_timer()/status_timer() contract — main task only.
        let st = sample_timer();
        if !st.is_null() {
            esp_timer_stop(st);
        }
        let ht = status_timer();
        if !ht.is_null() {
            esp_timer_stop(ht);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
