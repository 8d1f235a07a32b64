//! Task Watchdog Timer (TWDT) driver.
//!
//! The supervisory task subscribes itself and feeds the watchdog on every
//! cycle; if the safety loop stalls for longer than the timeout the chip
//! resets, which also drops the relay.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT with the given timeout.
    pub fn subscribe(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: reconfigure/add are safe to call from any task; the
            // null handle means "the calling task".
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("Watchdog: reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
                } else {
                    warn!("Watchdog: failed to subscribe ({})", ret);
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms timeout, no-op", timeout_ms);
            Self {}
        }
    }

    /// Feed the watchdog.
    pub fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
