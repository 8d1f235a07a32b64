//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                 |
//! |------------|-------------------------|-----------------------------|
//! | `display`  | StatusDisplay           | Serial log output           |
//! | `hardware` | RelayPort, FlowInput    | ESP32 GPIO, ISR service     |
//! |            | EnvironmentPort         | ESP32 ADC1                  |
//! | `http`     | (driving adapter)       | ESP-IDF HTTP server         |
//! | `log_sink` | EventSink               | Serial log output           |
//! | `time`     | Clock, MicrosClock      | ESP32 system timer          |
//! | `wifi`     | LinkProbe               | ESP-IDF WiFi STA            |

pub mod display;
pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http;
pub mod log_sink;
pub mod time;
pub mod wifi;
