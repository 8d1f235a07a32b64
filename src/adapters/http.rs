//! ESP-IDF HTTP server binding for the [`ControlSurface`].
//!
//! One wildcard handler per method forwards every request to the surface,
//! so route resolution (including 404/405) stays in host-tested code.

use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::http::Method as EspMethod;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::{Read, Write};
use log::info;

use crate::app::ports::Clock;
use crate::control::{ControlSurface, Method, MAX_BODY_BYTES};
use crate::pump::relay::RelayPort;

/// Start the server on `port` and register the handlers.  The returned
/// server must be kept alive for as long as requests should be served.
pub fn start<R, C>(surface: Arc<ControlSurface<R, C>>, port: u16) -> Result<EspHttpServer<'static>>
where
    R: RelayPort + Send + 'static,
    C: Clock + 'static,
{
    let config = Configuration {
        http_port: port,
        uri_match_wildcard: true,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&config)?;

    for (esp_method, method) in [
        (EspMethod::Get, Method::Get),
        (EspMethod::Post, Method::Post),
        (EspMethod::Put, Method::Other),
        (EspMethod::Delete, Method::Other),
    ] {
        let surface = Arc::clone(&surface);
        server.fn_handler::<anyhow::Error, _>("/*", esp_method, move |mut req| {
            let uri = req.uri().to_owned();

            // One byte past the limit, so the surface can tell an
            // oversized body from one that fits exactly.
            let mut body = [0u8; MAX_BODY_BYTES + 1];
            let mut len = 0;
            while len < body.len() {
                let n = req.read(&mut body[len..])?;
                if n == 0 {
                    break;
                }
                len += n;
            }

            let response = surface.handle(method, &uri, &body[..len]);
            let mut out = req.into_response(
                response.status,
                None,
                &[("Content-Type", "application/json")],
            )?;
            out.write_all(response.body.as_bytes())?;
            Ok(())
        })?;
    }

    info!("HTTP | control server listening on port {}", port);
    Ok(server)
}
