//! Control surface: HTTP requests → pump commands → JSON responses.
//!
//! Transport-free.  The ESP-IDF server adapter (`adapters::http`) passes
//! method, path and body in and writes the returned [`HttpResponse`] out,
//! which keeps every status-code decision testable on the host.
//!
//! | Method/Path                | Command        |
//! |----------------------------|----------------|
//! | `POST /pump/activate`      | Activate       |
//! | `POST /pump/deactivate`    | Deactivate     |
//! | `GET  /pump/status`        | Query          |
//! | `POST /pump/emergency-stop`| EmergencyStop  |
//! | `POST /pump/reset`         | Reset          |
//! | `POST /pump/enable`        | Enable         |
//! | `POST /pump/disable`       | Disable        |
//! | `POST /flow/reset`         | ResetFlowTotal |
//! | `POST /flow/mode`          | SetFlowMode    |
//!
//! Pump commands answer with the pump status.  Flow commands are queued
//! for the acquisition task and answer 202 with an acknowledgement.

pub mod json;

use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::Clock;
use crate::error::{Error, SafetyFault};
use crate::pump::relay::RelayPort;
use crate::pump::state::{Activation, StatusReport};
use crate::pump::PumpController;
use crate::sensors::flow::{FlowRequests, FlowStrategy};
use json::{ActivateBody, ErrorBody, FlowAckBody, FlowModeBody, StatusBody};

/// Largest request body the surface accepts.
pub const MAX_BODY_BYTES: usize = 512;

/// Request methods the surface distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        if method.eq_ignore_ascii_case("GET") {
            Self::Get
        } else if method.eq_ignore_ascii_case("POST") {
            Self::Post
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Activate,
    Deactivate,
    Status,
    EmergencyStop,
    Reset,
    Enable,
    Disable,
    FlowReset,
    FlowMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    MethodNotAllowed,
}

impl Route {
    /// Every route with its path and method.
    pub const ALL: [(Route, &'static str, Method); 9] = [
        (Route::Activate, "/pump/activate", Method::Post),
        (Route::Deactivate, "/pump/deactivate", Method::Post),
        (Route::Status, "/pump/status", Method::Get),
        (Route::EmergencyStop, "/pump/emergency-stop", Method::Post),
        (Route::Reset, "/pump/reset", Method::Post),
        (Route::Enable, "/pump/enable", Method::Post),
        (Route::Disable, "/pump/disable", Method::Post),
        (Route::FlowReset, "/flow/reset", Method::Post),
        (Route::FlowMode, "/flow/mode", Method::Post),
    ];

    /// Match a request line.  A query string is ignored.
    pub fn resolve(method: Method, uri: &str) -> Result<Self, RouteError> {
        let path = uri.split('?').next().unwrap_or(uri);
        let path = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
        let (route, _, expected) = Self::ALL
            .iter()
            .find(|(_, p, _)| *p == path)
            .ok_or(RouteError::NotFound)?;
        if *expected == method { Ok(*route) } else { Err(RouteError::MethodNotAllowed) }
    }
}

/// One inbound request, decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Activate(Activation),
    Deactivate,
    EmergencyStop,
    Reset,
    Query,
    Enable,
    Disable,
    ResetFlowTotal,
    SetFlowMode(FlowStrategy),
}

/// What a successful command produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Pump(StatusReport),
    /// Queued for the acquisition task.
    FlowQueued(Command),
}

/// Status code and JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    fn json<T: serde::Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(_) => Self {
                status: 500,
                body: String::from(r#"{"error":"Serialization failed","status":"error"}"#),
            },
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, &ErrorBody::new(message))
    }
}

pub struct ControlSurface<R: RelayPort, C: Clock> {
    pump: Arc<PumpController<R, C>>,
    flow: Option<Arc<FlowRequests>>,
    water_rate_ml_per_second: f64,
}

impl<R: RelayPort, C: Clock> ControlSurface<R, C> {
    pub fn new(pump: Arc<PumpController<R, C>>, water_rate_ml_per_second: f64) -> Self {
        Self {
            pump,
            flow: None,
            water_rate_ml_per_second,
        }
    }

    /// Serve the flow routes by posting to `requests`.  Without this they
    /// answer 503.
    pub fn with_flow_requests(mut self, requests: Arc<FlowRequests>) -> Self {
        self.flow = Some(requests);
        self
    }

    /// Serve one request.  `body` may be longer than [`MAX_BODY_BYTES`];
    /// such a request is refused with 413 before routing.
    pub fn handle(&self, method: Method, uri: &str, body: &[u8]) -> HttpResponse {
        if body.len() > MAX_BODY_BYTES {
            warn!("HTTP | {:?} {} -> 413 (body over {} bytes)", method, uri, MAX_BODY_BYTES);
            return HttpResponse::error(413, "Request body too large");
        }

        let route = match Route::resolve(method, uri) {
            Ok(route) => route,
            Err(RouteError::NotFound) => {
                warn!("HTTP | {:?} {} -> 404", method, uri);
                return HttpResponse::error(404, "Endpoint not found");
            }
            Err(RouteError::MethodNotAllowed) => {
                warn!("HTTP | {:?} {} -> 405", method, uri);
                return HttpResponse::error(405, "Method not allowed");
            }
        };

        let command = match self.decode(route, body) {
            Ok(command) => command,
            Err(e) => {
                info!("HTTP | {:?} rejected: {}", route, e);
                return HttpResponse::error(400, &e.to_string());
            }
        };

        let response = match self.execute(command) {
            Ok(Reply::Pump(report)) => {
                HttpResponse::json(200, &StatusBody::new(&report, self.water_rate_ml_per_second))
            }
            Ok(Reply::FlowQueued(command)) => HttpResponse::json(202, &FlowAckBody::new(&command)),
            Err(e) => HttpResponse::error(failure_status(route, &e), &error_message(&e)),
        };
        info!("HTTP | {:?} -> {}", route, response.status);
        response
    }

    /// Build the command for `route`.  Activation and flow mode read the
    /// body.
    pub fn decode(&self, route: Route, body: &[u8]) -> Result<Command, Error> {
        Ok(match route {
            Route::Activate => {
                let request = ActivateBody::parse(body)?.into_activation(self.water_rate_ml_per_second)?;
                Command::Activate(request)
            }
            Route::Deactivate => Command::Deactivate,
            Route::Status => Command::Query,
            Route::EmergencyStop => Command::EmergencyStop,
            Route::Reset => Command::Reset,
            Route::Enable => Command::Enable,
            Route::Disable => Command::Disable,
            Route::FlowReset => Command::ResetFlowTotal,
            Route::FlowMode => Command::SetFlowMode(FlowModeBody::parse(body)?.mode),
        })
    }

    /// Run a command against the controller, or queue it for the
    /// acquisition task.
    pub fn execute(&self, command: Command) -> Result<Reply, Error> {
        let report = match command {
            Command::Activate(request) => self.pump.activate(request),
            Command::Deactivate => self.pump.deactivate(),
            Command::EmergencyStop => self.pump.emergency_stop(),
            Command::Reset => self.pump.reset(),
            Command::Query => self.pump.status(),
            Command::Enable => self.pump.enable(),
            Command::Disable => self.pump.disable(),
            Command::ResetFlowTotal | Command::SetFlowMode(_) => {
                let requests = self.flow.as_deref().ok_or(Error::Init("flow control not attached"))?;
                match command {
                    Command::SetFlowMode(strategy) => requests.request_strategy(strategy),
                    _ => requests.request_reset(),
                }
                return Ok(Reply::FlowQueued(command));
            }
        };
        report.map(Reply::Pump)
    }
}

/// Status code for a failed command.
///
/// Actuation failures are 500.  A surface without flow control answers
/// 503 on the flow routes.  Busy is 400 on the command endpoints and 503
/// on status and reset, which never fail otherwise.  Everything else is a
/// client-visible 400.
fn failure_status(route: Route, error: &Error) -> u16 {
    match (route, error) {
        (_, Error::Actuator(_)) => 500,
        (_, Error::Init(_)) => 503,
        (Route::EmergencyStop, _) => 500,
        (Route::Status | Route::Reset, Error::Busy) => 503,
        _ => 400,
    }
}

fn error_message(error: &Error) -> String {
    match error {
        Error::Safety(SafetyFault::PumpDisabled) => String::from("Pump is disabled"),
        Error::Actuator(_) => format!("Actuation failed: {error}"),
        _ => error.to_string(),
    }
}
