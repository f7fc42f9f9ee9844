//! HTTP command intake (firmware only).
//!
//! A small ESP-IDF HTTP server exposing the downlink intake:
//!
//! | Route              | Method | Purpose                             |
//! |--------------------|--------|-------------------------------------|
//! | `/`                | GET    | liveness text                       |
//! | `/downlink`        | POST   | validate + enqueue a command        |
//! | `/downlink/status` | GET    | last accepted command, as JSON      |
//!
//! Handlers run on the HTTP server's own threads; they only touch the
//! static dispatch queue and status cell, both of which are sync-safe
//! by construction. Acceptance is acknowledged immediately with the
//! queue ticket — delivery is asynchronous.

use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::{Read as _, Write as _};
use log::{info, warn};

use crate::adapters::time::SystemClock;
use crate::app::ports::TimePort;
use crate::downlink::dispatch::{DispatchError, DispatchQueue};
use crate::downlink::intake::{CommandRequest, IntakeStatus};

const MAX_BODY: usize = 512;

/// Running intake server. Dropping it stops the routes.
pub struct HttpIntake {
    _server: EspHttpServer<'static>,
}

impl HttpIntake {
    pub fn start(
        queue: &'static DispatchQueue,
        status: &'static IntakeStatus,
    ) -> anyhow::Result<Self> {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
            req.into_ok_response()?
                .write_all(b"fieldlink gateway intake\n")?;
            Ok(())
        })?;

        server.fn_handler::<anyhow::Error, _>("/downlink", Method::Post, move |mut req| {
            let mut body = [0u8; MAX_BODY];
            let mut len = 0;
            loop {
                let n = req.read(&mut body[len..])?;
                if n == 0 {
                    break;
                }
                len += n;
                if len == body.len() {
                    break;
                }
            }

            let parsed = CommandRequest::parse(&String::from_utf8_lossy(&body[..len]))
                .and_then(|request| request.to_command().map(|cmd| (request, cmd)));
            let (request, command) = match parsed {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("intake: rejected request: {err}");
                    return respond_json(req, 400, &error_body(&err.to_string()));
                }
            };

            let now_ms = SystemClock::new().now_millis();
            match queue.enqueue(&request.device_id, &command.encode(), now_ms) {
                Ok(ticket) => {
                    status.record(&request, ticket, now_ms);
                    info!("intake: queued {} for {}", ticket, request.device_id);
                    let body = serde_json::json!({ "queued": ticket.0 }).to_string();
                    respond_json(req, 202, &body)
                }
                Err(DispatchError::QueueFull) => {
                    warn!("intake: queue full, rejecting {}", request.device_id);
                    respond_json(req, 503, &error_body("queue full"))
                }
                Err(err) => respond_json(req, 400, &error_body(&err.to_string())),
            }
        })?;

        server.fn_handler::<anyhow::Error, _>("/downlink/status", Method::Get, move |req| {
            respond_json(req, 200, &status.to_json())
        })?;

        info!("http intake listening");
        Ok(Self { _server: server })
    }
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn respond_json(
    req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection>,
    code: u16,
    body: &str,
) -> anyhow::Result<()> {
    let mut resp = req.into_response(code, None, &[("Content-Type", "application/json")])?;
    resp.write_all(body.as_bytes())?;
    Ok(())
}
