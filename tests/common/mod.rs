/// Shared helpers for integration tests: a scripted mock of the telemetry API.

use std::thread;
use std::time::Duration;

pub enum Reply {
    Json(u16, String),
    /// Accept the request and never answer.
    Hang(Duration),
}

/// Serves `replies` in order, one per request, then shuts down.
/// Returns the base URL.
pub fn spawn_upstream(replies: Vec<Reply>) -> String {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind mock upstream");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("mock upstream should listen on TCP");

    thread::spawn(move || {
        for reply in replies {
            let Ok(request) = server.recv() else {
                return;
            };
            match reply {
                Reply::Json(status, body) => {
                    let response = tiny_http::Response::from_data(body.into_bytes())
                        .with_status_code(tiny_http::StatusCode::from(status))
                        .with_header(
                            tiny_http::Header::from_bytes(
                                &b"Content-Type"[..],
                                &b"application/json"[..],
                            )
                            .unwrap(),
                        );
                    let _ = request.respond(response);
                }
                Reply::Hang(hold) => {
                    thread::sleep(hold);
                    drop(request);
                }
            }
        }
    });

    format!("http://{addr}/Weather")
}

/// Five-station payload at 2024-11-23 14:00, one station per alert level.
pub fn five_station_payload() -> String {
    let levels = [
        ("St1", 1050.0, 0.0),
        ("St2", 950.0, 2.5),
        ("St3", 850.0, 12.0),
        ("St4", 750.0, 31.0),
        ("St5", 650.0, 6.0),
    ];
    let rows: Vec<String> = levels
        .iter()
        .map(|(id, level, rain)| {
            format!(
                r#"{{"StationID": "{id}", "DateTime": "2024-11-23 14:00:00", "WaterLevel": "{level}", "HourlyRain": "{rain}", "Temperature": "27.5", "WindDirection": "ne"}}"#
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}
