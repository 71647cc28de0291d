//! Development server: the asset chain in front of a static file handler.

mod lifecycle;

use crate::{
    cli::common::Pipeline,
    config::PipelineConfig,
    core::{is_shutdown, register_server},
    events::SharedObserver,
    handler::{Handler, response},
    log,
    utils::plural_count,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tiny_http::Server;

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
}

/// Bind the HTTP server and register it for Ctrl+C shutdown.
pub fn bind_server(config: &PipelineConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);

    Ok(BoundServer { server })
}

impl BoundServer {
    /// Run the request loop until the server is unblocked (blocking).
    pub fn run(self, handler: Box<dyn Handler>) -> Result<()> {
        run_request_loop(&self.server, Arc::from(handler))
    }
}

/// Serve `config.serve.root` behind every configured asset.
pub fn serve(config: &PipelineConfig, pipeline: &Pipeline, observer: &SharedObserver) -> Result<()> {
    let handler = pipeline.handler(&config.serve.root, config.serve.timing, observer);
    let server = bind_server(config)?;

    log!(
        "serve";
        "{} from {}",
        plural_count(pipeline.len(), "asset"),
        config.serve.root.display()
    );
    server.run(handler)
}

fn run_request_loop(server: &Server, handler: Arc<dyn Handler>) -> Result<()> {
    // Builds run inside request tasks; one slow build must not stall the rest
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create request thread pool")?;

    // The scope returns only after in-flight builds have finished writing
    pool.scope(|scope| {
        for request in server.incoming_requests() {
            let handler = Arc::clone(&handler);
            scope.spawn(move |_| {
                let result = if is_shutdown() {
                    response::respond_unavailable(request)
                } else {
                    handler.handle(request)
                };
                if let Err(e) = result {
                    log!("serve"; "request error: {e:#}");
                }
            });
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::response::respond_not_found;
    use std::io::{Read, Write};
    use std::net::{IpAddr, Ipv4Addr, TcpStream};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_request_loop_dispatches_to_handler() {
        let (server, addr) =
            lifecycle::bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        let server = Arc::new(server);

        let loop_server = Arc::clone(&server);
        let looper = std::thread::spawn(move || {
            run_request_loop(&loop_server, Arc::new(respond_not_found)).unwrap();
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 404"));

        server.unblock();
        looper.join().unwrap();
    }

    #[test]
    fn test_request_loop_waits_for_running_handlers() {
        let (server, addr) =
            lifecycle::bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        let server = Arc::new(server);

        let (started_tx, started_rx) = mpsc::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let handler_finished = Arc::clone(&finished);
        let slow = move |request: tiny_http::Request| {
            started_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(200));
            handler_finished.store(true, Ordering::SeqCst);
            respond_not_found(request)
        };

        let loop_server = Arc::clone(&server);
        let looper = std::thread::spawn(move || {
            run_request_loop(&loop_server, Arc::new(slow)).unwrap();
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Unblock while the handler is still running
        server.unblock();
        looper.join().unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }
}
