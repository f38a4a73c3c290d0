// One platformer server per integration-test binary, shared by every test in it.
use std::{net::SocketAddr, sync::OnceLock, sync::mpsc, time::Duration};

// Address the shared server is bound to; set once by the first caller.
static SERVER_ADDR: OnceLock<SocketAddr> = OnceLock::new();

const BIND_TIMEOUT: Duration = Duration::from_secs(5);

// Start the shared server on first use and return its bound address.
fn server_addr() -> SocketAddr {
    *SERVER_ADDR.get_or_init(|| {
        let (addr_tx, addr_rx) = mpsc::sync_channel::<SocketAddr>(1);

        // Each `#[tokio::test]` has its own runtime, so the server gets a thread
        // and runtime of its own that live until the test process exits.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("server runtime");
            runtime.block_on(async move {
                // Ephemeral port; the listener accepts (into its backlog) as soon as it is bound.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("local addr");
                addr_tx.send(addr).expect("publish server address");
                platformer_server::run(listener)
                    .await
                    .expect("platformer server failed");
            });
        });

        addr_rx
            .recv_timeout(BIND_TIMEOUT)
            .expect("server did not bind in time")
    })
}

// `http://` URL for a route on the shared server.
#[allow(dead_code)]
pub fn http_url(path: &str) -> String {
    format!("http://{}{path}", server_addr())
}

// `ws://` URL for the socket endpoint, query string included.
#[allow(dead_code)]
pub fn ws_url(path_and_query: &str) -> String {
    format!("ws://{}{path_and_query}", server_addr())
}
