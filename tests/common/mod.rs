#![allow(dead_code)]

use axum::Router;
use std::net::SocketAddr;

/// Serve `app` on an ephemeral local port and return its address.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

pub fn http_url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}

pub fn ws_url(addr: SocketAddr, path: &str) -> String {
    format!("ws://{}{}", addr, path)
}
