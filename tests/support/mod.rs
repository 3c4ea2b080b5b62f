//! Shared helpers for integration tests: snapshot fixtures and mock endpoints.

#![allow(dead_code)]

pub mod snapshot;
pub mod socket_guard;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ASSET_PATH: &str = "/api/v5/AllPrintings.sqlite.bz2";
pub const CHECKSUM_PATH: &str = "/api/v5/AllPrintings.sqlite.bz2.sha256";

pub fn asset_url(server: &MockServer) -> String {
    format!("{}{ASSET_PATH}", server.uri())
}

pub fn checksum_url(server: &MockServer) -> String {
    format!("{}{CHECKSUM_PATH}", server.uri())
}

/// Serves `checksum` and `asset`; the asset must be requested exactly `asset_calls` times.
pub async fn mount_snapshot(server: &MockServer, checksum: &str, asset: Vec<u8>, asset_calls: u64) {
    Mock::given(method("GET"))
        .and(path(CHECKSUM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(checksum))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(ASSET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(asset))
        .expect(asset_calls)
        .mount(server)
        .await;
}
