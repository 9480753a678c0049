// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal socket client for the daemon protocol.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::net::UnixStream;

use warden_daemon::protocol::{read_response, write_request};
use warden_daemon::{Request, Response};

/// Send one request and read one framed response.
pub async fn request(socket: &Path, request: &Request) -> Result<Response> {
    let stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("connect {}", socket.display()))?;
    let (mut reader, mut writer) = stream.into_split();

    write_request(&mut writer, request).await.context("send request")?;

    match read_response(&mut reader).await.context("read daemon response")? {
        Some(response) => Ok(response),
        None => bail!("daemon closed the connection without responding"),
    }
}
