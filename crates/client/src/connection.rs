// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to a control server.

use std::net::{Ipv4Addr, SocketAddr, TcpStream};

use rcc_core::{Error, Result};
use rcc_ipc::{framing, Request, Response, PROTOCOL_VERSION};

use crate::config::SupervisorConfig;

/// A connection to a control server.
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Connection {
    /// Connect to a control server listening on `port` on localhost.
    pub fn connect(port: u16, config: &SupervisorConfig) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let connect_err = |e: std::io::Error| Error::Connect {
            addr: addr.to_string(),
            reason: e.to_string(),
        };
        let stream =
            TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(connect_err)?;
        stream
            .set_read_timeout(config.call_timeout)
            .map_err(connect_err)?;
        stream.set_nodelay(true).map_err(connect_err)?;
        Ok(Connection { stream, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send a request and receive its response.
    ///
    /// An error response is turned into an [`Error`] of the same kind.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        framing::write_message(&mut self.stream, request)?;
        match framing::read_message(&mut self.stream)? {
            Response::Error { kind, message } => Err(Error::from_remote(kind, message)),
            response => Ok(response),
        }
    }

    /// Exchange versions with the server.
    pub fn hello(&mut self) -> Result<()> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.call(&request)? {
            Response::Hello { version } if version == PROTOCOL_VERSION => Ok(()),
            Response::Hello { version } => Err(Error::VersionMismatch {
                server: version,
                client: PROTOCOL_VERSION.to_string(),
            }),
            other => Err(unexpected(&other)),
        }
    }
}

pub(crate) fn unexpected(response: &Response) -> Error {
    Error::UnexpectedResponse(format!("{:?}", response))
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
