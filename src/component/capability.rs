//! Capability views
//!
//! A capability is a [`Component`] that also hands out the resource it
//! manages. The core never enumerates capabilities; consumers fetch a
//! component by name and use the view they expect.

use super::Component;
use crate::logging::Logger;
use std::net::SocketAddr;

/// A component that serves configuration values
pub trait ConfigProvider: Component {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// A component that hands out structured logger handles
pub trait LoggerProvider: Component {
    fn logger(&self) -> Logger;
}

/// A component that owns a listening HTTP server
pub trait HttpServerProvider: Component {
    /// Address the server is bound to, once started
    fn local_addr(&self) -> Option<SocketAddr>;
}
