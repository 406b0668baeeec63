//! Serial-line transport abstraction.
//!
//! Provides the byte-stream the link protocol runs over: opening and
//! configuring a physical serial port, enumerating available ports, and the
//! [`LinkStream`] type the upper layers read from and write to.
//!
//! This is the lowest layer of serlink. The protocol engine itself is generic
//! over `Read`/`Write` and never touches port configuration; everything
//! port-shaped lives here.

pub mod error;
pub mod serial;
pub mod stream;

pub use error::{Result, TransportError};
pub use serial::{PortInfo, SerialConfig, SerialLine};
pub use stream::LinkStream;
