//! ICMP echo ("ping") for IPv4.
//!
//! ```no_run
//! use rping::{CancelToken, Engine, IcmpSocket, PingOptions, Target};
//!
//! let options = PingOptions {
//!     target: "192.0.2.1".to_string(),
//!     count: Some(3),
//!     ..PingOptions::default()
//! };
//! let target = Target::resolve(&options.target).expect("Error resolving");
//! let socket = IcmpSocket::open(target.addr, &options).expect("Error opening socket");
//! let summary = Engine::new(socket, target, &options, CancelToken::new(), std::io::stdout())
//!     .run()
//!     .expect("Error pinging");
//! println!("{}% loss", summary.loss_percent);
//! ```
pub mod checksum;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod icmp;
pub mod ipv4;
pub mod opts;
pub mod report;
pub mod signal;
#[cfg(unix)]
pub mod socket;
pub mod stats;
pub mod target;
pub mod transport;

pub use config::PingOptions;
pub use engine::{Engine, EngineState};
pub use error::{PacketError, PingError};
pub use signal::CancelToken;
#[cfg(unix)]
pub use socket::IcmpSocket;
pub use stats::Summary;
pub use target::Target;
pub use transport::{Received, SocketKind, Transport};
