// Core library for the SMRT service framework
// Request dispatch with strict content negotiation, uniform error mapping,
// request counters and the status endpoint.

pub mod application;
pub mod broadcast;
pub mod classifier;
pub mod content_negotiation;
pub mod counters;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod negotiation;
pub mod registration;
pub mod routing;
pub mod status;
pub mod status_report;

// Re-export commonly used types
pub use application::*;
pub use broadcast::{Broadcaster, DEFAULT_BROADCAST_PORT, Listener, ListenerHandle};
pub use classifier::*;
pub use content_negotiation::{Accept, MediaType};
pub use counters::*;
pub use error::*;
pub use handler::{BoxedHandler, Handler, IntoHandler};
pub use http::*;
pub use negotiation::*;
pub use registration::*;
pub use routing::*;
pub use status::*;
pub use status_report::*;
