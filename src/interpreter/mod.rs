//! Error interpreter
//!
//! Maps a non-2xx response to a canonical [`crate::error::ErrorKind`] plus
//! the provider's human message. Each provider registers a [`FormatSwitch`]:
//! an ordered list of required root keys and descriptor types. The first
//! template whose keys are all present parses the body and overlays its
//! message on the status-derived base error.

pub mod descriptors;
mod html;
mod switch;

pub use descriptors::{default_switch, join_messages};
pub use html::extract_message;
pub use switch::{DescriptorParser, ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate};
