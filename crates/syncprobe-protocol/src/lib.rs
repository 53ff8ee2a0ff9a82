//! # syncprobe protocol
//!
//! Client-side message shapes for a synchronised-playback server and the
//! precomputed corpus the prober sends from.
//!
//! - `ClientMessage` - `Hello`, `State` and `Set` messages, one CRLF-terminated
//!   JSON line each
//! - `MessageCorpus` - read-only pools of wire-ready greetings, state updates
//!   and file announcements, built once before a run
//! - `stream_rng` - per-consumer random streams, reproducible under a seed

pub mod corpus;
pub mod error;
pub mod messages;
pub mod rng;

pub use corpus::*;
pub use error::*;
pub use messages::*;
pub use rng::*;
