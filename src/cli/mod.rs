//! Interface to the agent CLI: event types, stream parsing, process
//! spawning and interactive command injection.

mod events;
mod process;
mod rpc;
mod stream;

pub use events::*;
pub use process::*;
pub use rpc::*;
pub use stream::*;
