//! Ports - trait definitions for the collaborators of the primitives.
//! Store transports and script sources implement these outside this crate.

mod clock;
mod scripts;
mod store;

pub use clock::{Clock, SystemClock};
pub use scripts::{AtomicScript, ScriptId, ScriptProvider};
pub use store::{ScriptOutput, StoreGateway};
