//! Session lifecycle state: the setup guard and the published snapshot.

pub mod guard;
pub mod snapshot;

pub use guard::{Begin, Generation, SetupGuard, SetupState};
pub use snapshot::{LoginMethod, SessionSnapshot};
