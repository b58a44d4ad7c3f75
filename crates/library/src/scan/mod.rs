mod discover;
mod session;

pub use self::discover::discover;
pub use self::session::{
    ScanEvent, ScanOptions, ScanSession, ScanSummary, SessionState, StopHandle,
};
