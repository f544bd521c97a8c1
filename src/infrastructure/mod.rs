pub mod clock;
pub mod database;
pub mod offline;
pub mod remote;

pub use clock::SystemClock;
