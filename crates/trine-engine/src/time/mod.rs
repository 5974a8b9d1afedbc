//! Time subsystem.
//!
//! Frame statistics for the render loop, kept independent of the platform so
//! they can be tested with synthetic timestamps.

mod frame_stats;

pub use frame_stats::FrameStats;
