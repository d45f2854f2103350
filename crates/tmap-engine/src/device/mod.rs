//! GPU device acquisition for offscreen use.

mod headless;
mod init;

pub use headless::HeadlessGpu;
pub use init::GpuInit;
