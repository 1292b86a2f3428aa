pub mod capture;
pub mod serve;

pub use capture::CaptureCommand;
pub use serve::ServeCommand;
