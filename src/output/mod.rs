//! Output handling (terminal styling, reports, cURL rendering)

pub mod curl;
pub mod report;
pub mod terminal;

pub use curl::to_curl;
pub use terminal::Painter;
