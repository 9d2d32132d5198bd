mod case_mode;
mod log_level;
mod report_format;

pub use case_mode::CaseMode;
pub use log_level::LogLevel;
pub use report_format::{configure_colors, format_report};
