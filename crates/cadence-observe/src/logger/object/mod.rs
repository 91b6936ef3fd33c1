mod format;
pub use format::LogFormat;

mod level;
pub use level::LogLevel;

mod timer;
pub use timer::LogTimer;

mod timezone;
pub use timezone::{LogTimeZone, init_local_offset};
