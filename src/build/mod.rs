mod clean;
mod core;
pub mod utils;
mod watcher;

pub use self::clean::{clean, clobber};
pub use self::core::{BuildOptions, BuildSession};
pub use self::test::run_tests;
pub use self::watcher::watch;
