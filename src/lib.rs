pub mod config;
pub mod error;
pub mod server;
pub mod storage;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use server::formatter::OutputFormatter;
pub use server::resource::ResourceDescriptor;
pub use server::{router, AppState};

// Test-only printing helper: expands to eprintln! during tests and debug builds and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
