//! Application-level error carrying the process exit code.
//!
//! Component errors (`FetchError`, `SnapshotError`) stay typed inside their
//! modules; only what reaches `main` is flattened into an `AppError`.

/// Bad CLI input or configuration.
pub const EXIT_CONFIG: u8 = 2;
/// Every source contributed zero records; nothing was written.
pub const EXIT_NO_DATA: u8 = 3;
/// Writing the snapshot or the latest envelope failed.
pub const EXIT_PERSISTENCE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(EXIT_PERSISTENCE, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
