//! Process-wide logging setup shared by every binary in the workspace.

pub mod tracing;

pub use self::tracing::LogFormat;

/// Install the default subscriber (JSON lines, `RUST_LOG` filter).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}
