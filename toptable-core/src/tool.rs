use fnv::FnvHasher;
use std::hash::Hasher;
use std::{io::Write, sync::Once};

/// Default refresh interval of a table, one second in nanoseconds.
pub const DEFAULT_REFRESH_INTERVAL_NS: u64 = 1_000_000_000;

/// Separator line printed after every sample.
pub const SAMPLE_SEPARATOR: &str = "----------------------";

/// Init log. Set log format.
pub fn init_log() {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}:{} - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .init();
}

static INIT_LOG: Once = Once::new();

/// Setup.
pub fn setup_log() {
    INIT_LOG.call_once(|| {
        init_log();
    });
}

/// Log the error and return it from the current function.
///
/// The error is converted with `Into`, so a `ConfigError` can be bailed from a function
/// returning `Result<_, TableError>`.
#[macro_export]
macro_rules! error_bail {
    ($err:expr $(,)?) => {{
        let err = $err;
        error!("{}", err);
        return Err(err.into());
    }};
}

/// Check if two keys are equal. Keys are compared by length and content, never by address.
#[inline]
pub fn is_keys_equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Hash of the key content, consistent with `is_keys_equal`.
#[inline]
pub fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.write_usize(key.len());
    hasher.finish()
}
