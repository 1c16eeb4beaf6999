//! Default values applied when an environment key is absent.

/// Reserved delimiter separating the meaningful part of an object name.
pub(crate) const DELIMITER: char = '|';
/// Default SMB port.
pub(crate) const SMB_PORT: u16 = 445;
/// Default SFTP port.
pub(crate) const SFTP_PORT: u16 = 22;
/// Object download deadline in seconds.
pub(crate) const FETCH_TIMEOUT_SECS: u64 = 50;
/// Remote write deadline in seconds.
pub(crate) const WRITE_TIMEOUT_SECS: u64 = 50;
/// Secret resolution deadline in seconds.
pub(crate) const SECRET_TIMEOUT_SECS: u64 = 10;
/// Whole-invocation budget in seconds.
pub(crate) const INVOCATION_TIMEOUT_SECS: u64 = 120;
/// HTTP listener port when `PORT` is not set.
pub(crate) const HTTP_PORT: u16 = 8080;
/// Log level when `COURIER_LOG_LEVEL` is not set.
pub(crate) const LOG_LEVEL: &str = "info";
/// Secret version used when only a project and secret id are given.
pub(crate) const SECRET_VERSION: &str = "latest";
