//! Constants and default values for Roller

/// Default chrono format for the timestamp embedded in backup names.
///
/// Renders as `2016-11-04T18-30-00.000`, which sorts lexically and contains
/// no characters that are awkward in filenames.
pub const DEFAULT_BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Default suffix appended to compressed backups
pub const DEFAULT_COMPRESS_SUFFIX: &str = ".gz";

/// Separator between the file stem and the backup timestamp
pub const BACKUP_SEPARATOR: char = '-';

/// How many millisecond steps rotation tries past the current time when the
/// backup name is already taken
pub const BACKUP_NAME_ATTEMPTS: u32 = 1000;

/// Permission mode for a freshly created active file when there is no
/// previous file to copy it from
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Permission mode for directories created on demand
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Name of the background retention thread
pub const MILL_THREAD_NAME: &str = "roller-mill";

/// Buffer size used when streaming a backup into the gzip encoder
pub const COMPRESS_BUFFER_SIZE: usize = 64 * 1024;

/// Config file extensions accepted by the loader, in priority order
pub const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];
