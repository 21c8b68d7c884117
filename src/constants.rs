pub const DEFAULT_PARTITION_COUNT: usize = 1024;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 8;
pub const DEFAULT_READ_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_PROCESSING_THREADS: usize = 4;
pub const DEFAULT_PARTITION_KEY_WARN_THRESHOLD: usize = 1_000_000;
/// Stays well under the common 256 (macOS) and 1024 (Linux) open-file soft limits.
pub const DEFAULT_MAX_OPEN_PARTITIONS: usize = 128;

pub const MIN_PARTITION_COUNT: usize = 1;
pub const MAX_PARTITION_COUNT: usize = 65_536;
pub const MIN_OPEN_PARTITIONS: usize = 1;
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 1_000_000;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 1;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 1024;
pub const MIN_PROCESSING_THREADS: usize = 1;
pub const MAX_PROCESSING_THREADS: usize = 256;

pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1_048_576;

pub const TEMP_DIR_PREFIX: &str = "topk_partitions_";
pub const PARTITION_FILE_PREFIX: &str = "partition_";
pub const PARTITION_FILE_EXTENSION: &str = ".keys";

/// Every partition frame is a little-endian `u32` byte length followed by the key bytes.
pub const FRAME_HEADER_BYTES: usize = 4;

pub const SHUTDOWN_CHECK_INTERVAL_RECORDS: u64 = 100;
pub const PROGRESS_REPORT_INTERVAL_RECORDS: u64 = 1_000_000;
