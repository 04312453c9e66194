/// Batch size used when a batch step is declared with a size of zero
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Flush deadline used when a batch step is declared with a zero timeout (5 seconds)
pub const DEFAULT_BATCH_TIMEOUT_MS: u64 = 5_000;
/// Upper bound on the slots a batcher reserves up front for one batch
pub const MAX_BATCH_PREALLOCATION: usize = 1024;
/// Capacity of the channel between two stages; 1 keeps stages in near lock-step
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;
/// Capacity of the shared error channel before errors start being dropped
pub const DEFAULT_ERROR_BUFFER: usize = 64;
/// Default log filter when RUST_LOG is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";
