//! System-wide constants for the OpenBid protocol.

/// Default timeout for a single session receive, in milliseconds.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 5_000;

/// Default capacity of each direction of a session channel.
pub const DEFAULT_SESSION_BUFFER: usize = 16;

/// Default capacity of a party's inbound-session queue.
pub const DEFAULT_INBOX_CAPACITY: usize = 256;

/// How many times a ledger debit is retried after losing a version race.
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 3;

/// Domain separator for transition signing payloads.
pub const TRANSITION_DOMAIN: &[u8] = b"openbid:transition:v1:";

/// Domain separator for commit receipt signatures.
pub const RECEIPT_DOMAIN: &[u8] = b"openbid:receipt:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name.
pub const PROTOCOL_NAME: &str = "OpenBid";
