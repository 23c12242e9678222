/// Policy for how the metadata pre-processor (spec §4.11) treats symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkPolicy {
    /// Drop the entry entirely, emitting nothing.
    Ignore,
    /// Synthesise a metadata record carrying the symlink target.
    Store,
    /// Follow the symlink and back up its target as a regular file.
    Follow,
}

/// Controls how much work the pre-processor does to decide whether a file
/// changed, from cheapest to most thorough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiletimeCheckMode {
    /// Only compare `last_modified`; skip metadata hashing entirely.
    DisableFiletimeCheck,
    /// Compare `last_modified` only, falling back to a content check when it
    /// differs.
    CheckFiletimeOnly,
    /// Always compare full metadata (owner, permissions, timestamps).
    Full,
}

/// Immutable configuration threaded through every call, per the Design Note
/// in spec §9 ("Global mutable options... represent as an immutable value").
/// `with_*` builders return a new value instead of mutating in place, so that
/// `UpdateOptionsFromManifest` (recreate engine) can produce a derived
/// `Options` without invalidating the caller's reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Target size of a `Blocks` remote volume, in bytes.
    pub volsize: u64,
    /// Size of a content-addressed block, in bytes.
    pub blocksize: u64,
    /// Number of block hashes folded into a single blocklist hash entry.
    pub hashes_per_block: u64,
    /// Size of a block/blocklist hash digest, in bytes (external hasher's
    /// output width; the hasher itself is an external collaborator).
    pub blockhash_size: u64,

    /// Percentage (0-100) of dead bytes in a volume that marks it as waste.
    pub waste_threshold_percent: f64,
    /// Volumes at or under this compressed size are "small" for compact
    /// purposes.
    pub small_file_size: u64,
    /// Compact when more than this many small volumes accumulate.
    pub max_small_file_count: usize,

    /// When set, destructive operations log a `would-...` message and skip
    /// the final mutating statement and commit.
    pub dry_run: bool,

    /// Selects between the two recreate-engine reconciliation code paths
    /// behind the historical `EXPERIMENTAL_RECREATEDB_DUPLICATI` flag
    /// (spec §9 Open Question).
    pub experimental_recreate_path: bool,

    pub symlink_policy: SymlinkPolicy,
    pub filetime_check: FiletimeCheckMode,

    /// Passphrase for legacy RC4-encrypted databases and for remote volumes
    /// declaring encryption during recreate. `None` means "not configured".
    pub passphrase: Option<String>,

    /// Whether retention policies are allowed to delete every fileset,
    /// including the most recent one, when none of them survive the
    /// configured rules.
    pub allow_full_removal: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            volsize: 50 * 1024 * 1024,
            blocksize: 100 * 1024,
            hashes_per_block: 1024,
            blockhash_size: 32,
            waste_threshold_percent: 25.0,
            small_file_size: 20 * 1024 * 1024,
            max_small_file_count: 20,
            dry_run: false,
            experimental_recreate_path: false,
            symlink_policy: SymlinkPolicy::Store,
            filetime_check: FiletimeCheckMode::Full,
            passphrase: None,
            allow_full_removal: false,
        }
    }
}

impl Options {
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        Self {
            dry_run,
            ..self.clone()
        }
    }

    pub fn with_passphrase(&self, passphrase: Option<String>) -> Self {
        Self {
            passphrase,
            ..self.clone()
        }
    }

    pub fn with_volsize(&self, volsize: u64) -> Self {
        Self {
            volsize,
            ..self.clone()
        }
    }
}
