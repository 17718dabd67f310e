//! Open-file budget for the bounded pool. Each active digest holds exactly one file handle, so
//! the digester count is what has to fit under the process limit.

/// Descriptors kept back for stdio, the walker's directory handles, and channel internals.
const RESERVED_FDS: u64 = 32;

/// Share of the remaining descriptors digesters may use.
const BUDGET_FRACTION: f64 = 0.8;

/// Descriptor budget derived from the soft `RLIMIT_NOFILE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FdBudget {
    soft_limit: u64,
}

impl FdBudget {
    /// Budget for this process, or `None` when the limit is unknown or unlimited.
    pub fn detect() -> Option<Self> {
        soft_nofile_limit().map(Self::from_soft_limit)
    }

    pub fn from_soft_limit(soft_limit: u64) -> Self {
        Self { soft_limit }
    }

    pub fn soft_limit(&self) -> u64 {
        self.soft_limit
    }

    /// Most digesters that can hold a file open at the same time. Never below 1.
    pub fn max_digesters(&self) -> usize {
        let usable = self.soft_limit.saturating_sub(RESERVED_FDS) as f64 * BUDGET_FRACTION;
        (usable as usize).max(1)
    }

    pub fn admits(&self, digesters: usize) -> bool {
        digesters <= self.max_digesters()
    }
}

#[cfg(unix)]
fn soft_nofile_limit() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
fn soft_nofile_limit() -> Option<u64> {
    None
}
