//! Tunables for the queue and coroutine discipline. No environment
//! variables, no config file — everything here is a compile-time default
//! overridable through `Config`'s constructor.

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Initial hash-table width for `IoQueue`'s in-flight set. `HashMap`
    /// resizes on its own; this only sizes the initial allocation.
    pub bucket_count: usize,

    /// Depth bound on nested sub-coroutines.
    pub coro_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket_count: 64,
            coro_depth: 8,
        }
    }
}
