use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

use crate::foundation::config::EngineConfig;
use crate::path::stream::{PathCmd, PathStream};

/// Retention limits of a [`ScratchPool`].
#[derive(Debug, Clone, Copy)]
pub struct ScratchPoolOpts {
    /// Maximum number of idle buffers kept for reuse.
    pub max_buffers: usize,
    /// Buffers that grew beyond this many commands are dropped instead of retained.
    pub max_cmds: usize,
}

impl Default for ScratchPoolOpts {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ScratchPoolOpts {
    /// Take the limits from the engine configuration.
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            max_buffers: cfg.scratch_pool_max_buffers,
            max_cmds: cfg.scratch_pool_max_cmds,
        }
    }
}

/// Counters of a [`ScratchPool`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScratchPoolStats {
    /// Idle buffers currently retained.
    pub retained: usize,
    /// Guards handed out and not yet dropped.
    pub outstanding: usize,
    /// Total acquisitions.
    pub acquired: u64,
    /// Acquisitions that had to allocate a fresh buffer.
    pub allocated: u64,
    /// Buffers discarded on release because a limit was hit.
    pub dropped_on_release: u64,
}

#[derive(Default)]
struct Inner {
    free: Vec<Vec<PathCmd>>,
    stats: ScratchPoolStats,
}

/// Bounded pool of path command buffers.
///
/// Buffers are borrowed through [`ScratchPool::acquire`] and returned when the guard drops, so
/// every exit path (including `?` returns) releases what it acquired.
pub struct ScratchPool {
    opts: ScratchPoolOpts,
    inner: RefCell<Inner>,
}

impl std::fmt::Debug for ScratchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchPool")
            .field("opts", &self.opts)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ScratchPool {
    /// Create an empty pool.
    pub fn new(opts: ScratchPoolOpts) -> Self {
        Self {
            opts,
            inner: RefCell::new(Inner::default()),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ScratchPoolStats {
        self.inner.borrow().stats.clone()
    }

    /// Borrow an empty path stream.
    pub fn acquire(&self) -> ScratchStream<'_> {
        let mut inner = self.inner.borrow_mut();
        inner.stats.acquired = inner.stats.acquired.saturating_add(1);
        inner.stats.outstanding += 1;
        let buf = match inner.free.pop() {
            Some(buf) => {
                inner.stats.retained = inner.stats.retained.saturating_sub(1);
                buf
            }
            None => {
                inner.stats.allocated = inner.stats.allocated.saturating_add(1);
                Vec::with_capacity(64)
            }
        };
        ScratchStream {
            pool: self,
            stream: Some(PathStream::from_vec(buf)),
        }
    }

    fn release(&self, buf: Vec<PathCmd>) {
        let mut inner = self.inner.borrow_mut();
        inner.stats.outstanding = inner.stats.outstanding.saturating_sub(1);
        if self.opts.max_buffers == 0
            || buf.capacity() > self.opts.max_cmds
            || inner.free.len() >= self.opts.max_buffers
        {
            inner.stats.dropped_on_release = inner.stats.dropped_on_release.saturating_add(1);
            return;
        }
        inner.free.push(buf);
        inner.stats.retained += 1;
    }
}

/// A pooled [`PathStream`]; returned to its pool on drop.
pub struct ScratchStream<'a> {
    pool: &'a ScratchPool,
    stream: Option<PathStream>,
}

impl Deref for ScratchStream<'_> {
    type Target = PathStream;

    fn deref(&self) -> &PathStream {
        // Only `Drop` takes the stream out.
        self.stream.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for ScratchStream<'_> {
    fn deref_mut(&mut self) -> &mut PathStream {
        self.stream.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for ScratchStream<'_> {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.pool.release(stream.into_vec());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/path/scratch.rs"]
mod tests;
