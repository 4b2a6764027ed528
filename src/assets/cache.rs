use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::assets::prepare::{ImageId, ImageSource, ImageTag, PreparedImage, Recolor, prepare_image};
use crate::foundation::config::EngineConfig;
use crate::foundation::error::VgResult;

/// Counters of an [`ImageCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageCacheStats {
    /// Requests served without preparing.
    pub hits: u64,
    /// Requests that ran the preparation pipeline.
    pub misses: u64,
    /// Entries replaced because the requested recolor differed.
    pub replaced: u64,
    /// Entries dropped to stay within capacity.
    pub evicted: u64,
    /// Entries currently held.
    pub len: usize,
}

#[derive(Debug)]
struct CacheEntry {
    tag: ImageTag,
    recolor: Option<Recolor>,
    image: Arc<PreparedImage>,
}

/// Prepared images keyed by source identity.
///
/// An entry is reused only when the requested recolor matches the one it was prepared with;
/// otherwise it is prepared again and the old buffer is dropped.
#[derive(Debug)]
pub struct ImageCache {
    cfg: EngineConfig,
    entries: HashMap<ImageId, CacheEntry>,
    lru: VecDeque<ImageId>,
    stats: ImageCacheStats,
}

impl ImageCache {
    /// Empty cache using the capacity and preparation settings of `cfg`.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            entries: HashMap::new(),
            lru: VecDeque::new(),
            stats: ImageCacheStats::default(),
        }
    }

    /// Configuration used for preparation.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Counters.
    pub fn stats(&self) -> ImageCacheStats {
        ImageCacheStats {
            len: self.entries.len(),
            ..self.stats
        }
    }

    /// Prepared image for `src`, preparing and caching it on a miss.
    pub fn prepare(
        &mut self,
        src: &ImageSource,
        recolor: Option<Recolor>,
    ) -> VgResult<Arc<PreparedImage>> {
        let recolor = recolor.filter(|r| r.is_active());
        if let Some(img) = self.get(src.id, recolor) {
            self.stats.hits += 1;
            self.touch(src.id);
            debug!(id = src.id.0, "image cache hit");
            return Ok(img);
        }

        self.stats.misses += 1;
        let image = Arc::new(prepare_image(src, recolor, &self.cfg)?);
        let entry = CacheEntry {
            tag: image.tag(),
            recolor,
            image: Arc::clone(&image),
        };
        if self.entries.insert(src.id, entry).is_some() {
            self.stats.replaced += 1;
            debug!(id = src.id.0, "image re-prepared with a different recolor");
        } else {
            debug!(id = src.id.0, "image cache miss");
        }
        self.touch(src.id);
        self.evict();
        Ok(image)
    }

    /// Cached image for `id` prepared with `recolor`, without preparing.
    pub fn get(&self, id: ImageId, recolor: Option<Recolor>) -> Option<Arc<PreparedImage>> {
        let recolor = recolor.filter(|r| r.is_active());
        self.entries
            .get(&id)
            .filter(|e| e.recolor == recolor)
            .map(|e| Arc::clone(&e.image))
    }

    /// Sub-tag of a cached entry.
    pub fn tag(&self, id: ImageId) -> Option<ImageTag> {
        self.entries.get(&id).map(|e| e.tag)
    }

    /// Drop the entry of `id`. Returns `true` when one existed.
    pub fn release(&mut self, id: ImageId) -> bool {
        if let Some(pos) = self.lru.iter().position(|x| *x == id) {
            self.lru.remove(pos);
        }
        self.entries.remove(&id).is_some()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    fn touch(&mut self, id: ImageId) {
        if let Some(pos) = self.lru.iter().position(|x| *x == id) {
            self.lru.remove(pos);
        }
        self.lru.push_back(id);
    }

    fn evict(&mut self) {
        let cap = self.cfg.image_cache_capacity.max(1);
        while self.lru.len() > cap {
            if let Some(old) = self.lru.pop_front() {
                self.entries.remove(&old);
                self.stats.evicted += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
