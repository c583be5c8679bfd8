use crate::RivetResult;
use fnv::FnvHashMap;
use std::collections::hash_map::Entry;

struct FrameCacheEntry<T: Clone> {
    value: T,
    last_used_frame: u64,
}

//NOTE: gc() is O(n) in the number of entries. It only runs periodically and the cache is expected
// to hold at most a few hundred entries.
/// Hash-keyed cache of backend objects that are cheap to look up but expensive to create (like
/// vertex arrays). Each entry is stamped with the frame it was last used in. `gc()` advances the
/// frame counter and hands back every entry that has gone unused for `time_to_keep` frames so the
/// owner can destroy it.
///
/// The frame counter only moves when `gc()` is called. If `gc()` runs every N rendered frames, the
/// effective time to live is `time_to_keep * N` rendered frames.
pub struct FrameCache<T: Clone> {
    entries: FnvHashMap<u64, FrameCacheEntry<T>>,
    current_frame: u64,
    time_to_keep: u64,
}

impl<T: Clone> FrameCache<T> {
    pub fn new(time_to_keep: u64) -> Self {
        FrameCache {
            entries: Default::default(),
            current_frame: 0,
            time_to_keep,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn time_to_keep(&self) -> u64 {
        self.time_to_keep
    }

    pub fn get_or_create<CreateFn: FnOnce() -> RivetResult<T>>(
        &mut self,
        hash: u64,
        create_fn: CreateFn,
    ) -> RivetResult<T> {
        let current_frame = self.current_frame;
        match self.entries.entry(hash) {
            Entry::Occupied(mut x) => {
                let entry = x.get_mut();
                entry.last_used_frame = current_frame;
                Ok(entry.value.clone())
            }
            Entry::Vacant(x) => {
                let entry = FrameCacheEntry {
                    value: (create_fn)()?,
                    last_used_frame: current_frame,
                };
                Ok(x.insert(entry).value.clone())
            }
        }
    }

    /// Advance the frame counter and evict every entry where `last_used + time_to_keep` has been
    /// reached. Returns the number of evicted entries.
    pub fn gc<DestroyFn: FnMut(T)>(
        &mut self,
        mut destroy_fn: DestroyFn,
    ) -> usize {
        self.current_frame += 1;

        let current_frame = self.current_frame;
        let time_to_keep = self.time_to_keep;
        let mut expired = Vec::default();
        self.entries.retain(|_, entry| {
            if entry.last_used_frame + time_to_keep <= current_frame {
                expired.push(entry.value.clone());
                false
            } else {
                true
            }
        });

        let expired_count = expired.len();
        for value in expired {
            (destroy_fn)(value);
        }

        expired_count
    }

    /// Evict everything regardless of age
    pub fn clear<DestroyFn: FnMut(T)>(
        &mut self,
        mut destroy_fn: DestroyFn,
    ) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            (destroy_fn)(entry.value);
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_entries_by_hash() {
        let mut cache = FrameCache::<u32>::new(2);
        let mut create_count = 0;

        for _ in 0..3 {
            let value = cache
                .get_or_create(7, || {
                    create_count += 1;
                    Ok(100)
                })
                .unwrap();
            assert_eq!(value, 100);
        }

        assert_eq!(create_count, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_create_is_not_cached() {
        let mut cache = FrameCache::<u32>::new(2);
        assert!(cache.get_or_create(1, || Err("out of ids".into())).is_err());
        assert!(cache.is_empty());

        assert_eq!(cache.get_or_create(1, || Ok(5)).unwrap(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_gc_evicts_after_time_to_keep() {
        let mut cache = FrameCache::<u32>::new(3);
        cache.get_or_create(1, || Ok(10)).unwrap();
        cache.get_or_create(2, || Ok(20)).unwrap();

        let mut destroyed = Vec::default();

        // Entry 1 is used every frame, entry 2 only at frame 0
        for _ in 0..2 {
            assert_eq!(cache.gc(|x| destroyed.push(x)), 0);
            cache.get_or_create(1, || Ok(10)).unwrap();
        }

        // Frame 3 reaches 0 + 3 for entry 2
        assert_eq!(cache.gc(|x| destroyed.push(x)), 1);
        assert_eq!(destroyed, vec![20]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_frame(), 3);

        // Entry 1 was last used at frame 2 and expires at frame 5
        assert_eq!(cache.gc(|x| destroyed.push(x)), 0);
        assert_eq!(cache.gc(|x| destroyed.push(x)), 1);
        assert_eq!(destroyed, vec![20, 10]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut cache = FrameCache::<u32>::new(100);
        for i in 0..5 {
            cache.get_or_create(i, || Ok(i as u32)).unwrap();
        }

        let mut destroyed = Vec::default();
        assert_eq!(cache.clear(|x| destroyed.push(x)), 5);
        destroyed.sort();
        assert_eq!(destroyed, vec![0, 1, 2, 3, 4]);
        assert!(cache.is_empty());
    }
}
