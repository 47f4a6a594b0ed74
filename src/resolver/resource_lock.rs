//! Named, reference-counted mutual exclusion.
//!
//! Acquiring a lock on a resource string guarantees no other thread
//! holds a lock on the same string. Entries are reference-counted and
//! freed when the last interested thread releases, so the table never
//! grows beyond the set of currently contended names. The resolver uses
//! this to keep two threads from parsing the same imported file at the
//! same time.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use std::sync::{Condvar, Mutex};

struct Entry {
    /// Threads holding or waiting on this resource.
    interested: usize,
    locked: bool,
}

static LOCK_TABLE: Lazy<(Mutex<HashMap<String, Entry>>, Condvar)> =
    Lazy::new(|| (Mutex::new(HashMap::new()), Condvar::new()));

/// RAII guard over a named resource.
pub struct ResourceLock {
    resource: String,
}

impl ResourceLock {
    pub fn acquire(resource: &str) -> Self {
        let (table, condvar) = &*LOCK_TABLE;
        let mut entries = table.lock().unwrap();
        entries
            .entry(resource.to_string())
            .or_insert(Entry {
                interested: 0,
                locked: false,
            })
            .interested += 1;
        loop {
            let entry = entries
                .get_mut(resource)
                .expect("lock entry vanished while waiting");
            if !entry.locked {
                entry.locked = true;
                return Self {
                    resource: resource.to_string(),
                };
            }
            entries = condvar.wait(entries).unwrap();
        }
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        let (table, condvar) = &*LOCK_TABLE;
        let mut entries = table.lock().unwrap();
        if let Some(entry) = entries.get_mut(&self.resource) {
            entry.locked = false;
            entry.interested -= 1;
            if entry.interested == 0 {
                entries.remove(&self.resource);
            }
        }
        condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn exclusive_within_one_name() {
        let active = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let active = Arc::clone(&active);
            handles.push(thread::spawn(move || {
                let _guard = ResourceLock::acquire("shared.ft");
                let now = active.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "two threads inside the same resource");
                thread::yield_now();
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn entries_are_freed_after_release() {
        {
            let _guard = ResourceLock::acquire("transient");
        }
        let (table, _) = &*LOCK_TABLE;
        assert!(!table.lock().unwrap().contains_key("transient"));
    }

    #[test]
    fn different_names_do_not_block_each_other() {
        let _a = ResourceLock::acquire("a.ft");
        let handle = thread::spawn(|| {
            let _b = ResourceLock::acquire("b.ft");
        });
        handle.join().unwrap();
    }
}
