//! Open-addressed dictionary.
//!
//! Robin-Hood hashing with linear probing: on insert, the entry that has
//! travelled further from its base slot keeps the bucket and the other
//! continues probing, which keeps probe-sequence lengths flat. Deletion
//! uses backward shifting to preserve the probe invariant.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::value::Value;

use super::StructObj;

/// Grow by doubling, but never by more than this many buckets at once.
const MAX_GROWTH_STEP: usize = 1024 * 1024;

fn approx_85_percent(x: usize) -> usize {
    (x * 870) >> 10
}

fn approx_40_percent(x: usize) -> usize {
    (x * 409) >> 10
}

fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash = 2166136261u32;
    for b in bytes {
        hash = 16777619u32.wrapping_mul(hash ^ u32::from(*b));
    }
    hash ^ (hash >> 16)
}

fn hash_value(value: &Value) -> u32 {
    match value {
        Value::None => 2,
        Value::Bool(b) => u32::from(*b),
        Value::Int(n) => hash_bytes(&n.to_le_bytes()),
        Value::Double(d) => hash_bytes(&d.to_bits().to_le_bytes()),
        Value::Str(s) => hash_bytes(s.as_bytes()),
        Value::Fn(v) => hash_bytes(&v.fn_idx().to_le_bytes()),
        Value::Struct(s) => hash_bytes(&(Rc::as_ptr(s) as *const () as usize).to_le_bytes()),
    }
}

#[derive(Debug)]
struct Bucket {
    key: Value,
    val: Value,
    hash: u32,
    psl: u32,
}

#[derive(Debug)]
struct RobinHood {
    nitems: usize,
    minsize: usize,
    buckets: Vec<Option<Bucket>>,
}

impl RobinHood {
    fn new(size: usize) -> Self {
        let minsize = size.max(1);
        let mut map = Self {
            nitems: 0,
            minsize,
            buckets: Vec::new(),
        };
        map.resize(minsize);
        map
    }

    fn size(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, key: &Value) -> Option<Value> {
        let hash = hash_value(key);
        let size = self.size();
        let mut i = hash as usize % size;
        let mut n = 0u32;
        loop {
            let bucket = self.buckets[i].as_ref()?;
            if bucket.hash == hash && bucket.key.equals(key) {
                return Some(bucket.val.clone());
            }
            // A bucket with a shorter probe length than our distance
            // would have captured the key on insert.
            if n > bucket.psl {
                return None;
            }
            n += 1;
            i = (i + 1) % size;
        }
    }

    fn insert(&mut self, key: Value, val: Value) {
        let hash = hash_value(&key);
        let mut entry = Bucket {
            key,
            val,
            hash,
            psl: 0,
        };
        let size = self.size();
        let mut i = entry.hash as usize % size;
        loop {
            match &mut self.buckets[i] {
                Some(bucket) => {
                    if bucket.hash == entry.hash && bucket.key.equals(&entry.key) {
                        bucket.val = entry.val;
                        return;
                    }
                    if entry.psl > bucket.psl {
                        core::mem::swap(bucket, &mut entry);
                    }
                    entry.psl += 1;
                    i = (i + 1) % size;
                }
                slot @ None => {
                    *slot = Some(entry);
                    self.nitems += 1;
                    return;
                }
            }
        }
    }

    fn put(&mut self, key: Value, val: Value) {
        let threshold = approx_85_percent(self.size());
        if self.nitems > threshold {
            let newsize = (self.size() << 1).min(self.size() + MAX_GROWTH_STEP);
            self.resize(newsize);
        }
        self.insert(key, val);
    }

    fn remove(&mut self, key: &Value) -> Option<Value> {
        let hash = hash_value(key);
        let size = self.size();
        let mut i = hash as usize % size;
        let mut n = 0u32;
        let removed = loop {
            let bucket = self.buckets[i].as_ref()?;
            if bucket.hash == hash && bucket.key.equals(key) {
                break self.buckets[i].take().map(|b| b.val)?;
            }
            if n > bucket.psl {
                return None;
            }
            n += 1;
            i = (i + 1) % size;
        };
        self.nitems -= 1;

        // Backward shift to keep every survivor within its probe
        // sequence.
        loop {
            let j = (i + 1) % size;
            match &mut self.buckets[j] {
                Some(next) if next.psl > 0 => {
                    next.psl -= 1;
                    self.buckets[i] = self.buckets[j].take();
                    i = j;
                }
                _ => break,
            }
        }

        let threshold = approx_40_percent(self.size());
        if self.nitems > self.minsize && self.nitems < threshold {
            let newsize = (self.size() >> 1).max(self.minsize);
            self.resize(newsize);
        }
        Some(removed)
    }

    fn resize(&mut self, newsize: usize) {
        let old = core::mem::replace(&mut self.buckets, Vec::new());
        self.buckets.resize_with(newsize, || None);
        self.nitems = 0;
        for bucket in old.into_iter().flatten() {
            self.insert(bucket.key, bucket.val);
        }
    }
}

/// A dictionary keyed by arbitrary values.
#[derive(Debug)]
pub struct Dict {
    map: RefCell<RobinHood>,
}

impl Dict {
    /// Create a dictionary with a bucket-count hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RefCell::new(RobinHood::new(capacity)),
        }
    }

    /// Insert or replace a key.
    pub fn insert(&self, key: Value, val: Value) {
        self.map.borrow_mut().put(key, val);
    }

    /// Look up a key.
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.map.borrow().get(key)
    }

    /// Remove a key, returning its value.
    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.map.borrow_mut().remove(key)
    }

    /// Current bucket count; exposed for resize behaviour tests.
    pub fn capacity(&self) -> usize {
        self.map.borrow().size()
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::with_capacity(1)
    }
}

impl StructObj for Dict {
    fn kind_name(&self) -> &'static str {
        "dict"
    }

    fn idx_get(&self, key: &Value) -> Option<Value> {
        self.get(key)
    }

    fn idx_set(&self, key: &Value, value: Value) -> bool {
        self.insert(key.clone(), value);
        true
    }

    fn len(&self) -> i32 {
        self.map.borrow().nitems as i32
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.map.borrow();
        let pairs = map
            .buckets
            .iter()
            .flatten()
            .format_with(", ", |b, f| f(&format_args!("{}: {}", b.key, b.val)));
        write!(f, "{{{pairs}}}")
    }

    fn as_dict(&self) -> Option<&Dict> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_finds_many_keys() {
        let dict = Dict::default();
        for i in 0..200 {
            dict.insert(Value::Int(i), Value::Int(i * 2));
        }
        for i in 0..200 {
            assert_eq!(dict.get(&Value::Int(i)), Some(Value::Int(i * 2)));
        }
        assert_eq!(dict.get(&Value::Int(200)), None);
        assert_eq!(dict.len(), 200);
    }

    #[test]
    fn replaces_duplicate_keys() {
        let dict = Dict::default();
        dict.insert(Value::str("k"), Value::Int(1));
        dict.insert(Value::str("k"), Value::Int(2));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::str("k")), Some(Value::Int(2)));
    }

    #[test]
    fn grows_past_the_85_percent_threshold_by_doubling() {
        let dict = Dict::with_capacity(16);
        let mut last_cap = dict.capacity();
        for i in 0..100 {
            let occupancy_before = i as usize;
            dict.insert(Value::Int(i), Value::None);
            let cap = dict.capacity();
            if cap != last_cap {
                assert_eq!(cap, last_cap * 2);
                assert!(occupancy_before > approx_85_percent(last_cap));
                last_cap = cap;
            }
        }
    }

    #[test]
    fn shrinks_below_40_percent_but_never_under_minimum() {
        let dict = Dict::with_capacity(4);
        for i in 0..300 {
            dict.insert(Value::Int(i), Value::None);
        }
        let grown = dict.capacity();
        for i in 0..300 {
            assert_eq!(dict.remove(&Value::Int(i)), Some(Value::None));
        }
        assert!(dict.capacity() < grown);
        assert!(dict.capacity() >= 4);
        assert_eq!(dict.len(), 0);
    }

    #[test]
    fn mixed_key_types_coexist() {
        let dict = Dict::default();
        dict.insert(Value::str("a"), Value::Int(1));
        dict.insert(Value::Int(1), Value::Int(2));
        dict.insert(Value::Bool(true), Value::Int(3));
        assert_eq!(dict.get(&Value::str("a")), Some(Value::Int(1)));
        assert_eq!(dict.get(&Value::Int(1)), Some(Value::Int(2)));
        assert_eq!(dict.get(&Value::Bool(true)), Some(Value::Int(3)));
    }
}
