//! Uniform iteration over automation collections.
//!
//! Host collections come in two flavours: ones that hand out a `_NewEnum`
//! enumerator and ones that only answer `Count` and `Item(i)` (1-based).
//! [`items`] hides the difference and yields owned object handles lazily.
//! A single item that fails to materialise is skipped and counted; it never
//! ends the iteration.

use crate::variant::{AutomationObject, Handle, NativeItems, Variant};

enum Source<'a> {
    Empty,
    Native(NativeItems<'a>),
    Indexed {
        collection: &'a dyn AutomationObject,
        next: i64,
        count: i64,
    },
}

/// Lazy sequence of item handles from one collection.
pub struct Items<'a> {
    source: Source<'a>,
    position: usize,
    skipped: usize,
}

/// Iterate `collection`, preferring native enumeration and falling back to
/// `Count` / `Item(i)`.  `None` yields nothing.
pub fn items(collection: Option<&dyn AutomationObject>) -> Items<'_> {
    let source = match collection {
        None => Source::Empty,
        Some(collection) => match collection.new_enum() {
            Ok(Some(native)) => Source::Native(native),
            Ok(None) => indexed(collection),
            Err(e) => {
                log::debug!("_NewEnum failed, falling back to Count/Item: {e}");
                indexed(collection)
            }
        },
    };
    Items {
        source,
        position: 0,
        skipped: 0,
    }
}

fn indexed(collection: &dyn AutomationObject) -> Source<'_> {
    match collection.get("Count").map(|v| v.as_i64()) {
        Ok(Some(count)) => Source::Indexed {
            collection,
            next: 1,
            count,
        },
        Ok(None) => {
            log::debug!("collection Count is not an integer, treating as empty");
            Source::Empty
        }
        Err(e) => {
            log::debug!("collection has neither _NewEnum nor Count: {e}");
            Source::Empty
        }
    }
}

impl Items<'_> {
    /// Number of items dropped so far because they could not be read.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        log::debug!(
            "skipping collection item {} ({reason}); {} skipped so far",
            self.position,
            self.skipped
        );
    }
}

impl Iterator for Items<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        loop {
            let item = match &mut self.source {
                Source::Empty => return None,
                Source::Native(native) => native.next()?,
                Source::Indexed {
                    collection,
                    next,
                    count,
                } => {
                    if *next > *count {
                        return None;
                    }
                    let index = *next;
                    *next += 1;
                    collection.get_with("Item", &[Variant::Int(index)])
                }
            };
            self.position += 1;

            match item {
                Ok(Variant::Object(handle)) => return Some(handle),
                Ok(other) => self.skip(&format!("not an object: {}", other.kind())),
                Err(e) => self.skip(&e.to_string()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
