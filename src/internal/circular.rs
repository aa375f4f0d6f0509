//! Circular dependency detection infrastructure.

use std::cell::RefCell;
use std::panic;

use crate::error::{DiError, DiResult};
use crate::key::Key;

const MAX_DEPTH: usize = 1024;

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_TLS: RefCell<ResolutionTls> = RefCell::new(ResolutionTls::default());
}

#[derive(Default)]
struct ResolutionTls {
    stack: Vec<Key>,
}

/// Panic payload for circular dependency detection.
///
/// When a circular dependency is detected during service resolution,
/// this panic payload carries the complete dependency path for debugging.
/// Each entry is the display form of a [`Key`], so keyed registrations show
/// their key.
///
/// Example path: `["ServiceA", "ServiceB", "ServiceC", "ServiceA"]`
#[derive(Debug)]
pub struct CircularPanic {
    /// The complete circular dependency path showing the cycle.
    pub path: Box<[String]>,
}

impl CircularPanic {
    fn new(path: Vec<String>) -> Self {
        CircularPanic { path: path.into_boxed_slice() }
    }
}

/// Guard for managing thread-local resolution stack
pub(crate) struct StackGuard {
    _private: (),
}

impl StackGuard {
    pub(crate) fn new(key: &Key) -> Self {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            // Circular detection BEFORE pushing the new key
            if tls.stack.iter().any(|k| k == key) {
                let mut path: Vec<String> = tls.stack.iter().map(|k| k.to_string()).collect();
                path.push(key.to_string());
                drop(tls);
                panic::panic_any(CircularPanic::new(path));
            }

            // Depth guard
            if tls.stack.len() >= MAX_DEPTH {
                let depth = tls.stack.len();
                drop(tls);
                panic::panic_any(DiError::DepthExceeded(depth));
            }

            tls.stack.push(key.clone());
        });

        Self { _private: () }
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        // Guards unwind in LIFO order, so the top frame is always ours
        let _ = RESOLUTION_TLS.try_with(|tls| {
            tls.borrow_mut().stack.pop();
        });
    }
}

/// Execute a closure with circular dependency detection
pub(crate) fn with_circular_catch<T, F>(key: &Key, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    use std::panic::AssertUnwindSafe;

    let _guard = StackGuard::new(key);

    // Wrap in catch_unwind to handle CircularPanic
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            if let Some(circular_panic) = payload.downcast_ref::<CircularPanic>() {
                Err(DiError::Circular(circular_panic.path.to_vec()))
            } else if let Some(error) = payload.downcast_ref::<DiError>() {
                Err(error.clone())
            } else {
                // Re-panic for other types of panics
                panic::resume_unwind(payload);
            }
        }
    }
}

/// Current resolution depth on this thread.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_TLS.with(|tls| tls.borrow().stack.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn stack_unwinds_after_cycle() {
        let a = key_of_type::<u8>();
        let result: DiResult<()> = with_circular_catch(&a, || {
            with_circular_catch(&key_of_type::<u16>(), || {
                let _guard = StackGuard::new(&key_of_type::<u8>());
                Ok(())
            })
        });
        assert!(matches!(result, Err(DiError::Circular(ref path)) if path.len() == 3));
        assert_eq!(depth(), 0);

        // A later resolution of the same key is not mistaken for a cycle
        let again: DiResult<u32> = with_circular_catch(&a, || Ok(1));
        assert_eq!(again, Ok(1));
    }

    #[test]
    fn keyed_frames_are_distinct() {
        let plain = key_of_type::<u8>();
        let keyed = Key::new(plain.service, Some("other".into()));
        let result = with_circular_catch(&plain, || with_circular_catch(&keyed, || Ok(5u8)));
        assert_eq!(result, Ok(5));
    }
}
