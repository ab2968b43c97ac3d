//! Stack growth for recursive visitor dispatch.
//!
//! Compiling a unit walks the AST through handler closures that call back
//! into the visitor, so nesting depth in the source becomes native recursion
//! depth. [`ensure_sufficient_stack`] grows the stack before a handler runs
//! when the remaining space drops under the red zone.
//!
//! On `wasm32` the guard is a passthrough.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than [`RED_ZONE`] remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// Passthrough on targets that manage their own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Bytes of stack left on the current segment, when the platform reports it.
#[cfg(not(target_arch = "wasm32"))]
pub fn remaining_stack() -> Option<usize> {
    stacker::remaining_stack()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_dispatch_does_not_overflow() {
        fn depth(n: u32) -> u32 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(200_000), 200_000);
    }

    #[test]
    fn propagates_errors_unchanged() {
        let result: Result<(), String> = ensure_sufficient_stack(|| Err("boom".to_owned()));
        assert_eq!(result, Err("boom".to_owned()));
    }

    #[test]
    fn reports_remaining_stack() {
        let remaining = remaining_stack();
        if let Some(bytes) = remaining {
            assert!(bytes > 0);
        }
    }
}
