use std::sync::atomic::{AtomicBool, Ordering};

static LIVE: AtomicBool = AtomicBool::new(false);

/// A renderer already exists in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a renderer is already constructed in this process")]
pub struct AlreadyConstructed;

/// Process-wide token held by the single live renderer.
///
/// Released on drop, after which a new renderer may be constructed.
#[derive(Debug)]
pub struct InstanceGuard {
    _private: (),
}

impl InstanceGuard {
    pub fn acquire() -> Result<Self, AlreadyConstructed> {
        LIVE.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _private: () })
            .map_err(|_| AlreadyConstructed)
    }

    /// Returns `true` while some guard is held.
    pub fn is_held() -> bool {
        LIVE.load(Ordering::Acquire)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        LIVE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the flag is process-global and tests run concurrently.
    #[test]
    fn second_acquire_fails_until_release() {
        let first = InstanceGuard::acquire().expect("first guard");
        assert!(InstanceGuard::is_held());
        assert_eq!(InstanceGuard::acquire().unwrap_err(), AlreadyConstructed);

        drop(first);
        assert!(!InstanceGuard::is_held());

        let again = InstanceGuard::acquire();
        assert!(again.is_ok());
    }
}
