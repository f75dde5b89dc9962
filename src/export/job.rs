//! Export admission: the concurrency guard and the read-only snapshot.

use super::ExportFormat;
use crate::error::ExportError;
use crate::session::SessionState;
use crate::types::Territories;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag marking an export in flight.
#[derive(Debug, Clone, Default)]
pub struct ExportLock {
    busy: Arc<AtomicBool>,
}

impl ExportLock {
    /// Takes the lock, or `None` if an export already holds it.
    pub fn try_acquire(&self) -> Option<ExportGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard { busy: self.busy.clone() })
    }

    /// True while a guard is alive.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the export lock; releases it when dropped, whatever the outcome.
#[derive(Debug)]
pub struct ExportGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        log::debug!("Export guard released");
    }
}

/// An admitted export: the requested output, a frozen copy of the collection,
/// and the view rotation at the time of the request.
#[derive(Debug)]
pub struct ExportJob {
    /// Requested output
    pub format: ExportFormat,
    /// Collection as it was when the export started
    pub snapshot: Territories,
    /// View bearing in degrees
    pub bearing: f64,
    _guard: ExportGuard,
}

impl SessionState {
    /// Admits an export request.
    ///
    /// # Returns
    ///
    /// * `Err(ExportError::NothingToExport)` if the collection is empty
    /// * `Ok(None)` if another export is in flight; the request is dropped silently
    /// * `Ok(Some(job))` otherwise; the lock is held until `job` is dropped
    pub fn begin_export(&self, format: ExportFormat) -> Result<Option<ExportJob>, ExportError> {
        if self.territories().is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let Some(guard) = self.export_lock().try_acquire() else {
            log::debug!("Export already in progress, ignoring {:?} request", format);
            return Ok(None);
        };
        Ok(Some(ExportJob {
            format,
            snapshot: self.territories().clone(),
            bearing: self.view().bearing,
            _guard: guard,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let lock = ExportLock::default();
        let guard = lock.try_acquire().expect("first acquire");
        assert!(lock.is_busy());
        assert!(lock.try_acquire().is_none());
        drop(guard);
        assert!(!lock.is_busy());
        assert!(lock.try_acquire().is_some());
    }
}
