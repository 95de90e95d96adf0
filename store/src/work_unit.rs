//! Work unit storage trait.

use crate::StoreError;
use attest_types::{WorkUnit, WorkUnitId};

pub trait WorkUnitStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] if the id is already known.
    fn put_work_unit(&self, unit: &WorkUnit) -> Result<(), StoreError>;
    fn get_work_unit(&self, id: &WorkUnitId) -> Result<WorkUnit, StoreError>;
    fn exists(&self, id: &WorkUnitId) -> Result<bool, StoreError>;
}
