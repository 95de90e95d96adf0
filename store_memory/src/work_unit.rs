//! In-memory work unit store.

use attest_store::{StoreError, WorkUnitStore};
use attest_types::{WorkUnit, WorkUnitId};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::lock;

#[derive(Default)]
pub struct MemoryWorkUnitStore {
    units: Mutex<HashMap<WorkUnitId, WorkUnit>>,
}

impl MemoryWorkUnitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkUnitStore for MemoryWorkUnitStore {
    fn put_work_unit(&self, unit: &WorkUnit) -> Result<(), StoreError> {
        let mut units = lock(&self.units, "work units")?;
        if units.contains_key(&unit.id) {
            return Err(StoreError::Duplicate(unit.id.to_string()));
        }
        units.insert(unit.id.clone(), unit.clone());
        Ok(())
    }

    fn get_work_unit(&self, id: &WorkUnitId) -> Result<WorkUnit, StoreError> {
        lock(&self.units, "work units")?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn exists(&self, id: &WorkUnitId) -> Result<bool, StoreError> {
        Ok(lock(&self.units, "work units")?.contains_key(id))
    }
}
