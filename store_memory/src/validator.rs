//! In-memory validator store.

use attest_store::{StoreError, Validator, ValidatorStore};
use attest_types::ValidatorId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::lock;

pub struct MemoryValidatorStore {
    validators: Mutex<BTreeMap<ValidatorId, Validator>>,
    next_id: AtomicU64,
}

impl MemoryValidatorStore {
    pub fn new() -> Self {
        Self {
            validators: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryValidatorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorStore for MemoryValidatorStore {
    fn next_validator_id(&self) -> Result<ValidatorId, StoreError> {
        Ok(ValidatorId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn put_validator(&self, validator: &Validator) -> Result<(), StoreError> {
        lock(&self.validators, "validators")?.insert(validator.id, validator.clone());
        Ok(())
    }

    fn get_validator(&self, id: ValidatorId) -> Result<Validator, StoreError> {
        lock(&self.validators, "validators")?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn exists(&self, id: ValidatorId) -> Result<bool, StoreError> {
        Ok(lock(&self.validators, "validators")?.contains_key(&id))
    }

    fn iter_validators(&self) -> Result<Vec<Validator>, StoreError> {
        Ok(lock(&self.validators, "validators")?.values().cloned().collect())
    }

    fn validator_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.validators, "validators")?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::Timestamp;

    fn validator(id: ValidatorId, name: &str) -> Validator {
        Validator {
            id,
            institution: name.to_string(),
            stake: 100,
            reputation: 0.5,
            total_votes: 0,
            correct_votes: 0,
            registered_at: Timestamp::new(1),
        }
    }

    #[test]
    fn ids_are_sequential() {
        let store = MemoryValidatorStore::new();
        let a = store.next_validator_id().unwrap();
        let b = store.next_validator_id().unwrap();
        assert_eq!(a, ValidatorId::new(1));
        assert_eq!(b, a.next());
    }

    #[test]
    fn put_get_and_iterate_in_id_order() {
        let store = MemoryValidatorStore::new();
        let b = validator(ValidatorId::new(2), "beta");
        let a = validator(ValidatorId::new(1), "alpha");
        store.put_validator(&b).unwrap();
        store.put_validator(&a).unwrap();

        assert_eq!(store.get_validator(a.id).unwrap().institution, "alpha");
        let all = store.iter_validators().unwrap();
        assert_eq!(all.iter().map(|v| v.id.get()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.validator_count().unwrap(), 2);
    }

    #[test]
    fn missing_validator_is_not_found() {
        let store = MemoryValidatorStore::new();
        assert!(matches!(
            store.get_validator(ValidatorId::new(9)),
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists(ValidatorId::new(9)).unwrap());
    }
}
