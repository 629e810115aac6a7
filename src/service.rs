//! Business rules in front of a [`CrudRepository`].
//!
//! Services validate caller input before any repository call is made and
//! turn empty results into `ResourceNotFound`. Repository errors pass
//! through unchanged.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::logging::OperationLog;
use crate::repository::{CrudRepository, Entity, EntityKey, NaturalKey};
use crate::validator;

pub struct Service<E: Entity> {
    repository: Arc<dyn CrudRepository<E>>,
}

impl<E: Entity> Clone for Service<E> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<E: Entity> Service<E> {
    pub fn new(repository: Arc<dyn CrudRepository<E>>) -> Self {
        Self { repository }
    }

    async fn logged<T>(
        operation: &'static str,
        future: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let log = OperationLog::start(E::descriptor().name, operation);
        let result = future.await;
        log.finish(&result);
        result
    }

    /// Every stored entity, in repository order; never empty
    pub async fn get_all(&self) -> AppResult<Vec<E>> {
        Self::logged("get_all", async {
            let entities = self.repository.get_all().await?;
            if entities.is_empty() {
                return Err(AppError::not_found());
            }
            Ok(entities)
        })
        .await
    }

    pub async fn get_by_id(&self, key: &E::Key) -> AppResult<E> {
        Self::logged("get_by_id", self.find_by_id(key)).await
    }

    /// Parse a caller-supplied identifier, then behave as [`Service::get_by_id`]
    pub async fn get_by_raw_id(&self, raw: &str) -> AppResult<E> {
        Self::logged("get_by_id", self.find_by_raw_id(raw)).await
    }

    /// Look an entity up by exactly one searchable attribute
    pub async fn get_by_unique_key(&self, query: &HashMap<String, String>) -> AppResult<E> {
        Self::logged("get_by_unique_key", async {
            if validator::is_empty_object(query) || query.len() != 1 {
                return Err(AppError::BadRequest(
                    "Exactly one search parameter must be provided".to_string(),
                ));
            }
            let (key, value) = query.iter().next().ok_or_else(AppError::bad_request)?;

            let descriptor = E::descriptor();
            if !validator::is_property_of(key, &descriptor.searchable_fields()) {
                return Err(AppError::BadRequest(format!(
                    "'{}' is not a searchable attribute of {}",
                    key, descriptor.name
                )));
            }

            if descriptor.is_primary_key(key) {
                return self.find_by_raw_id(value).await;
            }

            if !validator::is_valid_string(value) {
                return Err(AppError::bad_request());
            }

            let field = descriptor.search_field(key).ok_or_else(|| {
                AppError::InternalConfiguration(format!("No search field named '{}'", key))
            })?;
            let value = field
                .kind
                .parse_value(value)
                .ok_or_else(AppError::bad_request)?;

            self.repository
                .get_by_unique_key(field, &value)
                .await?
                .ok_or_else(AppError::not_found)
        })
        .await
    }

    /// Validate, check the natural key is free, then persist
    pub async fn add(&self, entity: E) -> AppResult<E> {
        Self::logged("add", async {
            if E::generates_key() && entity.key().is_some() {
                return Err(AppError::BadRequest(
                    "Identifiers are assigned on insert and must not be supplied".to_string(),
                ));
            }
            entity.validate_new().map_err(AppError::BadRequest)?;

            let descriptor = E::descriptor();
            let conflict = match entity.natural_key() {
                NaturalKey::Field(name, value) => {
                    let field = descriptor.search_field(name).ok_or_else(|| {
                        AppError::InternalConfiguration(format!(
                            "Natural key '{}' of {} is not a search field",
                            name, descriptor.name
                        ))
                    })?;
                    self.repository
                        .get_by_unique_key(field, &value)
                        .await?
                        .map(|_| format!("The provided {} is already taken", name))
                }
                NaturalKey::Key(key) => self
                    .repository
                    .get_by_id(&key)
                    .await?
                    .map(|_| format!("A {} record for {} already exists", descriptor.name, key)),
            };

            if let Some(message) = conflict {
                return Err(AppError::ResourcePersistence(message));
            }

            self.repository.save(entity).await
        })
        .await
    }

    /// Apply the supplied fields; true when a row changed
    pub async fn update(&self, entity: &E) -> AppResult<bool> {
        Self::logged("update", async {
            entity.validate_update().map_err(AppError::BadRequest)?;
            self.repository.update(entity).await
        })
        .await
    }

    pub async fn delete_by_id(&self, key: &E::Key) -> AppResult<bool> {
        Self::logged("delete_by_id", async {
            if !key.is_valid() {
                return Err(AppError::bad_request());
            }
            self.repository.delete_by_id(key).await
        })
        .await
    }

    pub async fn delete_by_raw_id(&self, raw: &str) -> AppResult<bool> {
        let key = E::Key::parse(raw).ok_or_else(AppError::bad_request)?;
        self.delete_by_id(&key).await
    }

    async fn find_by_id(&self, key: &E::Key) -> AppResult<E> {
        if !key.is_valid() {
            return Err(AppError::bad_request());
        }
        self.repository
            .get_by_id(key)
            .await?
            .ok_or_else(AppError::not_found)
    }

    async fn find_by_raw_id(&self, raw: &str) -> AppResult<E> {
        let key = E::Key::parse(raw).ok_or_else(AppError::bad_request)?;
        self.find_by_id(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::database::{Record, SqlValue};
    use crate::models::{Brand, Wax};
    use crate::repository::SearchField;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory repository that counts read calls
    struct MockRepository<E> {
        rows: Mutex<Vec<E>>,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl<E: Entity> MockRepository<E> {
        fn new(rows: Vec<E>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                reads: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            })
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn matches(entity: &E, field: &SearchField, value: &SqlValue) -> bool {
            let document = serde_json::to_value(entity).unwrap();
            match (&document[field.name], value) {
                (Value::String(stored), SqlValue::Text(wanted)) => {
                    stored.eq_ignore_ascii_case(wanted)
                }
                (Value::Number(stored), SqlValue::Integer(wanted)) => {
                    stored.as_i64() == Some(*wanted)
                }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl<E: Entity> CrudRepository<E> for MockRepository<E> {
        async fn get_all(&self) -> AppResult<Vec<E>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn get_by_id(&self, key: &E::Key) -> AppResult<Option<E>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|row| row.key().as_ref() == Some(key)).cloned())
        }

        async fn get_by_unique_key(
            &self,
            field: &SearchField,
            value: &SqlValue,
        ) -> AppResult<Option<E>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|row| Self::matches(row, field, value)).cloned())
        }

        async fn save(&self, mut entity: E) -> AppResult<E> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            let next_id = rows.len() as i64 + 1;
            entity.set_key_from_record(&Record::new().with("id", next_id))?;
            rows.push(entity.clone());
            Ok(entity)
        }

        async fn update(&self, _entity: &E) -> AppResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn delete_by_id(&self, _key: &E::Key) -> AppResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn brand(id: i64, name: &str) -> Brand {
        Brand {
            id: Some(id),
            brand_name: name.to_string(),
        }
    }

    fn query(key: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn test_get_all_empty_is_not_found() {
        let repository = MockRepository::<Brand>::new(Vec::new());
        let service = Service::new(repository.clone());

        let result = service.get_all().await;
        assert!(matches!(result, Err(AppError::ResourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_all_returns_repository_order() {
        let rows = vec![brand(2, "Scentsy"), brand(1, "ScentSationals")];
        let service = Service::new(MockRepository::new(rows.clone()));

        assert_eq!(service.get_all().await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_invalid_ids_never_reach_repository() {
        let repository = MockRepository::new(vec![brand(1, "Scentsy")]);
        let service = Service::new(repository.clone());

        for raw in ["0", "-1", "1.5", "NaN", "abc", ""] {
            let result = service.get_by_raw_id(raw).await;
            assert!(
                matches!(result, Err(AppError::BadRequest(_))),
                "expected {:?} to be rejected",
                raw
            );
        }
        assert!(matches!(
            service.get_by_id(&-3).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.delete_by_id(&0).await,
            Err(AppError::BadRequest(_))
        ));

        assert_eq!(repository.reads(), 0);
        assert_eq!(repository.writes(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_row_is_not_found() {
        let repository = MockRepository::new(vec![brand(1, "Scentsy")]);
        let service = Service::new(repository.clone());

        assert_eq!(service.get_by_raw_id("1").await.unwrap().brand_name, "Scentsy");
        assert!(matches!(
            service.get_by_id(&99).await,
            Err(AppError::ResourceNotFound(_))
        ));
        assert_eq!(repository.reads(), 2);
    }

    #[tokio::test]
    async fn test_get_by_unique_key_rules() {
        let repository = MockRepository::new(vec![brand(1, "Scentsy")]);
        let service = Service::new(repository.clone());

        let mut two_keys = query("brandName", "Scentsy");
        two_keys.insert("id".to_string(), "1".to_string());
        assert!(matches!(
            service.get_by_unique_key(&two_keys).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.get_by_unique_key(&HashMap::new()).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.get_by_unique_key(&query("brand_name", "Scentsy")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.get_by_unique_key(&query("brandName", "  ")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.get_by_unique_key(&query("id", "zero")).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(repository.reads(), 0);

        let found = service
            .get_by_unique_key(&query("brandName", "scentsy"))
            .await
            .unwrap();
        assert_eq!(found.id, Some(1));

        let found = service.get_by_unique_key(&query("id", "1")).await.unwrap();
        assert_eq!(found.brand_name, "Scentsy");

        assert!(matches!(
            service.get_by_unique_key(&query("brandName", "Yankee")).await,
            Err(AppError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_checks_natural_key() {
        let repository = MockRepository::<Wax>::new(Vec::new());
        let service = Service::new(repository.clone());
        let lemon_basil = Wax::new("Lemon Basil", "ScentSationals", 1.5, false, "Citrus");

        let saved = service.add(lemon_basil.clone()).await.unwrap();
        assert_eq!(saved.id, Some(1));

        let result = service.add(lemon_basil).await;
        assert!(matches!(result, Err(AppError::ResourcePersistence(_))));
        assert_eq!(repository.writes(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_supplied_id_and_bad_shape() {
        let repository = MockRepository::<Brand>::new(Vec::new());
        let service = Service::new(repository.clone());

        assert!(matches!(
            service.add(brand(5, "Scentsy")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.add(Brand::new("")).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(repository.reads(), 0);
        assert_eq!(repository.writes(), 0);
    }

    #[tokio::test]
    async fn test_update_validates_shape() {
        let repository = MockRepository::<Wax>::new(Vec::new());
        let service = Service::new(repository.clone());

        let mut wax = Wax::new("", "", 0.0, false, "");
        wax.id = Some(3);
        assert!(matches!(
            service.update(&wax).await,
            Err(AppError::BadRequest(_))
        ));

        wax.scent_strength = Some(0);
        assert!(service.update(&wax).await.unwrap());
        assert_eq!(repository.writes(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_raw_id() {
        let repository = MockRepository::new(vec![brand(1, "Scentsy")]);
        let service = Service::new(repository.clone());

        assert!(service.delete_by_raw_id("42").await.unwrap());
        assert!(matches!(
            service.delete_by_raw_id("forty-two").await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(repository.writes(), 1);
    }
}
