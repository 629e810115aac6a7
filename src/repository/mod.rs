//! Generic persistence for catalog entities.
//!
//! Each entity supplies a static [`EntityDescriptor`] naming its base query,
//! result columns, searchable fields and write templates. One
//! [`Repository`] implementation serves all of them: statement tables are
//! rendered once for the backend's dialect when the repository is built.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::backend::database::{
    ColumnKind, ColumnSpec, Dialect, InsertTemplate, Record, SqlValue, StatementTable,
    SqlExecutor, UpdateTemplate, WriteValues,
};
use crate::backend::CatalogBackend;
use crate::error::{AppError, AppResult};
use crate::password::PasswordManager;

pub mod brand;
pub mod owned;
pub mod user;
pub mod wax;

/// An attribute callers may look an entity up by
#[derive(Debug, Clone, Copy)]
pub struct SearchField {
    /// Attribute name as it appears in entity documents
    pub name: &'static str,
    /// Qualified column in the entity's base query
    pub column: &'static str,
    pub kind: ColumnKind,
    pub case_insensitive: bool,
}

impl SearchField {
    pub const fn new(name: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            column,
            kind,
            case_insensitive: false,
        }
    }

    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    fn condition(&self, dialect: Dialect) -> String {
        if self.case_insensitive {
            format!("LOWER({}) = LOWER({})", self.column, dialect.placeholder(1))
        } else {
            format!("{} = {}", self.column, dialect.placeholder(1))
        }
    }
}

/// Static description of how an entity is stored
#[derive(Debug)]
pub struct EntityDescriptor {
    pub name: &'static str,
    /// Join producing every column in `columns`, without a WHERE clause
    pub base_query: &'static str,
    pub order_by: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Qualified key columns in the base query, in key order
    pub key_columns: &'static [&'static str],
    /// Search field that names the generated primary key, if any
    pub primary_key_field: Option<&'static str>,
    /// Allow-list for unique-key lookups
    pub search_fields: &'static [SearchField],
    pub insert: InsertTemplate,
    pub update: UpdateTemplate,
}

impl EntityDescriptor {
    pub fn search_field(&self, name: &str) -> Option<&'static SearchField> {
        self.search_fields.iter().find(|field| field.name == name)
    }

    pub fn searchable_fields(&self) -> Vec<&'static str> {
        self.search_fields.iter().map(|field| field.name).collect()
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key_field == Some(name)
    }
}

/// Identity of a stored entity
pub trait EntityKey:
    Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Parse a caller-supplied identifier; `None` when malformed
    fn parse(raw: &str) -> Option<Self>;

    fn is_valid(&self) -> bool;

    /// Values bound against the descriptor's key columns, in order
    fn to_values(&self) -> Vec<SqlValue>;
}

impl EntityKey for i64 {
    fn parse(raw: &str) -> Option<Self> {
        crate::validator::parse_id(raw)
    }

    fn is_valid(&self) -> bool {
        crate::validator::is_valid_id(*self)
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Integer(*self)]
    }
}

/// How an entity proves it is not a duplicate before insert
#[derive(Debug, Clone, PartialEq)]
pub enum NaturalKey<K> {
    /// A unique search field and the value to look up
    Field(&'static str, SqlValue),
    /// The entity's own composite key
    Key(K),
}

/// Collaborators needed to turn an entity into bindable values
#[derive(Clone)]
pub struct WriteContext {
    pub passwords: Arc<PasswordManager>,
}

impl WriteContext {
    pub fn new(passwords: Arc<PasswordManager>) -> Self {
        Self { passwords }
    }
}

impl Default for WriteContext {
    fn default() -> Self {
        Self::new(Arc::new(PasswordManager::default()))
    }
}

pub trait Entity:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Key: EntityKey;

    fn descriptor() -> &'static EntityDescriptor;

    /// Whether the database assigns the key on insert
    fn generates_key() -> bool {
        true
    }

    /// Map one base-query row
    fn from_record(record: &Record) -> AppResult<Self>;

    fn key(&self) -> Option<Self::Key>;

    /// Back-fill the key from an insert's `RETURNING` row
    fn set_key_from_record(&mut self, record: &Record) -> AppResult<()>;

    fn validate_new(&self) -> Result<(), String>;

    fn validate_update(&self) -> Result<(), String>;

    fn natural_key(&self) -> NaturalKey<Self::Key>;

    fn insert_values(&self, context: &WriteContext) -> AppResult<WriteValues>;

    fn update_values(&self, context: &WriteContext) -> AppResult<WriteValues>;

    /// Drop write-only attributes before the entity leaves the repository
    fn redact(&mut self) {}
}

/// The six-operation persistence contract
#[async_trait]
pub trait CrudRepository<E: Entity>: Send + Sync {
    async fn get_all(&self) -> AppResult<Vec<E>>;

    async fn get_by_id(&self, key: &E::Key) -> AppResult<Option<E>>;

    /// First row, in base-query order, whose field equals `value`
    async fn get_by_unique_key(
        &self,
        field: &SearchField,
        value: &SqlValue,
    ) -> AppResult<Option<E>>;

    /// Insert and return the entity with its key filled in
    async fn save(&self, entity: E) -> AppResult<E>;

    /// True when a row was changed
    async fn update(&self, entity: &E) -> AppResult<bool>;

    /// Hard delete; succeeds whether or not a row matched
    async fn delete_by_id(&self, key: &E::Key) -> AppResult<bool>;
}

struct Statements {
    select_all: String,
    select_by_key: String,
    delete_by_key: String,
    insert: StatementTable,
    update: StatementTable,
    returning: Vec<ColumnSpec>,
}

impl Statements {
    fn render(descriptor: &EntityDescriptor, dialect: Dialect) -> Self {
        let select_by_key = format!(
            "{} WHERE {}",
            descriptor.base_query,
            key_conditions(descriptor.key_columns, dialect)
        );
        let delete_by_key = format!(
            "DELETE FROM {} WHERE {}",
            descriptor.update.table,
            key_conditions(descriptor.update.key_columns, dialect)
        );

        Self {
            select_all: format!("{} ORDER BY {}", descriptor.base_query, descriptor.order_by),
            select_by_key,
            delete_by_key,
            insert: descriptor.insert.render(dialect),
            update: descriptor.update.render(dialect),
            returning: descriptor
                .insert
                .returning
                .iter()
                .map(|column| ColumnSpec::new(*column, ColumnKind::Integer))
                .collect(),
        }
    }
}

fn key_conditions(columns: &[&str], dialect: Dialect) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", column, dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// SQL-backed [`CrudRepository`] for any [`Entity`]
pub struct Repository<E: Entity> {
    backend: Arc<dyn CatalogBackend>,
    context: WriteContext,
    statements: Statements,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(backend: Arc<dyn CatalogBackend>, context: WriteContext) -> Self {
        let statements = Statements::render(E::descriptor(), backend.dialect());
        Self {
            backend,
            context,
            statements,
            _entity: PhantomData,
        }
    }

    fn name() -> &'static str {
        E::descriptor().name
    }

    async fn fetch_entity(&self, sql: &str, args: &[SqlValue]) -> AppResult<Option<E>> {
        let row = self
            .backend
            .fetch_optional(sql, args, E::descriptor().columns)
            .await?;

        row.as_ref().map(E::from_record).transpose()
    }
}

#[async_trait]
impl<E: Entity> CrudRepository<E> for Repository<E> {
    async fn get_all(&self) -> AppResult<Vec<E>> {
        let rows = self
            .backend
            .fetch_all(&self.statements.select_all, &[], E::descriptor().columns)
            .await?;

        tracing::debug!(entity = Self::name(), rows = rows.len(), "Fetched all rows");
        rows.iter().map(E::from_record).collect()
    }

    async fn get_by_id(&self, key: &E::Key) -> AppResult<Option<E>> {
        self.fetch_entity(&self.statements.select_by_key, &key.to_values())
            .await
    }

    async fn get_by_unique_key(
        &self,
        field: &SearchField,
        value: &SqlValue,
    ) -> AppResult<Option<E>> {
        let descriptor = E::descriptor();
        if descriptor.search_field(field.name).is_none() {
            return Err(AppError::InternalConfiguration(format!(
                "'{}' is not a search field of {}",
                field.name, descriptor.name
            )));
        }

        let sql = format!(
            "{} WHERE {} ORDER BY {} LIMIT 1",
            descriptor.base_query,
            field.condition(self.backend.dialect()),
            descriptor.order_by
        );

        self.fetch_entity(&sql, std::slice::from_ref(value)).await
    }

    async fn save(&self, mut entity: E) -> AppResult<E> {
        let values = entity.insert_values(&self.context)?;
        let statement = self.statements.insert.resolve(values, Vec::new())?;
        tracing::debug!(
            entity = Self::name(),
            variant = statement.variant,
            "Inserting row"
        );

        let row = self
            .backend
            .fetch_optional(statement.sql, &statement.args, &self.statements.returning)
            .await?;

        // insert-from-select yields no row when the referenced source row is missing
        let record = row.ok_or_else(|| {
            AppError::BadRequest(format!(
                "The {} references a resource that does not exist",
                Self::name().to_lowercase()
            ))
        })?;

        entity.set_key_from_record(&record)?;
        entity.redact();
        Ok(entity)
    }

    async fn update(&self, entity: &E) -> AppResult<bool> {
        let key = entity.key().ok_or_else(AppError::bad_request)?;
        let values = entity.update_values(&self.context)?;
        let statement = self.statements.update.resolve(values, key.to_values())?;
        tracing::debug!(
            entity = Self::name(),
            key = %key,
            variant = statement.variant,
            "Updating row"
        );

        let affected = self.backend.execute(statement.sql, &statement.args).await?;
        Ok(affected > 0)
    }

    async fn delete_by_id(&self, key: &E::Key) -> AppResult<bool> {
        let affected = self
            .backend
            .execute(&self.statements.delete_by_key, &key.to_values())
            .await?;

        tracing::debug!(entity = Self::name(), key = %key, rows = affected, "Deleted rows");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Wax;

    #[test]
    fn test_key_conditions() {
        assert_eq!(key_conditions(&["w.id"], Dialect::Postgres), "w.id = $1");
        assert_eq!(
            key_conditions(&["user_id", "product_id"], Dialect::Sqlite),
            "user_id = ?1 AND product_id = ?2"
        );
    }

    #[test]
    fn test_rendered_statements() {
        let statements = Statements::render(Wax::descriptor(), Dialect::Postgres);

        assert!(statements.select_all.ends_with("ORDER BY w.id"));
        assert!(statements.select_by_key.ends_with("WHERE w.id = $1"));
        assert_eq!(statements.delete_by_key, "DELETE FROM waxes WHERE id = $1");
        assert_eq!(statements.returning.len(), 1);
    }

    #[test]
    fn test_search_field_condition() {
        let field = SearchField::new("productName", "w.product_name", ColumnKind::Text)
            .case_insensitive();
        assert_eq!(
            field.condition(Dialect::Sqlite),
            "LOWER(w.product_name) = LOWER(?1)"
        );

        let field = SearchField::new("userId", "wo.user_id", ColumnKind::Integer);
        assert_eq!(field.condition(Dialect::Postgres), "wo.user_id = $1");
    }

    #[test]
    fn test_integer_key() {
        assert_eq!(<i64 as EntityKey>::parse("12"), Some(12));
        assert_eq!(<i64 as EntityKey>::parse("-1"), None);
        assert!(!EntityKey::is_valid(&0i64));
        assert_eq!(7i64.to_values(), vec![SqlValue::Integer(7)]);
    }
}
