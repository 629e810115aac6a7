use super::{Entity, EntityDescriptor, NaturalKey, Repository, SearchField, WriteContext};
use crate::backend::database::{
    ColumnKind, ColumnSpec, InsertColumn, InsertTemplate, Record, SqlExecutor, SqlValue,
    UpdateTemplate, WriteValues,
};
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::validator;

static COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::new("id", ColumnKind::Integer),
    ColumnSpec::new("username", ColumnKind::Text),
    ColumnSpec::new("first_name", ColumnKind::Text),
    ColumnSpec::new("last_name", ColumnKind::Text),
    ColumnSpec::new("role", ColumnKind::Text),
];

static CREDENTIAL_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::new("id", ColumnKind::Integer),
    ColumnSpec::new("username", ColumnKind::Text),
    ColumnSpec::new("first_name", ColumnKind::Text),
    ColumnSpec::new("last_name", ColumnKind::Text),
    ColumnSpec::new("role", ColumnKind::Text),
    ColumnSpec::new("password", ColumnKind::Text),
];

static SEARCH_FIELDS: [SearchField; 2] = [
    SearchField::new("id", "u.id", ColumnKind::Integer),
    SearchField::new("username", "u.username", ColumnKind::Text).case_insensitive(),
];

// The password column is written but never part of the base query
static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "User",
    base_query: "SELECT u.id, u.username, u.first_name, u.last_name, u.role FROM users u",
    order_by: "u.id",
    columns: &COLUMNS,
    key_columns: &["u.id"],
    primary_key_field: Some("id"),
    search_fields: &SEARCH_FIELDS,
    insert: InsertTemplate {
        table: "users",
        columns: &[
            InsertColumn::Bound("username"),
            InsertColumn::Bound("password"),
            InsertColumn::Bound("first_name"),
            InsertColumn::Bound("last_name"),
            InsertColumn::Bound("role"),
        ],
        optional: &[],
        source: None,
        returning: &["id"],
    },
    update: UpdateTemplate {
        table: "users",
        columns: &["username", "first_name", "last_name", "role"],
        optional: &["password"],
        key_columns: &["id"],
    },
};

impl User {
    fn validate_profile(&self) -> Result<(), String> {
        if !validator::is_valid_strings(&[
            self.username.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.role.as_str(),
        ]) {
            return Err("Username, first name, last name and role are required".to_string());
        }
        Ok(())
    }
}

impl Entity for User {
    type Key = i64;

    fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        Ok(User {
            id: Some(record.get_i64("id")?),
            username: record.get_string("username")?,
            password: None,
            first_name: record.get_string("first_name")?,
            last_name: record.get_string("last_name")?,
            role: record.get_string("role")?,
        })
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key_from_record(&mut self, record: &Record) -> AppResult<()> {
        self.id = Some(record.get_i64("id")?);
        Ok(())
    }

    fn validate_new(&self) -> Result<(), String> {
        self.validate_profile()?;
        match self.password.as_deref() {
            Some(password) if validator::is_valid_string(password) => Ok(()),
            _ => Err("A password is required".to_string()),
        }
    }

    fn validate_update(&self) -> Result<(), String> {
        match self.id {
            Some(id) if validator::is_valid_id(id) => self.validate_profile(),
            _ => Err("A valid user id is required".to_string()),
        }
    }

    fn natural_key(&self) -> NaturalKey<i64> {
        NaturalKey::Field("username", self.username.clone().into())
    }

    fn insert_values(&self, context: &WriteContext) -> AppResult<WriteValues> {
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("A password is required".to_string()))?;
        let hash = context.passwords.hash_password(password)?;

        let required: Vec<SqlValue> = vec![
            self.username.clone().into(),
            hash.into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.role.clone().into(),
        ];
        Ok(WriteValues::new(required, Vec::new()))
    }

    fn update_values(&self, context: &WriteContext) -> AppResult<WriteValues> {
        let hash = self
            .password
            .as_deref()
            .map(|password| context.passwords.hash_password(password))
            .transpose()?;

        let required: Vec<SqlValue> = vec![
            self.username.clone().into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.role.clone().into(),
        ];
        Ok(WriteValues::new(required, vec![hash.map(SqlValue::Text)]))
    }

    fn redact(&mut self) {
        self.password = None;
    }
}

impl Repository<User> {
    /// Look a user up by username together with the stored password hash
    pub async fn find_credentials(&self, username: &str) -> AppResult<Option<(User, String)>> {
        let sql = format!(
            "SELECT u.id, u.username, u.first_name, u.last_name, u.role, u.password \
             FROM users u WHERE LOWER(u.username) = LOWER({}) ORDER BY u.id LIMIT 1",
            self.backend.dialect().placeholder(1)
        );

        let row = self
            .backend
            .fetch_optional(&sql, &[SqlValue::from(username)], &CREDENTIAL_COLUMNS)
            .await?;

        match row {
            Some(record) => {
                let user = User::from_record(&record)?;
                let hash = record.get_string("password")?;
                Ok(Some((user, hash)))
            }
            None => Ok(None),
        }
    }
}
