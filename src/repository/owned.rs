use super::{Entity, EntityDescriptor, EntityKey, NaturalKey, SearchField, WriteContext};
use crate::backend::database::{
    ColumnKind, ColumnSpec, InsertColumn, InsertTemplate, Record, SqlValue, UpdateTemplate,
    WriteValues,
};
use crate::error::AppResult;
use crate::models::{Owned, OwnedKey, WaxSummary};
use crate::validator;

static COLUMNS: [ColumnSpec; 11] = [
    ColumnSpec::new("user_id", ColumnKind::Integer),
    ColumnSpec::new("product_id", ColumnKind::Integer),
    ColumnSpec::new("quantity", ColumnKind::Integer),
    ColumnSpec::new("personal_rating", ColumnKind::Integer),
    ColumnSpec::new("product_name", ColumnKind::Text),
    ColumnSpec::new("brand_name", ColumnKind::Text),
    ColumnSpec::new("category", ColumnKind::Text),
    ColumnSpec::new("price", ColumnKind::Real),
    ColumnSpec::new("limited_edition", ColumnKind::Boolean),
    ColumnSpec::new("strength", ColumnKind::Integer),
    ColumnSpec::new("description", ColumnKind::Text),
];

static SEARCH_FIELDS: [SearchField; 2] = [
    SearchField::new("userId", "wo.user_id", ColumnKind::Integer),
    SearchField::new("waxId", "wo.product_id", ColumnKind::Integer),
];

static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Owned",
    base_query: "SELECT wo.user_id, wo.product_id, wo.quantity, wo.personal_rating, \
                 w.product_name, b.brand_name, w.category, w.price, w.limited_edition, \
                 w.strength, w.description \
                 FROM wax_owners wo \
                 INNER JOIN waxes w ON wo.product_id = w.id \
                 INNER JOIN brands b ON w.brand_id = b.id",
    order_by: "wo.user_id, wo.product_id",
    columns: &COLUMNS,
    key_columns: &["wo.user_id", "wo.product_id"],
    primary_key_field: None,
    search_fields: &SEARCH_FIELDS,
    insert: InsertTemplate {
        table: "wax_owners",
        columns: &[
            InsertColumn::Bound("user_id"),
            InsertColumn::Bound("product_id"),
            InsertColumn::Bound("quantity"),
        ],
        optional: &["personal_rating"],
        source: None,
        returning: &["user_id", "product_id"],
    },
    update: UpdateTemplate {
        table: "wax_owners",
        columns: &["quantity"],
        optional: &["personal_rating"],
        key_columns: &["user_id", "product_id"],
    },
};

impl EntityKey for OwnedKey {
    /// Accepts `userId:waxId`
    fn parse(raw: &str) -> Option<Self> {
        let (user_id, wax_id) = raw.split_once(':')?;
        Some(OwnedKey::new(
            validator::parse_id(user_id)?,
            validator::parse_id(wax_id)?,
        ))
    }

    fn is_valid(&self) -> bool {
        validator::is_valid_id(self.user_id) && validator::is_valid_id(self.wax_id)
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Integer(self.user_id), SqlValue::Integer(self.wax_id)]
    }
}

impl Owned {
    fn validate_amounts(&self) -> Result<(), String> {
        if !self.key().is_valid() {
            return Err("Valid user and wax ids are required".to_string());
        }
        if self.quantity < 0 {
            return Err("Quantity must not be negative".to_string());
        }
        match self.personal_rating {
            Some(rating) if rating < 0 => Err("Personal rating must not be negative".to_string()),
            _ => Ok(()),
        }
    }

    fn rating_value(&self) -> Vec<Option<SqlValue>> {
        vec![self.personal_rating.map(SqlValue::Integer)]
    }
}

impl Entity for Owned {
    type Key = OwnedKey;

    fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }

    fn generates_key() -> bool {
        false
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        Ok(Owned {
            user_id: record.get_i64("user_id")?,
            wax_id: record.get_i64("product_id")?,
            quantity: record.get_i64("quantity")?,
            personal_rating: record.get_opt_i64("personal_rating")?,
            product: Some(WaxSummary {
                product_name: record.get_string("product_name")?,
                brand: record.get_string("brand_name")?,
                scent_category: record.get_string("category")?,
                price: record.get_f64("price")?,
                limited_edition: record.get_bool("limited_edition")?,
                scent_strength: record.get_opt_i64("strength")?,
                scent_description: record.get_opt_string("description")?,
            }),
        })
    }

    fn key(&self) -> Option<OwnedKey> {
        Some(Owned::key(self))
    }

    fn set_key_from_record(&mut self, record: &Record) -> AppResult<()> {
        self.user_id = record.get_i64("user_id")?;
        self.wax_id = record.get_i64("product_id")?;
        Ok(())
    }

    fn validate_new(&self) -> Result<(), String> {
        self.validate_amounts()
    }

    fn validate_update(&self) -> Result<(), String> {
        self.validate_amounts()
    }

    fn natural_key(&self) -> NaturalKey<OwnedKey> {
        NaturalKey::Key(Owned::key(self))
    }

    fn insert_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        let required = vec![
            SqlValue::Integer(self.user_id),
            SqlValue::Integer(self.wax_id),
            SqlValue::Integer(self.quantity),
        ];
        Ok(WriteValues::new(required, self.rating_value()))
    }

    fn update_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        Ok(WriteValues::new(
            vec![SqlValue::Integer(self.quantity)],
            self.rating_value(),
        ))
    }
}
