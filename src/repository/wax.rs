use super::{Entity, EntityDescriptor, NaturalKey, SearchField, WriteContext};
use crate::backend::database::{
    ColumnKind, ColumnSpec, InsertColumn, InsertTemplate, Record, SqlValue, UpdateTemplate,
    WriteValues,
};
use crate::error::AppResult;
use crate::models::Wax;
use crate::validator;

static COLUMNS: [ColumnSpec; 8] = [
    ColumnSpec::new("id", ColumnKind::Integer),
    ColumnSpec::new("product_name", ColumnKind::Text),
    ColumnSpec::new("brand_name", ColumnKind::Text),
    ColumnSpec::new("price", ColumnKind::Real),
    ColumnSpec::new("limited_edition", ColumnKind::Boolean),
    ColumnSpec::new("category", ColumnKind::Text),
    ColumnSpec::new("strength", ColumnKind::Integer),
    ColumnSpec::new("description", ColumnKind::Text),
];

static SEARCH_FIELDS: [SearchField; 2] = [
    SearchField::new("id", "w.id", ColumnKind::Integer),
    SearchField::new("productName", "w.product_name", ColumnKind::Text).case_insensitive(),
];

/// Strength and description are independently optional, in this bit order
static OPTIONAL: [&str; 2] = ["strength", "description"];

static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Wax",
    base_query: "SELECT w.id, w.product_name, b.brand_name, w.price, w.limited_edition, \
                 w.category, w.strength, w.description \
                 FROM waxes w INNER JOIN brands b ON w.brand_id = b.id",
    order_by: "w.id",
    columns: &COLUMNS,
    key_columns: &["w.id"],
    primary_key_field: Some("id"),
    search_fields: &SEARCH_FIELDS,
    insert: InsertTemplate {
        table: "waxes",
        columns: &[
            InsertColumn::Bound("product_name"),
            InsertColumn::Derived("brand_id", "b.id"),
            InsertColumn::Bound("price"),
            InsertColumn::Bound("limited_edition"),
            InsertColumn::Bound("category"),
        ],
        optional: &OPTIONAL,
        source: Some("FROM brands b WHERE LOWER(b.brand_name) = LOWER({})"),
        returning: &["id"],
    },
    update: UpdateTemplate {
        table: "waxes",
        columns: &[],
        optional: &OPTIONAL,
        key_columns: &["id"],
    },
};

impl Wax {
    fn optional_values(&self) -> Vec<Option<SqlValue>> {
        vec![
            self.scent_strength.map(SqlValue::Integer),
            self.scent_description.clone().map(SqlValue::Text),
        ]
    }

    fn validate_scent(&self) -> Result<(), String> {
        match self.scent_strength {
            Some(strength) if strength < 0 => {
                Err("Scent strength must not be negative".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl Entity for Wax {
    type Key = i64;

    fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        Ok(Wax {
            id: Some(record.get_i64("id")?),
            product_name: record.get_string("product_name")?,
            brand: record.get_string("brand_name")?,
            price: record.get_f64("price")?,
            limited_edition: record.get_bool("limited_edition")?,
            scent_category: record.get_string("category")?,
            scent_strength: record.get_opt_i64("strength")?,
            scent_description: record.get_opt_string("description")?,
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
        if !validator::is_valid_strings(&[
            self.product_name.as_str(),
            self.brand.as_str(),
            self.scent_category.as_str(),
        ]) {
            return Err("Product name, brand and scent category are required".to_string());
        }
        if !validator::is_non_negative(self.price) {
            return Err("Price must be a non-negative number".to_string());
        }
        self.validate_scent()
    }

    /// Only the scent fields are updatable, and at least one must be supplied
    fn validate_update(&self) -> Result<(), String> {
        match self.id {
            Some(id) if validator::is_valid_id(id) => {}
            _ => return Err("A valid wax id is required".to_string()),
        }
        if self.scent_strength.is_none() && self.scent_description.is_none() {
            return Err("Nothing to update: supply a scent strength or description".to_string());
        }
        self.validate_scent()
    }

    fn natural_key(&self) -> NaturalKey<i64> {
        NaturalKey::Field("productName", self.product_name.clone().into())
    }

    fn insert_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        let required: Vec<SqlValue> = vec![
            self.product_name.clone().into(),
            self.price.into(),
            self.limited_edition.into(),
            self.scent_category.clone().into(),
        ];

        Ok(WriteValues::new(required, self.optional_values())
            .with_source(vec![self.brand.clone().into()]))
    }

    fn update_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        Ok(WriteValues::new(Vec::new(), self.optional_values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::database::Dialect;

    fn lemon_basil() -> Wax {
        Wax::new("Lemon Basil", "ScentSationals", 1.5, false, "Citrus")
    }

    #[test]
    fn test_insert_variant_with_strength_only() {
        let table = Wax::descriptor().insert.render(Dialect::Sqlite);
        let wax = lemon_basil().with_strength(0);
        let statement = table
            .resolve(wax.insert_values(&WriteContext::default()).unwrap(), Vec::new())
            .unwrap();

        assert_eq!(statement.variant, 0b01);
        assert_eq!(
            statement.sql,
            "INSERT INTO waxes (product_name, brand_id, price, limited_edition, category, strength) \
             SELECT ?1, b.id, ?2, ?3, ?4, ?5 FROM brands b \
             WHERE LOWER(b.brand_name) = LOWER(?6) RETURNING id"
        );
        assert_eq!(
            statement.args,
            vec![
                SqlValue::from("Lemon Basil"),
                SqlValue::Real(1.5),
                SqlValue::Boolean(false),
                SqlValue::from("Citrus"),
                SqlValue::Integer(0),
                SqlValue::from("ScentSationals"),
            ]
        );
    }

    #[test]
    fn test_update_binds_only_present_fields() {
        let table = Wax::descriptor().update.render(Dialect::Postgres);
        let mut wax = Wax::scent_update(9);
        wax.scent_strength = Some(5);

        let statement = table
            .resolve(
                wax.update_values(&WriteContext::default()).unwrap(),
                vec![SqlValue::Integer(9)],
            )
            .unwrap();

        assert_eq!(statement.sql, "UPDATE waxes SET strength = $1 WHERE id = $2");
        assert_eq!(statement.args, vec![SqlValue::Integer(5), SqlValue::Integer(9)]);
        assert!(!statement.sql.contains("description"));
    }

    #[test]
    fn test_validation() {
        assert!(lemon_basil().validate_new().is_ok());

        let mut wax = lemon_basil();
        wax.price = -1.0;
        assert!(wax.validate_new().is_err());

        let wax = Wax::scent_update(4);
        assert!(wax.validate_update().is_err());

        let mut wax = Wax::scent_update(4);
        wax.scent_description = Some(String::new());
        assert!(wax.validate_update().is_ok());

        let mut wax = Wax::scent_update(0);
        wax.scent_strength = Some(3);
        assert!(wax.validate_update().is_err());
    }

    #[test]
    fn test_from_record_with_nulls() {
        let record = Record::new()
            .with("id", 1i64)
            .with("product_name", "Lemon Basil")
            .with("brand_name", "ScentSationals")
            .with("price", 1.5f64)
            .with("limited_edition", true)
            .with("category", "Citrus")
            .with_null("strength")
            .with_null("description");

        let wax = Wax::from_record(&record).unwrap();
        assert_eq!(wax.id, Some(1));
        assert_eq!(wax.brand, "ScentSationals");
        assert!(wax.limited_edition);
        assert_eq!(wax.scent_strength, None);
    }
}
