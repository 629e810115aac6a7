use super::{Entity, EntityDescriptor, NaturalKey, SearchField, WriteContext};
use crate::backend::database::{
    ColumnKind, ColumnSpec, InsertColumn, InsertTemplate, Record, UpdateTemplate, WriteValues,
};
use crate::error::AppResult;
use crate::models::Brand;
use crate::validator;

static COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::new("id", ColumnKind::Integer),
    ColumnSpec::new("brand_name", ColumnKind::Text),
];

static SEARCH_FIELDS: [SearchField; 2] = [
    SearchField::new("id", "b.id", ColumnKind::Integer),
    SearchField::new("brandName", "b.brand_name", ColumnKind::Text).case_insensitive(),
];

static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    name: "Brand",
    base_query: "SELECT b.id, b.brand_name FROM brands b",
    order_by: "b.id",
    columns: &COLUMNS,
    key_columns: &["b.id"],
    primary_key_field: Some("id"),
    search_fields: &SEARCH_FIELDS,
    insert: InsertTemplate {
        table: "brands",
        columns: &[InsertColumn::Bound("brand_name")],
        optional: &[],
        source: None,
        returning: &["id"],
    },
    update: UpdateTemplate {
        table: "brands",
        columns: &["brand_name"],
        optional: &[],
        key_columns: &["id"],
    },
};

impl Entity for Brand {
    type Key = i64;

    fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }

    fn from_record(record: &Record) -> AppResult<Self> {
        Ok(Brand {
            id: Some(record.get_i64("id")?),
            brand_name: record.get_string("brand_name")?,
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
        if !validator::is_valid_string(&self.brand_name) {
            return Err("Brand name must not be empty".to_string());
        }
        Ok(())
    }

    fn validate_update(&self) -> Result<(), String> {
        match self.id {
            Some(id) if validator::is_valid_id(id) => self.validate_new(),
            _ => Err("A valid brand id is required".to_string()),
        }
    }

    fn natural_key(&self) -> NaturalKey<i64> {
        NaturalKey::Field("brandName", self.brand_name.clone().into())
    }

    fn insert_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        Ok(WriteValues::new(vec![self.brand_name.clone().into()], Vec::new()))
    }

    fn update_values(&self, _context: &WriteContext) -> AppResult<WriteValues> {
        Ok(WriteValues::new(vec![self.brand_name.clone().into()], Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::database::{Dialect, SqlValue};

    #[test]
    fn test_insert_statement() {
        let table = Brand::descriptor().insert.render(Dialect::Postgres);
        let statement = table
            .resolve(
                Brand::new("ScentSationals").insert_values(&WriteContext::default()).unwrap(),
                Vec::new(),
            )
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO brands (brand_name) VALUES ($1) RETURNING id"
        );
        assert_eq!(statement.args, vec![SqlValue::from("ScentSationals")]);
    }

    #[test]
    fn test_validation() {
        assert!(Brand::new("Scentsy").validate_new().is_ok());
        assert!(Brand::new("  ").validate_new().is_err());
        assert!(Brand::new("Scentsy").validate_update().is_err());

        let mut brand = Brand::new("Scentsy");
        brand.id = Some(2);
        assert!(brand.validate_update().is_ok());
    }

    #[test]
    fn test_from_record() {
        let record = Record::new().with("id", 3i64).with("brand_name", "Happy Wax");
        let brand = Brand::from_record(&record).unwrap();

        assert_eq!(brand.id, Some(3));
        assert_eq!(brand.brand_name, "Happy Wax");
    }
}
