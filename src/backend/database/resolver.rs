//! Field-presence resolution for insert and update statements.
//!
//! An entity with `N` independently optional attributes has `2^N` write
//! variants. Each variant is a fixed statement text stored in a
//! [`StatementTable`] under its presence bitmask: bit `i` is set when the
//! `i`-th declared optional attribute is present. Presence means "not `None`";
//! `0`, `""` and `false` are ordinary values.

use super::value::{Dialect, SqlValue};
use crate::error::{AppError, AppResult};

/// Values an entity supplies for one write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteValues {
    /// Always bound, in template column order
    pub required: Vec<SqlValue>,
    /// One slot per declared optional attribute
    pub optional: Vec<Option<SqlValue>>,
    /// Bound into the template's source clause, after the optional values
    pub source: Vec<SqlValue>,
}

impl WriteValues {
    pub fn new(required: Vec<SqlValue>, optional: Vec<Option<SqlValue>>) -> Self {
        Self {
            required,
            optional,
            source: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Vec<SqlValue>) -> Self {
        self.source = source;
        self
    }

    /// True when there is nothing to write at all
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.iter().all(Option::is_none)
    }
}

/// The statement picked for a write together with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStatement<'a> {
    /// Presence bitmask identifying the variant
    pub variant: u32,
    pub sql: &'a str,
    pub args: Vec<SqlValue>,
}

/// Statement texts indexed by presence bitmask
#[derive(Debug, Clone)]
pub struct StatementTable {
    optional_fields: Vec<&'static str>,
    variants: Vec<Option<String>>,
}

impl StatementTable {
    /// Create an empty table for the given optional attributes
    pub fn new(optional_fields: &[&'static str]) -> Self {
        Self {
            optional_fields: optional_fields.to_vec(),
            variants: vec![None; 1usize << optional_fields.len()],
        }
    }

    pub fn with_variant(mut self, mask: u32, sql: impl Into<String>) -> Self {
        if let Some(slot) = self.variants.get_mut(mask as usize) {
            *slot = Some(sql.into());
        }
        self
    }

    pub fn optional_fields(&self) -> &[&'static str] {
        &self.optional_fields
    }

    pub fn variant(&self, mask: u32) -> Option<&str> {
        self.variants.get(mask as usize).and_then(|sql| sql.as_deref())
    }

    pub fn presence_mask(optional: &[Option<SqlValue>]) -> u32 {
        optional
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_some())
            .fold(0, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Select the variant matching the present optional values and build its
    /// argument list: required, present optionals, source, then `trailing`.
    pub fn resolve(
        &self,
        values: WriteValues,
        trailing: Vec<SqlValue>,
    ) -> AppResult<ResolvedStatement<'_>> {
        if values.optional.len() != self.optional_fields.len() {
            return Err(AppError::InternalConfiguration(format!(
                "Expected {} optional values ({}), got {}",
                self.optional_fields.len(),
                self.optional_fields.join(", "),
                values.optional.len()
            )));
        }

        let mask = Self::presence_mask(&values.optional);
        let sql = self.variant(mask).ok_or_else(|| {
            AppError::InternalConfiguration(format!(
                "No statement variant for present fields [{}]",
                self.present_fields(mask).join(", ")
            ))
        })?;

        let mut args = values.required;
        args.extend(values.optional.into_iter().flatten());
        args.extend(values.source);
        args.extend(trailing);

        Ok(ResolvedStatement {
            variant: mask,
            sql,
            args,
        })
    }

    fn present_fields(&self, mask: u32) -> Vec<&'static str> {
        self.optional_fields
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, field)| *field)
            .collect()
    }
}

/// A column written by an insert
#[derive(Debug, Clone, Copy)]
pub enum InsertColumn {
    /// Bound from a required value
    Bound(&'static str),
    /// Filled from an expression over the template's source clause
    Derived(&'static str, &'static str),
}

/// Declarative insert: one rendered variant per optional-field subset
#[derive(Debug, Clone, Copy)]
pub struct InsertTemplate {
    pub table: &'static str,
    pub columns: &'static [InsertColumn],
    pub optional: &'static [&'static str],
    /// `FROM ... WHERE ...` clause for insert-from-select; each `{}` takes the next placeholder
    pub source: Option<&'static str>,
    pub returning: &'static [&'static str],
}

impl InsertTemplate {
    pub fn render(&self, dialect: Dialect) -> StatementTable {
        let mut table = StatementTable::new(self.optional);
        for mask in 0..(1u32 << self.optional.len()) {
            table = table.with_variant(mask, self.render_variant(dialect, mask));
        }
        table
    }

    fn render_variant(&self, dialect: Dialect, mask: u32) -> String {
        let mut next = 1;
        let mut columns = Vec::new();
        let mut exprs = Vec::new();

        for column in self.columns {
            match column {
                InsertColumn::Bound(name) => {
                    columns.push(*name);
                    exprs.push(dialect.placeholder(next));
                    next += 1;
                }
                InsertColumn::Derived(name, expr) => {
                    columns.push(*name);
                    exprs.push((*expr).to_string());
                }
            }
        }

        for (bit, name) in self.optional.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                columns.push(*name);
                exprs.push(dialect.placeholder(next));
                next += 1;
            }
        }

        let body = match self.source {
            Some(source) => format!(
                "SELECT {} {}",
                exprs.join(", "),
                fill_placeholders(source, dialect, &mut next)
            ),
            None => format!("VALUES ({})", exprs.join(", ")),
        };

        format!(
            "INSERT INTO {} ({}) {} RETURNING {}",
            self.table,
            columns.join(", "),
            body,
            self.returning.join(", ")
        )
    }
}

/// Declarative update keyed by primary or composite key
#[derive(Debug, Clone, Copy)]
pub struct UpdateTemplate {
    pub table: &'static str,
    /// Always written
    pub columns: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub key_columns: &'static [&'static str],
}

impl UpdateTemplate {
    /// Subsets that leave the SET list empty get no variant
    pub fn render(&self, dialect: Dialect) -> StatementTable {
        let mut table = StatementTable::new(self.optional);
        for mask in 0..(1u32 << self.optional.len()) {
            if let Some(sql) = self.render_variant(dialect, mask) {
                table = table.with_variant(mask, sql);
            }
        }
        table
    }

    fn render_variant(&self, dialect: Dialect, mask: u32) -> Option<String> {
        let mut next = 1;
        let mut assignments = Vec::new();

        let present = self
            .optional
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, name)| name);

        for name in self.columns.iter().chain(present) {
            assignments.push(format!("{} = {}", name, dialect.placeholder(next)));
            next += 1;
        }

        if assignments.is_empty() {
            return None;
        }

        let conditions: Vec<String> = self
            .key_columns
            .iter()
            .map(|key| {
                let condition = format!("{} = {}", key, dialect.placeholder(next));
                next += 1;
                condition
            })
            .collect();

        Some(format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            conditions.join(" AND ")
        ))
    }
}

/// Replace each `{}` in `clause` with the next positional placeholder
fn fill_placeholders(clause: &str, dialect: Dialect, next: &mut usize) -> String {
    let mut parts = clause.split("{}");
    let mut filled = parts.next().unwrap_or_default().to_string();
    for part in parts {
        filled.push_str(&dialect.placeholder(*next));
        *next += 1;
        filled.push_str(part);
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAX_INSERT: InsertTemplate = InsertTemplate {
        table: "waxes",
        columns: &[
            InsertColumn::Bound("product_name"),
            InsertColumn::Derived("brand_id", "b.id"),
            InsertColumn::Bound("price"),
        ],
        optional: &["strength", "description"],
        source: Some("FROM brands b WHERE b.brand_name = {}"),
        returning: &["id"],
    };

    const WAX_UPDATE: UpdateTemplate = UpdateTemplate {
        table: "waxes",
        columns: &[],
        optional: &["strength", "description"],
        key_columns: &["id"],
    };

    #[test]
    fn test_presence_treats_falsy_values_as_present() {
        let optional = vec![
            Some(SqlValue::Integer(0)),
            Some(SqlValue::Text(String::new())),
            Some(SqlValue::Boolean(false)),
            None,
        ];
        assert_eq!(StatementTable::presence_mask(&optional), 0b0111);
    }

    #[test]
    fn test_update_with_strength_only_binds_strength() {
        let table = WAX_UPDATE.render(Dialect::Postgres);
        let values = WriteValues::new(vec![], vec![Some(SqlValue::Integer(5)), None]);

        let resolved = table.resolve(values, vec![SqlValue::Integer(9)]).unwrap();

        assert_eq!(resolved.variant, 0b01);
        assert_eq!(resolved.sql, "UPDATE waxes SET strength = $1 WHERE id = $2");
        assert!(!resolved.sql.contains("description"));
        assert_eq!(
            resolved.args,
            vec![SqlValue::Integer(5), SqlValue::Integer(9)]
        );
    }

    #[test]
    fn test_zero_strength_is_present() {
        let table = WAX_UPDATE.render(Dialect::Sqlite);
        let values = WriteValues::new(
            vec![],
            vec![Some(SqlValue::Integer(0)), Some(SqlValue::Text("x".to_string()))],
        );

        let resolved = table.resolve(values, vec![SqlValue::Integer(3)]).unwrap();

        assert_eq!(resolved.variant, 0b11);
        assert_eq!(
            resolved.sql,
            "UPDATE waxes SET strength = ?1, description = ?2 WHERE id = ?3"
        );
        assert_eq!(resolved.args[0], SqlValue::Integer(0));
    }

    #[test]
    fn test_update_without_fields_has_no_variant() {
        let table = WAX_UPDATE.render(Dialect::Sqlite);
        let values = WriteValues::new(vec![], vec![None, None]);
        assert!(values.is_empty());

        let err = table.resolve(values, vec![SqlValue::Integer(3)]).unwrap_err();
        assert!(matches!(err, AppError::InternalConfiguration(_)));
    }

    #[test]
    fn test_insert_variants_cover_every_subset() {
        let table = WAX_INSERT.render(Dialect::Postgres);

        assert_eq!(
            table.variant(0b00).unwrap(),
            "INSERT INTO waxes (product_name, brand_id, price) SELECT $1, b.id, $2 FROM brands b WHERE b.brand_name = $3 RETURNING id"
        );
        assert_eq!(
            table.variant(0b10).unwrap(),
            "INSERT INTO waxes (product_name, brand_id, price, description) SELECT $1, b.id, $2, $3 FROM brands b WHERE b.brand_name = $4 RETURNING id"
        );
        assert_eq!(
            table.variant(0b11).unwrap(),
            "INSERT INTO waxes (product_name, brand_id, price, strength, description) SELECT $1, b.id, $2, $3, $4 FROM brands b WHERE b.brand_name = $5 RETURNING id"
        );
        assert!(table.variant(0b01).is_some());
    }

    #[test]
    fn test_insert_argument_order() {
        let table = WAX_INSERT.render(Dialect::Sqlite);
        let values = WriteValues::new(
            vec![SqlValue::from("Lemon Basil"), SqlValue::Real(4.5)],
            vec![None, Some(SqlValue::from("citrus"))],
        )
        .with_source(vec![SqlValue::from("ScentSationals")]);

        let resolved = table.resolve(values, vec![]).unwrap();

        assert_eq!(resolved.variant, 0b10);
        assert_eq!(
            resolved.args,
            vec![
                SqlValue::from("Lemon Basil"),
                SqlValue::Real(4.5),
                SqlValue::from("citrus"),
                SqlValue::from("ScentSationals"),
            ]
        );
    }

    #[test]
    fn test_plain_insert_uses_values_clause() {
        let template = InsertTemplate {
            table: "brands",
            columns: &[InsertColumn::Bound("brand_name")],
            optional: &[],
            source: None,
            returning: &["id"],
        };

        let table = template.render(Dialect::Sqlite);
        assert_eq!(
            table.variant(0).unwrap(),
            "INSERT INTO brands (brand_name) VALUES (?1) RETURNING id"
        );
    }

    #[test]
    fn test_composite_key_update() {
        let template = UpdateTemplate {
            table: "wax_owners",
            columns: &["quantity"],
            optional: &["personal_rating"],
            key_columns: &["user_id", "product_id"],
        };

        let table = template.render(Dialect::Postgres);
        assert_eq!(
            table.variant(0).unwrap(),
            "UPDATE wax_owners SET quantity = $1 WHERE user_id = $2 AND product_id = $3"
        );
        assert_eq!(
            table.variant(1).unwrap(),
            "UPDATE wax_owners SET quantity = $1, personal_rating = $2 WHERE user_id = $3 AND product_id = $4"
        );
    }

    #[test]
    fn test_missing_variant_is_configuration_error() {
        let table = StatementTable::new(&["strength", "description"])
            .with_variant(0b00, "INSERT ...")
            .with_variant(0b11, "INSERT ...");

        let values = WriteValues::new(vec![], vec![Some(SqlValue::Integer(2)), None]);
        let err = table.resolve(values, vec![]).unwrap_err();

        match err {
            AppError::InternalConfiguration(message) => assert!(message.contains("strength")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_optional_count_mismatch_is_configuration_error() {
        let table = WAX_UPDATE.render(Dialect::Sqlite);
        let values = WriteValues::new(vec![], vec![Some(SqlValue::Integer(2))]);

        assert!(matches!(
            table.resolve(values, vec![]),
            Err(AppError::InternalConfiguration(_))
        ));
    }
}
