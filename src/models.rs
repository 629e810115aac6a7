use serde::{Deserialize, Serialize};
use std::fmt;

/// Role that may mutate the catalog
pub const ADMIN_ROLE: &str = "Admin";

/// A catalog user. The password is accepted on input and never serialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: Some(password.into()),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: role.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub brand_name: String,
}

impl Brand {
    pub fn new(brand_name: impl Into<String>) -> Self {
        Self {
            id: None,
            brand_name: brand_name.into(),
        }
    }
}

/// A wax product. The brand is referenced by name on input and resolved to
/// its id by the insert statement.
///
/// Updates only carry `id` plus the scent fields, so the remaining fields
/// default when absent from the input document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wax {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub limited_edition: bool,
    #[serde(default)]
    pub scent_category: String,
    #[serde(default)]
    pub scent_strength: Option<i64>,
    #[serde(default)]
    pub scent_description: Option<String>,
}

impl Wax {
    pub fn new(
        product_name: impl Into<String>,
        brand: impl Into<String>,
        price: f64,
        limited_edition: bool,
        scent_category: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            product_name: product_name.into(),
            brand: brand.into(),
            price,
            limited_edition,
            scent_category: scent_category.into(),
            scent_strength: None,
            scent_description: None,
        }
    }

    /// Update document for `id` with no scent field set yet
    pub fn scent_update(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::new("", "", 0.0, false, "")
        }
    }

    pub fn with_strength(mut self, strength: i64) -> Self {
        self.scent_strength = Some(strength);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.scent_description = Some(description.into());
        self
    }
}

/// Display fields of the owned wax, filled in on reads
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaxSummary {
    pub product_name: String,
    pub brand: String,
    pub scent_category: String,
    pub price: f64,
    pub limited_edition: bool,
    pub scent_strength: Option<i64>,
    pub scent_description: Option<String>,
}

/// A user's holding of one wax
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Owned {
    pub user_id: i64,
    pub wax_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub personal_rating: Option<i64>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub product: Option<WaxSummary>,
}

impl Owned {
    pub fn new(user_id: i64, wax_id: i64, quantity: i64) -> Self {
        Self {
            user_id,
            wax_id,
            quantity,
            personal_rating: None,
            product: None,
        }
    }

    pub fn with_rating(mut self, rating: i64) -> Self {
        self.personal_rating = Some(rating);
        self
    }

    pub fn key(&self) -> OwnedKey {
        OwnedKey::new(self.user_id, self.wax_id)
    }
}

/// Composite identity of an [`Owned`] record, written `userId:waxId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnedKey {
    pub user_id: i64,
    pub wax_id: i64,
}

impl OwnedKey {
    pub fn new(user_id: i64, wax_id: i64) -> Self {
        Self { user_id, wax_id }
    }
}

impl fmt::Display for OwnedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.wax_id)
    }
}
