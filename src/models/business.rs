//! Model businesses
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use diesel::sql_types::VarChar;
use validator::Validate;

use models::validation_rules::*;
use models::BusinessId;

use schema::businesses;

/// DB representation of a local business
#[derive(Debug, Serialize, Deserialize, Queryable, Clone, Identifiable)]
#[table_name = "businesses"]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub category: BusinessCategory,
    pub email: String,
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Payload for creating a business
#[derive(Serialize, Deserialize, Insertable, Clone, Validate, Debug)]
#[table_name = "businesses"]
pub struct NewBusiness {
    #[validate(length(min = "1", message = "Name must not be empty"))]
    pub name: String,
    pub category: BusinessCategory,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    #[validate(range(min = "-90", max = "90"))]
    pub latitude: f64,
    #[validate(range(min = "-180", max = "180"))]
    pub longitude: f64,
}

/// Payload for updating a business
#[derive(Serialize, Deserialize, Insertable, AsChangeset, Validate, Debug)]
#[table_name = "businesses"]
pub struct UpdateBusiness {
    #[validate(length(min = "1", message = "Name must not be empty"))]
    pub name: Option<String>,
    pub category: Option<BusinessCategory>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
#[serde(rename_all = "lowercase")]
pub enum BusinessCategory {
    Restaurant,
    Retail,
    Service,
    Entertainment,
    Health,
    Beauty,
    Automotive,
    Other,
}

diesel_text_enum!(BusinessCategory);

impl fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BusinessCategory::Restaurant => write!(f, "restaurant"),
            BusinessCategory::Retail => write!(f, "retail"),
            BusinessCategory::Service => write!(f, "service"),
            BusinessCategory::Entertainment => write!(f, "entertainment"),
            BusinessCategory::Health => write!(f, "health"),
            BusinessCategory::Beauty => write!(f, "beauty"),
            BusinessCategory::Automotive => write!(f, "automotive"),
            BusinessCategory::Other => write!(f, "other"),
        }
    }
}

impl FromStr for BusinessCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restaurant" => Ok(BusinessCategory::Restaurant),
            "retail" => Ok(BusinessCategory::Retail),
            "service" => Ok(BusinessCategory::Service),
            "entertainment" => Ok(BusinessCategory::Entertainment),
            "health" => Ok(BusinessCategory::Health),
            "beauty" => Ok(BusinessCategory::Beauty),
            "automotive" => Ok(BusinessCategory::Automotive),
            "other" => Ok(BusinessCategory::Other),
            _ => Err(()),
        }
    }
}
