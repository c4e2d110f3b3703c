use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RecordId);
id_newtype!(SubjectId);
id_newtype!(VenueId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDomainError {
    #[error("unknown resource kind '{0}' (expected person, venue, preference, affiliation or category)")]
    ResourceKind(String),
    #[error("unknown algorithm '{0}' (expected hybrid/lightfm or collaborative/surprise)")]
    Algorithm(String),
}

/// Static description of one managed collection.
#[derive(Debug)]
pub struct ResourceSchema {
    pub collection_path: &'static str,
    pub display_name: &'static str,
    /// Fields that must be present and non-blank when creating a record.
    pub required_fields: &'static [&'static str],
    /// Fields matched by the list filter.
    pub searchable_fields: &'static [&'static str],
    /// Values filled in on create when the operator leaves the field empty.
    pub create_defaults: &'static [(&'static str, &'static str)],
    /// Collection loaded next to this one to populate a dropdown.
    pub reference: Option<ResourceKind>,
    /// Field holding the id of a record in `reference`.
    pub reference_field: Option<&'static str>,
    /// Field shown when a record of this kind is picked from a dropdown.
    pub label_field: &'static str,
}

static PERSON_SCHEMA: ResourceSchema = ResourceSchema {
    collection_path: "/people",
    display_name: "person",
    required_fields: &["nome", "email", "senha_hash"],
    searchable_fields: &["nome", "email"],
    create_defaults: &[("senha_hash", "hash_default")],
    reference: Some(ResourceKind::Affiliation),
    reference_field: Some("id_universidade"),
    label_field: "nome",
};

static VENUE_SCHEMA: ResourceSchema = ResourceSchema {
    collection_path: "/venues",
    display_name: "venue",
    required_fields: &["descricao", "endereco", "cidade"],
    searchable_fields: &["descricao", "cidade"],
    create_defaults: &[],
    reference: Some(ResourceKind::Category),
    reference_field: Some("id_categoria"),
    label_field: "descricao",
};

static PREFERENCE_SCHEMA: ResourceSchema = ResourceSchema {
    collection_path: "/preferences",
    display_name: "preference",
    required_fields: &["nome_preferencia", "tipo_preferencia"],
    searchable_fields: &["nome_preferencia", "tipo_preferencia"],
    create_defaults: &[],
    reference: None,
    reference_field: None,
    label_field: "nome_preferencia",
};

static AFFILIATION_SCHEMA: ResourceSchema = ResourceSchema {
    collection_path: "/affiliations",
    display_name: "affiliation",
    required_fields: &["nome", "cidade", "estado"],
    searchable_fields: &["nome", "cidade", "estado"],
    create_defaults: &[],
    reference: None,
    reference_field: None,
    label_field: "nome",
};

static CATEGORY_SCHEMA: ResourceSchema = ResourceSchema {
    collection_path: "/categories",
    display_name: "category",
    required_fields: &["nome_categoria"],
    searchable_fields: &["nome_categoria"],
    create_defaults: &[],
    reference: None,
    reference_field: None,
    label_field: "nome_categoria",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Person,
    Venue,
    Preference,
    Affiliation,
    Category,
}

impl ResourceKind {
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Person => &PERSON_SCHEMA,
            ResourceKind::Venue => &VENUE_SCHEMA,
            ResourceKind::Preference => &PREFERENCE_SCHEMA,
            ResourceKind::Affiliation => &AFFILIATION_SCHEMA,
            ResourceKind::Category => &CATEGORY_SCHEMA,
        }
    }

    pub fn collection_path(self) -> &'static str {
        self.schema().collection_path
    }

    pub fn record_path(self, id: RecordId) -> String {
        format!("{}/{}", self.collection_path(), id.0)
    }

    pub fn display_name(self) -> &'static str {
        self.schema().display_name
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseDomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "person" | "people" => Ok(ResourceKind::Person),
            "venue" | "venues" => Ok(ResourceKind::Venue),
            "preference" | "preferences" => Ok(ResourceKind::Preference),
            "affiliation" | "affiliations" => Ok(ResourceKind::Affiliation),
            "category" | "categories" => Ok(ResourceKind::Category),
            _ => Err(ParseDomainError::ResourceKind(raw.to_string())),
        }
    }
}

/// The two recommendation strategies offered by the remote service.
///
/// Serialized with the identifiers the service routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    /// Content features blended with collaborative signal.
    #[serde(rename = "lightfm", alias = "hybrid")]
    Hybrid,
    /// Interaction history only.
    #[serde(rename = "surprise", alias = "collaborative")]
    Collaborative,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Hybrid, Algorithm::Collaborative];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Hybrid => "lightfm",
            Algorithm::Collaborative => "surprise",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Hybrid => "hybrid (content + collaborative)",
            Algorithm::Collaborative => "collaborative filtering",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ParseDomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lightfm" | "hybrid" => Ok(Algorithm::Hybrid),
            "surprise" | "collaborative" | "cf" => Ok(Algorithm::Collaborative),
            _ => Err(ParseDomainError::Algorithm(raw.to_string())),
        }
    }
}
