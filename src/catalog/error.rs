use crate::catalog::model::ItemRef;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("validation failed for {entity}.{field}: {message}")]
    Validation {
        entity: &'static str,
        field: &'static str,
        message: String,
    },
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("manifest error: {0}")]
    Manifest(String),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn validation(
        entity: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        CatalogError::Validation {
            entity,
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn missing_item(item: ItemRef) -> Self {
        CatalogError::not_found(item.kind.as_str(), item.id)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}
