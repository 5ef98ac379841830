use std::fmt;
use std::sync::Arc;

use super::BranchError;
use crate::entity::{Entity, FieldDescriptor};
use crate::key::{KeySegment, PLACEHOLDER};

/// One grouping segment of a branch key.
pub(crate) enum Group<T> {
    /// Group by the entity id. Yields data segments, so the branch key is the
    /// primary record key.
    Id,
    /// Group by a property value.
    Property(FieldDescriptor<T>),
    /// Group by the text a function returns.
    Function {
        name: String,
        group: Arc<dyn Fn(&T) -> String + Send + Sync>,
    },
}

impl<T: Entity> Group<T> {
    pub(crate) fn property(property: &str) -> Result<Self, BranchError> {
        let field = T::field(property).ok_or_else(|| BranchError::UnknownProperty {
            entity: T::NAME,
            property: property.to_string(),
        })?;
        if field.name == T::ID_FIELD {
            return Ok(Group::Id);
        }
        if !field.value_type.is_scalar() {
            return Err(BranchError::UngroupableProperty {
                property: property.to_string(),
                type_name: field.type_name,
                value_type: field.value_type,
            });
        }
        Ok(Group::Property(field))
    }

    pub(crate) fn function(
        name: impl Into<String>,
        group: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Group::Function {
            name: name.into(),
            group: Arc::new(group),
        }
    }

    /// Segment for a known value, or the placeholder segment for `None`.
    pub(crate) fn segment(&self, value: Option<&str>) -> KeySegment {
        let value = value.unwrap_or(PLACEHOLDER).to_string();
        match self {
            Group::Id => KeySegment::Data { id: value },
            Group::Property(field) => KeySegment::group(field.name, value),
            Group::Function { name, .. } => KeySegment::group(name.as_str(), value),
        }
    }

    pub(crate) fn value_of(&self, entity: &T) -> Result<String, BranchError> {
        match self {
            Group::Id => Ok(entity.id().to_string()),
            Group::Property(field) => Ok(field.read(entity)?.key_text()),
            Group::Function { group, .. } => Ok(group(entity)),
        }
    }
}

impl<T> Clone for Group<T> {
    fn clone(&self) -> Self {
        match self {
            Group::Id => Group::Id,
            Group::Property(field) => Group::Property(*field),
            Group::Function { name, group } => Group::Function {
                name: name.clone(),
                group: Arc::clone(group),
            },
        }
    }
}

impl<T> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Id => f.write_str("Id"),
            Group::Property(field) => f.debug_tuple("Property").field(&field.name).finish(),
            Group::Function { name, .. } => f.debug_tuple("Function").field(name).finish(),
        }
    }
}
