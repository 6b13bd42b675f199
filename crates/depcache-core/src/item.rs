//! Structured item data walked by the traversal
//!
//! An item is a small property graph: a hierarchy of objects carrying
//! components, each component holding typed fields. Fields may reference
//! other items by handle, or point at an embedded sub-object of the same
//! item (which is how self-referencing structures appear).

use serde::{Deserialize, Serialize};

/// Role of an item with respect to variant relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum VariantRole {
    /// Plain item
    #[default]
    None,
    /// Base item, optionally produced from another source item
    Root {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Variant that overrides the item referenced by `base`
    VariantOf { base: String },
}

/// Leaf or container value of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Handle of another item; `None` for an unassigned reference
    Reference(Option<String>),
    Struct(Vec<Field>),
    Array(Vec<FieldValue>),
    /// Index into the owning item's `embedded` table
    Embedded(usize),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::Integer(_) => FieldKind::Integer,
            Self::Float(_) => FieldKind::Float,
            Self::String(_) => FieldKind::String,
            Self::Reference(_) => FieldKind::ObjectReference,
            Self::Struct(_) => FieldKind::Generic,
            Self::Array(_) => FieldKind::Array,
            Self::Embedded(_) => FieldKind::ManagedReference,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Reference(handle) => handle.as_deref(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Structural category of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Integer,
    Float,
    String,
    ObjectReference,
    Generic,
    Array,
    ManagedReference,
}

/// Named field of a component or struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn reference(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self::new(name, FieldValue::Reference(Some(handle.into())))
    }
}

/// Typed bag of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Component {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

/// Node of an item's object hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemObject {
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub children: Vec<ItemObject>,
}

impl ItemObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_child(mut self, child: ItemObject) -> Self {
        self.children.push(child);
        self
    }
}

/// Structured data of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredItem {
    /// May be left out when the source derives ids from item locations
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub variant: VariantRole,

    /// Components attached to the item itself
    #[serde(default)]
    pub components: Vec<Component>,

    /// Object hierarchy roots
    #[serde(default)]
    pub objects: Vec<ItemObject>,

    /// Sub-objects addressed by `FieldValue::Embedded`
    #[serde(default)]
    pub embedded: Vec<Component>,
}

impl StructuredItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variant: VariantRole::None,
            components: Vec::new(),
            objects: Vec::new(),
            embedded: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: VariantRole) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_object(mut self, object: ItemObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_embedded(mut self, component: Component) -> Self {
        self.embedded.push(component);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kinds() {
        assert_eq!(FieldValue::Reference(None).kind(), FieldKind::ObjectReference);
        assert_eq!(FieldValue::Embedded(0).kind(), FieldKind::ManagedReference);
        assert_eq!(FieldValue::Array(Vec::new()).kind(), FieldKind::Array);
    }

    #[test]
    fn test_item_json_shape() {
        let json = r#"{
            "id": "a1",
            "variant": { "role": "variant_of", "base": "Assets/Base.prefab" },
            "objects": [{
                "name": "Player",
                "components": [{
                    "type_name": "Renderer",
                    "fields": [
                        { "name": "m_Material", "value": { "kind": "reference", "value": "Assets/Mat.mat" } },
                        { "name": "m_Enabled", "value": { "kind": "bool", "value": true } }
                    ]
                }]
            }]
        }"#;

        let item: StructuredItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "a1");
        assert_eq!(
            item.variant,
            VariantRole::VariantOf {
                base: "Assets/Base.prefab".to_string()
            }
        );
        let field = &item.objects[0].components[0].fields[0];
        assert_eq!(field.value.as_reference(), Some("Assets/Mat.mat"));
        assert!(item.embedded.is_empty());
    }
}
