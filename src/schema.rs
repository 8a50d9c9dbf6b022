//! Content-type schema model
//!
//! A [`ContentType`] is an administrator-defined, versioned description of a
//! content shape: an ordered set of [`FieldDefinition`]s plus storage
//! metadata. Editing a type (adding, removing or retyping a field) bumps its
//! version; the generated storage class must then be re-compiled before any
//! instance of the type is read or written (see [`crate::compiler`]).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Subtype of a plain scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
	/// Free text
	Text,
	/// Signed integer
	Integer,
	/// Boolean flag
	Boolean,
	/// Calendar date
	Date,
}

/// Kind tag of a field definition
///
/// Name+kind pairs are the stable identifiers used for transtyping
/// field-matching; two fields match only when both are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
	/// Plain persisted column
	Scalar(ScalarKind),
	/// Single reference to another entity
	ManyToOne,
	/// Ordered collection of references
	ManyToMany,
	/// Ordered collection mediated by an intermediate join record
	ManyToManyProxy,
	/// Documents attached to a variant, resolved on demand
	Documents,
	/// Other content nodes related to a node, resolved on demand
	RelatedNodes,
	/// External form submissions attached to a node, resolved on demand
	ExternalForms,
	/// Opaque structured text (YAML), parsed on demand
	Structured,
}

impl FieldKind {
	/// Stable tag used as the generator-registry dispatch key
	pub fn tag(&self) -> &'static str {
		match self {
			FieldKind::Scalar(_) => "scalar",
			FieldKind::ManyToOne => "many_to_one",
			FieldKind::ManyToMany => "many_to_many",
			FieldKind::ManyToManyProxy => "many_to_many_proxy",
			FieldKind::Documents => "documents",
			FieldKind::RelatedNodes => "related_nodes",
			FieldKind::ExternalForms => "external_forms",
			FieldKind::Structured => "structured",
		}
	}

	/// Whether the kind is a relation (configured with a target class)
	pub fn is_relation(&self) -> bool {
		matches!(
			self,
			FieldKind::ManyToOne | FieldKind::ManyToMany | FieldKind::ManyToManyProxy
		)
	}

	/// Whether the kind is backed by a lazily resolved association rather
	/// than a persisted column
	pub fn is_lookup_collection(&self) -> bool {
		matches!(
			self,
			FieldKind::Documents | FieldKind::RelatedNodes | FieldKind::ExternalForms
		)
	}
}

/// One named, typed field belonging to a content type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
	/// Field name, unique per content type
	pub name: String,
	/// Kind tag
	pub kind: FieldKind,
	/// Value must be identical across all language variants of a node
	pub universal: bool,
	/// Not a plain persisted column (relation or computed)
	pub is_virtual: bool,
	/// Whether an index clause is emitted for this field
	pub indexed: bool,
	/// Kind-specific raw configuration (e.g. target class for relations)
	pub config: Option<JsonValue>,
	/// Admin-facing label
	pub label: Option<String>,
	/// Admin-facing description
	pub description: Option<String>,
	/// Admin-facing placeholder
	pub placeholder: Option<String>,
	/// Ordering position within the type
	pub position: u32,
}

impl FieldDefinition {
	/// Creates a field definition with flags derived from the kind
	pub fn new(name: impl Into<String>, kind: FieldKind, position: u32) -> Self {
		Self {
			name: name.into(),
			kind,
			universal: false,
			is_virtual: kind.is_relation() || kind.is_lookup_collection(),
			indexed: false,
			config: None,
			label: None,
			description: None,
			placeholder: None,
			position,
		}
	}

	/// Marks the field universal
	#[must_use]
	pub fn universal(mut self, universal: bool) -> Self {
		self.universal = universal;
		self
	}

	/// Marks the field indexed
	#[must_use]
	pub fn indexed(mut self, indexed: bool) -> Self {
		self.indexed = indexed;
		self
	}

	/// Sets the raw configuration blob
	#[must_use]
	pub fn config(mut self, config: JsonValue) -> Self {
		self.config = Some(config);
		self
	}

	/// Reads a required string key from the configuration blob
	///
	/// Fails with a descriptive configuration error when the blob is absent,
	/// the key is missing, or the value is not a string; a misconfigured
	/// field must never silently default.
	pub fn config_str(&self, key: &str) -> EngineResult<String> {
		let value = self
			.config
			.as_ref()
			.and_then(|c| c.get(key))
			.and_then(JsonValue::as_str)
			.ok_or_else(|| EngineError::FieldConfig {
				field: self.name.clone(),
				reason: format!("missing required configuration key `{key}`"),
			})?;
		Ok(value.to_string())
	}
}

/// Administrator-defined schema for a class of content nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentType {
	/// Identity
	pub id: Uuid,
	/// Unique type name
	pub name: String,
	/// Bumped on every field edit; drives re-compilation
	pub version: u32,
	/// Whether instances are publishable/addressable
	pub reachable: bool,
	/// Default time-to-live for new instances, in seconds
	pub default_ttl: Option<i64>,
	/// Name of the generated storage class
	pub storage_class: String,
	/// Ordered field definitions
	pub fields: Vec<FieldDefinition>,
}

impl ContentType {
	/// Creates an empty content type
	///
	/// # Examples
	///
	/// ```
	/// use arbor_cms::schema::ContentType;
	///
	/// let ct = ContentType::new("news article");
	/// assert_eq!(ct.storage_class, "NewsArticleStorage");
	/// assert_eq!(ct.table_name(), "content_news_article");
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();
		let storage_class = storage_class_name(&name);
		Self {
			id: Uuid::new_v4(),
			name,
			version: 1,
			reachable: true,
			default_ttl: None,
			storage_class,
			fields: Vec::new(),
		}
	}

	/// Sets the reachable flag
	#[must_use]
	pub fn reachable(mut self, reachable: bool) -> Self {
		self.reachable = reachable;
		self
	}

	/// Sets the default time-to-live
	#[must_use]
	pub fn default_ttl(mut self, seconds: i64) -> Self {
		self.default_ttl = Some(seconds);
		self
	}

	/// Appends a field and bumps the version
	#[must_use]
	pub fn field(mut self, field: FieldDefinition) -> Self {
		self.fields.push(field);
		self.version += 1;
		self
	}

	/// Looks up a field by name
	pub fn field_named(&self, name: &str) -> Option<&FieldDefinition> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Fields in declaration-position order
	pub fn fields_ordered(&self) -> Vec<&FieldDefinition> {
		let mut fields: Vec<&FieldDefinition> = self.fields.iter().collect();
		fields.sort_by_key(|f| f.position);
		fields
	}

	/// Fields flagged universal, in position order
	pub fn universal_fields(&self) -> Vec<&FieldDefinition> {
		self.fields_ordered()
			.into_iter()
			.filter(|f| f.universal)
			.collect()
	}

	/// Table/collection name backing the generated storage class
	pub fn table_name(&self) -> String {
		format!("content_{}", snake_case(&self.name))
	}

	/// Marks the definition edited so stale compiled classes are detected
	pub fn bump_version(&mut self) {
		self.version += 1;
	}
}

/// Derives the generated storage class name for a type name
pub fn storage_class_name(type_name: &str) -> String {
	let mut out = String::with_capacity(type_name.len() + 7);
	let mut upper_next = true;
	for ch in type_name.chars() {
		if ch.is_ascii_alphanumeric() {
			if upper_next {
				out.push(ch.to_ascii_uppercase());
				upper_next = false;
			} else {
				out.push(ch);
			}
		} else {
			upper_next = true;
		}
	}
	out.push_str("Storage");
	out
}

fn snake_case(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut pending_sep = false;
	for ch in name.chars() {
		if ch.is_ascii_alphanumeric() {
			if pending_sep && !out.is_empty() {
				out.push('_');
			}
			pending_sep = false;
			out.push(ch.to_ascii_lowercase());
		} else {
			pending_sep = true;
		}
	}
	out
}

/// Runtime catalog of content types, keyed by type name
///
/// Engines that walk heterogeneous subtrees (duplication, propagation) use
/// the catalog to resolve a node's type name to its definition.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
	types: RwLock<HashMap<String, ContentType>>,
}

impl SchemaCatalog {
	/// Creates an empty catalog
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers or replaces a content type
	pub fn register(&self, content_type: ContentType) {
		self.types
			.write()
			.insert(content_type.name.clone(), content_type);
	}

	/// Looks up a type by name
	pub fn get(&self, name: &str) -> Option<ContentType> {
		self.types.read().get(name).cloned()
	}

	/// Looks up a type by name, failing when it is not registered
	pub fn require(&self, name: &str) -> EngineResult<ContentType> {
		self.get(name).ok_or_else(|| EngineError::NotFound {
			kind: "content type",
			id: name.to_string(),
		})
	}
}
