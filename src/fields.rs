//! Field-kind code-generation strategies
//!
//! One [`FieldGenerator`] per field kind turns a declarative
//! [`FieldDefinition`] into the structured pieces of a generated storage
//! class: a property declaration, index clauses, accessors, constructor
//! initialization, plus the value-copy classification shared by transtyping
//! and cross-translation propagation. Strategies emit intermediate
//! representation only; stringification happens at the compiler boundary.
//!
//! The [`GeneratorRegistry`] is a dispatch table keyed on the kind tag, in
//! the spirit of a block/factory registry rather than an inheritance chain.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::model::{FieldValue, Variant};
use crate::schema::{FieldDefinition, FieldKind, ScalarKind};

/// Storage type of a declared property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
	/// Text column
	Text,
	/// Integer column
	Integer,
	/// Boolean column
	Boolean,
	/// Date column
	Date,
	/// Single reference to a configured target class
	Reference {
		/// Target class name
		target: String,
	},
	/// Ordered reference collection
	ReferenceList {
		/// Target class name
		target: String,
	},
	/// Ordered reference collection mediated by a join record
	ProxyList {
		/// Target class name
		target: String,
		/// Intermediate join-record class
		proxy: String,
	},
	/// Opaque structured text
	StructuredText,
}

/// Declared storage property of a generated class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
	/// Property name (the field name)
	pub name: String,
	/// Column/collection type
	pub storage: StorageType,
	/// Whether null is admissible
	pub nullable: bool,
	/// Initial value
	pub default: FieldValue,
	/// Whether the property participates in outward serialization
	pub exported: bool,
}

/// One table-level index clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexClause {
	/// Indexed field name
	pub field: String,
}

/// Body of a generated accessor, in IR form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorBody {
	/// Plain property read
	ReadProperty {
		/// Backing property
		property: String,
	},
	/// Setter that coerces the incoming value to the declared subtype
	CoerceAndAssign {
		/// Backing property
		property: String,
		/// Declared scalar subtype
		scalar: ScalarKind,
	},
	/// Setter assigning a single reference
	AssignReference {
		/// Backing property
		property: String,
	},
	/// Setter replacing an ordered reference collection wholesale
	ReplaceCollection {
		/// Backing property
		property: String,
	},
	/// Setter that detaches every existing proxy record, then recreates one
	/// per incoming reference preserving order
	ReplaceProxySet {
		/// Backing property
		property: String,
		/// Join-record class
		proxy: String,
	},
	/// Getter that resolves the association via a repository lookup scoped
	/// to (owner, field), once, cached per instance
	LazyLookup {
		/// Field the lookup is scoped to
		field: String,
		/// Collection kind tag (documents, related nodes, external forms)
		collection: String,
	},
	/// Getter that parses the stored structured text on demand
	ParseStructured {
		/// Backing property
		property: String,
	},
}

/// A generated getter or setter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
	/// Accessor name
	pub name: String,
	/// IR body
	pub body: AccessorBody,
}

/// Constructor initialization of a collection property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initializer {
	/// Property initialized to an empty collection
	pub property: String,
}

/// How a field's value travels during transtyping and propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
	/// Stored value is copied verbatim between variants
	ByValue,
	/// Document associations are re-created against the destination variant
	DocumentLinks,
	/// Nothing to copy at the variant level
	Skipped,
}

/// Everything the compiler needs for one field
#[derive(Debug, Clone)]
pub struct GeneratedField {
	/// Declared property, absent for lookup-collection kinds
	pub declaration: Option<PropertyDeclaration>,
	/// Index clauses contributed to the table-level list
	pub indexes: Vec<IndexClause>,
	/// Getter
	pub getter: Accessor,
	/// Optional setter
	pub setter: Option<Accessor>,
	/// Extra accessors (e.g. the structured parse accessor)
	pub extra: Vec<Accessor>,
	/// Constructor initialization, for collection-backed kinds
	pub initializer: Option<Initializer>,
}

/// Code-generation strategy for one field kind
pub trait FieldGenerator: Send + Sync {
	/// Dispatch key, equal to [`FieldKind::tag`]
	fn kind_tag(&self) -> &'static str;

	/// Value-copy classification for transtyping and propagation
	fn copy_mode(&self) -> CopyMode;

	/// Default value stored for the field on a fresh variant
	fn default_value(&self, def: &FieldDefinition) -> FieldValue;

	/// Storage declaration, `None` for kinds without a persisted column
	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>>;

	/// Index clauses, empty unless the kind supports indexing
	fn indexes(&self, _def: &FieldDefinition) -> Vec<IndexClause> {
		Vec::new()
	}

	/// Getter
	fn getter(&self, def: &FieldDefinition) -> Accessor;

	/// Optional setter
	fn setter(&self, _def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		Ok(None)
	}

	/// Additional accessors beyond getter/setter
	fn extra_accessors(&self, _def: &FieldDefinition) -> Vec<Accessor> {
		Vec::new()
	}

	/// Constructor initialization
	fn initializer(&self, _def: &FieldDefinition) -> Option<Initializer> {
		None
	}
}

fn getter_name(field: &str) -> String {
	format!("get_{field}")
}

fn setter_name(field: &str) -> String {
	format!("set_{field}")
}

/// Scalar text/number/boolean/date columns
struct ScalarGenerator;

impl FieldGenerator for ScalarGenerator {
	fn kind_tag(&self) -> &'static str {
		"scalar"
	}

	fn copy_mode(&self) -> CopyMode {
		CopyMode::ByValue
	}

	fn default_value(&self, def: &FieldDefinition) -> FieldValue {
		match def.kind {
			FieldKind::Scalar(kind) => FieldValue::scalar_default(kind),
			_ => FieldValue::Null,
		}
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		let kind = scalar_kind(def)?;
		let storage = match kind {
			ScalarKind::Text => StorageType::Text,
			ScalarKind::Integer => StorageType::Integer,
			ScalarKind::Boolean => StorageType::Boolean,
			ScalarKind::Date => StorageType::Date,
		};
		Ok(Some(PropertyDeclaration {
			name: def.name.clone(),
			storage,
			nullable: matches!(kind, ScalarKind::Text | ScalarKind::Date),
			default: FieldValue::scalar_default(kind),
			exported: true,
		}))
	}

	fn indexes(&self, def: &FieldDefinition) -> Vec<IndexClause> {
		if def.indexed {
			vec![IndexClause {
				field: def.name.clone(),
			}]
		} else {
			Vec::new()
		}
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::ReadProperty {
				property: def.name.clone(),
			},
		}
	}

	fn setter(&self, def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		let kind = scalar_kind(def)?;
		Ok(Some(Accessor {
			name: setter_name(&def.name),
			body: AccessorBody::CoerceAndAssign {
				property: def.name.clone(),
				scalar: kind,
			},
		}))
	}
}

fn scalar_kind(def: &FieldDefinition) -> EngineResult<ScalarKind> {
	match def.kind {
		FieldKind::Scalar(kind) => Ok(kind),
		_ => Err(EngineError::FieldConfig {
			field: def.name.clone(),
			reason: "scalar generator invoked for a non-scalar field".to_string(),
		}),
	}
}

/// Single reference to a configured target class
struct ManyToOneGenerator;

impl FieldGenerator for ManyToOneGenerator {
	fn kind_tag(&self) -> &'static str {
		"many_to_one"
	}

	fn copy_mode(&self) -> CopyMode {
		CopyMode::ByValue
	}

	fn default_value(&self, _def: &FieldDefinition) -> FieldValue {
		FieldValue::Null
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		let target = def.config_str("target_class")?;
		Ok(Some(PropertyDeclaration {
			name: def.name.clone(),
			storage: StorageType::Reference { target },
			nullable: true,
			default: FieldValue::Null,
			exported: true,
		}))
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::ReadProperty {
				property: def.name.clone(),
			},
		}
	}

	fn setter(&self, def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		Ok(Some(Accessor {
			name: setter_name(&def.name),
			body: AccessorBody::AssignReference {
				property: def.name.clone(),
			},
		}))
	}
}

/// Ordered collection of references to a configured target class
struct ManyToManyGenerator;

impl FieldGenerator for ManyToManyGenerator {
	fn kind_tag(&self) -> &'static str {
		"many_to_many"
	}

	fn copy_mode(&self) -> CopyMode {
		CopyMode::ByValue
	}

	fn default_value(&self, _def: &FieldDefinition) -> FieldValue {
		FieldValue::References(Vec::new())
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		let target = def.config_str("target_class")?;
		Ok(Some(PropertyDeclaration {
			name: def.name.clone(),
			storage: StorageType::ReferenceList { target },
			nullable: false,
			default: FieldValue::References(Vec::new()),
			exported: true,
		}))
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::ReadProperty {
				property: def.name.clone(),
			},
		}
	}

	fn setter(&self, def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		Ok(Some(Accessor {
			name: setter_name(&def.name),
			body: AccessorBody::ReplaceCollection {
				property: def.name.clone(),
			},
		}))
	}

	fn initializer(&self, def: &FieldDefinition) -> Option<Initializer> {
		Some(Initializer {
			property: def.name.clone(),
		})
	}
}

/// Many-to-many mediated by an intermediate join record
///
/// The setter replaces the entire proxy set: detach all existing proxies,
/// then recreate one per incoming reference preserving order.
struct ManyToManyProxyGenerator;

impl FieldGenerator for ManyToManyProxyGenerator {
	fn kind_tag(&self) -> &'static str {
		"many_to_many_proxy"
	}

	fn copy_mode(&self) -> CopyMode {
		CopyMode::ByValue
	}

	fn default_value(&self, _def: &FieldDefinition) -> FieldValue {
		FieldValue::References(Vec::new())
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		let target = def.config_str("target_class")?;
		let proxy = def.config_str("proxy_class")?;
		Ok(Some(PropertyDeclaration {
			name: def.name.clone(),
			storage: StorageType::ProxyList { target, proxy },
			nullable: false,
			default: FieldValue::References(Vec::new()),
			exported: true,
		}))
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::ReadProperty {
				property: def.name.clone(),
			},
		}
	}

	fn setter(&self, def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		let proxy = def.config_str("proxy_class")?;
		Ok(Some(Accessor {
			name: setter_name(&def.name),
			body: AccessorBody::ReplaceProxySet {
				property: def.name.clone(),
				proxy,
			},
		}))
	}

	fn initializer(&self, def: &FieldDefinition) -> Option<Initializer> {
		Some(Initializer {
			property: def.name.clone(),
		})
	}
}

/// Lazily resolved association collections (documents, related nodes,
/// external forms)
///
/// Never persisted directly: the getter issues one repository lookup scoped
/// to (owner, field) and caches it per instance; mutation goes through the
/// owning node's add/remove operations, so no setter is generated.
struct LookupCollectionGenerator {
	tag: &'static str,
	copy: CopyMode,
	required_key: Option<&'static str>,
}

impl FieldGenerator for LookupCollectionGenerator {
	fn kind_tag(&self) -> &'static str {
		self.tag
	}

	fn copy_mode(&self) -> CopyMode {
		self.copy
	}

	fn default_value(&self, _def: &FieldDefinition) -> FieldValue {
		FieldValue::Null
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		if let Some(key) = self.required_key {
			def.config_str(key)?;
		}
		Ok(None)
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::LazyLookup {
				field: def.name.clone(),
				collection: self.tag.to_string(),
			},
		}
	}
}

/// Opaque structured (YAML) text column
///
/// Excluded from outward serialization; an extra accessor parses the stored
/// text into structured data on demand (see [`parse_structured`]).
struct StructuredGenerator;

impl FieldGenerator for StructuredGenerator {
	fn kind_tag(&self) -> &'static str {
		"structured"
	}

	fn copy_mode(&self) -> CopyMode {
		CopyMode::ByValue
	}

	fn default_value(&self, _def: &FieldDefinition) -> FieldValue {
		FieldValue::Null
	}

	fn declare(&self, def: &FieldDefinition) -> EngineResult<Option<PropertyDeclaration>> {
		Ok(Some(PropertyDeclaration {
			name: def.name.clone(),
			storage: StorageType::StructuredText,
			nullable: true,
			default: FieldValue::Null,
			exported: false,
		}))
	}

	fn getter(&self, def: &FieldDefinition) -> Accessor {
		Accessor {
			name: getter_name(&def.name),
			body: AccessorBody::ReadProperty {
				property: def.name.clone(),
			},
		}
	}

	fn setter(&self, def: &FieldDefinition) -> EngineResult<Option<Accessor>> {
		Ok(Some(Accessor {
			name: setter_name(&def.name),
			body: AccessorBody::CoerceAndAssign {
				property: def.name.clone(),
				scalar: ScalarKind::Text,
			},
		}))
	}

	fn extra_accessors(&self, def: &FieldDefinition) -> Vec<Accessor> {
		vec![Accessor {
			name: format!("get_{}_parsed", def.name),
			body: AccessorBody::ParseStructured {
				property: def.name.clone(),
			},
		}]
	}
}

/// Parses a structured field's stored text into YAML data
pub fn parse_structured(text: &str) -> EngineResult<serde_yaml::Value> {
	serde_yaml::from_str(text).map_err(|e| EngineError::FieldConfig {
		field: String::new(),
		reason: format!("structured value does not parse: {e}"),
	})
}

/// Dispatch table of field generators, keyed on the kind tag
pub struct GeneratorRegistry {
	generators: HashMap<&'static str, Box<dyn FieldGenerator>>,
}

impl GeneratorRegistry {
	/// Creates an empty registry
	pub fn new() -> Self {
		Self {
			generators: HashMap::new(),
		}
	}

	/// Creates a registry with all eight built-in kinds registered
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(Box::new(ScalarGenerator));
		registry.register(Box::new(ManyToOneGenerator));
		registry.register(Box::new(ManyToManyGenerator));
		registry.register(Box::new(ManyToManyProxyGenerator));
		registry.register(Box::new(LookupCollectionGenerator {
			tag: "documents",
			copy: CopyMode::DocumentLinks,
			required_key: None,
		}));
		registry.register(Box::new(LookupCollectionGenerator {
			tag: "related_nodes",
			copy: CopyMode::Skipped,
			required_key: None,
		}));
		registry.register(Box::new(LookupCollectionGenerator {
			tag: "external_forms",
			copy: CopyMode::Skipped,
			required_key: Some("form_class"),
		}));
		registry.register(Box::new(StructuredGenerator));
		registry
	}

	/// Registers a generator under its kind tag
	pub fn register(&mut self, generator: Box<dyn FieldGenerator>) {
		self.generators.insert(generator.kind_tag(), generator);
	}

	/// Resolves the generator for a field kind
	pub fn generator_for(&self, kind: &FieldKind) -> EngineResult<&dyn FieldGenerator> {
		self.generators
			.get(kind.tag())
			.map(Box::as_ref)
			.ok_or_else(|| EngineError::UnknownFieldKind(kind.tag().to_string()))
	}

	/// Value-copy classification for a field kind
	pub fn copy_mode(&self, kind: &FieldKind) -> EngineResult<CopyMode> {
		Ok(self.generator_for(kind)?.copy_mode())
	}

	/// Runs the full strategy for one field definition
	pub fn generate(&self, def: &FieldDefinition) -> EngineResult<GeneratedField> {
		let generator = self.generator_for(&def.kind)?;
		Ok(GeneratedField {
			declaration: generator.declare(def)?,
			indexes: generator.indexes(def),
			getter: generator.getter(def),
			setter: generator.setter(def)?,
			extra: generator.extra_accessors(def),
			initializer: generator.initializer(def),
		})
	}

	/// Copies one field's stored value between two variants of the same node
	/// family, honoring the kind's copy classification
	///
	/// Returns whether a by-value copy took place; document-link and skipped
	/// kinds report `false` and are handled by the calling engine.
	pub fn copy_value(
		&self,
		def: &FieldDefinition,
		from: &Variant,
		to: &mut Variant,
	) -> EngineResult<bool> {
		match self.copy_mode(&def.kind)? {
			CopyMode::ByValue => {
				match from.values.get(&def.name) {
					Some(value) => {
						to.values.insert(def.name.clone(), value.clone());
					}
					None => {
						to.values.remove(&def.name);
					}
				}
				Ok(true)
			}
			CopyMode::DocumentLinks | CopyMode::Skipped => Ok(false),
		}
	}
}

impl Default for GeneratorRegistry {
	fn default() -> Self {
		Self::with_defaults()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn relation_without_target_class_fails_compilation() {
		let registry = GeneratorRegistry::with_defaults();
		let def = FieldDefinition::new("owner", FieldKind::ManyToOne, 1);
		let err = registry.generate(&def).unwrap_err();
		assert!(matches!(err, EngineError::FieldConfig { .. }));
	}

	#[test]
	fn proxy_setter_replaces_whole_set() {
		let registry = GeneratorRegistry::with_defaults();
		let def = FieldDefinition::new("tags", FieldKind::ManyToManyProxy, 1)
			.config(json!({"target_class": "Tag", "proxy_class": "NodeTag"}));
		let generated = registry.generate(&def).unwrap();
		let setter = generated.setter.unwrap();
		assert!(matches!(setter.body, AccessorBody::ReplaceProxySet { .. }));
		assert!(generated.initializer.is_some());
	}

	#[test]
	fn lookup_collections_have_no_declaration_and_no_setter() {
		let registry = GeneratorRegistry::with_defaults();
		let def = FieldDefinition::new("gallery", FieldKind::Documents, 1);
		let generated = registry.generate(&def).unwrap();
		assert!(generated.declaration.is_none());
		assert!(generated.setter.is_none());
		assert!(matches!(generated.getter.body, AccessorBody::LazyLookup { .. }));
	}

	#[test]
	fn structured_property_is_not_exported() {
		let registry = GeneratorRegistry::with_defaults();
		let def = FieldDefinition::new("settings", FieldKind::Structured, 1);
		let generated = registry.generate(&def).unwrap();
		assert!(!generated.declaration.unwrap().exported);
		assert_eq!(generated.extra.len(), 1);
	}

	#[test]
	fn parse_structured_rejects_invalid_yaml() {
		assert!(parse_structured("key: [unclosed").is_err());
		assert!(parse_structured("key: value").is_ok());
	}
}
