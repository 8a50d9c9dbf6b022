//! Content-type compiler
//!
//! Turns a [`ContentType`] into a [`StorageClass`]: the structured
//! intermediate representation of the generated storage class (properties,
//! accessors, table-level indexes, constructor initialization). The IR is
//! only stringified at the boundary by [`StorageClass::render`], so the
//! field-kind strategies stay free of textual templating.
//!
//! Compiled classes are installed into a [`GeneratedClassStore`], which
//! answers the storage-class-loader contract used by transtyping validation
//! and detects stale classes after a type edit.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

use crate::error::EngineResult;
use crate::fields::{Accessor, AccessorBody, GeneratorRegistry, IndexClause, PropertyDeclaration, StorageType};
use crate::model::FieldValue;
use crate::repository::StorageClassLoader;
use crate::schema::ContentType;

/// Generated storage-class definition, as structured IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageClass {
	/// Fully qualified generated class name
	pub name: String,
	/// Backing table/collection name
	pub table: String,
	/// Content-type version the class was compiled against
	pub type_version: u32,
	/// Properties in field-position order
	pub properties: Vec<PropertyDeclaration>,
	/// Table-level index list
	pub indexes: Vec<IndexClause>,
	/// Accessors in field-position order (getter, setter, extras per field)
	pub accessors: Vec<Accessor>,
	/// Constructor collection initializations
	pub initializers: Vec<String>,
}

impl StorageClass {
	/// Renders the IR to source text
	///
	/// The rendering is deterministic: compiling the same content-type
	/// definition twice yields byte-identical output.
	pub fn render(&self) -> String {
		let mut out = String::new();
		let _ = writeln!(out, "class {} (table {}, version {})", self.name, self.table, self.type_version);
		for prop in &self.properties {
			let nullable = if prop.nullable { " null" } else { "" };
			let exported = if prop.exported { "" } else { " internal" };
			let _ = writeln!(
				out,
				"\tproperty {}: {}{}{} = {}",
				prop.name,
				render_storage(&prop.storage),
				nullable,
				exported,
				render_value(&prop.default),
			);
		}
		for index in &self.indexes {
			let _ = writeln!(out, "\tindex idx_{}_{} ({})", self.table, index.field, index.field);
		}
		let _ = writeln!(out, "\tconstructor:");
		for property in &self.initializers {
			let _ = writeln!(out, "\t\t{property} = []");
		}
		for accessor in &self.accessors {
			let _ = writeln!(out, "\t{} -> {}", accessor.name, render_body(&accessor.body));
		}
		out
	}
}

fn render_storage(storage: &StorageType) -> String {
	match storage {
		StorageType::Text => "text".to_string(),
		StorageType::Integer => "integer".to_string(),
		StorageType::Boolean => "boolean".to_string(),
		StorageType::Date => "date".to_string(),
		StorageType::Reference { target } => format!("ref<{target}>"),
		StorageType::ReferenceList { target } => format!("list<ref<{target}>>"),
		StorageType::ProxyList { target, proxy } => format!("list<ref<{target}> via {proxy}>"),
		StorageType::StructuredText => "structured_text".to_string(),
	}
}

fn render_value(value: &FieldValue) -> String {
	match value {
		FieldValue::Null => "null".to_string(),
		FieldValue::Text(s) => format!("{s:?}"),
		FieldValue::Integer(i) => i.to_string(),
		FieldValue::Boolean(b) => b.to_string(),
		FieldValue::Date(d) => d.to_string(),
		FieldValue::Reference(id) => id.to_string(),
		FieldValue::References(ids) => format!("[{} refs]", ids.len()),
		FieldValue::Structured(_) => "structured".to_string(),
	}
}

fn render_body(body: &AccessorBody) -> String {
	match body {
		AccessorBody::ReadProperty { property } => format!("read {property}"),
		AccessorBody::CoerceAndAssign { property, scalar } => {
			format!("coerce to {scalar:?}, assign {property}")
		}
		AccessorBody::AssignReference { property } => format!("assign reference {property}"),
		AccessorBody::ReplaceCollection { property } => format!("replace collection {property}"),
		AccessorBody::ReplaceProxySet { property, proxy } => {
			format!("replace proxy set {property} via {proxy}")
		}
		AccessorBody::LazyLookup { field, collection } => {
			format!("lazy cached {collection} lookup scoped to (owner, {field})")
		}
		AccessorBody::ParseStructured { property } => format!("parse structured {property}"),
	}
}

/// Compiles content types into storage-class IR
pub struct StorageClassCompiler {
	registry: GeneratorRegistry,
}

impl StorageClassCompiler {
	/// Creates a compiler over the given generator registry
	pub fn new(registry: GeneratorRegistry) -> Self {
		Self { registry }
	}

	/// Creates a compiler over the built-in field kinds
	pub fn with_defaults() -> Self {
		Self::new(GeneratorRegistry::with_defaults())
	}

	/// Compiles one content type
	///
	/// Iterates the type's fields in position order, invokes the per-kind
	/// strategy for each, and assembles one class definition. A type with
	/// zero fields compiles to a bare class. The routine has no knowledge of
	/// stored data; it only prepares the shape data is validated against.
	pub fn compile(&self, content_type: &ContentType) -> EngineResult<StorageClass> {
		let mut properties = Vec::new();
		let mut indexes = Vec::new();
		let mut accessors = Vec::new();
		let mut initializers = Vec::new();

		for def in content_type.fields_ordered() {
			let generated = self.registry.generate(def)?;
			if let Some(declaration) = generated.declaration {
				properties.push(declaration);
			}
			indexes.extend(generated.indexes);
			accessors.push(generated.getter);
			if let Some(setter) = generated.setter {
				accessors.push(setter);
			}
			accessors.extend(generated.extra);
			if let Some(initializer) = generated.initializer {
				initializers.push(initializer.property);
			}
		}

		debug!(
			content_type = %content_type.name,
			class = %content_type.storage_class,
			fields = content_type.fields.len(),
			"compiled storage class"
		);

		Ok(StorageClass {
			name: content_type.storage_class.clone(),
			table: content_type.table_name(),
			type_version: content_type.version,
			properties,
			indexes,
			accessors,
			initializers,
		})
	}
}

/// Store of installed generated classes, keyed by class name
///
/// Installation is all-or-nothing: the replacement class is fully built
/// before the previous entry is removed, never a partial overwrite.
#[derive(Debug, Default)]
pub struct GeneratedClassStore {
	classes: RwLock<HashMap<String, StorageClass>>,
}

impl GeneratedClassStore {
	/// Creates an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Removes any previous class of the same name, then installs the new one
	pub fn install(&self, class: StorageClass) {
		let mut classes = self.classes.write();
		classes.remove(&class.name);
		debug!(class = %class.name, version = class.type_version, "installed storage class");
		classes.insert(class.name.clone(), class);
	}

	/// Removes a class
	pub fn remove(&self, name: &str) {
		self.classes.write().remove(name);
	}

	/// Fetches an installed class
	pub fn get(&self, name: &str) -> Option<StorageClass> {
		self.classes.read().get(name).cloned()
	}
}

impl StorageClassLoader for GeneratedClassStore {
	fn class_exists(&self, class: &str) -> bool {
		self.classes.read().contains_key(class)
	}

	fn is_current(&self, content_type: &ContentType) -> bool {
		self.classes
			.read()
			.get(&content_type.storage_class)
			.is_some_and(|class| class.type_version == content_type.version)
	}
}
