//! External collaborator contracts
//!
//! The engine consumes persistence, address resolution and cache
//! invalidation exclusively through the traits in this module; callers
//! provide production implementations or test doubles. [`MemoryRepository`]
//! is an in-process reference backend used throughout the test suite.
//!
//! Unit-of-work semantics: `persist`/`remove` stage state, [`flush`]
//! commits the pending work exactly once per engine operation. The engine
//! performs no compensating rollback beyond not committing.
//!
//! [`flush`]: ContentRepository::flush

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{
	AddressAlias, AttributeValue, AttributeValueVariant, DocumentLink, Node, NodeId, NodeLink,
	Redirect, Translation, TranslationId, Variant, VariantId,
};
use crate::schema::ContentType;

/// Repository / unit-of-work contract over the persisted content model
#[async_trait]
pub trait ContentRepository: Send + Sync {
	/// Finds a node, failing when it does not exist
	async fn node(&self, id: NodeId) -> EngineResult<Node>;
	/// Children of a node, ordered by position; `None` scopes to roots
	async fn children_of(&self, parent: Option<NodeId>) -> EngineResult<Vec<Node>>;
	/// Persists (inserts or updates) a node
	async fn persist_node(&self, node: &Node) -> EngineResult<()>;
	/// Removes a node
	async fn remove_node(&self, id: NodeId) -> EngineResult<()>;
	/// Whether any node carries the given name
	async fn node_name_exists(&self, name: &str) -> EngineResult<bool>;

	/// All variants of a node
	async fn variants_of(&self, node: NodeId) -> EngineResult<Vec<Variant>>;
	/// The variant of a node in one translation, if any
	async fn variant_for(
		&self,
		node: NodeId,
		translation: TranslationId,
	) -> EngineResult<Option<Variant>>;
	/// Persists a variant
	async fn persist_variant(&self, variant: &Variant) -> EngineResult<()>;
	/// Removes a variant
	async fn remove_variant(&self, id: VariantId) -> EngineResult<()>;

	/// All known translations
	async fn translations(&self) -> EngineResult<Vec<Translation>>;
	/// The system default translation
	async fn default_translation(&self) -> EngineResult<Translation>;

	/// Document links of a variant, optionally scoped to one field, ordered
	/// by position
	async fn document_links_for(
		&self,
		variant: VariantId,
		field: Option<&str>,
	) -> EngineResult<Vec<DocumentLink>>;
	/// Persists a document link
	async fn persist_document_link(&self, link: &DocumentLink) -> EngineResult<()>;
	/// Removes a document link
	async fn remove_document_link(&self, id: Uuid) -> EngineResult<()>;

	/// Outgoing node links of a node, ordered by (field, position)
	async fn node_links_from(&self, node: NodeId) -> EngineResult<Vec<NodeLink>>;
	/// Persists a node link
	async fn persist_node_link(&self, link: &NodeLink) -> EngineResult<()>;

	/// Address aliases of a variant
	async fn aliases_of(&self, variant: VariantId) -> EngineResult<Vec<AddressAlias>>;
	/// Whether any variant carries the given alias
	async fn alias_exists(&self, alias: &str) -> EngineResult<bool>;
	/// Persists an alias
	async fn persist_alias(&self, alias: &AddressAlias) -> EngineResult<()>;
	/// Removes an alias
	async fn remove_alias(&self, id: Uuid) -> EngineResult<()>;

	/// Attribute values of a node, ordered by position
	async fn attribute_values_of(&self, node: NodeId) -> EngineResult<Vec<AttributeValue>>;
	/// Per-language sub-records of an attribute value
	async fn attribute_value_variants_of(
		&self,
		attribute_value: Uuid,
	) -> EngineResult<Vec<AttributeValueVariant>>;
	/// Persists an attribute value
	async fn persist_attribute_value(&self, value: &AttributeValue) -> EngineResult<()>;
	/// Persists an attribute-value sub-record
	async fn persist_attribute_value_variant(
		&self,
		value: &AttributeValueVariant,
	) -> EngineResult<()>;

	/// The redirect registered for an exact source address, if any
	async fn redirect_by_source(&self, source: &str) -> EngineResult<Option<Redirect>>;
	/// Persists (inserts or updates) a redirect
	async fn persist_redirect(&self, redirect: &Redirect) -> EngineResult<()>;
	/// Removes a redirect
	async fn remove_redirect(&self, id: Uuid) -> EngineResult<()>;

	/// Commits the pending unit of work
	async fn flush(&self) -> EngineResult<()>;
	/// Re-reads a node from committed state
	async fn refresh_node(&self, id: NodeId) -> EngineResult<Node>;
}

/// Reports whether a generated storage class exists and is up to date
pub trait StorageClassLoader: Send + Sync {
	/// Whether the fully-qualified class name can be instantiated
	fn class_exists(&self, class: &str) -> bool;
	/// Whether the installed class matches the type's current version
	fn is_current(&self, content_type: &ContentType) -> bool;
}

/// Resolves a variant's current public address (router contract)
#[async_trait]
pub trait AddressResolver: Send + Sync {
	/// Current externally resolved address of a variant
	async fn address_of(&self, variant: &Variant) -> EngineResult<String>;
}

/// Downstream response-cache invalidation
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
	/// Invalidates everything
	async fn flush_all(&self) -> EngineResult<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
	nodes: HashMap<NodeId, Node>,
	variants: HashMap<VariantId, Variant>,
	translations: Vec<Translation>,
	document_links: HashMap<Uuid, DocumentLink>,
	node_links: HashMap<Uuid, NodeLink>,
	aliases: HashMap<Uuid, AddressAlias>,
	attribute_values: HashMap<Uuid, AttributeValue>,
	attribute_value_variants: HashMap<Uuid, AttributeValueVariant>,
	redirects: HashMap<Uuid, Redirect>,
	flushes: usize,
}

/// In-process repository backend
///
/// Applies persists immediately and counts `flush` calls, which lets tests
/// assert that an engine operation commits exactly once.
#[derive(Debug, Default)]
pub struct MemoryRepository {
	state: RwLock<MemoryState>,
}

impl MemoryRepository {
	/// Creates an empty repository
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a translation and returns it
	pub fn add_translation(&self, locale: impl Into<String>, is_default: bool) -> Translation {
		let translation = Translation::new(locale, is_default);
		self.state.write().translations.push(translation.clone());
		translation
	}

	/// Number of `flush` calls observed
	pub fn flush_count(&self) -> usize {
		self.state.read().flushes
	}
}

#[async_trait]
impl ContentRepository for MemoryRepository {
	async fn node(&self, id: NodeId) -> EngineResult<Node> {
		self.state
			.read()
			.nodes
			.get(&id)
			.cloned()
			.ok_or_else(|| EngineError::NotFound {
				kind: "node",
				id: id.to_string(),
			})
	}

	async fn children_of(&self, parent: Option<NodeId>) -> EngineResult<Vec<Node>> {
		let mut children: Vec<Node> = self
			.state
			.read()
			.nodes
			.values()
			.filter(|n| n.parent == parent)
			.cloned()
			.collect();
		children.sort_by_key(|n| (n.position, n.id));
		Ok(children)
	}

	async fn persist_node(&self, node: &Node) -> EngineResult<()> {
		self.state.write().nodes.insert(node.id, node.clone());
		Ok(())
	}

	async fn remove_node(&self, id: NodeId) -> EngineResult<()> {
		self.state.write().nodes.remove(&id);
		Ok(())
	}

	async fn node_name_exists(&self, name: &str) -> EngineResult<bool> {
		Ok(self.state.read().nodes.values().any(|n| n.name == name))
	}

	async fn variants_of(&self, node: NodeId) -> EngineResult<Vec<Variant>> {
		let mut variants: Vec<Variant> = self
			.state
			.read()
			.variants
			.values()
			.filter(|v| v.node == node)
			.cloned()
			.collect();
		variants.sort_by_key(|v| v.id);
		Ok(variants)
	}

	async fn variant_for(
		&self,
		node: NodeId,
		translation: TranslationId,
	) -> EngineResult<Option<Variant>> {
		Ok(self
			.state
			.read()
			.variants
			.values()
			.find(|v| v.node == node && v.translation == translation)
			.cloned())
	}

	async fn persist_variant(&self, variant: &Variant) -> EngineResult<()> {
		self.state.write().variants.insert(variant.id, variant.clone());
		Ok(())
	}

	async fn remove_variant(&self, id: VariantId) -> EngineResult<()> {
		self.state.write().variants.remove(&id);
		Ok(())
	}

	async fn translations(&self) -> EngineResult<Vec<Translation>> {
		Ok(self.state.read().translations.clone())
	}

	async fn default_translation(&self) -> EngineResult<Translation> {
		self.state
			.read()
			.translations
			.iter()
			.find(|t| t.is_default)
			.cloned()
			.ok_or_else(|| EngineError::NotFound {
				kind: "translation",
				id: "default".to_string(),
			})
	}

	async fn document_links_for(
		&self,
		variant: VariantId,
		field: Option<&str>,
	) -> EngineResult<Vec<DocumentLink>> {
		let mut links: Vec<DocumentLink> = self
			.state
			.read()
			.document_links
			.values()
			.filter(|l| l.variant == variant && field.is_none_or(|f| l.field == f))
			.cloned()
			.collect();
		links.sort_by_key(|l| (l.field.clone(), l.position));
		Ok(links)
	}

	async fn persist_document_link(&self, link: &DocumentLink) -> EngineResult<()> {
		self.state.write().document_links.insert(link.id, link.clone());
		Ok(())
	}

	async fn remove_document_link(&self, id: Uuid) -> EngineResult<()> {
		self.state.write().document_links.remove(&id);
		Ok(())
	}

	async fn node_links_from(&self, node: NodeId) -> EngineResult<Vec<NodeLink>> {
		let mut links: Vec<NodeLink> = self
			.state
			.read()
			.node_links
			.values()
			.filter(|l| l.source == node)
			.cloned()
			.collect();
		links.sort_by_key(|l| (l.field.clone(), l.position));
		Ok(links)
	}

	async fn persist_node_link(&self, link: &NodeLink) -> EngineResult<()> {
		self.state.write().node_links.insert(link.id, link.clone());
		Ok(())
	}

	async fn aliases_of(&self, variant: VariantId) -> EngineResult<Vec<AddressAlias>> {
		let mut aliases: Vec<AddressAlias> = self
			.state
			.read()
			.aliases
			.values()
			.filter(|a| a.variant == variant)
			.cloned()
			.collect();
		aliases.sort_by_key(|a| a.alias.clone());
		Ok(aliases)
	}

	async fn alias_exists(&self, alias: &str) -> EngineResult<bool> {
		Ok(self.state.read().aliases.values().any(|a| a.alias == alias))
	}

	async fn persist_alias(&self, alias: &AddressAlias) -> EngineResult<()> {
		self.state.write().aliases.insert(alias.id, alias.clone());
		Ok(())
	}

	async fn remove_alias(&self, id: Uuid) -> EngineResult<()> {
		self.state.write().aliases.remove(&id);
		Ok(())
	}

	async fn attribute_values_of(&self, node: NodeId) -> EngineResult<Vec<AttributeValue>> {
		let mut values: Vec<AttributeValue> = self
			.state
			.read()
			.attribute_values
			.values()
			.filter(|v| v.node == node)
			.cloned()
			.collect();
		values.sort_by_key(|v| v.position);
		Ok(values)
	}

	async fn attribute_value_variants_of(
		&self,
		attribute_value: Uuid,
	) -> EngineResult<Vec<AttributeValueVariant>> {
		let mut variants: Vec<AttributeValueVariant> = self
			.state
			.read()
			.attribute_value_variants
			.values()
			.filter(|v| v.attribute_value == attribute_value)
			.cloned()
			.collect();
		variants.sort_by_key(|v| v.id);
		Ok(variants)
	}

	async fn persist_attribute_value(&self, value: &AttributeValue) -> EngineResult<()> {
		self.state.write().attribute_values.insert(value.id, value.clone());
		Ok(())
	}

	async fn persist_attribute_value_variant(
		&self,
		value: &AttributeValueVariant,
	) -> EngineResult<()> {
		self.state
			.write()
			.attribute_value_variants
			.insert(value.id, value.clone());
		Ok(())
	}

	async fn redirect_by_source(&self, source: &str) -> EngineResult<Option<Redirect>> {
		Ok(self
			.state
			.read()
			.redirects
			.values()
			.find(|r| r.source == source)
			.cloned())
	}

	async fn persist_redirect(&self, redirect: &Redirect) -> EngineResult<()> {
		self.state.write().redirects.insert(redirect.id, redirect.clone());
		Ok(())
	}

	async fn remove_redirect(&self, id: Uuid) -> EngineResult<()> {
		self.state.write().redirects.remove(&id);
		Ok(())
	}

	async fn flush(&self) -> EngineResult<()> {
		self.state.write().flushes += 1;
		Ok(())
	}

	async fn refresh_node(&self, id: NodeId) -> EngineResult<Node> {
		self.node(id).await
	}
}
