//! Node factory
//!
//! Creates new nodes (and their first variant) against a content type,
//! naming them through the canonical derivation with a safe fallback on
//! collision.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{AddressAlias, Node, NodeId, TranslationId, Variant};
use crate::naming::{MAX_NAME_LENGTH, NameChecker, NamePolicy, is_valid_name};
use crate::repository::ContentRepository;
use crate::schema::ContentType;

/// Request to create a node or attach a new variant to an existing one
#[derive(Debug, Clone, Default)]
pub struct CreateNode {
	/// Title of the initial variant, source of the node's name
	pub title: Option<String>,
	/// Translation of the initial variant, system default when unset
	pub translation: Option<TranslationId>,
	/// Existing node to attach a variant to, instead of creating one
	pub existing: Option<NodeId>,
	/// Parent of a freshly created node
	pub parent: Option<NodeId>,
}

/// Creates uniquely named node instances
pub struct NodeFactory {
	repo: Arc<dyn ContentRepository>,
	policy: NamePolicy,
}

impl NodeFactory {
	/// Creates a factory over the given repository and naming policy
	pub fn new(repo: Arc<dyn ContentRepository>, policy: NamePolicy) -> Self {
		Self { repo, policy }
	}

	/// Creates a node (or a variant on an existing node) against a type
	///
	/// Requires either `request.existing` or a content type. The new node
	/// takes its time-to-live from the type default; exactly one variant is
	/// created for the requested translation, carrying the title and the
	/// publication timestamp; attaching to an existing node fails when that
	/// translation is already occupied. The node is named via the canonical
	/// derivation, falling back to the safe derivation when the canonical
	/// name is already used.
	pub async fn create(
		&self,
		request: CreateNode,
		content_type: Option<&ContentType>,
	) -> EngineResult<(Node, Variant)> {
		let translation = match request.translation {
			Some(id) => id,
			None => self.repo.default_translation().await?.id,
		};

		let (mut node, storage_class) = match (request.existing, content_type) {
			(Some(id), _) => {
				let node = self.repo.node(id).await?;
				// At most one variant per (node, translation)
				if self.repo.variant_for(id, translation).await?.is_some() {
					return Err(EngineError::VariantExists {
						node: id,
						translation,
					});
				}
				let storage_class = match self.repo.variants_of(id).await?.first() {
					Some(variant) => variant.storage_class.clone(),
					None => content_type
						.map(|ct| ct.storage_class.clone())
						.ok_or(EngineError::MissingType)?,
				};
				(node, storage_class)
			}
			(None, Some(ct)) => {
				let mut node = Node::new(ct.name.clone(), request.parent);
				node.ttl = ct.default_ttl;
				(node, ct.storage_class.clone())
			}
			(None, None) => return Err(EngineError::MissingType),
		};

		let mut variant = Variant::new(node.id, translation, storage_class);
		variant.title = request.title.clone();
		variant.published_at = Some(Utc::now());

		if request.existing.is_none() {
			let content_type = content_type.ok_or(EngineError::MissingType)?;
			node.name = self
				.derive_name(request.title.as_deref(), content_type, &node.id)
				.await?;
			debug!(node = %node.id, name = %node.name, "created node");
		}

		self.repo.persist_node(&node).await?;
		self.repo.persist_variant(&variant).await?;
		Ok((node, variant))
	}

	/// Creates a node and additionally registers one address alias for its
	/// variant, when the requested alias string is not already taken
	pub async fn create_with_alias(
		&self,
		request: CreateNode,
		content_type: Option<&ContentType>,
		alias: &str,
	) -> EngineResult<(Node, Variant)> {
		let (node, variant) = self.create(request, content_type).await?;
		if !self.repo.alias_exists(alias).await? {
			self.repo
				.persist_alias(&AddressAlias {
					id: Uuid::new_v4(),
					variant: variant.id,
					alias: alias.to_string(),
				})
				.await?;
			debug!(node = %node.id, alias, "registered address alias");
		}
		Ok((node, variant))
	}

	async fn derive_name(
		&self,
		title: Option<&str>,
		content_type: &ContentType,
		node_id: &Uuid,
	) -> EngineResult<String> {
		let checker = NameChecker::new(Arc::clone(&self.repo));
		let canonical = self.policy.canonical(title, content_type, node_id)?;
		let name = if checker.is_used(&canonical).await? {
			self.policy.safe(title, content_type, node_id)?
		} else {
			canonical
		};
		if name.len() > MAX_NAME_LENGTH {
			return Err(EngineError::NameTooLong {
				name,
				limit: MAX_NAME_LENGTH,
			});
		}
		debug_assert!(is_valid_name(&name));
		Ok(name)
	}
}
