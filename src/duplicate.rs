//! Duplication engine
//!
//! Deep-clones a node and its entire descendant subtree: per-language
//! variants, document associations, outgoing node relations and attribute
//! values. Clones are demoted to draft, detached from any lock, and renamed
//! through the safe derivation. Document entities, relation targets and
//! attribute definitions are referenced, never duplicated.

use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{
	AttributeValue, AttributeValueVariant, DocumentLink, Node, NodeId, NodeLink, NodeStatus,
	TranslationId, Variant,
};
use crate::naming::NamePolicy;
use crate::repository::ContentRepository;
use crate::schema::SchemaCatalog;

/// Deep-clones nodes and their subtrees
pub struct DuplicationEngine {
	repo: Arc<dyn ContentRepository>,
	policy: NamePolicy,
	catalog: Arc<SchemaCatalog>,
}

impl DuplicationEngine {
	/// Creates an engine over the given collaborators
	pub fn new(
		repo: Arc<dyn ContentRepository>,
		policy: NamePolicy,
		catalog: Arc<SchemaCatalog>,
	) -> Self {
		Self {
			repo,
			policy,
			catalog,
		}
	}

	/// Duplicates a node and, recursively, all of its descendants
	///
	/// Fails with [`EngineError::LockedEntity`] when the source node is
	/// locked. Nothing is flushed until the entire clone subtree has been
	/// constructed; a single flush commits it atomically, followed by a
	/// refresh of the top-level clone.
	pub async fn duplicate(&self, node_id: NodeId) -> EngineResult<Node> {
		let original = self.repo.node(node_id).await?;
		if original.locked {
			return Err(EngineError::LockedEntity(original.id));
		}
		let default_translation = self.repo.default_translation().await?.id;
		let clone = self
			.clone_subtree(original.clone(), original.parent, default_translation)
			.await?;
		self.repo.flush().await?;
		debug!(original = %node_id, clone = %clone.id, "duplicated subtree");
		self.repo.refresh_node(clone.id).await
	}

	fn clone_subtree(
		&self,
		original: Node,
		parent: Option<NodeId>,
		default_translation: TranslationId,
	) -> BoxFuture<'_, EngineResult<Node>> {
		Box::pin(async move {
			let mut clone = original.clone();
			clone.id = Uuid::new_v4();
			clone.parent = parent;
			clone.status = NodeStatus::Draft;
			clone.locked = false;

			// Fresh collision-free name from the default-translation title
			let title = self
				.repo
				.variant_for(original.id, default_translation)
				.await?
				.and_then(|v| v.title);
			let content_type = self.catalog.require(&original.type_name)?;
			clone.name = self
				.policy
				.safe(title.as_deref(), &content_type, &clone.id)?;
			self.repo.persist_node(&clone).await?;

			for child in self.repo.children_of(Some(original.id)).await? {
				self.clone_subtree(child, Some(clone.id), default_translation)
					.await?;
			}

			self.clone_variants(&original, &clone).await?;
			self.clone_node_links(&original, &clone).await?;
			self.clone_attribute_values(&original, &clone).await?;

			Ok(clone)
		})
	}

	/// Copies every variant of the original onto the clone, together with
	/// the document associations of each variant
	async fn clone_variants(&self, original: &Node, clone: &Node) -> EngineResult<()> {
		for variant in self.repo.variants_of(original.id).await? {
			let mut copy = variant.clone();
			copy.id = Uuid::new_v4();
			copy.node = clone.id;
			self.repo.persist_variant(&copy).await?;

			for link in self.repo.document_links_for(variant.id, None).await? {
				self.repo
					.persist_document_link(&DocumentLink {
						id: Uuid::new_v4(),
						variant: copy.id,
						document: link.document,
						field: link.field,
						position: link.position,
					})
					.await?;
			}
		}
		Ok(())
	}

	/// Recreates outgoing node relations, preserving order, pointed at the
	/// same targets
	async fn clone_node_links(&self, original: &Node, clone: &Node) -> EngineResult<()> {
		for link in self.repo.node_links_from(original.id).await? {
			self.repo
				.persist_node_link(&NodeLink {
					id: Uuid::new_v4(),
					source: clone.id,
					target: link.target,
					field: link.field,
					position: link.position,
				})
				.await?;
		}
		Ok(())
	}

	async fn clone_attribute_values(&self, original: &Node, clone: &Node) -> EngineResult<()> {
		for value in self.repo.attribute_values_of(original.id).await? {
			let copy = AttributeValue {
				id: Uuid::new_v4(),
				node: clone.id,
				attribute: value.attribute.clone(),
				position: value.position,
			};
			self.repo.persist_attribute_value(&copy).await?;

			for sub in self.repo.attribute_value_variants_of(value.id).await? {
				self.repo
					.persist_attribute_value_variant(&AttributeValueVariant {
						id: Uuid::new_v4(),
						attribute_value: copy.id,
						translation: sub.translation,
						value: sub.value,
					})
					.await?;
			}
		}
		Ok(())
	}
}
