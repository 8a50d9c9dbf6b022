//! Cross-translation propagation
//!
//! Copies "universal" (language-independent) field values from a node's
//! default-translation variant into every other variant of the same node,
//! using the same per-kind value-copy contract as transtyping.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::fields::{CopyMode, GeneratorRegistry};
use crate::model::{DocumentLink, Variant};
use crate::repository::ContentRepository;
use crate::schema::{FieldDefinition, SchemaCatalog};

/// Propagates universal field values across a node's translations
pub struct TranslationPropagator {
	repo: Arc<dyn ContentRepository>,
	registry: Arc<GeneratorRegistry>,
	catalog: Arc<SchemaCatalog>,
}

impl TranslationPropagator {
	/// Creates a propagator over the given collaborators
	pub fn new(
		repo: Arc<dyn ContentRepository>,
		registry: Arc<GeneratorRegistry>,
		catalog: Arc<SchemaCatalog>,
	) -> Self {
		Self {
			repo,
			registry,
			catalog,
		}
	}

	/// Copies universal field values from `variant` to all sibling variants
	///
	/// Applies only when the given variant belongs to the default
	/// translation, or when its node has no default-translation variant
	/// yet. By-value kinds are copied verbatim; document-collection fields
	/// are fully replaced (delete, then recreate preserving order). Returns
	/// `Ok(false)` when nothing was propagated.
	pub async fn propagate(&self, variant: &Variant) -> EngineResult<bool> {
		let default_translation = self.repo.default_translation().await?;
		if variant.translation != default_translation.id {
			let default_exists = self
				.repo
				.variant_for(variant.node, default_translation.id)
				.await?
				.is_some();
			if default_exists {
				return Ok(false);
			}
		}

		let node = self.repo.node(variant.node).await?;
		let content_type = self.catalog.require(&node.type_name)?;
		let universal = content_type.universal_fields();
		if universal.is_empty() {
			return Ok(false);
		}

		let siblings: Vec<Variant> = self
			.repo
			.variants_of(node.id)
			.await?
			.into_iter()
			.filter(|v| v.id != variant.id)
			.collect();

		for sibling in siblings {
			let mut sibling = sibling;
			let mut dirty = false;
			for def in &universal {
				match self.registry.copy_mode(&def.kind)? {
					CopyMode::ByValue => {
						dirty |= self.registry.copy_value(def, variant, &mut sibling)?;
					}
					CopyMode::DocumentLinks => {
						self.replace_document_links(variant, &sibling, def).await?;
					}
					CopyMode::Skipped => {}
				}
			}
			if dirty {
				self.repo.persist_variant(&sibling).await?;
			}
		}

		debug!(
			node = %node.id,
			variant = %variant.id,
			fields = universal.len(),
			"propagated universal fields"
		);
		Ok(true)
	}

	/// Replaces the sibling's associations for one field with a mirror of
	/// the source variant's, preserving order
	async fn replace_document_links(
		&self,
		source: &Variant,
		sibling: &Variant,
		def: &FieldDefinition,
	) -> EngineResult<()> {
		for stale in self
			.repo
			.document_links_for(sibling.id, Some(&def.name))
			.await?
		{
			self.repo.remove_document_link(stale.id).await?;
		}
		for link in self
			.repo
			.document_links_for(source.id, Some(&def.name))
			.await?
		{
			self.repo
				.persist_document_link(&DocumentLink {
					id: Uuid::new_v4(),
					variant: sibling.id,
					document: link.document,
					field: def.name.clone(),
					position: link.position,
				})
				.await?;
		}
		Ok(())
	}
}
