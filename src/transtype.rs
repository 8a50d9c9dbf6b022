//! Transtyping engine
//!
//! Migrates an existing node from one content type to another, preserving
//! data in fields that match by name+kind and dropping the rest. An
//! invocation walks `Matching → Validating → Migrating → Committed`; the
//! caller wraps the whole sequence in one external transaction and commits
//! exactly once at the end.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::fields::{CopyMode, GeneratorRegistry};
use crate::model::{AddressAlias, DocumentLink, Node, Variant};
use crate::repository::{ContentRepository, StorageClassLoader};
use crate::schema::{ContentType, FieldDefinition};

/// How relation fields with diverging configured targets are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationTargetRule {
	/// Name+kind equality only
	#[default]
	Lenient,
	/// Relation fields whose configured target classes differ are treated
	/// as unmatched (dropped, never coerced)
	Strict,
}

/// Transtype configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranstypeOptions {
	/// Whether to probe the destination storage class before migrating
	pub validate: bool,
	/// Relation-target matching rule
	pub relation_targets: RelationTargetRule,
}

impl Default for TranstypeOptions {
	fn default() -> Self {
		Self {
			validate: true,
			relation_targets: RelationTargetRule::default(),
		}
	}
}

/// A matched (source, destination) field pair
#[derive(Debug, Clone, Copy)]
pub struct FieldMatch<'a> {
	/// Field on the source type
	pub source: &'a FieldDefinition,
	/// Field of the same name and kind on the destination type
	pub dest: &'a FieldDefinition,
}

/// Outcome summary of a transtype invocation
#[derive(Debug, Clone)]
pub struct TranstypeReport {
	/// Names of fields whose data was carried over
	pub matched: Vec<String>,
	/// Names of source fields that were dropped
	pub dropped: Vec<String>,
	/// Number of variants replaced
	pub migrated_variants: usize,
}

/// Migrates nodes between content types
pub struct TranstypeEngine {
	repo: Arc<dyn ContentRepository>,
	loader: Arc<dyn StorageClassLoader>,
	registry: Arc<GeneratorRegistry>,
}

impl TranstypeEngine {
	/// Creates an engine over the given collaborators
	pub fn new(
		repo: Arc<dyn ContentRepository>,
		loader: Arc<dyn StorageClassLoader>,
		registry: Arc<GeneratorRegistry>,
	) -> Self {
		Self {
			repo,
			loader,
			registry,
		}
	}

	/// Pairs source fields with destination fields of the same name+kind
	///
	/// Unmatched source fields are dropped; a field present in both types
	/// under the same name but a different kind is treated as unmatched.
	pub fn match_fields<'a>(
		&self,
		source: &'a ContentType,
		dest: &'a ContentType,
		rule: RelationTargetRule,
	) -> (Vec<FieldMatch<'a>>, Vec<&'a FieldDefinition>) {
		let mut matched = Vec::new();
		let mut dropped = Vec::new();
		for field in source.fields_ordered() {
			let candidate = dest
				.field_named(&field.name)
				.filter(|d| d.kind == field.kind)
				.filter(|d| {
					rule == RelationTargetRule::Lenient
						|| !field.kind.is_relation()
						|| relation_target(field) == relation_target(d)
				});
			match candidate {
				Some(dest_field) => matched.push(FieldMatch {
					source: field,
					dest: dest_field,
				}),
				None => dropped.push(field),
			}
		}
		(matched, dropped)
	}

	/// Migrates a node from `source` to `dest`
	///
	/// Replaces every per-language variant with one built against the
	/// destination storage class, carrying title, matched by-value fields,
	/// document associations of matched document fields and all address
	/// aliases. Old variants are removed only after every new variant
	/// exists; the node's type pointer is switched last. The engine never
	/// flushes; committing is the caller's responsibility.
	pub async fn transtype(
		&self,
		node: &mut Node,
		source: &ContentType,
		dest: &ContentType,
		options: &TranstypeOptions,
	) -> EngineResult<TranstypeReport> {
		// Matching
		let (matches, dropped) = self.match_fields(source, dest, options.relation_targets);
		debug!(
			node = %node.id,
			source = %source.name,
			dest = %dest.name,
			matched = matches.len(),
			dropped = dropped.len(),
			"matched fields"
		);

		// Validating
		if options.validate {
			self.validate_destination(dest).await?;
		}

		// Migrating
		let old_variants = self.repo.variants_of(node.id).await?;
		let mut replacements: Vec<Variant> = Vec::with_capacity(old_variants.len());
		for old in &old_variants {
			let new = self.migrate_variant(old, dest, &matches).await?;
			replacements.push(new);
		}
		for new in &replacements {
			self.repo.persist_variant(new).await?;
		}
		for (old, new) in old_variants.iter().zip(&replacements) {
			self.relink_documents(old, new, &matches).await?;
			self.recreate_aliases(old, new).await?;
		}
		debug!(node = %node.id, count = old_variants.len(), "removing old sources");
		for old in &old_variants {
			self.detach_variant(old).await?;
		}

		// Committed
		node.type_name = dest.name.clone();
		self.repo.persist_node(node).await?;

		Ok(TranstypeReport {
			matched: matches.iter().map(|m| m.source.name.clone()).collect(),
			dropped: dropped.iter().map(|f| f.name.clone()).collect(),
			migrated_variants: replacements.len(),
		})
	}

	/// Guards against migrating into a type whose generated class has not
	/// been compiled: checks the loader, then persists and immediately
	/// deletes one throw-away probe variant against the destination class.
	async fn validate_destination(&self, dest: &ContentType) -> EngineResult<()> {
		if !self.loader.class_exists(&dest.storage_class) {
			return Err(EngineError::StorageClassMissing(dest.storage_class.clone()));
		}
		if !self.loader.is_current(dest) {
			return Err(EngineError::StorageClassStale {
				class: dest.storage_class.clone(),
				current: dest.version,
			});
		}
		let translation = self.repo.default_translation().await?;
		let probe = Variant::new(Uuid::new_v4(), translation.id, dest.storage_class.clone());
		self.repo.persist_variant(&probe).await?;
		self.repo.remove_variant(probe.id).await?;
		debug!(class = %dest.storage_class, "destination storage class validated");
		Ok(())
	}

	/// Builds the destination-class variant replacing `old`
	///
	/// Unmatched destination fields are left at their generated defaults;
	/// matched by-value fields are copied verbatim.
	async fn migrate_variant(
		&self,
		old: &Variant,
		dest: &ContentType,
		matches: &[FieldMatch<'_>],
	) -> EngineResult<Variant> {
		let mut new = Variant::new(old.node, old.translation, dest.storage_class.clone());
		new.title = old.title.clone();
		new.published_at = old.published_at;

		for def in dest.fields_ordered() {
			if def.kind.is_lookup_collection() {
				continue;
			}
			let generator = self.registry.generator_for(&def.kind)?;
			new.values.insert(def.name.clone(), generator.default_value(def));
		}
		for m in matches {
			self.registry.copy_value(m.source, old, &mut new)?;
		}
		Ok(new)
	}

	async fn relink_documents(
		&self,
		old: &Variant,
		new: &Variant,
		matches: &[FieldMatch<'_>],
	) -> EngineResult<()> {
		for m in matches {
			if self.registry.copy_mode(&m.source.kind)? != CopyMode::DocumentLinks {
				continue;
			}
			let links = self
				.repo
				.document_links_for(old.id, Some(&m.source.name))
				.await?;
			for link in links {
				self.repo
					.persist_document_link(&DocumentLink {
						id: Uuid::new_v4(),
						variant: new.id,
						document: link.document,
						field: m.dest.name.clone(),
						position: link.position,
					})
					.await?;
			}
		}
		Ok(())
	}

	async fn recreate_aliases(&self, old: &Variant, new: &Variant) -> EngineResult<()> {
		let aliases = self.repo.aliases_of(old.id).await?;
		if !aliases.is_empty() {
			debug!(variant = %new.id, count = aliases.len(), "recreating aliases");
		}
		for alias in aliases {
			self.repo
				.persist_alias(&AddressAlias {
					id: Uuid::new_v4(),
					variant: new.id,
					alias: alias.alias,
				})
				.await?;
		}
		Ok(())
	}

	async fn detach_variant(&self, old: &Variant) -> EngineResult<()> {
		for link in self.repo.document_links_for(old.id, None).await? {
			self.repo.remove_document_link(link.id).await?;
		}
		for alias in self.repo.aliases_of(old.id).await? {
			self.repo.remove_alias(alias.id).await?;
		}
		self.repo.remove_variant(old.id).await
	}
}

fn relation_target(def: &FieldDefinition) -> Option<String> {
	def.config_str("target_class").ok()
}
