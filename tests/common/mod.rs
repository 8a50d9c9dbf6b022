//! Shared fixtures for the integration test suite

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_cms::error::EngineResult;
use arbor_cms::model::{Translation, Variant};
use arbor_cms::repository::{AddressResolver, CacheInvalidator, ContentRepository, MemoryRepository};
use arbor_cms::schema::{ContentType, FieldDefinition, FieldKind, ScalarKind};

/// Repository with a French default translation and an English one
pub fn repo_with_translations() -> (Arc<MemoryRepository>, Translation, Translation) {
	let repo = Arc::new(MemoryRepository::new());
	let fr = repo.add_translation("fr", true);
	let en = repo.add_translation("en", false);
	(repo, fr, en)
}

/// The "Article" type from the propagation scenario: a non-universal title
/// and a universal document collection
pub fn article_type() -> ContentType {
	ContentType::new("article")
		.field(FieldDefinition::new("title", FieldKind::Scalar(ScalarKind::Text), 1))
		.field(FieldDefinition::new("main_image", FieldKind::Documents, 2).universal(true))
}

/// A richer type exercising several field kinds
pub fn page_type() -> ContentType {
	ContentType::new("page")
		.field(FieldDefinition::new("title", FieldKind::Scalar(ScalarKind::Text), 1))
		.field(
			FieldDefinition::new("hits", FieldKind::Scalar(ScalarKind::Integer), 2).indexed(true),
		)
		.field(
			FieldDefinition::new("owner", FieldKind::ManyToOne, 3)
				.config(json!({"target_class": "User"})),
		)
		.field(FieldDefinition::new("gallery", FieldKind::Documents, 4))
		.field(FieldDefinition::new("settings", FieldKind::Structured, 5))
}

/// Resolves a variant's address from its node's ancestry names
pub struct PathResolver {
	repo: Arc<MemoryRepository>,
}

impl PathResolver {
	pub fn new(repo: Arc<MemoryRepository>) -> Self {
		Self { repo }
	}
}

#[async_trait]
impl AddressResolver for PathResolver {
	async fn address_of(&self, variant: &Variant) -> EngineResult<String> {
		let mut segments = Vec::new();
		let mut cursor = Some(variant.node);
		while let Some(id) = cursor {
			let node = self.repo.node(id).await?;
			if !node.name.is_empty() {
				segments.push(node.name.clone());
			}
			cursor = node.parent;
		}
		segments.reverse();
		Ok(format!("/{}", segments.join("/")))
	}
}

/// Counts cache invalidations
#[derive(Default)]
pub struct CountingCache {
	flushes: AtomicUsize,
}

impl CountingCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn flushes(&self) -> usize {
		self.flushes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl CacheInvalidator for CountingCache {
	async fn flush_all(&self) -> EngineResult<()> {
		self.flushes.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}
