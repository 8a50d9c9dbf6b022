//! Transtyping engine integration tests

mod common;

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use arbor_cms::compiler::{GeneratedClassStore, StorageClassCompiler};
use arbor_cms::error::EngineError;
use arbor_cms::fields::GeneratorRegistry;
use arbor_cms::model::{AddressAlias, DocumentLink, FieldValue, Node, Variant};
use arbor_cms::repository::{ContentRepository, MemoryRepository, StorageClassLoader};
use arbor_cms::schema::{ContentType, FieldDefinition, FieldKind, ScalarKind};
use arbor_cms::transtype::{RelationTargetRule, TranstypeEngine, TranstypeOptions};

struct Fixture {
	repo: Arc<MemoryRepository>,
	store: Arc<GeneratedClassStore>,
	engine: TranstypeEngine,
}

fn fixture(compiled: &[&ContentType]) -> Fixture {
	let (repo, _fr, _en) = common::repo_with_translations();
	let compiler = StorageClassCompiler::with_defaults();
	let store = Arc::new(GeneratedClassStore::new());
	for ct in compiled {
		store.install(compiler.compile(ct).unwrap());
	}
	let engine = TranstypeEngine::new(
		repo.clone(),
		store.clone(),
		Arc::new(GeneratorRegistry::with_defaults()),
	);
	Fixture {
		repo,
		store,
		engine,
	}
}

fn blog_type() -> ContentType {
	ContentType::new("blog post")
		.field(FieldDefinition::new("body", FieldKind::Scalar(ScalarKind::Text), 1))
		.field(FieldDefinition::new("legacy", FieldKind::Scalar(ScalarKind::Text), 2))
		.field(FieldDefinition::new("gallery", FieldKind::Documents, 3))
}

fn news_type() -> ContentType {
	ContentType::new("news item")
		.field(FieldDefinition::new("body", FieldKind::Scalar(ScalarKind::Text), 1))
		.field(FieldDefinition::new("teaser", FieldKind::Scalar(ScalarKind::Text), 2))
		.field(FieldDefinition::new("gallery", FieldKind::Documents, 3))
}

async fn node_with_variants(
	repo: &Arc<MemoryRepository>,
	ct: &ContentType,
) -> (Node, Vec<Variant>) {
	let mut node = Node::new(ct.name.clone(), None);
	node.name = format!("n-{}", Uuid::new_v4().simple());
	repo.persist_node(&node).await.unwrap();

	let mut variants = Vec::new();
	for translation in repo.translations().await.unwrap() {
		let mut variant = Variant::new(node.id, translation.id, ct.storage_class.clone());
		variant.title = Some(format!("Title {}", translation.locale));
		variant
			.values
			.insert("body".to_string(), FieldValue::Text(format!("body {}", translation.locale)));
		variant
			.values
			.insert("legacy".to_string(), FieldValue::Text("old data".to_string()));
		repo.persist_variant(&variant).await.unwrap();
		variants.push(variant);
	}
	(node, variants)
}

#[tokio::test]
async fn matched_fields_are_preserved_across_every_variant() {
	// Arrange
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let (mut node, _) = node_with_variants(&f.repo, &source).await;

	// Act
	let report = f
		.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert
	assert_eq!(report.migrated_variants, 2);
	assert_eq!(node.type_name, dest.name);
	for variant in f.repo.variants_of(node.id).await.unwrap() {
		let body = variant.values.get("body").unwrap();
		assert!(matches!(body, FieldValue::Text(t) if t.starts_with("body ")));
		assert_eq!(variant.storage_class, dest.storage_class);
	}
}

#[tokio::test]
async fn unmatched_source_fields_do_not_leak() {
	// Arrange - `legacy` exists only on the source type
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let (mut node, _) = node_with_variants(&f.repo, &source).await;

	// Act
	let report = f
		.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert - dropped, and destination-only fields sit at generated defaults
	assert!(report.dropped.contains(&"legacy".to_string()));
	for variant in f.repo.variants_of(node.id).await.unwrap() {
		assert!(!variant.values.contains_key("legacy"));
		assert_eq!(variant.values.get("teaser"), Some(&FieldValue::Null));
	}
}

#[tokio::test]
async fn same_name_different_kind_is_unmatched() {
	// Arrange - `body` is text on the source, structured on the destination
	let source = ContentType::new("a")
		.field(FieldDefinition::new("body", FieldKind::Scalar(ScalarKind::Text), 1));
	let dest = ContentType::new("b").field(FieldDefinition::new("body", FieldKind::Structured, 1));
	let f = fixture(&[&source, &dest]);

	// Act
	let (matched, dropped) =
		f.engine
			.match_fields(&source, &dest, RelationTargetRule::Lenient);

	// Assert - not coerced
	assert!(matched.is_empty());
	assert_eq!(dropped.len(), 1);
}

#[tokio::test]
async fn missing_destination_class_aborts_before_touching_variants() {
	// Arrange - destination type is never compiled
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source]);
	let (mut node, originals) = node_with_variants(&f.repo, &source).await;

	// Act
	let err = f
		.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap_err();

	// Assert - source variants remain intact
	assert!(matches!(err, EngineError::StorageClassMissing(_)));
	assert!(!f.store.class_exists(&dest.storage_class));
	let survivors = f.repo.variants_of(node.id).await.unwrap();
	assert_eq!(survivors.len(), originals.len());
	for original in &originals {
		assert!(survivors.iter().any(|v| v.id == original.id));
	}
}

#[tokio::test]
async fn stale_destination_class_is_rejected() {
	// Arrange - destination edited after compilation
	let source = blog_type();
	let mut dest = news_type();
	let f = fixture(&[&source, &dest]);
	dest.bump_version();
	let (mut node, _) = node_with_variants(&f.repo, &source).await;

	// Act & Assert
	let err = f
		.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, EngineError::StorageClassStale { .. }));
}

#[tokio::test]
async fn node_without_variants_switches_type_pointer_only() {
	// Arrange
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let mut node = Node::new(source.name.clone(), None);
	node.name = "empty-node".to_string();
	f.repo.persist_node(&node).await.unwrap();

	// Act
	let report = f
		.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert
	assert_eq!(report.migrated_variants, 0);
	assert_eq!(f.repo.node(node.id).await.unwrap().type_name, dest.name);
}

#[tokio::test]
async fn document_associations_follow_matched_document_fields() {
	// Arrange - two gallery documents on the French variant
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let (mut node, originals) = node_with_variants(&f.repo, &source).await;
	let docs = [Uuid::new_v4(), Uuid::new_v4()];
	for (position, document) in docs.iter().enumerate() {
		f.repo
			.persist_document_link(&DocumentLink {
				id: Uuid::new_v4(),
				variant: originals[0].id,
				document: *document,
				field: "gallery".to_string(),
				position: position as i32,
			})
			.await
			.unwrap();
	}

	// Act
	f.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert - same documents, same order, fresh link records
	let variants = f.repo.variants_of(node.id).await.unwrap();
	let migrated = variants
		.iter()
		.find(|v| v.translation == originals[0].translation)
		.unwrap();
	let links = f
		.repo
		.document_links_for(migrated.id, Some("gallery"))
		.await
		.unwrap();
	let linked: Vec<Uuid> = links.iter().map(|l| l.document).collect();
	assert_eq!(linked, docs);
	// old variant's links are gone
	let stale = f
		.repo
		.document_links_for(originals[0].id, None)
		.await
		.unwrap();
	assert!(stale.is_empty());
}

#[tokio::test]
async fn aliases_are_recreated_against_the_new_variants() {
	// Arrange
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let (mut node, originals) = node_with_variants(&f.repo, &source).await;
	f.repo
		.persist_alias(&AddressAlias {
			id: Uuid::new_v4(),
			variant: originals[0].id,
			alias: "legacy-address".to_string(),
		})
		.await
		.unwrap();

	// Act
	f.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert
	let variants = f.repo.variants_of(node.id).await.unwrap();
	let migrated = variants
		.iter()
		.find(|v| v.translation == originals[0].translation)
		.unwrap();
	let aliases = f.repo.aliases_of(migrated.id).await.unwrap();
	assert_eq!(aliases.len(), 1);
	assert_eq!(aliases[0].alias, "legacy-address");
	assert!(f.repo.aliases_of(originals[0].id).await.unwrap().is_empty());
}

#[tokio::test]
async fn strict_rule_drops_relation_fields_with_diverging_targets() {
	// Arrange - same name and kind, different configured targets
	let source = ContentType::new("a").field(
		FieldDefinition::new("owner", FieldKind::ManyToOne, 1)
			.config(json!({"target_class": "User"})),
	);
	let dest = ContentType::new("b").field(
		FieldDefinition::new("owner", FieldKind::ManyToOne, 1)
			.config(json!({"target_class": "Group"})),
	);
	let f = fixture(&[&source, &dest]);

	// Act
	let (lenient, _) = f
		.engine
		.match_fields(&source, &dest, RelationTargetRule::Lenient);
	let (strict, dropped) = f
		.engine
		.match_fields(&source, &dest, RelationTargetRule::Strict);

	// Assert
	assert_eq!(lenient.len(), 1);
	assert!(strict.is_empty());
	assert_eq!(dropped.len(), 1);
}

#[tokio::test]
async fn engine_never_flushes_the_unit_of_work() {
	// Arrange
	let source = blog_type();
	let dest = news_type();
	let f = fixture(&[&source, &dest]);
	let (mut node, _) = node_with_variants(&f.repo, &source).await;

	// Act
	f.engine
		.transtype(&mut node, &source, &dest, &TranstypeOptions::default())
		.await
		.unwrap();

	// Assert - committing is the caller's responsibility, exactly once
	assert_eq!(f.repo.flush_count(), 0);
}
