//! # Arbor CMS
//!
//! Dynamic content schema and node lifecycle engine for tree-structured,
//! multilingual content.
//!
//! Editors define [`ContentType`](schema::ContentType)s at runtime (ordered
//! fields, field kinds, relations); this crate materializes each type into a
//! concrete storage-class definition and manages the lifecycle of the content
//! nodes built against it: transtyping between types, deep duplication of
//! subtrees, unique naming, tree moves with redirect preservation, and
//! propagation of language-independent field values across translations.
//!
//! ## Architecture
//!
//! ```text
//! arbor-cms
//! ├── schema     - ContentType / FieldDefinition data model, type catalog
//! ├── model      - Node, Variant, Translation, relation records, Redirect
//! ├── fields     - one code-generation strategy per field kind + registry
//! ├── compiler   - ContentType -> StorageClass IR, generated-class store
//! ├── naming     - canonical / safe / datestamped name derivations
//! ├── repository - async collaborator contracts + in-memory backend
//! ├── factory    - node creation against a type
//! ├── transtype  - migrate a node from one type to another
//! ├── duplicate  - deep-clone a node and its subtree
//! ├── propagate  - copy universal field values across translations
//! └── mover      - reparent/reposition nodes, record redirects
//! ```
//!
//! Persistence, routing and caching are consumed through the contracts in
//! [`repository`]; the engine never talks to a database directly.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod compiler;
pub mod duplicate;
pub mod error;
pub mod factory;
pub mod fields;
pub mod model;
pub mod mover;
pub mod naming;
pub mod propagate;
pub mod repository;
pub mod schema;
pub mod transtype;

// Prelude for convenient imports
pub mod prelude {
	//! Convenient re-exports of commonly used items

	pub use crate::compiler::{GeneratedClassStore, StorageClass, StorageClassCompiler};
	pub use crate::duplicate::DuplicationEngine;
	pub use crate::error::{EngineError, EngineResult};
	pub use crate::factory::{CreateNode, NodeFactory};
	pub use crate::fields::{CopyMode, FieldGenerator, GeneratorRegistry};
	pub use crate::model::{
		FieldValue, Node, NodeId, NodeStatus, Redirect, RedirectStatus, Translation, Variant,
	};
	pub use crate::mover::TreeMover;
	pub use crate::naming::{NameChecker, NamePolicy, NamingOptions};
	pub use crate::propagate::TranslationPropagator;
	pub use crate::repository::{
		AddressResolver, CacheInvalidator, ContentRepository, MemoryRepository, StorageClassLoader,
	};
	pub use crate::schema::{ContentType, FieldDefinition, FieldKind, ScalarKind, SchemaCatalog};
	pub use crate::transtype::{RelationTargetRule, TranstypeEngine, TranstypeOptions};
}
