//! Engine error types
//!
//! The taxonomy distinguishes configuration errors (fail fast, before any
//! write), invariant violations (caller-visible, never retried), collision
//! errors that could not be resolved procedurally, and repository faults.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the schema and lifecycle engine
#[derive(Error, Debug)]
pub enum EngineError {
	/// A field's configuration blob is missing a required key or cannot be parsed
	#[error("invalid configuration for field `{field}`: {reason}")]
	FieldConfig {
		/// Field name as declared on the content type
		field: String,
		/// Human-readable description of the problem
		reason: String,
	},

	/// No generator is registered for the given field kind
	#[error("no generator registered for field kind `{0}`")]
	UnknownFieldKind(String),

	/// The destination storage class has not been compiled
	#[error("storage class `{0}` does not exist or is not compiled")]
	StorageClassMissing(String),

	/// The compiled storage class is older than the content type definition
	#[error("storage class `{class}` is stale against type version {current}")]
	StorageClassStale {
		/// Generated class name
		class: String,
		/// Current version of the content type
		current: u32,
	},

	/// Structural mutation attempted on a locked node
	#[error("entity {0} is locked")]
	LockedEntity(Uuid),

	/// A derived name exceeds the maximum length bound
	#[error("name `{name}` exceeds the {limit}-character bound")]
	NameTooLong {
		/// The offending name
		name: String,
		/// The configured bound
		limit: usize,
	},

	/// The canonical name derivation produced an empty name
	#[error("cannot derive a name: title slugifies to nothing and no fallback is available")]
	EmptyName,

	/// A node already carries a variant in the requested translation
	#[error("node {node} already has a variant for translation {translation}")]
	VariantExists {
		/// The node
		node: Uuid,
		/// The occupied translation
		translation: Uuid,
	},

	/// Reparenting a node under its own descendant
	#[error("moving node {node} under {parent} would create a cycle")]
	MoveCycle {
		/// The node being moved
		node: Uuid,
		/// The rejected new parent
		parent: Uuid,
	},

	/// The node factory was given neither an existing node nor a content type
	#[error("node creation requires an existing node or a content type")]
	MissingType,

	/// A referenced entity does not exist
	#[error("{kind} not found: {id}")]
	NotFound {
		/// Entity kind (node, variant, translation, ...)
		kind: &'static str,
		/// Identifier that failed to resolve
		id: String,
	},

	/// Fault reported by the external persistence layer
	#[error("repository error: {0}")]
	Repository(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
