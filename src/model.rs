//! Content node data model
//!
//! A [`Node`] is one item in the content tree, independent of language; its
//! per-language data lives in [`Variant`] records, one per [`Translation`].
//! Relation records (document links, node links, address aliases, attribute
//! values) are ordered collections scoped per field and are used identically
//! by generation, transtyping and duplication.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::schema::ScalarKind;

/// Identity of a [`Node`]
pub type NodeId = Uuid;
/// Identity of a [`Variant`]
pub type VariantId = Uuid;
/// Identity of a [`Translation`]
pub type TranslationId = Uuid;
/// Identity of an external document entity
pub type DocumentId = Uuid;

/// Publication status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
	/// Not yet published
	Draft,
	/// Publicly reachable
	Published,
	/// Retired, kept for history
	Archived,
}

/// One item in the content tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
	/// Identity
	pub id: NodeId,
	/// Name of the node's content type
	pub type_name: String,
	/// Parent node, `None` for roots
	pub parent: Option<NodeId>,
	/// Ordered position among siblings
	pub position: i32,
	/// Globally unique slug-like name
	pub name: String,
	/// Publication status
	pub status: NodeStatus,
	/// Advisory lock preventing structural mutation
	pub locked: bool,
	/// Time-to-live in seconds, from the type default
	pub ttl: Option<i64>,
}

impl Node {
	/// Creates a draft node of the given type
	pub fn new(type_name: impl Into<String>, parent: Option<NodeId>) -> Self {
		Self {
			id: Uuid::new_v4(),
			type_name: type_name.into(),
			parent,
			position: 0,
			name: String::new(),
			status: NodeStatus::Draft,
			locked: false,
			ttl: None,
		}
	}
}

/// Language-specific data record for a node in one translation
///
/// Field values are stored under the field names dictated by the node's
/// content type; values for fields the type does not define are never read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
	/// Identity
	pub id: VariantId,
	/// Owning node
	pub node: NodeId,
	/// Translation this variant belongs to
	pub translation: TranslationId,
	/// Title, source of the node's derived name
	pub title: Option<String>,
	/// Publication timestamp
	pub published_at: Option<DateTime<Utc>>,
	/// Generated storage class this variant is persisted against
	pub storage_class: String,
	/// Per-field column values
	pub values: BTreeMap<String, FieldValue>,
}

impl Variant {
	/// Creates an empty variant bound to a node and translation
	pub fn new(node: NodeId, translation: TranslationId, storage_class: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			node,
			translation,
			title: None,
			published_at: None,
			storage_class: storage_class.into(),
			values: BTreeMap::new(),
		}
	}
}

/// A language known to the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
	/// Identity
	pub id: TranslationId,
	/// Locale code, e.g. `fr` or `en`
	pub locale: String,
	/// Whether this is the system default translation
	pub is_default: bool,
}

impl Translation {
	/// Creates a translation
	pub fn new(locale: impl Into<String>, is_default: bool) -> Self {
		Self {
			id: Uuid::new_v4(),
			locale: locale.into(),
			is_default,
		}
	}
}

/// Association between a variant and a document, scoped per field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLink {
	/// Identity
	pub id: Uuid,
	/// Owning variant
	pub variant: VariantId,
	/// Referenced document entity (never duplicated)
	pub document: DocumentId,
	/// Field the association belongs to
	pub field: String,
	/// Position within the field's collection
	pub position: i32,
}

/// Association between two nodes, scoped per field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLink {
	/// Identity
	pub id: Uuid,
	/// Source node owning the edge
	pub source: NodeId,
	/// Target node (never duplicated, only re-pointed)
	pub target: NodeId,
	/// Field the association belongs to
	pub field: String,
	/// Position within the field's collection
	pub position: i32,
}

/// Alternate address under which a variant resolves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressAlias {
	/// Identity
	pub id: Uuid,
	/// Variant the alias resolves to
	pub variant: VariantId,
	/// Alias string
	pub alias: String,
}

/// Attribute-value record attached to a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
	/// Identity
	pub id: Uuid,
	/// Owning node
	pub node: NodeId,
	/// Attribute definition name (referenced, never duplicated)
	pub attribute: String,
	/// Position among the node's attribute values
	pub position: i32,
}

/// Per-language sub-record of an [`AttributeValue`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValueVariant {
	/// Identity
	pub id: Uuid,
	/// Owning attribute value
	pub attribute_value: Uuid,
	/// Translation the value applies to
	pub translation: TranslationId,
	/// Stored value
	pub value: String,
}

/// HTTP semantics of a redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectStatus {
	/// 301
	Permanent,
	/// 302
	Temporary,
}

/// Stored mapping from a stale address to a variant's current address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirect {
	/// Identity
	pub id: Uuid,
	/// The old address string
	pub source: String,
	/// Variant the old address should resolve to
	pub target: VariantId,
	/// HTTP semantics
	pub status: RedirectStatus,
}

/// A stored field value
///
/// The tagged representation mirrors the storage columns the field-kind
/// strategies declare; lookup-collection kinds have no stored value here,
/// their data lives in relation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
	/// Absent value
	Null,
	/// Text scalar
	Text(String),
	/// Integer scalar
	Integer(i64),
	/// Boolean scalar
	Boolean(bool),
	/// Date scalar
	Date(NaiveDate),
	/// Single reference (many-to-one)
	Reference(Uuid),
	/// Ordered references (many-to-many, plain or via proxy)
	References(Vec<Uuid>),
	/// Opaque structured text, parsed on demand
	Structured(String),
}

impl FieldValue {
	/// Default value for a scalar subtype: boolean→false, integer→0, others→null
	pub fn scalar_default(kind: ScalarKind) -> FieldValue {
		match kind {
			ScalarKind::Boolean => FieldValue::Boolean(false),
			ScalarKind::Integer => FieldValue::Integer(0),
			ScalarKind::Text | ScalarKind::Date => FieldValue::Null,
		}
	}

	/// Coerces a value to the declared scalar subtype, as generated setters do
	///
	/// # Examples
	///
	/// ```
	/// use arbor_cms::model::FieldValue;
	/// use arbor_cms::schema::ScalarKind;
	///
	/// let v = FieldValue::Text("42".into()).coerce(ScalarKind::Integer);
	/// assert_eq!(v, FieldValue::Integer(42));
	/// let v = FieldValue::Integer(0).coerce(ScalarKind::Boolean);
	/// assert_eq!(v, FieldValue::Boolean(false));
	/// ```
	pub fn coerce(self, kind: ScalarKind) -> FieldValue {
		match (kind, self) {
			(_, FieldValue::Null) => FieldValue::Null,
			(ScalarKind::Text, FieldValue::Text(s)) => FieldValue::Text(s),
			(ScalarKind::Text, FieldValue::Integer(i)) => FieldValue::Text(i.to_string()),
			(ScalarKind::Text, FieldValue::Boolean(b)) => FieldValue::Text(b.to_string()),
			(ScalarKind::Text, FieldValue::Date(d)) => FieldValue::Text(d.to_string()),
			(ScalarKind::Integer, FieldValue::Integer(i)) => FieldValue::Integer(i),
			(ScalarKind::Integer, FieldValue::Text(s)) => {
				s.trim().parse().map(FieldValue::Integer).unwrap_or(FieldValue::Null)
			}
			(ScalarKind::Integer, FieldValue::Boolean(b)) => FieldValue::Integer(i64::from(b)),
			(ScalarKind::Boolean, FieldValue::Boolean(b)) => FieldValue::Boolean(b),
			(ScalarKind::Boolean, FieldValue::Integer(i)) => FieldValue::Boolean(i != 0),
			(ScalarKind::Boolean, FieldValue::Text(s)) => {
				FieldValue::Boolean(matches!(s.as_str(), "true" | "1" | "yes"))
			}
			(ScalarKind::Date, FieldValue::Date(d)) => FieldValue::Date(d),
			(ScalarKind::Date, FieldValue::Text(s)) => {
				s.parse().map(FieldValue::Date).unwrap_or(FieldValue::Null)
			}
			_ => FieldValue::Null,
		}
	}
}
