//! Node naming policy
//!
//! Derives canonical, safe and datestamped names for nodes from their title,
//! type and identity, bounded to [`MAX_NAME_LENGTH`] characters. A valid
//! name matches `[A-Za-z0-9-]+` exactly. The companion [`NameChecker`]
//! queries both the node-name space and the address-alias space.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::repository::ContentRepository;
use crate::schema::ContentType;

/// Maximum length of a derived node name
pub const MAX_NAME_LENGTH: usize = 250;

/// Length of the high-entropy token appended by the safe derivation
const TOKEN_LENGTH: usize = 13;

/// Slugifies a title into the node-name alphabet
///
/// # Examples
///
/// ```
/// use arbor_cms::naming::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  --Multiple   spaces--  "), "multiple-spaces");
/// assert_eq!(slugify("???"), "");
/// ```
pub fn slugify(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut pending_sep = false;
	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			if pending_sep && !out.is_empty() {
				out.push('-');
			}
			pending_sep = false;
			out.push(ch.to_ascii_lowercase());
		} else {
			pending_sep = true;
		}
	}
	out
}

/// Whether a name matches `[A-Za-z0-9-]+` exactly
///
/// # Examples
///
/// ```
/// use arbor_cms::naming::is_valid_name;
///
/// assert!(is_valid_name("my-article-2024"));
/// assert!(!is_valid_name(""));
/// assert!(!is_valid_name("my article"));
/// assert!(!is_valid_name("café"));
/// ```
pub fn is_valid_name(name: &str) -> bool {
	!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingOptions {
	/// Whether non-reachable types append their slugified type name as a
	/// suffix to the canonical derivation
	pub type_suffix: bool,
}

impl Default for NamingOptions {
	fn default() -> Self {
		Self { type_suffix: true }
	}
}

/// Derives node names from titles, types and identities
#[derive(Debug, Clone, Default)]
pub struct NamePolicy {
	options: NamingOptions,
}

impl NamePolicy {
	/// Creates a policy with the given options
	pub fn new(options: NamingOptions) -> Self {
		Self { options }
	}

	/// Canonical derivation: the slugified title, suffixed with the
	/// slugified type name when the type is not reachable and a suffix
	/// policy is configured
	///
	/// Without a title the name falls back to `type-suffix + "-" + id`. A
	/// title that slugifies to nothing is an invariant violation.
	pub fn canonical(
		&self,
		title: Option<&str>,
		content_type: &ContentType,
		fallback_id: &Uuid,
	) -> EngineResult<String> {
		let type_slug = slugify(&content_type.name);
		match title {
			Some(title) => {
				let slug = slugify(title);
				if slug.is_empty() {
					return Err(EngineError::EmptyName);
				}
				if content_type.reachable || !self.options.type_suffix {
					bounded(&slug, None)
				} else {
					bounded(&slug, Some(&type_slug))
				}
			}
			None => bounded(&type_slug, Some(&fallback_id.simple().to_string())),
		}
	}

	/// Safe derivation: canonical plus a fresh unique token, collision-free
	/// without a repository round trip
	pub fn safe(
		&self,
		title: Option<&str>,
		content_type: &ContentType,
		fallback_id: &Uuid,
	) -> EngineResult<String> {
		let canonical = self.canonical(title, content_type, fallback_id)?;
		bounded(&canonical, Some(&unique_token()))
	}

	/// Datestamped derivation: canonical plus the publication date
	pub fn datestamped(
		&self,
		title: Option<&str>,
		content_type: &ContentType,
		fallback_id: &Uuid,
		date: NaiveDate,
	) -> EngineResult<String> {
		let canonical = self.canonical(title, content_type, fallback_id)?;
		bounded(&canonical, Some(&date.format("%Y-%m-%d").to_string()))
	}
}

/// Joins a base and an optional suffix under the length bound, truncating
/// the base (never the suffix) when the combination would exceed it
fn bounded(base: &str, suffix: Option<&str>) -> EngineResult<String> {
	let name = match suffix {
		None => {
			let mut base = base.to_string();
			base.truncate(MAX_NAME_LENGTH);
			trim_dashes(base)
		}
		Some(suffix) => {
			let budget = MAX_NAME_LENGTH
				.checked_sub(suffix.len() + 1)
				.ok_or_else(|| EngineError::NameTooLong {
					name: suffix.to_string(),
					limit: MAX_NAME_LENGTH,
				})?;
			let mut base = base.to_string();
			base.truncate(budget);
			let base = trim_dashes(base);
			if base.is_empty() {
				return Err(EngineError::EmptyName);
			}
			format!("{base}-{suffix}")
		}
	};
	if name.is_empty() {
		return Err(EngineError::EmptyName);
	}
	Ok(name)
}

fn trim_dashes(mut name: String) -> String {
	while name.ends_with('-') {
		name.pop();
	}
	name
}

/// Fresh high-entropy short token for the safe derivation
pub fn unique_token() -> String {
	let mut token = Uuid::new_v4().simple().to_string();
	token.truncate(TOKEN_LENGTH);
	token
}

/// Repository-backed existence check over node names and address aliases
pub struct NameChecker {
	repo: Arc<dyn ContentRepository>,
}

impl NameChecker {
	/// Creates a checker over the given repository
	pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
		Self { repo }
	}

	/// Reports whether a candidate name is already used by a node or an alias
	pub async fn is_used(&self, name: &str) -> EngineResult<bool> {
		Ok(self.repo.node_name_exists(name).await? || self.repo.alias_exists(name).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::ContentType;

	#[test]
	fn canonical_appends_type_suffix_for_unreachable_types() {
		let policy = NamePolicy::default();
		let ct = ContentType::new("press release").reachable(false);
		let id = Uuid::new_v4();
		let name = policy.canonical(Some("Big News"), &ct, &id).unwrap();
		assert_eq!(name, "big-news-press-release");
	}

	#[test]
	fn canonical_skips_type_suffix_for_reachable_types() {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();
		assert_eq!(policy.canonical(Some("Big News"), &ct, &id).unwrap(), "big-news");
	}

	#[test]
	fn canonical_without_title_falls_back_to_type_and_id() {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();
		let name = policy.canonical(None, &ct, &id).unwrap();
		assert!(name.starts_with("article-"));
		assert!(is_valid_name(&name));
	}

	#[test]
	fn canonical_rejects_title_that_slugifies_to_nothing() {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();
		assert!(matches!(
			policy.canonical(Some("???"), &ct, &id),
			Err(EngineError::EmptyName)
		));
	}

	#[test]
	fn truncation_preserves_the_suffix() {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();
		let long_title = "a".repeat(400);
		let name = policy
			.datestamped(Some(&long_title), &ct, &id, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
			.unwrap();
		assert!(name.len() <= MAX_NAME_LENGTH);
		assert!(name.ends_with("-2024-03-09"));
	}
}
