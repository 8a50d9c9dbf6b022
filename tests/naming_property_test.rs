//! Property-based tests for the naming policy

use chrono::NaiveDate;
use proptest::prelude::*;
use uuid::Uuid;

use arbor_cms::error::EngineError;
use arbor_cms::naming::{MAX_NAME_LENGTH, NamePolicy, is_valid_name, slugify};
use arbor_cms::schema::ContentType;

proptest! {
	#[test]
	fn prop_canonical_never_exceeds_bound(title in ".{0,400}") {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();

		match policy.canonical(Some(&title), &ct, &id) {
			Ok(name) => {
				prop_assert!(name.len() <= MAX_NAME_LENGTH);
				prop_assert!(is_valid_name(&name));
			}
			// Titles that slugify to nothing are an invariant violation
			Err(EngineError::EmptyName) => prop_assert!(slugify(&title).is_empty()),
			Err(e) => prop_assert!(false, "unexpected error: {e}"),
		}
	}

	#[test]
	fn prop_safe_never_exceeds_bound(title in "[a-zA-Z0-9 ]{1,400}") {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();

		if slugify(&title).is_empty() {
			return Ok(());
		}
		let name = policy.safe(Some(&title), &ct, &id).unwrap();
		prop_assert!(name.len() <= MAX_NAME_LENGTH);
		prop_assert!(is_valid_name(&name));
	}

	#[test]
	fn prop_consecutive_safe_names_never_collide(title in "[a-z]{1,300}") {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();

		let first = policy.safe(Some(&title), &ct, &id).unwrap();
		let second = policy.safe(Some(&title), &ct, &id).unwrap();
		prop_assert_ne!(first, second);
	}

	#[test]
	fn prop_datestamp_suffix_survives_truncation(title in "[a-z]{1,400}") {
		let policy = NamePolicy::default();
		let ct = ContentType::new("article");
		let id = Uuid::new_v4();
		let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

		let name = policy.datestamped(Some(&title), &ct, &id, date).unwrap();
		prop_assert!(name.len() <= MAX_NAME_LENGTH);
		prop_assert!(name.ends_with("-2024-12-31"));
	}

	#[test]
	fn prop_slugify_output_is_always_a_valid_name_or_empty(text in ".{0,200}") {
		let slug = slugify(&text);
		prop_assert!(slug.is_empty() || is_valid_name(&slug));
	}

	#[test]
	fn fuzz_unreachable_type_suffix_applies(title in "[a-z]{1,100}") {
		let policy = NamePolicy::default();
		let ct = ContentType::new("press release").reachable(false);
		let id = Uuid::new_v4();

		let name = policy.canonical(Some(&title), &ct, &id).unwrap();
		prop_assert!(name.ends_with("-press-release"));
	}
}
