//! Helpers over the string forms of objects, users and tuple keys
//!
//! Objects are `type:id`. Users are `type:id`, `type:*` (wildcard),
//! `type:id#relation` (userset) or the bare `*`.

use std::collections::HashSet;

use crate::errors::TupleError;
use crate::model::{RelationshipCondition, TupleKey, UserType};

/// Split `type:id` at the first colon
///
/// An object without a colon yields an empty type and the whole input as id;
/// a trailing colon yields an empty id.
pub fn split_object(object: &str) -> (&str, &str) {
    match object.split_once(':') {
        Some((object_type, object_id)) => (object_type, object_id),
        None => ("", object),
    }
}

pub fn build_object(object_type: &str, object_id: &str) -> String {
    format!("{}:{}", object_type, object_id)
}

/// Split `type:id#relation` into the object part and the relation
///
/// Users without `#` return an empty relation.
pub fn split_userset(user: &str) -> (&str, &str) {
    match user.rsplit_once('#') {
        Some((object, relation)) => (object, relation),
        None => (user, ""),
    }
}

/// Usersets and wildcards (typed or bare) are `UserSet`; anything else is `User`
pub fn get_user_type_from_user(user: &str) -> UserType {
    if user.contains('#') || is_wildcard(user) {
        UserType::UserSet
    } else {
        UserType::User
    }
}

/// `*` or `type:*`
pub fn is_wildcard(user: &str) -> bool {
    user == "*" || user.ends_with(":*")
}

pub fn tuple_key_to_string(key: &TupleKey) -> String {
    format!("{}#{}@{}", key.object, key.relation, key.user)
}

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ':' | '#' | '@'))
}

fn validate_object(object: &str) -> Result<(), TupleError> {
    let (object_type, object_id) = split_object(object);
    let id_ok = !object_id.is_empty()
        && !object_id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '@'));
    if is_valid_identifier(object_type) && id_ok {
        Ok(())
    } else {
        Err(TupleError::InvalidObject {
            object: object.to_string(),
        })
    }
}

fn validate_user(user: &str) -> Result<(), TupleError> {
    if user == "*" {
        return Ok(());
    }
    let invalid = || TupleError::InvalidUser {
        user: user.to_string(),
    };
    let (object, relation) = split_userset(user);
    if user.contains('#') && !is_valid_identifier(relation) {
        return Err(invalid());
    }
    let (user_type, user_id) = split_object(object);
    if !is_valid_identifier(user_type) || user_id.is_empty() || user_id.contains('@') {
        return Err(invalid());
    }
    Ok(())
}

/// Check that a tuple key is well formed
///
/// # Errors
///
/// Returns the first malformed component found (object, then relation, then
/// user, then condition).
pub fn validate_tuple_key(key: &TupleKey) -> Result<(), TupleError> {
    validate_object(&key.object)?;
    if !is_valid_identifier(&key.relation) {
        return Err(TupleError::InvalidRelation {
            relation: key.relation.clone(),
        });
    }
    validate_user(&key.user)?;
    if let Some(condition) = &key.condition {
        if condition.name.trim().is_empty() {
            return Err(TupleError::InvalidCondition {
                tuple_key: tuple_key_to_string(key),
                reason: "condition name must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Validate a whole write request before any round trip is made
///
/// # Errors
///
/// - `ExceedsMaxTuplesPerWrite` when `deletes.len() + writes.len()` is above `max_tuples`
/// - any key-level error from [`validate_tuple_key`]
/// - `DuplicateTupleInWrite` when a key appears twice across both sets
pub fn validate_write_request(
    deletes: &[TupleKey],
    writes: &[TupleKey],
    max_tuples: usize,
) -> Result<(), TupleError> {
    let count = deletes.len() + writes.len();
    if count > max_tuples {
        return Err(TupleError::ExceedsMaxTuplesPerWrite {
            count,
            limit: max_tuples,
        });
    }

    let mut seen = HashSet::with_capacity(count);
    for key in deletes.iter().chain(writes.iter()) {
        validate_tuple_key(key)?;
        let rendered = tuple_key_to_string(key);
        if !seen.insert(rendered.clone()) {
            return Err(TupleError::DuplicateTupleInWrite {
                tuple_key: rendered,
            });
        }
    }
    Ok(())
}

/// Encode a condition into its `(condition_name, condition_context)` columns
///
/// # Errors
///
/// Fails only if the context cannot be serialized.
pub fn encode_condition(
    condition: Option<&RelationshipCondition>,
) -> Result<(Option<String>, Option<Vec<u8>>), TupleError> {
    match condition {
        None => Ok((None, None)),
        Some(c) => {
            let context = match &c.context {
                Some(map) if !map.is_empty() => Some(serde_json::to_vec(map)?),
                _ => None,
            };
            Ok((Some(c.name.clone()), context))
        }
    }
}

/// Rebuild a condition from its persisted columns
///
/// # Errors
///
/// Fails if the context blob is not a JSON object.
pub fn decode_condition(
    name: Option<String>,
    context: Option<Vec<u8>>,
) -> Result<Option<RelationshipCondition>, TupleError> {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let context = match context {
        Some(bytes) if !bytes.is_empty() => Some(serde_json::from_slice(&bytes)?),
        _ => None,
    };
    Ok(Some(RelationshipCondition { name, context }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_split_object() {
        assert_eq!(split_object("doc:readme"), ("doc", "readme"));
        assert_eq!(split_object("readme"), ("", "readme"));
        assert_eq!(split_object("doc:"), ("doc", ""));
        assert_eq!(split_object("doc:a:b"), ("doc", "a:b"));
    }

    #[test]
    fn test_user_type() {
        assert_eq!(get_user_type_from_user("user:anne"), UserType::User);
        assert_eq!(get_user_type_from_user("user:*"), UserType::UserSet);
        assert_eq!(get_user_type_from_user("group:eng#member"), UserType::UserSet);
        assert_eq!(get_user_type_from_user("*"), UserType::UserSet);
    }

    #[test]
    fn test_wildcard() {
        assert!(is_wildcard("*"));
        assert!(is_wildcard("user:*"));
        assert!(!is_wildcard("user:anne"));
    }

    #[test]
    fn test_validate_tuple_key() {
        assert!(validate_tuple_key(&TupleKey::new("doc:1", "viewer", "user:anne")).is_ok());
        assert!(validate_tuple_key(&TupleKey::new("doc:1", "viewer", "group:eng#member")).is_ok());
        assert!(validate_tuple_key(&TupleKey::new("doc:1", "viewer", "user:*")).is_ok());

        assert!(matches!(
            validate_tuple_key(&TupleKey::new("doc", "viewer", "user:anne")),
            Err(TupleError::InvalidObject { .. })
        ));
        assert!(matches!(
            validate_tuple_key(&TupleKey::new("doc:1", "", "user:anne")),
            Err(TupleError::InvalidRelation { .. })
        ));
        assert!(matches!(
            validate_tuple_key(&TupleKey::new("doc:1", "viewer", "anne")),
            Err(TupleError::InvalidUser { .. })
        ));
        assert!(matches!(
            validate_tuple_key(&TupleKey::new("doc:1", "viewer", "group:eng#")),
            Err(TupleError::InvalidUser { .. })
        ));
        assert!(matches!(
            validate_tuple_key(
                &TupleKey::new("doc:1", "viewer", "user:anne")
                    .with_condition(RelationshipCondition::new(" "))
            ),
            Err(TupleError::InvalidCondition { .. })
        ));
    }

    #[test]
    fn test_validate_write_request_rejects_cross_set_duplicate() {
        let tk = TupleKey::new("doc:1", "viewer", "user:anne");
        let err = validate_write_request(&[tk.clone()], &[tk], 100).unwrap_err();
        assert!(matches!(err, TupleError::DuplicateTupleInWrite { .. }));
    }

    #[test]
    fn test_validate_write_request_limit() {
        let writes: Vec<_> = (0..3)
            .map(|i| TupleKey::new(format!("doc:{}", i), "viewer", "user:anne"))
            .collect();
        assert!(validate_write_request(&[], &writes, 3).is_ok());
        assert_eq!(
            validate_write_request(&[], &writes, 2),
            Err(TupleError::ExceedsMaxTuplesPerWrite { count: 3, limit: 2 })
        );
    }

    #[test]
    fn test_condition_columns() {
        let condition = RelationshipCondition::new("in_region")
            .with_context(json!({"region": "eu"}).as_object().cloned().unwrap());
        let (name, context) = encode_condition(Some(&condition)).unwrap();
        assert_eq!(name.as_deref(), Some("in_region"));
        let decoded = decode_condition(name, context).unwrap().unwrap();
        assert!(decoded.same_as(&condition));

        assert_eq!(encode_condition(None).unwrap(), (None, None));
        assert_eq!(decode_condition(None, None).unwrap(), None);
    }

    #[test]
    fn test_decode_condition_rejects_garbage() {
        let err = decode_condition(Some("c".into()), Some(b"not json".to_vec())).unwrap_err();
        assert!(matches!(err, TupleError::Serialization { .. }));
    }

    proptest! {
        #[test]
        fn prop_build_then_split_object(t in "[a-z_]{1,12}", id in "[a-zA-Z0-9_:-]{0,20}") {
            let object = build_object(&t, &id);
            prop_assert_eq!(split_object(&object), (t.as_str(), id.as_str()));
        }

        #[test]
        fn prop_userset_iff_hash_or_wildcard(user in "[a-z:*#]{0,16}") {
            let expected = user.contains('#') || user == "*" || user.ends_with(":*");
            prop_assert_eq!(get_user_type_from_user(&user) == UserType::UserSet, expected);
        }
    }
}
