//! Lock-key ordering for the write path
//!
//! Every write call locks the rows it touches in the order produced here.
//! Because the order is a total order over the key identity and does not
//! depend on how the caller arranged its input, two writers with overlapping
//! key sets always acquire their common keys in the same sequence and cannot
//! wait on each other in a cycle.

use std::collections::BTreeSet;

use crate::model::{TupleKey, UserType};
use crate::tuple_utils::{get_user_type_from_user, split_object};

/// Identity of one tuple row, without its condition
///
/// Field order defines the derived `Ord`, which is the lock order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleLockKey {
    pub object_type: String,
    pub object_id: String,
    pub relation: String,
    pub user: String,
    pub user_type: UserType,
}

impl TupleLockKey {
    pub fn from_tuple_key(key: &TupleKey) -> Self {
        let (object_type, object_id) = split_object(&key.object);
        Self {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            relation: key.relation.clone(),
            user: key.user.clone(),
            user_type: get_user_type_from_user(&key.user),
        }
    }

    /// `object#relation@user`, the key used for locked-snapshot lookups
    pub fn tuple_key_string(&self) -> String {
        format!(
            "{}:{}#{}@{}",
            self.object_type, self.object_id, self.relation, self.user
        )
    }
}

/// Deduplicate and order the keys touched by a write call
pub fn make_tuple_lock_keys(deletes: &[TupleKey], writes: &[TupleKey]) -> Vec<TupleLockKey> {
    deletes
        .iter()
        .chain(writes.iter())
        .map(TupleLockKey::from_tuple_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
