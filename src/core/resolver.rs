// src/core/resolver.rs

//! Turns a user token into exactly one item of a previously listed collection.
//!
//! Resolution order: a positive integer is a 1-based ordinal, then an exact id
//! match, then a case-insensitive name match. An out-of-range ordinal is
//! `NotFound`; it never falls through to id or name matching.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No item matches '{token}'.")]
    NotFound { token: String },
    #[error("'{token}' matches several items: {}. Use the number or the id.", .candidates.join(", "))]
    Ambiguous {
        token: String,
        candidates: Vec<String>,
    },
}

/// Something a user can select by number, id or name.
pub trait Resolvable {
    fn id(&self) -> Option<&str>;
    fn display_name(&self) -> Option<&str>;
}

impl Resolvable for Value {
    fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }

    fn display_name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }
}

/// A successful resolution.
#[derive(Debug, PartialEq, Eq)]
pub struct Resolved<'a, T> {
    pub item: &'a T,
    /// 1-based position of `item` in the list.
    pub ordinal: usize,
}

/// Picks one item for `token`: an ordinal, then an exact id, then a
/// case-insensitive name.
///
/// # Errors
/// [`ResolveError::NotFound`] when nothing matches or the ordinal is out of
/// range, [`ResolveError::Ambiguous`] when several names match.
pub fn resolve<'a, T: Resolvable>(items: &'a [T], token: &str) -> Result<Resolved<'a, T>, ResolveError> {
    let token = token.trim();
    let not_found = || ResolveError::NotFound {
        token: token.to_string(),
    };

    if let Ok(n) = token.parse::<usize>() {
        if n >= 1 {
            let item = items.get(n - 1).ok_or_else(not_found)?;
            return Ok(Resolved { item, ordinal: n });
        }
    }

    if let Some((i, item)) = items
        .iter()
        .enumerate()
        .find(|(_, item)| item.id() == Some(token))
    {
        return Ok(Resolved {
            item,
            ordinal: i + 1,
        });
    }

    let lowered = token.to_lowercase();
    let matches: Vec<(usize, &T)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            item.display_name()
                .is_some_and(|name| name.to_lowercase() == lowered)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(not_found()),
        [(i, item)] => Ok(Resolved {
            item: *item,
            ordinal: *i + 1,
        }),
        many => Err(ResolveError::Ambiguous {
            token: token.to_string(),
            candidates: many
                .iter()
                .map(|(i, item)| item.id().map_or_else(|| format!("#{}", i + 1), str::to_string))
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn items() -> Vec<Value> {
        vec![
            json!({"id": "vpc-aaa", "name": "Prod"}),
            json!({"id": "vpc-bbb", "name": "staging"}),
            json!({"id": "vpc-ccc", "name": "prod"}),
            json!({"id": "3", "name": "numeric-id"}),
        ]
    }

    #[test]
    fn test_ordinal_wins_over_id() {
        let items = items();
        let resolved = resolve(&items, "3").unwrap();
        assert_eq!(resolved.ordinal, 3);
        assert_eq!(resolved.item.id(), Some("vpc-ccc"));
    }

    #[test]
    fn test_out_of_range_ordinal_is_not_found() {
        let items = items();
        assert_eq!(
            resolve(&items, "9"),
            Err(ResolveError::NotFound {
                token: "9".to_string()
            })
        );
        assert!(matches!(resolve(&items, "0"), Err(ResolveError::NotFound { .. })));
    }

    #[test]
    fn test_exact_id_match() {
        let items = items();
        let resolved = resolve(&items, "vpc-bbb").unwrap();
        assert_eq!(resolved.ordinal, 2);
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let items = items();
        let resolved = resolve(&items, "STAGING").unwrap();
        assert_eq!(resolved.item.id(), Some("vpc-bbb"));
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let items = items();
        match resolve(&items, "prod") {
            Err(ResolveError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["vpc-aaa", "vpc-ccc"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_list_is_not_found() {
        let items: Vec<Value> = Vec::new();
        assert!(matches!(resolve(&items, "1"), Err(ResolveError::NotFound { .. })));
        assert!(matches!(resolve(&items, "x"), Err(ResolveError::NotFound { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_resolution_is_idempotent(token in "[a-z0-9-]{0,8}") {
            let items = items();
            let first = resolve(&items, &token).map(|r| r.ordinal);
            let second = resolve(&items, &token).map(|r| r.ordinal);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_every_ordinal_in_range_resolves_to_its_position(n in 1usize..=4) {
            let items = items();
            let resolved = resolve(&items, &n.to_string()).unwrap();
            prop_assert_eq!(resolved.ordinal, n);
            prop_assert!(std::ptr::eq(resolved.item, &items[n - 1]));
        }
    }
}
