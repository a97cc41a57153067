//! Property tests for annotation normalization and document ordering.

use indexmap::IndexMap;
use proptest::prelude::*;

use apidoc_ultra::markdown::link_id;
use apidoc_ultra::visibility::SortKey;
use apidoc_ultra::{parse_expression, Resolver};

fn type_name() -> impl Strategy<Value = String> {
    "X[a-z]{0,5}"
}

proptest! {
    #[test]
    fn union_becomes_bit_or_chain(names in prop::collection::vec(type_name(), 2..6)) {
        let aliases = IndexMap::new();
        let resolver = Resolver::new("m", &aliases);
        let expr = parse_expression(&format!("Union[{}]", names.join(", "))).unwrap();
        prop_assert_eq!(resolver.resolve(&expr), names.join(" | "));
    }

    #[test]
    fn resolving_is_idempotent(names in prop::collection::vec(type_name(), 1..4)) {
        let aliases = IndexMap::new();
        let resolver = Resolver::new("m", &aliases);
        let text = format!("Optional[Dict[str, {}]]", names.join(" | "));
        let once = resolver.resolve(&parse_expression(&text).unwrap());
        let twice = resolver.resolve(&parse_expression(&once).unwrap());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn lower_case_spelling_sorts_first(name in "[a-z][a-z_]{0,8}") {
        prop_assert!(SortKey::new(0, &name) < SortKey::new(0, &name.to_uppercase()));
    }

    #[test]
    fn shallow_modules_sort_first(a in "[a-zA-Z]{1,8}", b in "[a-zA-Z]{1,8}") {
        prop_assert!(SortKey::new(0, &a) < SortKey::new(1, &b));
    }

    #[test]
    fn anchors_have_no_dots(name in "[a-zA-Z_]{1,6}(\\.[a-zA-Z_]{1,6}){0,3}") {
        let id = link_id(&name);
        prop_assert!(!id.contains('.'));
        prop_assert_eq!(id.len(), name.len());
    }
}
