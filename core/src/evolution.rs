use std::collections::BTreeMap;

use serde_json::Value;

use crate::pokeapi::ChainLink;

/// Flattened transition conditions for one evolution edge:
/// condition name -> scalar requirement.
pub type ConditionMap = BTreeMap<String, Value>;

/// Flat view of a whole chain: every species in the chain appears as a key,
/// mapping each of its next forms to the conditions for that transition.
/// Final forms map to an empty set.
pub type ChainMap = BTreeMap<String, BTreeMap<String, ConditionMap>>;

#[derive(Debug, Clone)]
pub struct NormalizedChain {
    /// Depth of each species: base form = 1, one more per `evolves_to` level.
    pub tiers: BTreeMap<String, i64>,
    pub links: ChainMap,
}

/// Flatten the conditions of one evolution edge.
///
/// Only the first detail entry counts; a species that can evolve through
/// several alternative condition sets keeps just the first alternative, and
/// an empty detail list yields an empty map. Within the entry, `trigger` and
/// any other object-valued condition collapse to the object's `name`, and
/// null / false / empty-string requirements are dropped.
#[must_use]
pub fn flatten_conditions(details: &[Value]) -> ConditionMap {
    let mut out = ConditionMap::new();
    let Some(Value::Object(first)) = details.first() else {
        return out;
    };
    for (condition, need) in first {
        if condition == "trigger" {
            if let Some(name) = need.get("name").and_then(Value::as_str) {
                out.insert("trigger".to_string(), Value::String(name.to_string()));
            }
            continue;
        }
        match need {
            Value::Null | Value::Bool(false) => {}
            Value::String(s) if s.is_empty() => {}
            Value::Object(obj) => {
                if let Some(name) = obj.get("name").and_then(Value::as_str) {
                    out.insert(condition.clone(), Value::String(name.to_string()));
                }
            }
            other => {
                out.insert(condition.clone(), other.clone());
            }
        }
    }
    out
}

/// Convert the remote nested chain tree into the flat per-species view.
/// Depth is not capped: a hypothetical chain deeper than three tiers keeps
/// incrementing.
#[must_use]
pub fn normalize_chain(root: &ChainLink) -> NormalizedChain {
    let mut chain = NormalizedChain {
        tiers: BTreeMap::new(),
        links: ChainMap::new(),
    };
    walk(root, 1, &mut chain);
    chain
}

fn walk(link: &ChainLink, tier: i64, out: &mut NormalizedChain) {
    let species = link.species.name.clone();
    out.tiers.insert(species.clone(), tier);
    let next_forms = out.links.entry(species).or_default();
    for next in &link.evolves_to {
        next_forms.insert(
            next.species.name.clone(),
            flatten_conditions(&next.evolution_details),
        );
    }
    for next in &link.evolves_to {
        walk(next, tier + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pokeapi::NamedResource;
    use serde_json::json;

    fn link(name: &str, details: Vec<Value>, evolves_to: Vec<ChainLink>) -> ChainLink {
        ChainLink {
            species: NamedResource {
                name: name.to_string(),
            },
            evolution_details: details,
            evolves_to,
        }
    }

    fn level_up(level: i64) -> Value {
        json!({
            "trigger": {"name": "level-up", "url": "https://pokeapi.co/api/v2/evolution-trigger/1/"},
            "min_level": level,
            "item": null,
            "held_item": null,
            "time_of_day": "",
            "needs_overworld_rain": false
        })
    }

    #[test]
    fn test_three_tier_chain() {
        let root = link(
            "bulbasaur",
            vec![],
            vec![link(
                "ivysaur",
                vec![level_up(16)],
                vec![link("venusaur", vec![level_up(32)], vec![])],
            )],
        );
        let chain = normalize_chain(&root);

        assert_eq!(chain.tiers.get("bulbasaur"), Some(&1));
        assert_eq!(chain.tiers.get("ivysaur"), Some(&2));
        assert_eq!(chain.tiers.get("venusaur"), Some(&3));

        let from_base = chain.links.get("bulbasaur").unwrap();
        assert_eq!(from_base.len(), 1);
        let to_ivysaur = from_base.get("ivysaur").unwrap();
        assert_eq!(to_ivysaur.get("trigger"), Some(&json!("level-up")));
        assert_eq!(to_ivysaur.get("min_level"), Some(&json!(16)));

        let from_mid = chain.links.get("ivysaur").unwrap();
        assert_eq!(from_mid.get("venusaur").unwrap().get("min_level"), Some(&json!(32)));

        // Final form still appears, with nothing to evolve into.
        assert!(chain.links.get("venusaur").unwrap().is_empty());
    }

    #[test]
    fn test_branching_chain() {
        let root = link(
            "eevee",
            vec![],
            vec![
                link(
                    "vaporeon",
                    vec![json!({"trigger": {"name": "use-item"}, "item": {"name": "water-stone"}})],
                    vec![],
                ),
                link(
                    "jolteon",
                    vec![json!({"trigger": {"name": "use-item"}, "item": {"name": "thunder-stone"}})],
                    vec![],
                ),
            ],
        );
        let chain = normalize_chain(&root);

        let from_base = chain.links.get("eevee").unwrap();
        assert_eq!(from_base.len(), 2);
        assert_eq!(
            from_base.get("vaporeon").unwrap().get("item"),
            Some(&json!("water-stone"))
        );
        assert_eq!(
            from_base.get("jolteon").unwrap().get("item"),
            Some(&json!("thunder-stone"))
        );
        assert_eq!(chain.tiers.get("vaporeon"), Some(&2));
        assert_eq!(chain.tiers.get("jolteon"), Some(&2));
    }

    #[test]
    fn test_only_first_alternative_recorded() {
        let details = vec![
            json!({"trigger": {"name": "level-up"}, "min_level": 20}),
            json!({"trigger": {"name": "use-item"}, "item": {"name": "moon-stone"}}),
        ];
        let conditions = flatten_conditions(&details);
        assert_eq!(conditions.get("trigger"), Some(&json!("level-up")));
        assert_eq!(conditions.get("min_level"), Some(&json!(20)));
        assert!(!conditions.contains_key("item"));
    }

    #[test]
    fn test_empty_details_yield_empty_conditions() {
        assert!(flatten_conditions(&[]).is_empty());

        let root = link("feebas", vec![], vec![link("milotic", vec![], vec![])]);
        let chain = normalize_chain(&root);
        assert!(chain.links.get("feebas").unwrap().get("milotic").unwrap().is_empty());
    }

    #[test]
    fn test_flatten_drops_null_false_and_empty() {
        let details = vec![json!({
            "trigger": {"name": "level-up"},
            "min_level": 16,
            "item": null,
            "needs_overworld_rain": false,
            "time_of_day": "",
            "min_happiness": 220,
            "turn_upside_down": true
        })];
        let conditions = flatten_conditions(&details);
        assert!(!conditions.contains_key("item"));
        assert!(!conditions.contains_key("needs_overworld_rain"));
        assert!(!conditions.contains_key("time_of_day"));
        assert_eq!(conditions.get("min_happiness"), Some(&json!(220)));
        assert_eq!(conditions.get("turn_upside_down"), Some(&json!(true)));
    }

    #[test]
    fn test_flatten_collapses_objects_to_name() {
        let details = vec![json!({
            "trigger": {"name": "trade"},
            "held_item": {"name": "metal-coat", "url": "https://pokeapi.co/api/v2/item/233/"}
        })];
        let conditions = flatten_conditions(&details);
        assert_eq!(conditions.get("trigger"), Some(&json!("trade")));
        assert_eq!(conditions.get("held_item"), Some(&json!("metal-coat")));
    }

    #[test]
    fn test_depth_keeps_incrementing_past_three() {
        let root = link(
            "a",
            vec![],
            vec![link(
                "b",
                vec![],
                vec![link("c", vec![], vec![link("d", vec![], vec![])])],
            )],
        );
        let chain = normalize_chain(&root);
        assert_eq!(chain.tiers.get("d"), Some(&4));
    }
}
