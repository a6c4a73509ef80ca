#[cfg(test)]
mod tests {
    use crate::Canonical::{
        CanonicalOracle, NativeOracle, OracleBackend, OracleError, ScriptedOracle, canonical_string,
        create_oracle_by_name, label_seeds, molecule_names,
    };
    use crate::Grammar::parse_rule_language;
    use crate::Interchange::{network_to_xml, split_species};
    use crate::PatternModel::Species;
    use crate::PatternModel::builder::network_from_sections;
    use std::collections::BTreeMap;

    const TYPES: &str = "begin molecule types\n  A(x,y,s~U~P)\n  B(y)\n  C(s,s,s)\n  L(c)\nend molecule types\n";

    const MODEL: &str = "begin molecule types\n  A(x,s~U~P)\n  B(y)\nend molecule types\n\
        begin seed species\n  A(x,s~U) 100\n  A(x!1,s~P).B(y!1) 20\n  B(y) 50\nend seed species\n\
        begin reaction rules\n  A(x) + B(y) -> A(x!1).B(y!1) 1\nend reaction rules\n";

    fn species(patterns: &[&str]) -> Vec<Species> {
        let mut text = TYPES.to_string();
        text.push_str("begin seed species\n");
        for p in patterns {
            text.push_str(&format!("  {} 1\n", p));
        }
        text.push_str("end seed species\n");
        let network = network_from_sections(&parse_rule_language(&text).unwrap()).unwrap();
        network.seeds.into_iter().map(|s| s.species).collect()
    }

    fn split_model() -> (String, String) {
        let network = network_from_sections(&parse_rule_language(MODEL).unwrap()).unwrap();
        split_species(&network_to_xml(&network).unwrap()).unwrap()
    }

    #[test]
    fn test_molecule_order_does_not_matter() {
        let s = species(&["A(x!1).B(y!1)", "B(y!1).A(x!1)"]);
        assert_eq!(canonical_string(&s[0]), canonical_string(&s[1]));
        assert_eq!(canonical_string(&s[0]), "A(x!1).B(y!1)");
    }

    #[test]
    fn test_bond_topology_matters() {
        let s = species(&["A(x!1).B(y!1)", "A(x).B(y)"]);
        assert_ne!(canonical_string(&s[0]), canonical_string(&s[1]));
    }

    #[test]
    fn test_states_matter() {
        let s = species(&["A(s~U)", "A(s~P)"]);
        assert_ne!(canonical_string(&s[0]), canonical_string(&s[1]));
    }

    #[test]
    fn test_component_order_does_not_matter() {
        let s = species(&["A(y,x!1,s~U).B(y!1)", "B(y!2).A(s~U,x!2,y)"]);
        assert_eq!(canonical_string(&s[0]), canonical_string(&s[1]));
        assert_eq!(canonical_string(&s[0]), "A(s~U,x!1,y).B(y!1)");
    }

    #[test]
    fn test_ring_relabelled() {
        let s = species(&[
            "A(x!1,y!2).A(x!2,y!3).A(x!3,y!1)",
            "A(x!7,y!5).A(x!5,y!9).A(x!9,y!7)",
            "A(x,y!1).A(x!1,y!2).A(x!2,y)",
        ]);
        assert_eq!(canonical_string(&s[0]), canonical_string(&s[1]));
        assert_ne!(canonical_string(&s[0]), canonical_string(&s[2]));
    }

    #[test]
    fn test_symmetric_star() {
        let s = species(&[
            "C(s!1,s!2,s!3).L(c!1).L(c!2).L(c!3)",
            "L(c!1).C(s!2,s!1,s!3).L(c!3).L(c!2)",
            "C(s!1,s!2,s).L(c!1).L(c!2).L(c)",
        ]);
        assert_eq!(canonical_string(&s[0]), canonical_string(&s[1]));
        assert_eq!(canonical_string(&s[0]), "C(s!1,s!2,s!3).L(c!1).L(c!2).L(c!3)");
        assert_ne!(canonical_string(&s[0]), canonical_string(&s[2]));
    }

    #[test]
    fn test_molecule_names_of_label() {
        let names = molecule_names("c:@PM:Lig(l!1,l).Rec(a!1,s~U).Lig(l)").unwrap();
        let expected: BTreeMap<String, usize> =
            [("Lig".to_string(), 2), ("Rec".to_string(), 1)].into_iter().collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_native_oracle_ranks_by_amount() {
        let (rest, fragment) = split_model();
        let mut oracle = NativeOracle::new();
        oracle.init(&rest, 0).unwrap();
        oracle.reset().unwrap();
        oracle.init_from_xml(&fragment).unwrap();
        let ranked = oracle.query("complex").unwrap();
        assert_eq!(
            ranked,
            vec!["c:A(s~U,x)", "c:B(y)", "c:A(s~P,x!1).B(y!1)"]
        );
        oracle.reset().unwrap();
        assert!(oracle.query("complex").unwrap().is_empty());
    }

    #[test]
    fn test_native_oracle_needs_init() {
        let (_, fragment) = split_model();
        let mut oracle = NativeOracle::new();
        assert!(matches!(oracle.init_from_xml(&fragment), Err(OracleError::Unavailable(_))));
        assert!(matches!(oracle.query("complex"), Err(OracleError::Unavailable(_))));
    }

    #[test]
    fn test_label_seeds_with_native_backend() {
        let (rest, fragment) = split_model();
        let mut oracle = create_oracle_by_name("native").unwrap();
        assert!(matches!(oracle, OracleBackend::Native(_)));
        let labels = label_seeds(&mut oracle, &rest, &fragment, 0).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["S1"], "c:A(s~U,x)");
        assert_eq!(labels["S2"], "c:A(s~P,x!1).B(y!1)");
        assert_eq!(labels["S3"], "c:B(y)");
    }

    #[test]
    fn test_label_seeds_filters_ranked_list() {
        let (rest, fragment) = split_model();
        let mut oracle = ScriptedOracle::new(vec!["c:B(y)", "c:A(s~P,x!1).B(y!1)", "c:A(s~U,x)"]);
        let labels = label_seeds(&mut oracle, &rest, &fragment, 1).unwrap();
        assert_eq!(labels["S1"], "c:A(s~U,x)");
        assert_eq!(labels["S2"], "c:A(s~P,x!1).B(y!1)");
        assert_eq!(labels["S3"], "c:B(y)");
        assert_eq!(oracle.network.as_deref(), Some(rest.as_str()));
        assert_eq!(oracle.resets, 3);
        assert_eq!(oracle.submitted.len(), 3);
        assert!(oracle.submitted[1].contains("id=\"S2\""));
        assert!(!oracle.submitted[1].contains("id=\"S1\""));
    }

    #[test]
    fn test_no_matching_label() {
        let (rest, fragment) = split_model();
        let mut oracle = ScriptedOracle::new(vec!["c:A(s~U,x)"]);
        let err = label_seeds(&mut oracle, &rest, &fragment, 0).unwrap_err();
        assert!(matches!(err, OracleError::NoMatchingLabel { ref species } if species.starts_with("S2")));
    }

    #[test]
    fn test_unavailable_oracle() {
        assert!(matches!(create_oracle_by_name("libnauty"), Err(OracleError::Unavailable(_))));
        let (rest, fragment) = split_model();
        let mut oracle = OracleBackend::Scripted(ScriptedOracle::unavailable("library not found"));
        let err = label_seeds(&mut oracle, &rest, &fragment, 0).unwrap_err();
        assert_eq!(err, OracleError::Unavailable("library not found".to_string()));
        assert_eq!(
            err.to_string(),
            "canonicalization oracle unavailable: library not found"
        );
    }
}
