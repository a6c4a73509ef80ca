#[cfg(test)]
mod tests {
    use crate::Grammar::{parse_model_description, parse_rule_language};
    use crate::PatternModel::builder::network_from_sections;
    use crate::PatternModel::{
        Action, BondMarker, Compartment, ComponentOccurrence, ModelError, MoleculeInstance, Network,
        ObservableKind, Side, SiteIndex, Species,
    };
    use approx::assert_relative_eq;

    const LIGAND_RECEPTOR: &str = r#"
ITERATIONS = 1000
DEFINE_MOLECULES
{
  Lig(l,l) { DIFFUSION_CONSTANT_3D = 8.51e-7 }
  Rec(a) { DIFFUSION_CONSTANT_2D = 1.7e-7 }
}
DEFINE_REACTIONS
{
  Lig(l) + Rec(a) -> Lig(l!1).Rec(a!1) [1e5]
}
INSTANTIATE Scene OBJECT
{
  Rel_Lig RELEASE_SITE
  {
    SHAPE = Scene.box
    MOLECULE = Lig(l,l)
    NUMBER_TO_RELEASE = 1000
  }
  Rel_Rec RELEASE_SITE
  {
    SHAPE = Scene.box
    MOLECULE = Rec(a)
    NUMBER_TO_RELEASE = 1000
    RELEASE_PROBABILITY = 1
  }
}
"#;

    fn mdl(src: &str) -> Result<Network, ModelError> {
        network_from_sections(&parse_model_description(src).unwrap())
    }

    fn bngl(src: &str) -> Result<Network, ModelError> {
        network_from_sections(&parse_rule_language(src).unwrap())
    }

    fn molecule(name: &str, comps: &[(&str, BondMarker)]) -> MoleculeInstance {
        MoleculeInstance::new(
            name,
            comps
                .iter()
                .map(|(c, b)| ComponentOccurrence::new(c, None, b.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_bond_labels_pair_into_edges() {
        let s = Species::new(
            vec![
                molecule("A", &[("x", BondMarker::Label(1)), ("y", BondMarker::AnyBound)]),
                molecule("B", &[("z", BondMarker::Label(1))]),
            ],
            None,
        )
        .unwrap();
        let edge = s.bond(1).unwrap();
        assert_eq!(edge.a, SiteIndex { molecule: 0, component: 0 });
        assert_eq!(edge.b, SiteIndex { molecule: 1, component: 0 });
        assert_eq!(
            s.partner(SiteIndex { molecule: 1, component: 0 }),
            Some(SiteIndex { molecule: 0, component: 0 })
        );
        assert_eq!(s.partner(SiteIndex { molecule: 0, component: 1 }), None);
        assert_eq!(s.bonds().count(), 1);
        assert_eq!(s.to_string(), "A(x!1,y!+).B(z!1)");
    }

    #[test]
    fn test_single_bond_label_is_unpaired() {
        let err = Species::new(vec![molecule("A", &[("x", BondMarker::Label(3))])], None).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnpairedBond {
                label: 3,
                occurrences: 1,
                pattern: "A(x!3)".to_string()
            }
        );
    }

    #[test]
    fn test_triple_bond_label_is_unpaired() {
        let err = Species::new(
            vec![
                molecule("A", &[("x", BondMarker::Label(1))]),
                molecule("B", &[("y", BondMarker::Label(1))]),
                molecule("C", &[("z", BondMarker::Label(1))]),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::UnpairedBond { occurrences: 3, .. }));
    }

    #[test]
    fn test_wildcards_never_pair() {
        let s = Species::new(
            vec![molecule("A", &[("x", BondMarker::AnyBound), ("y", BondMarker::Any)])],
            Some("cyto".to_string()),
        )
        .unwrap();
        assert_eq!(s.bonds().count(), 0);
        assert_eq!(s.to_string(), "@cyto:A(x!+,y!?)");
    }

    #[test]
    fn test_unpaired_bond_from_source() {
        let err = mdl("DEFINE_MOLECULES\n{\n  A(x)\n}\nDEFINE_REACTIONS\n{\n  A(x) -> A(x!1) [1]\n}\n").unwrap_err();
        assert!(matches!(err, ModelError::UnpairedBond { label: 1, .. }));
    }

    #[test]
    fn test_end_to_end_ligand_receptor() {
        let network = mdl(LIGAND_RECEPTOR).unwrap();
        assert_eq!(network.molecule_types.len(), 2);
        assert_eq!(network.seeds.len(), 2);
        assert_eq!(network.seeds[0].species.to_string(), "Lig(l,l)");
        assert_eq!(network.seeds[1].species.to_string(), "Rec(a)");
        for seed in &network.seeds {
            assert_relative_eq!(seed.amount.parse::<f64>().unwrap(), 1000.0);
        }
        assert_eq!(network.rules.len(), 1);

        let rule = &network.rules[0];
        assert_eq!(rule.actions.len(), 1);
        match &rule.actions[0] {
            Action::AddBond { a, b } => {
                assert_eq!(a.side, Side::Reactant);
                assert_eq!((a.pattern, a.molecule, a.component), (0, 0, Some(0)));
                assert_eq!((b.pattern, b.molecule, b.component), (1, 0, Some(0)));
                let lig = &rule.reactants[a.pattern].molecules()[a.molecule];
                let rec = &rule.reactants[b.pattern].molecules()[b.molecule];
                assert_eq!(lig.type_name, "Lig");
                assert_eq!(rec.type_name, "Rec");
                assert_eq!(rec.components[0].name, "a");
            }
            other => panic!("expected AddBond, got {:?}", other),
        }
    }

    #[test]
    fn test_source_extras_are_collected() {
        let network = mdl(LIGAND_RECEPTOR).unwrap();
        assert_eq!(network.extras.statement("ITERATIONS"), Some("1000"));
        assert!(network.parameters.is_empty());
        assert!(network.is_surface_molecule("Rec"));
        assert!(!network.is_surface_molecule("Lig"));
        assert_eq!(network.extras.scene_name.as_deref(), Some("Scene"));
        let release = &network.extras.releases["S2"];
        assert_eq!(release.site_name, "Rel_Rec");
        assert_eq!(release.quantity_key, "NUMBER_TO_RELEASE");
        assert_eq!(release.probability.as_deref(), Some("1"));
        assert_eq!(network.extras.releases["S1"].shape.as_deref(), Some("Scene.box"));
    }

    #[test]
    fn test_duplicate_molecule_type() {
        let err = mdl("DEFINE_MOLECULES\n{\n  A(x)\n  A(y)\n}\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateDefinition {
                kind: "molecule type".to_string(),
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_parameter_and_observable() {
        let err = bngl("begin parameters\n  k 1\n  k 2\nend parameters\n").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDefinition { ref kind, .. } if kind == "parameter"));
        let err = bngl(
            "begin molecule types\n  A(x)\nend molecule types\nbegin observables\n  Molecules Atot A()\n  Species Atot A()\nend observables\n",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDefinition { ref kind, .. } if kind == "observable"));
    }

    #[test]
    fn test_compartments_parent_first() {
        let mut network = Network::new();
        network
            .add_compartment(Compartment {
                name: "pm".to_string(),
                dimensions: 2,
                size: "1".to_string(),
                parent: Some("cyto".to_string()),
            })
            .unwrap();
        network
            .add_compartment(Compartment {
                name: "cyto".to_string(),
                dimensions: 3,
                size: "1".to_string(),
                parent: None,
            })
            .unwrap();
        let order: Vec<&str> = network
            .compartments_parent_first()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(order, vec!["cyto", "pm"]);
    }

    #[test]
    fn test_compartment_cycle_and_undeclared_parent() {
        let err = bngl("begin compartments\n  a 3 1 b\n  b 3 1 a\nend compartments\n").unwrap_err();
        assert!(matches!(err, ModelError::CompartmentCycle { .. }));
        let err = bngl("begin compartments\n  a 3 1 nowhere\nend compartments\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::UndeclaredCompartment {
                name: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_type_component_and_state() {
        let err = bngl("begin molecule types\n  A(x~U~P)\nend molecule types\nbegin seed species\n  B(x) 1\nend seed species\n").unwrap_err();
        assert!(matches!(err, ModelError::UnknownMoleculeType { ref name, .. } if name == "B"));
        let err = bngl("begin molecule types\n  A(x~U~P)\nend molecule types\nbegin seed species\n  A(y) 1\nend seed species\n").unwrap_err();
        assert!(matches!(err, ModelError::UnknownComponent { ref component, .. } if component == "y"));
        let err = bngl("begin molecule types\n  A(x~U~P)\nend molecule types\nbegin seed species\n  A(x~Q) 1\nend seed species\n").unwrap_err();
        assert!(matches!(err, ModelError::InvalidState { ref state, .. } if state == "Q"));
    }

    #[test]
    fn test_derived_state_change_and_unbinding() {
        let network = bngl(
            "begin molecule types\n  A(x,s~U~P)\n  B(y)\nend molecule types\nbegin reaction rules\n  A(x!1,s~U).B(y!1) -> A(x,s~P) + B(y) k\nend reaction rules\n",
        )
        .unwrap();
        let actions = &network.rules[0].actions;
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().any(|a| matches!(a,
            Action::StateChange { site, final_state } if final_state == "P" && site.component == Some(1))));
        assert!(actions.iter().any(|a| matches!(a, Action::DeleteBond { .. })));
    }

    #[test]
    fn test_derived_create_and_destroy() {
        let network = bngl(
            "begin molecule types\n  A(x)\n  B(y)\nend molecule types\nbegin reaction rules\n  A(x) -> 0 kdeg\n  0 -> B(y) ksyn\nend reaction rules\n",
        )
        .unwrap();
        assert!(network.rules[0].products.is_empty());
        assert!(matches!(network.rules[0].actions[..], [Action::Destroy { .. }]));
        assert!(matches!(network.rules[1].actions[..], [Action::Create { .. }]));
        assert_eq!(network.rules[1].equation(), " -> B(y)");
    }

    #[test]
    fn test_reversible_rate_law() {
        let network = bngl(
            "begin molecule types\n  A(x)\nend molecule types\nbegin reaction rules\n  dimer: A(x) + A(x) <-> A(x!1).A(x!1) kf, kr\nend reaction rules\n",
        )
        .unwrap();
        let rule = &network.rules[0];
        assert!(rule.rate.is_reversible());
        assert_eq!(rule.rate.expressions(), vec!["kf", "kr"]);
        assert_eq!(rule.label(0), "dimer");
        assert_eq!(rule.actions.len(), 1);
    }

    #[test]
    fn test_parameters_in_dependency_order() {
        let network = bngl("begin parameters\n  kon 2*NA*vol\n  NA 6.022e23\n  vol 1e-15\n  koff 0.1\nend parameters\n").unwrap();
        assert_eq!(
            network.parameters[0].depends_on,
            Some(vec!["NA".to_string(), "vol".to_string()])
        );
        assert_eq!(network.parameters[1].depends_on, Some(vec![]));
        let order: Vec<&str> = network
            .parameters_in_dependency_order()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(order, vec!["NA", "vol", "kon", "koff"]);
    }

    #[test]
    fn test_parameters_without_metadata_keep_declaration_order() {
        let mut network = bngl("begin parameters\n  b 2*a\n  a 1\nend parameters\n").unwrap();
        network.parameters[0].depends_on = None;
        let order: Vec<&str> = network
            .parameters_in_dependency_order()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_object_named_as_parent_becomes_volume() {
        let src = r#"
DEFINE_MOLECULES
{
  Lig(l) { DIFFUSION_CONSTANT_3D = 1e-6 }
}
INSTANTIATE Scene OBJECT
{
  EC OBJECT box {}
  Other OBJECT box {}
  CP OBJECT box {
    PARENT = EC
    MEMBRANE = PM box[ALL]
  }
  Rel RELEASE_SITE
  {
    MOLECULE = Lig(l)@EC
    NUMBER_TO_RELEASE = 10
  }
}
"#;
        let network = mdl(src).unwrap();
        network.validate().unwrap();
        let order: Vec<(&str, Option<&str>)> = network
            .compartments_parent_first()
            .unwrap()
            .iter()
            .map(|c| (c.name.as_str(), c.parent.as_deref()))
            .collect();
        assert_eq!(order, vec![("EC", None), ("PM", Some("EC")), ("CP", Some("PM"))]);
        // nothing names Other as a parent
        assert!(network.compartment("Other").is_none());
        assert_eq!(network.extras.scene_objects.len(), 3);
    }

    #[test]
    fn test_membrane_objects_become_compartments() {
        let src = r#"
DEFINE_MOLECULES
{
  R(l) { DIFFUSION_CONSTANT_2D = 1e-7 }
}
INSTANTIATE Scene OBJECT
{
  EC OBJECT Box { SIZE = 8 }
  CP OBJECT Cube {
    PARENT = EC
    MEMBRANE = PM Cube[ALL]
  }
  Rel RELEASE_SITE
  {
    SHAPE = Scene.CP[ALL]
    MOLECULE = R(l)@PM
    DENSITY = 2
  }
}
"#;
        let network = mdl(src).unwrap();
        let names: Vec<&str> = network.compartments.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["EC", "PM", "CP"]);
        // EC is only named as a parent, so it becomes an outermost volume
        assert_eq!(network.compartments[0].dimensions, 3);
        assert_eq!(network.compartments[0].parent, None);
        assert_eq!(network.compartments[0].size, "8");
        assert_eq!(network.compartments[1].dimensions, 2);
        assert_eq!(network.compartments[1].parent.as_deref(), Some("EC"));
        assert_eq!(network.compartments[2].parent.as_deref(), Some("PM"));
        assert_eq!(network.extras.scene_objects.len(), 2);
        assert_eq!(network.extras.releases["S1"].quantity_key, "DENSITY");
        assert!(network.is_surface_species(&network.seeds[0].species));
    }

    #[test]
    fn test_output_counts_become_observables() {
        let src = r#"
DEFINE_MOLECULES
{
  Rec(a)
}
REACTION_DATA_OUTPUT
{
  STEP = 1e-5
  {COUNT[Rec(a), WORLD]} => "./react_data/RecFree.dat"
  {COUNT_SPECIES[Rec(a), WORLD]} => "./react_data/RecSpecies.dat"
}
"#;
        let network = mdl(src).unwrap();
        assert_eq!(network.extras.output_step.as_deref(), Some("1e-5"));
        assert_eq!(network.observables.len(), 2);
        assert_eq!(network.observables[0].name, "RecFree");
        assert_eq!(network.observables[0].kind, ObservableKind::Molecules);
        assert_eq!(network.observables[1].kind, ObservableKind::Species);
        assert_eq!(network.extras.observable_paths["RecFree"], "./react_data/RecFree.dat");
    }

    #[test]
    fn test_pretty_print_lists_rules() {
        let network = mdl(LIGAND_RECEPTOR).unwrap();
        let text = network.pretty_print();
        assert!(text.contains("Lig(l) + Rec(a) -> Lig(l!1).Rec(a!1)"));
        assert!(text.contains("1e5"));
        assert!(text.contains("AddBond(R1.M1.C1, R2.M1.C1)"));
        let json = serde_json::to_string(&network).unwrap();
        assert!(json.contains("\"molecule_types\""));
    }
}
