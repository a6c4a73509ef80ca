#[cfg(test)]
mod tests {
    use crate::Grammar::ast::{BondAst, CountKind, ExtensionEntry, OutputEntry, Section};
    use crate::Grammar::lexer::{LexMode, TokenKind, tokenize};
    use crate::Grammar::{parse_model_description, parse_rule_language};

    const LIGAND_MODEL: &str = r#"
// ligand / receptor toy model
ITERATIONS = 1000
TIME_STEP = 1e-6 /* seconds */

DEFINE_MOLECULES
{
  Lig(l,l)
  {
    DIFFUSION_CONSTANT_3D = 8.51e-7
  }
  Rec(a)
  {
    DIFFUSION_CONSTANT_2D = 1.7e-7
  }
}

DEFINE_REACTIONS
{
  Lig(l) + Rec(a) -> Lig(l!1).Rec(a!1) [1e5]
}
"#;

    fn reactions(src: &str) -> Vec<crate::Grammar::ast::RuleAst> {
        let tree = parse_model_description(src).unwrap();
        match tree.get("DEFINE_REACTIONS").first() {
            Some(Section::DefineReactions(rules)) => rules.clone(),
            other => panic!("expected DEFINE_REACTIONS, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("A = 1 // trailing\n/* multi\nline */ B", LexMode::ModelDescription).unwrap();
        let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("A".to_string()),
                TokenKind::Equals,
                TokenKind::Number("1".to_string()),
                TokenKind::Newline,
                TokenKind::Ident("B".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_hash_depends_on_mode() {
        let mdl = tokenize("#NAME", LexMode::ModelDescription).unwrap();
        assert_eq!(mdl[0].kind, TokenKind::Hash);
        let bngl = tokenize("#NAME\nX", LexMode::RuleLanguage).unwrap();
        assert_eq!(bngl[0].kind, TokenKind::Newline);
        assert_eq!(bngl[1].kind, TokenKind::Ident("X".to_string()));
    }

    #[test]
    fn test_line_continuation_in_rule_language() {
        let tokens = tokenize("a \\\n b", LexMode::RuleLanguage).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].span.line, 2);
    }

    #[test]
    fn test_numbers_with_exponents() {
        let tokens = tokenize("1e5 8.51e-7 .5", LexMode::ModelDescription).unwrap();
        let numbers: Vec<String> = tokens
            .into_iter()
            .filter_map(|t| match t.kind {
                TokenKind::Number(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(numbers, vec!["1e5", "8.51e-7", ".5"]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = tokenize("A = 1 /* never closed", LexMode::ModelDescription).unwrap_err();
        assert!(err.message.contains("unterminated block comment"));
    }

    #[test]
    fn test_sections_in_source_order() {
        let tree = parse_model_description(LIGAND_MODEL).unwrap();
        assert_eq!(
            tree.section_names(),
            vec!["ITERATIONS", "TIME_STEP", "DEFINE_MOLECULES", "DEFINE_REACTIONS"]
        );
        match tree.get("TIME_STEP").first() {
            Some(Section::Statement(a)) => assert_eq!(a.value, "1e-6"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_molecule_declarations_with_properties() {
        let tree = parse_model_description(LIGAND_MODEL).unwrap();
        let Some(Section::DefineMolecules(decls)) = tree.get("DEFINE_MOLECULES").first().cloned() else {
            panic!("DEFINE_MOLECULES missing");
        };
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].molecule.name, "Lig");
        assert_eq!(decls[0].molecule.components.len(), 2);
        assert_eq!(decls[0].properties[0].key, "DIFFUSION_CONSTANT_3D");
        assert_eq!(decls[0].properties[0].value, "8.51e-7");
        assert_eq!(decls[1].properties[0].key, "DIFFUSION_CONSTANT_2D");
    }

    #[test]
    fn test_missing_sections_are_not_errors() {
        let tree = parse_model_description("ITERATIONS = 10\n").unwrap();
        assert!(tree.get("DEFINE_MOLECULES").is_empty());
        let empty = parse_model_description("").unwrap();
        assert!(empty.sections.is_empty());
    }

    #[test]
    fn test_bond_syntax_kinds() {
        let rules = reactions(
            "DEFINE_REACTIONS\n{\n  A(a!1,b!+,c!?,d~P).B(x!1) -> A(a,b!+,c!?,d~U) + B(x) [k]\n}\n",
        );
        let reactant = &rules[0].reactants[0];
        assert_eq!(reactant.molecules.len(), 2);
        let comps = &reactant.molecules[0].components;
        assert_eq!(comps[0].bond, BondAst::Label(1));
        assert_eq!(comps[1].bond, BondAst::AnyBound);
        assert_eq!(comps[2].bond, BondAst::Any);
        assert_eq!(comps[3].bond, BondAst::Unbound);
        assert_eq!(comps[3].states, vec!["P"]);
        assert_eq!(rules[0].products.len(), 2);
        assert_eq!(rules[0].rates, vec!["k"]);
    }

    #[test]
    fn test_end_to_end_rule_shape() {
        let rules = reactions(LIGAND_MODEL);
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert!(!rule.reversible);
        assert_eq!(rule.reactants.len(), 2);
        assert_eq!(rule.products.len(), 1);
        assert_eq!(rule.products[0].molecules.len(), 2);
        assert_eq!(rule.rates, vec!["1e5"]);
    }

    #[test]
    fn test_reversible_rule_with_two_rates_and_name() {
        let rules = reactions(
            "DEFINE_REACTIONS\n{\n  A(x) + B(y) <-> A(x!1).B(y!1) [kf, kr] : bind\n  unbind: A(x!1).B(y!1) -> A(x) + B(y) [koff]\n}\n",
        );
        assert!(rules[0].reversible);
        assert_eq!(rules[0].rates, vec!["kf", "kr"]);
        assert_eq!(rules[0].name.as_deref(), Some("bind"));
        assert_eq!(rules[1].name.as_deref(), Some("unbind"));
    }

    #[test]
    fn test_reversible_rule_needs_two_rates() {
        let err = parse_model_description("DEFINE_REACTIONS\n{\n  A(x) <-> B(y) [kf]\n}\n").unwrap_err();
        assert!(err.message.contains("reversible rule needs 2"));
    }

    #[test]
    fn test_compartment_prefix_orientation_and_null() {
        let rules = reactions("DEFINE_REACTIONS\n{\n  @PM:Rec(a)' + Lig(l)@EC -> NULL [1]\n}\n");
        let rec = &rules[0].reactants[0];
        assert_eq!(rec.compartment.as_deref(), Some("PM"));
        assert!(rec.oriented);
        assert_eq!(rules[0].reactants[1].molecules[0].compartment.as_deref(), Some("EC"));
        assert!(rules[0].products[0].molecules.is_empty());
    }

    #[test]
    fn test_malformed_bond_is_rejected() {
        let err = parse_model_description("DEFINE_REACTIONS\n{\n  A(x!) -> A(x) [1]\n}\n").unwrap_err();
        assert!(err.message.contains("malformed bond syntax"));
        assert_eq!(err.span.line, 3);
        assert!(err.snippet.contains('!'));

        let err = parse_model_description("DEFINE_REACTIONS\n{\n  A(x!b) -> A(x) [1]\n}\n").unwrap_err();
        assert!(err.message.contains("malformed bond syntax"));
    }

    #[test]
    fn test_double_bond_on_component_is_rejected() {
        let err = parse_model_description("DEFINE_REACTIONS\n{\n  A(x!1!2) -> A(x) [1]\n}\n").unwrap_err();
        assert!(err.message.contains("more than one bond"));
    }

    #[test]
    fn test_unterminated_brace_is_rejected() {
        let err = parse_model_description("DEFINE_MOLECULES\n{\n  A(x)\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.span.line, 2);
    }

    #[test]
    fn test_rule_without_rate_is_rejected() {
        let err = parse_model_description("DEFINE_REACTIONS\n{\n  A(x) + B(y) -> A(x!1).B(y!1)\n}\n").unwrap_err();
        assert!(err.message.contains("rate clause"));
        assert_eq!(err.span.line, 3);
        assert!(err.to_string().starts_with("line 3, column 3"));
    }

    #[test]
    fn test_generic_blocks_tolerate_nesting() {
        let src = "Cube POLYGON_LIST\n{\n  VERTEX_LIST\n  {\n    [ -1, -1, -1 ]\n    [ 1, 1, 1 ]\n  }\n  ELEMENT_CONNECTIONS { [0, 1, 2] }\n}\n";
        let tree = parse_model_description(src).unwrap();
        match &tree.sections[0] {
            Section::Generic { header, block } => {
                assert_eq!(header, "Cube POLYGON_LIST");
                assert!(block.raw.contains("VERTEX_LIST"));
                assert!(block.raw.contains("[0, 1, 2]"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_brackets_in_generic_block() {
        let err = parse_model_description("Box BOX\n{\n  CORNERS = [0, 0, 0)\n}\n").unwrap_err();
        assert!(err.message.contains("closed by"));
    }

    #[test]
    fn test_instantiate_objects_and_release_sites() {
        let src = r#"
INSTANTIATE Scene OBJECT
{
  CP OBJECT Cube {
    PARENT = World
    MEMBRANE = PM Cube[ALL]
  }
  Rel_Lig RELEASE_SITE
  {
    SHAPE = Scene.CP[ALL] - Scene.EC[ALL]
    MOLECULE = Lig(l,l)@EC
    NUMBER_TO_RELEASE = 1000
    RELEASE_PROBABILITY = 1
  }
}
"#;
        let tree = parse_model_description(src).unwrap();
        let Some(Section::Instantiate(inst)) = tree.get("INSTANTIATE").first().cloned() else {
            panic!("INSTANTIATE missing");
        };
        assert_eq!(inst.name, "Scene");
        assert_eq!(inst.kind, "OBJECT");
        assert_eq!(inst.objects.len(), 1);
        let object = &inst.objects[0];
        assert_eq!(object.name, "CP");
        assert_eq!(object.geometry, "Cube");
        assert_eq!(object.properties[1].key, "MEMBRANE");
        assert_eq!(object.properties[1].value, "PM Cube[ALL]");
        assert!(object.raw_body.starts_with("PARENT"));

        let site = &inst.release_sites[0];
        assert_eq!(site.name, "Rel_Lig");
        let molecule = site.molecule.as_ref().unwrap();
        assert_eq!(molecule.molecules[0].name, "Lig");
        assert_eq!(molecule.molecules[0].compartment.as_deref(), Some("EC"));
        let keys: Vec<&str> = site.properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["SHAPE", "MOLECULE", "NUMBER_TO_RELEASE", "RELEASE_PROBABILITY"]);
        assert_eq!(site.properties[0].value, "Scene.CP[ALL] - Scene.EC[ALL]");
    }

    #[test]
    fn test_reaction_data_output_counts() {
        let src = r#"
REACTION_DATA_OUTPUT
{
  STEP = 1e-6
  {COUNT[Rec(a!1), WORLD]} => "./react_data/RecBound.dat"
  {COUNT_SPECIES[Lig(l!+,l), WORLD]} => "./react_data/LigOne.dat"
}
"#;
        let tree = parse_model_description(src).unwrap();
        let Some(Section::ReactionDataOutput(entries)) = tree.get("REACTION_DATA_OUTPUT").first().cloned()
        else {
            panic!("REACTION_DATA_OUTPUT missing");
        };
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], OutputEntry::Assignment(a) if a.key == "STEP"));
        match &entries[1] {
            OutputEntry::Count {
                kind,
                patterns,
                location,
                path,
                ..
            } => {
                assert_eq!(*kind, CountKind::Molecules);
                assert_eq!(patterns.len(), 1);
                assert_eq!(location, "WORLD");
                assert_eq!(path, "./react_data/RecBound.dat");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&entries[2], OutputEntry::Count { kind: CountKind::Species, .. }));
    }

    #[test]
    fn test_hashed_extension_section() {
        let src = "#DEFINE_MOLECULES\n{\n  Lig(l,l) { DIFFUSION_CONSTANT_3D = 1e-6 }\n  Rec\n  {\n    DIFFUSION_CONSTANT_2D = 2e-7\n  }\n}\n";
        let tree = parse_model_description(src).unwrap();
        assert_eq!(tree.section_names(), vec!["#DEFINE_MOLECULES"]);
        match &tree.sections[0] {
            Section::Extension { entries, .. } => {
                assert_eq!(entries.len(), 2);
                match &entries[0] {
                    ExtensionEntry::Target { name, properties } => {
                        assert_eq!(name, "Lig");
                        assert_eq!(properties[0].value, "1e-6");
                    }
                    other => panic!("unexpected {:?}", other),
                }
                assert!(matches!(&entries[1], ExtensionEntry::Target { name, .. } if name == "Rec"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_surface_blocks_are_raw() {
        let src = "DEFINE_SURFACE_CLASSES\n{\n  reflect_Lig { REFLECTIVE = Lig }\n}\nMODIFY_SURFACE_REGIONS\n{\n  CP[wall] { SURFACE_CLASS = reflect_Lig }\n}\n";
        let tree = parse_model_description(src).unwrap();
        match &tree.sections[0] {
            Section::DefineSurfaceClasses(block) => assert!(block.raw.contains("REFLECTIVE = Lig")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&tree.sections[1], Section::ModifySurfaceRegions(_)));
    }

    const RULE_LANGUAGE: &str = r#"
# receptor model
begin model
begin parameters
  kon 1e5
  koff = 0.1
end parameters
begin molecule types
  Lig(l,l)
  Rec(a,s~U~P)
end molecule types
begin compartments
  cyto 3 1.0
  pm 2 0.01 cyto
end compartments
begin seed species
  Lig(l,l) 1000
  @cyto:Rec(a,s~U) Rec0
end seed species
begin observables
  Molecules RecBound Rec(a!1), Rec(s~P)
  Species LigFree Lig(l,l)
end observables
begin functions
  f() = kon * 2
end functions
begin reaction rules
  bind: Lig(l) + Rec(a) <-> Lig(l!1).Rec(a!1) kon, koff
  phos: Rec(s~U) -> Rec(s~P) 1.0 # trailing comment
end reaction rules
end model
generate_network({overwrite=>1})
"#;

    #[test]
    fn test_rule_language_sections() {
        let tree = parse_rule_language(RULE_LANGUAGE).unwrap();
        assert_eq!(
            tree.section_names(),
            vec![
                "parameters",
                "molecule types",
                "compartments",
                "seed species",
                "observables",
                "functions",
                "reaction rules"
            ]
        );
    }

    #[test]
    fn test_rule_language_contents() {
        let tree = parse_rule_language(RULE_LANGUAGE).unwrap();
        for section in &tree.sections {
            match section {
                Section::Parameters(p) => {
                    assert_eq!(p[0].key, "kon");
                    assert_eq!(p[1].value, "0.1");
                }
                Section::MoleculeTypes(m) => assert_eq!(m[1].components[1].states, vec!["U", "P"]),
                Section::Compartments(c) => {
                    assert_eq!(c[0].dimensions, 3);
                    assert_eq!(c[0].parent, None);
                    assert_eq!(c[1].size, "0.01");
                    assert_eq!(c[1].parent.as_deref(), Some("cyto"));
                }
                Section::SeedSpecies(s) => {
                    assert_eq!(s[0].amount, "1000");
                    assert_eq!(s[1].species.compartment.as_deref(), Some("cyto"));
                    assert_eq!(s[1].amount, "Rec0");
                }
                Section::Observables(o) => {
                    assert_eq!(o[0].patterns.len(), 2);
                    assert_eq!(o[1].kind, CountKind::Species);
                }
                Section::Functions(f) => assert_eq!(f[0].expression, "kon * 2"),
                Section::ReactionRules(r) => {
                    assert_eq!(r[0].name.as_deref(), Some("bind"));
                    assert_eq!(r[0].rates, vec!["kon", "koff"]);
                    assert_eq!(r[1].rates, vec!["1.0"]);
                }
                other => panic!("unexpected section {:?}", other),
            }
        }
    }

    #[test]
    fn test_rule_language_rejects_bad_compartment_dimension() {
        let err = parse_rule_language("begin compartments\n  cyto 1 1.0\nend compartments\n").unwrap_err();
        assert!(err.message.contains("dimension 2 or 3"));
    }

    #[test]
    fn test_rule_language_mismatched_end() {
        let err = parse_rule_language("begin parameters\n  k 1\nend observables\n").unwrap_err();
        assert!(err.message.contains("expected 'end parameters'"));
        let err = parse_rule_language("begin parameters\n  k 1\n").unwrap_err();
        assert!(err.message.contains("unterminated section"));
    }

    #[test]
    fn test_rule_language_strips_rule_modifiers() {
        let tree = parse_rule_language(
            "begin reaction rules\n  A(x) -> 0 kdeg DeleteMolecules\nend reaction rules\n",
        )
        .unwrap();
        match &tree.sections[0] {
            Section::ReactionRules(r) => {
                assert_eq!(r[0].rates, vec!["kdeg"]);
                assert!(r[0].products[0].molecules.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_modifier_names_inside_rate_names_are_kept() {
        let tree = parse_rule_language(
            "begin reaction rules\n  A(x) -> 0 kTotalRate*2\n  B(y) -> 0 k_deg TotalRate\n  C(z) -> 0 kc exclude_reactants(1,A)\nend reaction rules\n",
        )
        .unwrap();
        match &tree.sections[0] {
            Section::ReactionRules(r) => {
                assert_eq!(r[0].rates, vec!["kTotalRate*2"]);
                assert_eq!(r[1].rates, vec!["k_deg"]);
                assert_eq!(r[2].rates, vec!["kc"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
