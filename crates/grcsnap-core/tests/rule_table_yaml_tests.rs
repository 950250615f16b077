use grcsnap_core::rules::{NeighborRule, RuleTable, ScopingRule};

const RULES: &str = r#"
Audit:
  fst:
    - { kind: attribute, name: program }
    - { kind: relation, name: Control }
    - { kind: mapping, name: Risk }
Program:
  snd: [Control, Objective]
"#;

#[test]
fn test_rule_table_parses_from_yaml() {
    let table: RuleTable = serde_yaml::from_str(RULES).unwrap();

    let audit = table.get("Audit").unwrap();
    assert!(audit.fst.contains(&NeighborRule::attribute("program")));
    assert!(audit.fst.contains(&NeighborRule::relation("Control")));
    assert_eq!(audit.unrecognized().count(), 1);
    assert!(audit.snd.is_empty());

    let program = table.get("Program").unwrap();
    assert!(program.fst.is_empty());
    assert!(program.snd.contains("Objective"));
}

#[test]
fn test_rule_table_serializes_back_to_same_table() {
    let table = RuleTable::new().with_rule(
        "Audit",
        ScopingRule::first_order([NeighborRule::relation("Control")]),
    );
    let yaml = serde_yaml::to_string(&table).unwrap();
    let restored: RuleTable = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(restored, table);
}
