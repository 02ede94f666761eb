use std::{error::Error, sync::Arc, thread};

use schemacheck::{Domain, LoadingConfig, LogLevel, ValidationConfig, Validator};
use serde_json::{json, Value};

fn validator(cfg: ValidationConfig) -> Validator {
    Validator::with_config(LoadingConfig::new(), cfg)
}

fn keywords(report: &schemacheck::Report) -> Vec<&str> {
    report.errors().filter_map(|m| m.keyword_name()).collect()
}

#[test]
fn test_deterministic() -> Result<(), Box<dyn Error>> {
    let schema = json!({
        "properties": {"a": {"type": "string"}, "b": {"minimum": 3}},
        "patternProperties": {"^c": {"enum": [1]}},
        "required": ["z"]
    });
    let instance = json!({"a": 1, "b": 1, "cc": 2});
    let mut cfg = ValidationConfig::new();
    cfg.set_explore_all(true);
    let v = validator(cfg);
    let first = v.validate_value(&schema, &instance)?.to_json();
    for _ in 0..3 {
        assert_eq!(v.validate_value(&schema, &instance)?.to_json(), first);
    }
    // fresh caches give the same output too
    let mut cfg = ValidationConfig::new();
    cfg.set_explore_all(true);
    let again = validator(cfg).validate_value(&schema, &instance)?.to_json();
    assert_eq!(again, first);
    Ok(())
}

#[test]
fn test_reference_loop_is_fatal() {
    let v = Validator::new();
    let Err(aborted) = v.validate_value(&json!({"$ref": "#"}), &json!(1)) else {
        panic!("reference loop must abort");
    };
    let msg = aborted.message();
    assert_eq!(msg.level(), LogLevel::Fatal);
    assert_eq!(msg.domain(), Domain::Resolution);
    assert_eq!(msg.args()["chain"], json!(["#", "#"]));
}

#[test]
fn test_fatal_retained_without_threshold() -> Result<(), Box<dyn Error>> {
    let mut cfg = ValidationConfig::new();
    cfg.set_fatal_threshold(LogLevel::None);
    let report = validator(cfg).validate_value(&json!({"$ref": "#"}), &json!(1))?;
    assert!(!report.is_success());
    assert_eq!(report.len(), 1);
    assert_eq!(report.messages()[0].level(), LogLevel::Fatal);
    Ok(())
}

#[test]
fn test_validation_loop_is_fatal() {
    let v = Validator::new();
    let Err(aborted) = v.validate_value(&json!({"allOf": [{"$ref": "#"}]}), &json!(1)) else {
        panic!("validation loop must abort");
    };
    assert_eq!(aborted.message().domain(), Domain::Validation);
    assert!(aborted.message().args().contains_key("visited"));
}

#[test]
fn test_bad_keyword_is_fatal_syntax() {
    let Err(aborted) = Validator::new().validate_value(&json!({"minLength": -1}), &json!("x")) else {
        panic!("unbuildable check must abort");
    };
    let msg = aborted.message();
    assert_eq!(msg.level(), LogLevel::Fatal);
    assert_eq!(msg.domain(), Domain::Syntax);
    assert_eq!(msg.keyword_name(), Some("minLength"));
}

#[test]
fn test_fatal_in_branch_aborts() -> Result<(), Box<dyn Error>> {
    for kw in ["anyOf", "oneOf"] {
        let schema = json!({kw: [{"$ref": "#/nope"}, {}]});
        let Err(aborted) = Validator::new().validate_value(&schema, &json!(1)) else {
            panic!("{kw}: dangling branch must abort");
        };
        assert_eq!(aborted.message().domain(), Domain::Resolution, "{kw}");

        let mut cfg = ValidationConfig::new();
        cfg.set_fatal_threshold(LogLevel::None);
        let report = validator(cfg).validate_value(&schema, &json!(1))?;
        assert!(!report.is_success(), "{kw}");
        let fatals = report
            .iter()
            .filter(|m| m.level() == LogLevel::Fatal)
            .collect::<Vec<_>>();
        assert_eq!(fatals.len(), 1, "{kw}");
        assert_eq!(fatals[0].domain(), Domain::Resolution, "{kw}");
    }
    Ok(())
}

#[test]
fn test_declaration_order() -> Result<(), Box<dyn Error>> {
    let schema: Value = serde_json::from_str(
        r#"{"patternProperties": {"z": {"type": "string"}, "a": {"type": "boolean"}}}"#,
    )?;
    let instance: Value = serde_json::from_str(r#"{"zz": 1, "az": 2}"#)?;
    let report = Validator::new().validate_value(&schema, &instance)?;
    let got = report
        .errors()
        .map(|m| {
            let schema = m.schema_ref().map(ToString::to_string).unwrap_or_default();
            let fragment = schema.split_once('#').map(|(_, f)| f.to_owned());
            (m.instance_ptr().to_string(), fragment.unwrap_or_default())
        })
        .collect::<Vec<_>>();
    let want = [
        ("/zz", "/patternProperties/z"),
        ("/az", "/patternProperties/z"),
        ("/az", "/patternProperties/a"),
    ]
    .map(|(i, s)| (i.to_owned(), s.to_owned()));
    assert_eq!(got, want);
    Ok(())
}

#[test]
fn test_same_ref_at_different_instances_is_not_a_loop() -> Result<(), Box<dyn Error>> {
    let schema = json!({
        "definitions": {"leaf": {"type": "integer"}},
        "items": {"$ref": "#/definitions/leaf"}
    });
    let report = Validator::new().validate_value(&schema, &json!([1, 2, 3]))?;
    assert!(report.is_success());
    Ok(())
}

#[test]
fn test_digests_are_shared() -> Result<(), Box<dyn Error>> {
    let schema = json!({
        "properties": {"a": {"minLength": 2}, "b": {"minLength": 2.0}}
    });
    let instance = json!({"a": "xx", "b": "yy"});
    let v = Validator::new();
    assert!(v.validate_value(&schema, &instance)?.is_success());
    // routing of the root and one minLength check
    assert_eq!(v.digests().builds(), 2);
    assert_eq!(v.digests().len(), 2);

    assert!(!v.validate_value(&schema, &json!({"a": "x"}))?.is_success());
    assert_eq!(v.digests().builds(), 2);
    Ok(())
}

#[test]
fn test_all_of_keeps_all_diagnostics() -> Result<(), Box<dyn Error>> {
    let schema = json!({"allOf": [{"type": "string"}, {"minimum": 1}]});
    let report = Validator::new().validate_value(&schema, &json!(0))?;
    assert!(!report.is_success());
    assert_eq!(keywords(&report), ["type", "minimum"]);
    Ok(())
}

#[test]
fn test_one_of() -> Result<(), Box<dyn Error>> {
    let v = Validator::new();
    let report = v.validate_value(&json!({"oneOf": [{}, {"not": {}}]}), &json!("x"))?;
    assert!(report.is_success());

    let report = v.validate_value(&json!({"oneOf": [{}, {}]}), &json!("x"))?;
    assert!(!report.is_success());
    let errors = report.errors().collect::<Vec<_>>();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword_name(), Some("oneOf"));
    assert_eq!(errors[0].args()["matched"], json!(2));
    assert_eq!(errors[0].args()["matchedIndices"], json!([0, 1]));
    Ok(())
}

#[test]
fn test_not_suppresses_diagnostics() -> Result<(), Box<dyn Error>> {
    let v = Validator::new();
    let schema = json!({"not": {"type": "string"}});
    let report = v.validate_value(&schema, &json!(1))?;
    assert!(report.is_success());
    assert!(report.is_empty());

    let report = v.validate_value(&schema, &json!("x"))?;
    assert_eq!(keywords(&report), ["not"]);
    Ok(())
}

#[test]
fn test_unique_items_compares_numbers_by_value() -> Result<(), Box<dyn Error>> {
    let v = Validator::new();
    let schema = json!({"uniqueItems": true});
    assert!(!v.validate_value(&schema, &json!([1, 1.0]))?.is_success());
    assert!(v.validate_value(&schema, &json!([1, 2]))?.is_success());
    Ok(())
}

#[test]
fn test_explore_policy() -> Result<(), Box<dyn Error>> {
    let schema = json!({"minItems": 2, "items": {"type": "string"}});
    let instance = json!([1]);
    let v = Validator::new();

    let tree = schemacheck::SchemaTree::anonymous(
        schema.clone(),
        schemacheck::Dialect::V4,
        schemacheck::Addressing::Canonical,
    );
    let report = v.validate_tree(&tree, &instance, false)?;
    assert_eq!(keywords(&report), ["minItems"]);
    let builds = v.digests().builds();

    let report = v.validate_tree(&tree, &instance, true)?;
    assert_eq!(keywords(&report), ["minItems", "type"]);
    let errors = report.errors().collect::<Vec<_>>();
    assert_eq!(errors[1].instance_ptr().to_string(), "/0");
    // routing of items and the type check of its subschema
    assert_eq!(v.digests().builds(), builds + 2);

    let report = v.validate_tree(&tree, &instance, true)?;
    assert_eq!(report.errors().count(), 2);
    assert_eq!(v.digests().builds(), builds + 2);
    Ok(())
}

#[test]
fn test_depth_guard() {
    let mut cfg = ValidationConfig::new();
    cfg.set_max_depth(3);
    let v = validator(cfg);
    let schema = json!({"items": {"items": {"items": {"items": {}}}}});
    assert!(v.validate_value(&schema, &json!([[[]]])).is_ok());

    let Err(aborted) = v.validate_value(&schema, &json!([[[[1]]]])) else {
        panic!("exceeding depth must abort");
    };
    assert_eq!(aborted.message().args()["maxDepth"], json!(3));
}

#[test]
fn test_log_level() -> Result<(), Box<dyn Error>> {
    let schema = json!({"foo": 1, "format": "no-such-format"});

    let report = Validator::new().validate_value(&schema, &json!("x"))?;
    assert!(report.is_success());
    let levels = report.iter().map(|m| m.level()).collect::<Vec<_>>();
    assert_eq!(levels, [LogLevel::Info, LogLevel::Warning]);
    assert_eq!(report.messages()[0].args()["ignored"], json!(["foo"]));

    let mut cfg = ValidationConfig::new();
    cfg.set_log_level(LogLevel::Error);
    let report = validator(cfg).validate_value(&schema, &json!("x"))?;
    assert!(report.is_success());
    assert!(report.is_empty());
    Ok(())
}

#[test]
fn test_error_threshold_aborts() {
    let mut cfg = ValidationConfig::new();
    cfg.set_fatal_threshold(LogLevel::Error);
    let v = validator(cfg);
    let schema = json!({"type": "string", "minLength": 2});
    let Err(aborted) = v.validate_value(&schema, &json!(1)) else {
        panic!("error must abort");
    };
    assert_eq!(aborted.message().keyword_name(), Some("type"));
}

#[test]
fn test_format_assertions_disabled() -> Result<(), Box<dyn Error>> {
    let mut cfg = ValidationConfig::new();
    cfg.enable_format_assertions(false);
    let report = validator(cfg).validate_value(&json!({"format": "ipv4"}), &json!("x"))?;
    assert!(report.is_success());
    Ok(())
}

#[test]
fn test_shared_between_threads() -> Result<(), Box<dyn Error>> {
    let mut loading = LoadingConfig::new();
    loading.preload(
        "http://example.com/schema.json",
        json!({"type": "array", "items": {"type": "integer", "minimum": 0}}),
    )?;
    let v = Arc::new(Validator::with_config(loading, ValidationConfig::new()));

    let handles = (0..4)
        .map(|i| {
            let v = Arc::clone(&v);
            thread::spawn(move || {
                let instance = Value::from(vec![i, i + 1]);
                v.validate("http://example.com/schema.json", &instance)
                    .map(|r| r.is_success())
            })
        })
        .collect::<Vec<_>>();
    for h in handles {
        let ok = h.join().map_err(|_| "thread panicked")??;
        assert!(ok);
    }
    assert_eq!(v.service().cached(), 1);
    Ok(())
}
