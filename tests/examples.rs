use std::{error::Error, fs::File, path::Path};

use schemacheck::{LoadingConfig, ValidationConfig, Validator};
use serde_json::{json, Value};
use url::Url;

#[test]
fn example_from_files() -> Result<(), Box<dyn Error>> {
    let schema_url = {
        let path = Path::new("tests/examples/schema.json");
        let path = path.canonicalize()?;
        Url::from_file_path(path).map_err(|_| "invalid file path")?
    };

    let instance: Value = serde_json::from_reader(File::open("tests/examples/instance.json")?)?;

    let validator = Validator::new();
    let report = validator.validate(schema_url.as_str(), &instance)?;
    assert!(report.is_success(), "{report}");
    // schema.json and address.json
    assert_eq!(validator.service().cached(), 2);

    let invalid = json!({
        "name": "",
        "tags": ["a", "a"],
        "address": {"city": "Hyderabad", "zip": "5"}
    });
    let report = validator.validate(schema_url.as_str(), &invalid)?;
    assert!(!report.is_success());
    let mut keywords = report
        .errors()
        .filter_map(|m| m.keyword_name())
        .collect::<Vec<_>>();
    keywords.sort();
    assert_eq!(keywords, ["minLength", "pattern", "uniqueItems"]);

    let report = validator.validate(schema_url.as_str(), &json!({"address": {}}))?;
    let mut keywords = report
        .errors()
        .filter_map(|m| m.keyword_name())
        .collect::<Vec<_>>();
    keywords.sort();
    // the root fails, so its members are not explored
    assert_eq!(keywords, ["required"]);

    Ok(())
}

#[test]
fn example_from_strings() -> Result<(), Box<dyn Error>> {
    let schema_url = "http://tmp/schema.json";
    let schema: Value = serde_json::from_str(r#"{"type": "object"}"#)?;
    let instance: Value = serde_json::from_str(r#"{"foo": "bar"}"#)?;

    let mut loading = LoadingConfig::new();
    loading.preload(schema_url, schema)?;
    let validator = Validator::with_config(loading, ValidationConfig::new());
    let report = validator.validate(schema_url, &instance)?;
    assert!(report.is_success());

    Ok(())
}

#[test]
fn example_from_value() -> Result<(), Box<dyn Error>> {
    let schema = json!({
        "definitions": {"positive": {"type": "integer", "minimum": 1}},
        "type": "array",
        "items": {"$ref": "#/definitions/positive"}
    });

    let validator = Validator::new();
    assert!(validator.validate_value(&schema, &json!([1, 2, 3]))?.is_success());

    let report = validator.validate_value(&schema, &json!([1, 0, 3]))?;
    assert!(!report.is_success());
    let errors = report.errors().collect::<Vec<_>>();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_ptr().to_string(), "/1");
    assert_eq!(errors[0].keyword_name(), Some("minimum"));

    Ok(())
}

#[test]
fn example_custom_format() -> Result<(), Box<dyn Error>> {
    fn is_odd(v: &Value) -> Result<(), Box<dyn Error>> {
        let Some(n) = v.as_u64() else {
            return Ok(());
        };
        if n % 2 == 0 {
            Err("even number")?
        }
        Ok(())
    }

    let schema = json!({"format": "odd"});
    let mut cfg = ValidationConfig::new();
    cfg.register_format("odd", is_odd);
    let validator = Validator::with_config(LoadingConfig::new(), cfg);

    assert!(validator.validate_value(&schema, &json!(5))?.is_success());
    assert!(!validator.validate_value(&schema, &json!(6))?.is_success());

    Ok(())
}

#[test]
fn example_report_as_json() -> Result<(), Box<dyn Error>> {
    let schema = json!({"type": "string"});
    let report = Validator::new().validate_value(&schema, &json!(1))?;
    let output = report.to_json();
    let first = &output[0];
    assert_eq!(first["level"], "error");
    assert_eq!(first["domain"], "validation");
    assert_eq!(first["keyword"], "type");
    assert_eq!(first["instance"], "");
    assert_eq!(first["found"], "integer");

    Ok(())
}
