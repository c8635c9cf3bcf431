use apiaudit_core::{
    bundle, Assessment, AuditError, AuditSession, JsonPointer, Locator, Severity,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ROOT: &str = r#"openapi: 3.0.0
info:
  title: t
  version: '1'
paths:
  /x:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'b.yaml#/components/schemas/X'
"#;

const SCHEMAS: &str = r#"components:
  schemas:
    X:
      type: object
      properties:
        name:
          type: string
"#;

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), ROOT).unwrap();
    fs::write(dir.path().join("b.yaml"), SCHEMAS).unwrap();
    dir
}

fn canonical(dir: &TempDir, name: &str) -> PathBuf {
    fs::canonicalize(dir.path().join(name)).unwrap()
}

#[test]
fn test_locate_in_root_and_relocated_files() {
    let dir = fixture();
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    let mut locator = Locator::new(&mut session, &bundled).unwrap();

    let title = locator.locate(&JsonPointer::parse("#/info/title")).unwrap();
    assert_eq!(title.file, canonical(&dir, "a.yaml"));
    assert_eq!(title.line, 3);
    assert_eq!(&ROOT[title.range.0..title.range.1], "t");

    let name = locator
        .locate(&JsonPointer::parse(
            "#/components/schemas/b-yaml-X/properties/name",
        ))
        .unwrap();
    assert_eq!(name.file, canonical(&dir, "b.yaml"));
    assert_eq!(name.line, 7);
    assert_eq!(
        &SCHEMAS[name.range.0..name.range.1].trim_end(),
        &"type: string"
    );

    // The rewritten reference itself still lives in the root file.
    let schema = locator
        .locate(&JsonPointer::parse(
            "#/paths/~1x/get/responses/200/content/application~1json/schema",
        ))
        .unwrap();
    assert_eq!(schema.file, canonical(&dir, "a.yaml"));
    assert_eq!(schema.line, 14);
}

#[test]
fn test_locate_missing_pointer() {
    let dir = fixture();
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    let mut locator = Locator::new(&mut session, &bundled).unwrap();

    for pointer in ["#/nowhere", "#/components/schemas/b-yaml-X/properties/age"] {
        let err = locator.locate(&JsonPointer::parse(pointer)).unwrap_err();
        assert!(
            matches!(&err, AuditError::LocationNotFound(p) if p == pointer),
            "{}",
            err
        );
        assert!(err.is_per_issue());
    }
}

#[test]
fn test_get_issues_sorted_and_defaulted() {
    let dir = fixture();
    let report = Assessment::from_json(
        r#"{
            "index": [
                "/info/title",
                "/components/schemas/b-yaml-X/properties/name",
                "/paths/~1x/get/responses/200",
                "/missing"
            ],
            "warnings": {"issues": {"info-title-short": {
                "description": "Title is too short",
                "issues": [{"pointer": 0, "score": -0.2}]
            }}},
            "data": {"issues": {"v3-schema-string-pattern": {
                "description": "String has no pattern",
                "criticality": 3,
                "issues": [
                    {"pointer": 1, "score": -4.5, "specificDescription": "name has no pattern"},
                    {"pointer": 3, "score": -1}
                ]
            }}},
            "security": {"issues": {"response-401": {
                "description": "No 401 response",
                "criticality": 0,
                "issues": [{"pointer": 2, "score": -12.5}]
            }}}
        }"#,
    )
    .unwrap();

    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    let issues = Locator::new(&mut session, &bundled)
        .unwrap()
        .get_issues(&report)
        .unwrap();

    let ids: Vec<_> = issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "response-401",
            "v3-schema-string-pattern",
            "v3-schema-string-pattern",
            "info-title-short"
        ]
    );

    assert_eq!(issues[0].criticality, 5);
    assert_eq!(issues[0].severity, Severity::Critical);
    assert_eq!(issues[0].display_score, "12");
    assert_eq!(issues[0].line, Some(10));

    assert_eq!(issues[1].description, "name has no pattern");
    assert_eq!(issues[1].file, canonical(&dir, "b.yaml"));
    assert_eq!(issues[1].line, Some(7));
    assert_eq!(issues[1].severity, Severity::Medium);
    assert_eq!(issues[1].display_score, "4");

    assert!(!issues[2].is_located());
    assert_eq!(issues[2].file, canonical(&dir, "a.yaml"));
    assert_eq!(issues[2].description, "String has no pattern");

    assert_eq!(issues[3].criticality, 1);
    assert_eq!(issues[3].severity, Severity::Low);
    assert_eq!(issues[3].display_score, "less than 1");
    assert_eq!(issues[3].line, Some(3));
}

#[test]
fn test_get_issues_rejects_bad_criticality() {
    let dir = fixture();
    let report = Assessment::from_json(
        r#"{"index": ["/info"], "data": {"issues": {"x": {"criticality": 9, "issues": [{"pointer": 0}]}}}}"#,
    )
    .unwrap();
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    let err = Locator::new(&mut session, &bundled)
        .unwrap()
        .get_issues(&report)
        .unwrap_err();
    assert!(matches!(err, AuditError::InvalidCriticality(9)));
}

#[test]
fn test_get_issues_rejects_dangling_index_key() {
    let dir = fixture();
    let report = Assessment::from_json(
        r#"{"index": [], "data": {"issues": {"x": {"issues": [{"pointer": 4}]}}}}"#,
    )
    .unwrap();
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    let err = Locator::new(&mut session, &bundled)
        .unwrap()
        .get_issues(&report)
        .unwrap_err();
    assert!(matches!(err, AuditError::Report(_)));
}

#[test]
fn test_bundle_and_locate_through_alias() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), ROOT).unwrap();
    let schemas = r#"components:
  schemas:
    Name: &name
      type: string
      maxLength: 10
    X:
      type: object
      properties:
        name: *name
"#;
    fs::write(dir.path().join("b.yaml"), schemas).unwrap();

    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();
    assert_eq!(
        bundled.document["components"]["schemas"]["b-yaml-X"]["properties"]["name"],
        serde_json::json!({"type": "string", "maxLength": 10})
    );

    let mut locator = Locator::new(&mut session, &bundled).unwrap();
    let location = locator
        .locate(&JsonPointer::parse(
            "#/components/schemas/b-yaml-X/properties/name/maxLength",
        ))
        .unwrap();
    assert_eq!(location.file, canonical(&dir, "b.yaml"));
    // The alias resolves to where the anchored node was written.
    assert_eq!(location.line, 5);
    assert_eq!(&schemas[location.range.0..location.range.1], "10");
}
