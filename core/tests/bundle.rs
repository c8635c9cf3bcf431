use apiaudit_core::ast::parse;
use apiaudit_core::{bundle, AuditError, AuditSession, Format, JsonPointer, SpecVersion};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

fn canonical(dir: &Path, name: &str) -> PathBuf {
    fs::canonicalize(dir.join(name)).unwrap()
}

const ROOT_V3: &str = r#"openapi: 3.0.0
info:
  title: t
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

const SCHEMAS_V3: &str = r#"components:
  schemas:
    X:
      type: object
      properties:
        name:
          type: string
"#;

#[test]
fn test_relocates_component_reference() {
    let dir = workspace(&[("a.yaml", ROOT_V3), ("b.yaml", SCHEMAS_V3)]);
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &dir.path().join("a.yaml")).unwrap();

    assert_eq!(bundled.version, Some(SpecVersion::V3));
    let schema = &bundled.document["paths"]["/x"]["get"]["responses"]["200"]["content"]
        ["application/json"]["schema"];
    assert_eq!(schema, &json!({"$ref": "#/components/schemas/b-yaml-X"}));
    assert_eq!(
        bundled.document["components"]["schemas"]["b-yaml-X"],
        json!({"type": "object", "properties": {"name": {"type": "string"}}})
    );

    let origin = bundled
        .provenance
        .resolve(&JsonPointer::parse("#/components/schemas/b-yaml-X/properties/name"))
        .unwrap();
    assert_eq!(origin.file, canonical(dir.path(), "b.yaml"));
    assert_eq!(
        origin.pointer,
        JsonPointer::parse("#/components/schemas/X/properties/name")
    );
    assert_eq!(session.cached(), 2);
}

#[test]
fn test_bundling_is_deterministic() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.1
paths:
  /a:
    get:
      parameters:
        - $ref: 'params.yaml#/limit'
        - $ref: 'params.yaml#/offset'
      responses:
        '200':
          $ref: 'common/responses.yaml#/components/responses/Ok'
"#,
        ),
        ("params.yaml", "limit:\n  name: limit\n  in: query\noffset:\n  name: offset\n  in: query\n"),
        (
            "common/responses.yaml",
            "components:\n  responses:\n    Ok:\n      description: fine\n",
        ),
    ]);
    let root = dir.path().join("a.yaml");
    let first = bundle(&mut AuditSession::open(), &root).unwrap();
    let second = bundle(&mut AuditSession::open(), &root).unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

    let params = &first.document["paths"]["/a"]["get"]["parameters"];
    assert_eq!(params[0]["$ref"], "#/components/parameters/params-yaml-limit");
    assert_eq!(params[1]["$ref"], "#/components/parameters/params-yaml-offset");
    let keys: Vec<_> = first.document["components"]["parameters"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, vec!["params-yaml-limit", "params-yaml-offset"]);
    assert_eq!(
        first.document["components"]["responses"]["common-responses-yaml-Ok"]["description"],
        "fine"
    );
}

#[test]
fn test_swagger_schema_goes_to_definitions() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"swagger: '2.0'
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          schema:
            $ref: 'defs.yaml#/Pet'
"#,
        ),
        ("defs.yaml", "Pet:\n  type: object\n"),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    assert_eq!(bundled.version, Some(SpecVersion::V2));
    assert_eq!(
        bundled.document["paths"]["/pets"]["get"]["responses"]["200"]["schema"]["$ref"],
        "#/definitions/defs-yaml-Pet"
    );
    assert_eq!(bundled.document["definitions"]["defs-yaml-Pet"]["type"], "object");
}

#[test]
fn test_shared_target_is_relocated_once() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.0
paths:
  /a:
    get:
      responses:
        '200':
          $ref: 'b.yaml#/components/responses/Ok'
  /b:
    get:
      responses:
        '200':
          $ref: './b.yaml#/components/responses/Ok'
"#,
        ),
        ("b.yaml", "components:\n  responses:\n    Ok:\n      description: fine\n"),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    let paths = &bundled.document["paths"];
    assert_eq!(
        paths["/a"]["get"]["responses"]["200"]["$ref"],
        paths["/b"]["get"]["responses"]["200"]["$ref"]
    );
    assert_eq!(
        bundled.document["components"]["responses"].as_object().unwrap().len(),
        1
    );
}

#[test]
fn test_self_referencing_component_terminates() {
    let dir = workspace(&[
        (
            "a.yaml",
            "openapi: 3.0.0\ncomponents:\n  schemas:\n    Tree:\n      $ref: 'b.yaml#/components/schemas/Node'\n",
        ),
        (
            "b.yaml",
            r#"components:
  schemas:
    Node:
      type: object
      properties:
        child:
          $ref: '#/components/schemas/Node'
"#,
        ),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    let schemas = &bundled.document["components"]["schemas"];
    assert_eq!(schemas["Tree"]["$ref"], "#/components/schemas/b-yaml-Node");
    assert_eq!(
        schemas["b-yaml-Node"]["properties"]["child"]["$ref"],
        "#/components/schemas/b-yaml-Node"
    );
}

#[test]
fn test_reference_without_container_is_inlined() {
    let dir = workspace(&[
        (
            "a.yaml",
            "openapi: 3.0.0\ninfo:\n  $ref: 'info.yaml'\n  version: '2'\npaths: {}\n",
        ),
        ("info.yaml", "title: From file\nversion: '1'\n"),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    assert_eq!(
        bundled.document["info"],
        json!({"title": "From file", "version": "2"})
    );
    let origin = bundled
        .provenance
        .resolve(&JsonPointer::parse("#/info/title"))
        .unwrap();
    assert_eq!(origin.file, canonical(dir.path(), "info.yaml"));
    assert_eq!(origin.pointer, JsonPointer::parse("#/title"));
}

#[test]
fn test_inline_cycle_is_an_error() {
    let dir = workspace(&[
        ("a.yaml", "openapi: 3.0.0\ninfo:\n  $ref: 'loop.yaml#/a'\n"),
        (
            "loop.yaml",
            "a:\n  next:\n    $ref: '#/b'\nb:\n  next:\n    $ref: '#/a'\n",
        ),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    assert!(matches!(err, AuditError::CircularReference { .. }), "{}", err);
}

#[test]
fn test_destination_taken_in_root_is_a_collision() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.0
paths:
  /x:
    get:
      responses:
        '200':
          $ref: 'b.yaml#/components/responses/Ok'
components:
  responses:
    b-yaml-Ok:
      description: already here
"#,
        ),
        ("b.yaml", "components:\n  responses:\n    Ok:\n      description: fine\n"),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    match err {
        AuditError::DestinationCollision { path } => {
            assert_eq!(path, "#/components/responses/b-yaml-Ok")
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_root_references_are_kept() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.0
paths:
  /x:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Local'
components:
  schemas:
    Local:
      $ref: 'b.yaml#/components/schemas/X'
"#,
        ),
        (
            "b.yaml",
            r#"components:
  schemas:
    X:
      type: object
      properties:
        back:
          $ref: 'a.yaml#/components/schemas/Local'
"#,
        ),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    let doc = &bundled.document;
    assert_eq!(
        doc["paths"]["/x"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]
            ["$ref"],
        "#/components/schemas/Local"
    );
    assert_eq!(
        doc["components"]["schemas"]["Local"]["$ref"],
        "#/components/schemas/b-yaml-X"
    );
    assert_eq!(
        doc["components"]["schemas"]["b-yaml-X"]["properties"]["back"]["$ref"],
        "#/components/schemas/Local"
    );
}

#[test]
fn test_unresolvable_references() {
    let cases = [
        "'missing.yaml#/components/schemas/X'",
        "'b.yaml#/components/schemas/Nope'",
        "'#/components/schemas/Nope'",
        "'https://example.com/api.yaml#/components/schemas/X'",
    ];
    for reference in cases {
        let root = format!(
            "openapi: 3.0.0\ncomponents:\n  schemas:\n    A:\n      $ref: {}\n",
            reference
        );
        let dir = workspace(&[("a.yaml", &root), ("b.yaml", SCHEMAS_V3)]);
        let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
        assert!(
            matches!(err, AuditError::ReferenceResolution { .. }),
            "{}: {}",
            reference,
            err
        );
    }
}

#[test]
fn test_unknown_version_with_external_reference() {
    let dir = workspace(&[
        ("a.yaml", &ROOT_V3.replace("3.0.0", "3.1.0")),
        ("b.yaml", SCHEMAS_V3),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    assert!(matches!(err, AuditError::UnsupportedVersion { .. }));

    let local_only = workspace(&[("a.yaml", "openapi: 3.1.0\npaths: {}\n")]);
    let bundled = bundle(&mut AuditSession::open(), &local_only.path().join("a.yaml")).unwrap();
    assert_eq!(bundled.version, None);
    assert!(bundled.provenance.is_empty());
}

#[test]
fn test_json_sources() {
    let dir = workspace(&[
        (
            "a.json",
            r#"{"openapi": "3.0.2", "components": {"schemas": {"A": {"$ref": "b.json#/components/schemas/X"}}}}"#,
        ),
        (
            "b.json",
            r#"{"components": {"schemas": {"X": {"type": "integer", "format": "int64"}}}}"#,
        ),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.json")).unwrap();
    assert_eq!(
        bundled.document["components"]["schemas"]["b-json-X"],
        json!({"type": "integer", "format": "int64"})
    );
}

#[test]
fn test_parse_errors_are_reported_with_offset() {
    let dir = workspace(&[
        ("a.yaml", "openapi: 3.0.0\ninfo:\n  $ref: 'bad.json'\n"),
        ("bad.json", "{\"title\": }"),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    match err {
        AuditError::Parse { offset, .. } => assert_eq!(offset, 10),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_two_sources_mangled_to_one_destination() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"swagger: '2.0'
paths:
  /a:
    get:
      responses:
        '200':
          description: ok
          schema:
            $ref: 'x/common.yaml#/Pet'
  /b:
    get:
      responses:
        '200':
          description: ok
          schema:
            $ref: 'x-common.yaml#/Pet'
"#,
        ),
        ("x/common.yaml", "Pet:\n  type: object\n"),
        ("x-common.yaml", "Pet:\n  type: string\n"),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    match err {
        AuditError::DestinationCollision { path } => {
            assert_eq!(path, "#/definitions/x-common-yaml-Pet")
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_nested_destination_of_another_source_is_a_collision() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.0
components:
  schemas:
    A:
      $ref: 'b.yaml#/components/schemas/X'
    B:
      $ref: 'b.yaml#/components/schemas/X/properties/y'
"#,
        ),
        (
            "b.yaml",
            "components:\n  schemas:\n    X:\n      properties:\n        y:\n          type: string\n",
        ),
    ]);
    let err = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap_err();
    match err {
        AuditError::DestinationCollision { path } => {
            assert_eq!(path, "#/components/schemas/b-yaml-X/properties/y")
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// Drops every `$ref` so rewritten references compare equal to their source.
fn without_refs(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "$ref")
                .map(|(key, child)| (key.clone(), without_refs(child)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(without_refs).collect()),
        other => other.clone(),
    }
}

#[test]
fn test_every_provenance_record_points_at_its_source() {
    let dir = workspace(&[
        (
            "a.yaml",
            r#"openapi: 3.0.0
info:
  $ref: 'meta/info.yaml'
externalDocs:
  $ref: 'docs.json#/Docs'
paths:
  /pets:
    get:
      parameters:
        - $ref: 'params.yaml#/limit'
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'schemas.yaml#/components/schemas/Pet'
"#,
        ),
        ("meta/info.yaml", "title: Pets\nversion: '1'\n"),
        ("params.yaml", "limit:\n  name: limit\n  in: query\n"),
        (
            "schemas.yaml",
            r#"components:
  schemas:
    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
        tags:
          type: array
          items:
            type: string
    Owner:
      type: string
"#,
        ),
        (
            "docs.json",
            r#"{"Docs": {"description": "Guide", "url": "https://example.com/docs"}}"#,
        ),
    ]);
    let bundled = bundle(&mut AuditSession::open(), &dir.path().join("a.yaml")).unwrap();
    let records = bundled.provenance.records();
    assert_eq!(records.len(), 5);

    for (path, origin) in records {
        let text = fs::read_to_string(&origin.file).unwrap();
        let source = parse(&text, Format::from_path(&origin.file)).unwrap();
        let node = source
            .find(&origin.pointer)
            .unwrap_or_else(|| panic!("{} missing in {}", origin.pointer, origin.file.display()));
        let merged = bundled
            .document
            .pointer(&path.to_string())
            .unwrap_or_else(|| panic!("{} missing in the bundle", path));
        assert_eq!(without_refs(merged), without_refs(&node.to_value()), "{}", path);
    }
}
