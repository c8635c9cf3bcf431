#![deny(missing_docs)]

//! # Bundle Builder
//!
//! Traversal state for one bundling run. The builder walks the root document
//! depth first, resolves every `$ref` it meets and decides, per reference,
//! whether it stays as is, is rewritten to a relocated copy, or is replaced
//! inline by the referenced content. Relocated content is collected while
//! walking and merged into the document by [`BundleBuilder::finish`].

use crate::bundle::provenance::{Origin, ProvenanceTree};
use crate::bundle::BundledDocument;
use crate::error::{AuditError, AuditResult};
use crate::oas::pointer::JsonPointer;
use crate::oas::ref_utils::{
    mangle, parse_reference, relative_path, resolve_document_path, Reference, ReferenceKind,
};
use crate::oas::version::SpecVersion;
use crate::session::{AuditSession, ParsedDocument};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

type SourceKey = (PathBuf, JsonPointer);

/// A relocation whose destination is reserved; `content` is filled in once
/// the referenced subtree has been walked.
struct Relocation {
    destination: JsonPointer,
    source: SourceKey,
    content: JsonValue,
}

/// Mutable state of a bundling run.
pub struct BundleBuilder<'s> {
    session: &'s mut AuditSession,
    root: Rc<ParsedDocument>,
    root_dir: PathBuf,
    version: Option<SpecVersion>,
    relocated: HashMap<SourceKey, JsonPointer>,
    relocations: Vec<Relocation>,
    inlining: HashSet<SourceKey>,
    provenance: ProvenanceTree,
}

impl<'s> BundleBuilder<'s> {
    /// Starts a run for an already parsed root document.
    pub fn new(session: &'s mut AuditSession, root: Rc<ParsedDocument>) -> Self {
        let root_dir = root
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let version = SpecVersion::detect(&root.value);
        Self {
            session,
            root,
            root_dir,
            version,
            relocated: HashMap::new(),
            relocations: Vec::new(),
            inlining: HashSet::new(),
            provenance: ProvenanceTree::new(),
        }
    }

    /// Walks the root document and returns the merged result.
    pub fn run(mut self) -> AuditResult<BundledDocument> {
        log::debug!(
            "Bundling {} (version: {})",
            self.root.path.display(),
            self.version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        let mut document = self.root.value.clone();
        let root_path = self.root.path.clone();
        self.walk(&mut document, &root_path, &mut JsonPointer::root())?;
        self.finish(document)
    }

    fn walk(
        &mut self,
        value: &mut JsonValue,
        file: &Path,
        site: &mut JsonPointer,
    ) -> AuditResult<()> {
        if let Some(raw) = value.get("$ref").and_then(JsonValue::as_str) {
            let raw = raw.to_string();
            return self.visit_reference(value, &raw, file, site);
        }
        match value {
            JsonValue::Object(map) => {
                for (key, child) in map.iter_mut() {
                    site.push(key.clone());
                    self.walk(child, file, site)?;
                    site.pop();
                }
            }
            JsonValue::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    site.push(i.to_string());
                    self.walk(item, file, site)?;
                    site.pop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Walks every key of a reference object except `$ref` itself.
    fn walk_siblings(
        &mut self,
        value: &mut JsonValue,
        file: &Path,
        site: &mut JsonPointer,
    ) -> AuditResult<()> {
        if let JsonValue::Object(map) = value {
            for (key, child) in map.iter_mut() {
                if key == "$ref" {
                    continue;
                }
                site.push(key.clone());
                self.walk(child, file, site)?;
                site.pop();
            }
        }
        Ok(())
    }

    fn visit_reference(
        &mut self,
        value: &mut JsonValue,
        raw: &str,
        file: &Path,
        site: &mut JsonPointer,
    ) -> AuditResult<()> {
        let reference = parse_reference(raw);
        log::debug!("{}: $ref '{}' at {}", file.display(), raw, site.to_fragment());

        if reference.kind == ReferenceKind::Remote {
            return Err(resolution_error(file, raw, "only local files can be referenced"));
        }
        let target = self.load_target(&reference, file)?;
        if target.root.find(&reference.pointer).is_none() {
            let reason = format!(
                "'{}' not found in {}",
                reference.pointer.to_fragment(),
                target.path.display()
            );
            return Err(resolution_error(file, raw, &reason));
        }

        if target.path == self.root.path {
            // Targets in the root file already exist in the merged document.
            if file != self.root.path {
                set_ref(value, &reference.pointer);
            }
            return self.walk_siblings(value, file, site);
        }

        let version = self.version.ok_or_else(|| AuditError::UnsupportedVersion {
            file: self.root.path.display().to_string(),
        })?;
        let source: SourceKey = (target.path.clone(), reference.pointer.clone());

        if let Some(destination) = self.relocated.get(&source).cloned() {
            log::debug!("Reusing {} for '{}'", destination.to_fragment(), raw);
            set_ref(value, &destination);
            return self.walk_siblings(value, file, site);
        }

        match self.destination_for(&reference, &target.path, site, version) {
            Some(destination) => {
                self.relocate(&target, source, destination.clone())?;
                set_ref(value, &destination);
                self.walk_siblings(value, file, site)
            }
            None => self.inline(value, &target, source, raw, file, site),
        }
    }

    fn load_target(
        &mut self,
        reference: &Reference,
        file: &Path,
    ) -> AuditResult<Rc<ParsedDocument>> {
        if reference.document.is_empty() {
            return self.session.document(file);
        }
        let path = resolve_document_path(file, &reference.document)
            .ok_or_else(|| resolution_error(file, &reference.raw, "invalid file path"))?;
        self.session.document(&path).map_err(|e| match e {
            AuditError::Io(io) => resolution_error(
                file,
                &reference.raw,
                &format!("cannot read {}: {}", path.display(), io),
            ),
            other => other,
        })
    }

    /// Picks the container a cross-file reference is relocated into, or
    /// `None` if it has to be inlined.
    fn destination_for(
        &self,
        reference: &Reference,
        target: &Path,
        site: &JsonPointer,
        version: SpecVersion,
    ) -> Option<JsonPointer> {
        let segments = reference.pointer.segments();
        if segments.len() >= 3 && segments[0] == "components" {
            let relative = relative_path(&self.root_dir, target);
            let mut destination = JsonPointer::from_segments([
                "components".to_string(),
                segments[1].clone(),
                format!("{}-{}", mangle(&relative), segments[2]),
            ]);
            for rest in &segments[3..] {
                destination.push(rest.clone());
            }
            return Some(destination);
        }

        // parent key first, then grandparent
        let container = site
            .nth_last(0)
            .and_then(|key| version.destination_for(key))
            .or_else(|| site.nth_last(1).and_then(|key| version.destination_for(key)))?;
        let mut destination = JsonPointer::from_segments(container.iter().copied());
        destination.push(mangle(&reference.raw));
        Some(destination)
    }

    fn relocate(
        &mut self,
        target: &ParsedDocument,
        source: SourceKey,
        destination: JsonPointer,
    ) -> AuditResult<()> {
        self.check_collision(&destination, &source)?;
        log::info!(
            "Relocating {}{} to {}",
            source.0.display(),
            source.1.to_fragment(),
            destination.to_fragment()
        );

        self.relocated.insert(source.clone(), destination.clone());
        self.provenance.insert(
            &destination,
            Origin {
                file: source.0.clone(),
                pointer: source.1.clone(),
            },
        );
        let slot = self.relocations.len();
        self.relocations.push(Relocation {
            destination: destination.clone(),
            source: source.clone(),
            content: JsonValue::Null,
        });

        let mut content = target
            .root
            .find(&source.1)
            .map(|node| node.to_value())
            .unwrap_or(JsonValue::Null);
        // Inline cycles are tracked per relocated subtree.
        let outer = std::mem::take(&mut self.inlining);
        let walked = self.walk(&mut content, &target.path, &mut destination.clone());
        self.inlining = outer;
        walked?;
        self.relocations[slot].content = content;
        Ok(())
    }

    fn inline(
        &mut self,
        value: &mut JsonValue,
        target: &ParsedDocument,
        source: SourceKey,
        raw: &str,
        file: &Path,
        site: &mut JsonPointer,
    ) -> AuditResult<()> {
        if self.inlining.contains(&source) {
            return Err(AuditError::CircularReference {
                file: file.display().to_string(),
                reference: raw.to_string(),
            });
        }
        log::debug!("Inlining '{}' at {}", raw, site.to_fragment());
        self.provenance.insert(
            site,
            Origin {
                file: source.0.clone(),
                pointer: source.1.clone(),
            },
        );

        let mut content = target
            .root
            .find(&source.1)
            .map(|node| node.to_value())
            .unwrap_or(JsonValue::Null);
        self.inlining.insert(source.clone());
        let walked = self.walk(&mut content, &target.path, site);
        self.inlining.remove(&source);
        walked?;

        self.walk_siblings(value, file, site)?;
        if let (JsonValue::Object(siblings), JsonValue::Object(merged)) =
            (&mut *value, &mut content)
        {
            for (key, sibling) in std::mem::take(siblings) {
                if key != "$ref" {
                    merged.insert(key, sibling);
                }
            }
        }
        *value = content;
        Ok(())
    }

    /// A destination must be free in the root document and unrelated to the
    /// destination of any other source.
    fn check_collision(&self, destination: &JsonPointer, source: &SourceKey) -> AuditResult<()> {
        if self.root.root.find(destination).is_some() {
            return Err(collision(destination));
        }
        let clash = self.relocations.iter().any(|r| {
            r.source != *source
                && (r.destination.is_prefix_of(destination)
                    || destination.is_prefix_of(&r.destination))
        });
        if clash {
            return Err(collision(destination));
        }
        Ok(())
    }

    /// Inserts the relocated content and freezes the result.
    pub fn finish(self, mut document: JsonValue) -> AuditResult<BundledDocument> {
        for relocation in self.relocations {
            insert_at(&mut document, &relocation.destination, relocation.content)?;
        }
        log::debug!(
            "Bundled {} ({} relocations)",
            self.root.path.display(),
            self.relocated.len()
        );
        Ok(BundledDocument {
            root_file: self.root.path.clone(),
            version: self.version,
            document,
            provenance: self.provenance,
        })
    }
}

fn set_ref(value: &mut JsonValue, pointer: &JsonPointer) {
    if let JsonValue::Object(map) = value {
        map.insert("$ref".to_string(), JsonValue::String(pointer.to_fragment()));
    }
}

fn insert_at(
    document: &mut JsonValue,
    destination: &JsonPointer,
    content: JsonValue,
) -> AuditResult<()> {
    let Some((last, parents)) = destination.segments().split_last() else {
        return Err(collision(destination));
    };
    let mut current = document;
    for segment in parents {
        current = current
            .as_object_mut()
            .ok_or_else(|| collision(destination))?
            .entry(segment.clone())
            .or_insert_with(|| JsonValue::Object(Map::new()));
    }
    let container = current.as_object_mut().ok_or_else(|| collision(destination))?;
    if container.contains_key(last) {
        return Err(collision(destination));
    }
    container.insert(last.clone(), content);
    Ok(())
}

fn collision(destination: &JsonPointer) -> AuditError {
    AuditError::DestinationCollision {
        path: destination.to_fragment(),
    }
}

fn resolution_error(file: &Path, reference: &str, reason: &str) -> AuditError {
    AuditError::ReferenceResolution {
        file: file.display().to_string(),
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_at_creates_intermediate_objects() {
        let mut doc = json!({"openapi": "3.0.0"});
        let destination = JsonPointer::parse("/components/schemas/a");
        insert_at(&mut doc, &destination, json!({"type": "string"})).unwrap();
        assert_eq!(doc["components"]["schemas"]["a"]["type"], "string");
    }

    #[test]
    fn test_insert_at_rejects_existing_and_scalar_parents() {
        let mut doc = json!({"components": {"schemas": {"a": {}}}, "info": "x"});
        let existing = JsonPointer::parse("/components/schemas/a");
        let err = insert_at(&mut doc, &existing, json!(1)).unwrap_err();
        assert!(matches!(err, AuditError::DestinationCollision { .. }));
        assert!(insert_at(&mut doc, &JsonPointer::parse("/info/x"), json!(1)).is_err());
        assert!(insert_at(&mut doc, &JsonPointer::root(), json!(1)).is_err());
    }

    #[test]
    fn test_set_ref_keeps_siblings_and_order() {
        let mut site = json!({"description": "d", "$ref": "b.yaml#/X", "x-a": 1});
        set_ref(&mut site, &JsonPointer::parse("/definitions/b-yaml-X"));
        let keys: Vec<_> = site.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["description", "$ref", "x-a"]);
        assert_eq!(site["$ref"], "#/definitions/b-yaml-X");
    }
}
