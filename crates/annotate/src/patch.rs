//! Annotation patching for a matched workload.
//!
//! The merge happens up front; the patch itself is a single `add` at the
//! route's annotation path, which replaces the member when it exists and
//! creates it when only the parent exists.

use json_patch::{AddOperation, Patch, PatchOperation};
use serde_json::{Map, Value as Json};
use sidecar_core::{keys, AnnotateError, AnnotationSet, ResourceRef, Result};

use crate::classify::KindRoute;

/// Textual encoding of a source document, kept so patched output reads like input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    pub fn detect(raw: &[u8]) -> Self {
        match raw.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Encoding::Json,
            _ => Encoding::Yaml,
        }
    }
}

pub fn encode(doc: &Json, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Yaml => serde_yaml::to_string(doc)
            .map(String::into_bytes)
            .map_err(|e| AnnotateError::encode(format!("writing YAML: {}", e))),
        Encoding::Json => {
            let mut out = serde_json::to_vec_pretty(doc).map_err(|e| AnnotateError::encode(format!("writing JSON: {}", e)))?;
            out.push(b'\n');
            Ok(out)
        }
    }
}

/// Existing annotations overlaid with `set`, plus the default app id when
/// neither side provides one.
pub fn effective_annotations(existing: Option<&Json>, set: &AnnotationSet, target: &ResourceRef) -> Result<Map<String, Json>> {
    let mut merged = match existing {
        None | Some(Json::Null) => Map::new(),
        Some(Json::Object(m)) => m.clone(),
        Some(other) => {
            return Err(AnnotateError::patch(format!("annotations of {} are not a mapping: {}", target, other)));
        }
    };
    for (k, v) in set.iter() {
        merged.insert(k.to_string(), Json::String(v.to_string()));
    }
    if !merged.contains_key(keys::APP_ID) {
        merged.insert(keys::APP_ID.to_string(), Json::String(target.default_app_id()));
    }
    Ok(merged)
}

/// Merge and apply in place. Fails when the route's parent path does not exist.
pub fn apply(doc: &mut Json, route: &KindRoute, set: &AnnotationSet, target: &ResourceRef) -> Result<()> {
    let merged = effective_annotations(doc.pointer(route.path), set, target)?;
    let patch = Patch(vec![PatchOperation::Add(AddOperation {
        path: route.path.to_string(),
        value: Json::Object(merged),
    })]);
    json_patch::patch(doc, &patch)
        .map_err(|e| AnnotateError::patch(format!("applying annotations at {} to {}: {}", route.path, target, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::route_for;
    use serde_json::json;

    fn target(kind: &str, name: &str) -> ResourceRef {
        ResourceRef { kind: kind.into(), namespace: None, name: name.into() }
    }

    #[test]
    fn merges_over_existing_and_fills_default_id() {
        let existing = json!({"team": "x", "dapr.io/app-port": "1"});
        let mut set = AnnotationSet::enabled();
        set.insert(keys::APP_PORT, "3000");
        let m = effective_annotations(Some(&existing), &set, &target("Deployment", "web")).unwrap();
        assert_eq!(
            Json::Object(m),
            json!({"team": "x", "dapr.io/app-port": "3000", "dapr.io/enabled": "true", "dapr.io/app-id": "default-deployment-web"})
        );
    }

    #[test]
    fn existing_app_id_is_kept_when_not_overridden() {
        let existing = json!({"dapr.io/app-id": "keep"});
        let m = effective_annotations(Some(&existing), &AnnotationSet::enabled(), &target("Pod", "p")).unwrap();
        assert_eq!(m.get(keys::APP_ID), Some(&json!("keep")));
    }

    #[test]
    fn non_mapping_annotations_are_rejected() {
        let err = effective_annotations(Some(&json!(["a"])), &AnnotationSet::enabled(), &target("Pod", "p")).unwrap_err();
        assert!(matches!(err, AnnotateError::Patch { .. }));
    }

    #[test]
    fn apply_creates_annotations_under_existing_parent() {
        let mut doc = json!({"kind": "Pod", "metadata": {"name": "p"}, "spec": {"containers": []}});
        apply(&mut doc, route_for("pod").unwrap(), &AnnotationSet::enabled(), &target("Pod", "p")).unwrap();
        assert_eq!(doc.pointer("/metadata/annotations/dapr.io~1enabled"), Some(&json!("true")));
        assert_eq!(doc["spec"], json!({"containers": []}));
    }

    #[test]
    fn apply_fails_without_parent_structure() {
        let mut doc = json!({"kind": "Deployment", "metadata": {"name": "d"}, "spec": {"template": {}}});
        let before = doc.clone();
        let err = apply(&mut doc, route_for("deployment").unwrap(), &AnnotationSet::enabled(), &target("Deployment", "d"))
            .unwrap_err();
        assert!(matches!(err, AnnotateError::Patch { .. }), "{}", err);
        assert_eq!(doc, before);
    }

    #[test]
    fn detects_json_documents() {
        assert_eq!(Encoding::detect(b"  \n{\"kind\": \"Pod\"}"), Encoding::Json);
        assert_eq!(Encoding::detect(b"kind: Pod\n"), Encoding::Yaml);
        assert_eq!(Encoding::detect(b"# {not json}\nkind: Pod\n"), Encoding::Yaml);
    }
}
