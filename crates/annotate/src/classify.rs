//! Kind classification: decide per document whether it is a list wrapper, a
//! supported workload, or something we pass through untouched.

use kube::core::GroupVersionKind;
use serde_json::Value as Json;
use serde_yaml::Value as Yaml;

/// Where a workload kind keeps the annotations its pods end up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRoute {
    /// Lower-cased kind name.
    pub kind: &'static str,
    /// JSON pointer of the annotation mapping.
    pub path: &'static str,
}

const POD_PATH: &str = "/metadata/annotations";
const TEMPLATE_PATH: &str = "/spec/template/metadata/annotations";
const JOB_TEMPLATE_PATH: &str = "/spec/jobTemplate/spec/template/metadata/annotations";

pub static ROUTES: [KindRoute; 7] = [
    KindRoute { kind: "pod", path: POD_PATH },
    KindRoute { kind: "deployment", path: TEMPLATE_PATH },
    KindRoute { kind: "replicaset", path: TEMPLATE_PATH },
    KindRoute { kind: "daemonset", path: TEMPLATE_PATH },
    KindRoute { kind: "statefulset", path: TEMPLATE_PATH },
    KindRoute { kind: "job", path: TEMPLATE_PATH },
    KindRoute { kind: "cronjob", path: JOB_TEMPLATE_PATH },
];

pub const LIST_KIND: &str = "list";

/// Case-insensitive route lookup.
pub fn route_for(kind: &str) -> Option<&'static KindRoute> {
    ROUTES.iter().find(|r| r.kind.eq_ignore_ascii_case(kind))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentClass {
    List,
    Workload(&'static KindRoute),
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    pub gvk: GroupVersionKind,
    pub class: DocumentClass,
}

impl Descriptor {
    fn from_type_meta(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        let class = if kind.eq_ignore_ascii_case(LIST_KIND) {
            DocumentClass::List
        } else {
            route_for(kind).map(DocumentClass::Workload).unwrap_or(DocumentClass::Passthrough)
        };
        Self { gvk: GroupVersionKind { group, version, kind: kind.to_string() }, class }
    }

    fn passthrough() -> Self {
        Self::from_type_meta("", "")
    }
}

/// Read only `apiVersion` and `kind` from a parsed YAML document. Anything that
/// is not a mapping (null for comment-only documents, scalars, sequences) passes
/// through. A present but non-string type field is an error.
pub fn classify_yaml(doc: &Yaml) -> Result<Descriptor, String> {
    let Some(map) = doc.as_mapping() else { return Ok(Descriptor::passthrough()) };
    let field = |key: &str| -> Result<String, String> {
        match map.get(key) {
            None | Some(Yaml::Null) => Ok(String::new()),
            Some(Yaml::String(s)) => Ok(s.clone()),
            Some(other) => Err(format!("{} must be a string, got {:?}", key, other)),
        }
    };
    Ok(Descriptor::from_type_meta(&field("apiVersion")?, &field("kind")?))
}

/// Same as [`classify_yaml`] for list items, which are already JSON.
pub fn classify_json(doc: &Json) -> Result<Descriptor, String> {
    let Some(map) = doc.as_object() else { return Ok(Descriptor::passthrough()) };
    let field = |key: &str| -> Result<String, String> {
        match map.get(key) {
            None | Some(Json::Null) => Ok(String::new()),
            Some(Json::String(s)) => Ok(s.clone()),
            Some(other) => Err(format!("{} must be a string, got {}", key, other)),
        }
    };
    Ok(Descriptor::from_type_meta(&field("apiVersion")?, &field("kind")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Yaml { serde_yaml::from_str(s).unwrap() }

    #[test]
    fn routes_are_case_insensitive() {
        assert_eq!(route_for("Deployment").map(|r| r.path), Some(TEMPLATE_PATH));
        assert_eq!(route_for("POD").map(|r| r.path), Some(POD_PATH));
        assert_eq!(route_for("CronJob").map(|r| r.path), Some(JOB_TEMPLATE_PATH));
        assert!(route_for("Service").is_none());
        assert!(route_for("List").is_none());
    }

    #[test]
    fn classifies_workload_list_and_passthrough() {
        let d = classify_yaml(&yaml("apiVersion: apps/v1\nkind: StatefulSet\nspec: {}\n")).unwrap();
        assert_eq!(d.gvk.group, "apps");
        assert_eq!(d.gvk.version, "v1");
        assert!(matches!(d.class, DocumentClass::Workload(r) if r.kind == "statefulset"));

        let d = classify_yaml(&yaml("apiVersion: v1\nkind: list\nitems: []\n")).unwrap();
        assert_eq!(d.class, DocumentClass::List);

        let d = classify_yaml(&yaml("apiVersion: v1\nkind: Service\n")).unwrap();
        assert_eq!(d.class, DocumentClass::Passthrough);
    }

    #[test]
    fn tolerates_shapeless_documents() {
        for s in ["# only a comment\n", "- a\n- b\n", "plain scalar", "metadata: {name: x}\n"] {
            assert_eq!(classify_yaml(&yaml(s)).unwrap().class, DocumentClass::Passthrough, "{}", s);
        }
    }

    #[test]
    fn non_string_kind_is_rejected() {
        let err = classify_yaml(&yaml("apiVersion: v1\nkind: [Pod]\n")).unwrap_err();
        assert!(err.contains("kind must be a string"), "{}", err);
        let err = classify_json(&serde_json::json!({"apiVersion": 1, "kind": "Pod"})).unwrap_err();
        assert!(err.contains("apiVersion"), "{}", err);
    }
}
