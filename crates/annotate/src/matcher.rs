//! Target matching: is this workload *the* resource of the run?

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value as Json;
use sidecar_core::{ResourceRef, TargetSelector};

/// Resolve name and namespace from the top-level `metadata` of a workload.
pub fn identity_of(doc: &Json, kind: &str) -> Result<ResourceRef, String> {
    let meta: ObjectMeta = match doc.get("metadata") {
        Some(m) if !m.is_null() => {
            serde_json::from_value(m.clone()).map_err(|e| format!("reading metadata of {}: {}", kind, e))?
        }
        _ => ObjectMeta::default(),
    };
    Ok(ResourceRef { kind: kind.to_string(), namespace: meta.namespace, name: meta.name.unwrap_or_default() })
}

/// First-match-wins selection.
///
/// Once a run has matched, nothing matches again. With no resource name the
/// first candidate wins; otherwise names must agree (case-insensitively) and,
/// when the selector has a namespace, so must namespaces, an absent manifest
/// namespace counting as `default`.
pub fn is_target(selector: &TargetSelector, candidate: &ResourceRef, already_matched: bool) -> bool {
    if already_matched {
        return false;
    }
    let Some(name) = selector.resource() else { return true };
    if !candidate.name.eq_ignore_ascii_case(name) {
        return false;
    }
    match selector.namespace() {
        Some(ns) => candidate.namespace_or_default().eq_ignore_ascii_case(ns),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(name: &str, ns: Option<&str>) -> ResourceRef {
        ResourceRef { kind: "Pod".into(), namespace: ns.map(str::to_string), name: name.into() }
    }

    #[test]
    fn empty_selector_takes_first_candidate_only() {
        let sel = TargetSelector::any();
        assert!(is_target(&sel, &pod("a", None), false));
        assert!(!is_target(&sel, &pod("a", None), true));
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let sel = TargetSelector::named("NodeApp");
        assert!(is_target(&sel, &pod("nodeapp", Some("anything")), false));
        assert!(!is_target(&sel, &pod("other", None), false));
    }

    #[test]
    fn namespace_defaults_when_absent_from_manifest() {
        let sel = TargetSelector::named("web").in_namespace("Default");
        assert!(is_target(&sel, &pod("web", None), false));
        assert!(!is_target(&sel, &pod("web", Some("prod")), false));
        let sel = TargetSelector::named("web").in_namespace("prod");
        assert!(is_target(&sel, &pod("WEB", Some("PROD")), false));
        assert!(!is_target(&sel, &pod("web", None), false));
    }

    #[test]
    fn identity_reads_metadata() {
        let r = identity_of(&json!({"kind": "Job", "metadata": {"name": "j", "namespace": "batch"}}), "Job").unwrap();
        assert_eq!(r, ResourceRef { kind: "Job".into(), namespace: Some("batch".into()), name: "j".into() });
        let r = identity_of(&json!({"kind": "Pod"}), "Pod").unwrap();
        assert_eq!(r.name, "");
        assert!(identity_of(&json!({"metadata": {"name": 7}}), "Pod").is_err());
    }
}
