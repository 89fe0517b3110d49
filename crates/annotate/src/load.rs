//! Manifest loading with YAML 1.1 scalar resolution.
//!
//! Kubernetes tooling reads manifests with YAML 1.1 rules: a plain `0644` is
//! the octal integer 420 and a plain `yes` or `on` is a boolean. Quoted
//! scalars are always strings. A patched document is loaded here so that
//! every value outside the annotation mapping keeps that meaning when the
//! document is written back.

use std::collections::HashMap;
use std::str::Chars;

use serde_json::{Map, Number, Value as Json};
use sidecar_core::{AnnotateError, Result};
use yaml_rust2::parser::{Event, Parser, Tag};
use yaml_rust2::scanner::TScalarStyle;

const CORE_SCHEMA: &str = "tag:yaml.org,2002:";

/// Load the first document of `raw` as JSON.
pub fn document(raw: &[u8]) -> Result<Json> {
    let text = std::str::from_utf8(raw).map_err(|e| AnnotateError::decode(format!("document is not UTF-8: {}", e)))?;
    let mut loader = Loader { parser: Parser::new(text.chars()), anchors: HashMap::new() };
    loop {
        match loader.next()? {
            Event::StreamEnd => return Ok(Json::Null),
            ev @ (Event::Scalar(..) | Event::SequenceStart(..) | Event::MappingStart(..) | Event::Alias(_)) => {
                return loader.node(ev)
            }
            _ => continue,
        }
    }
}

struct Loader<'a> {
    parser: Parser<Chars<'a>>,
    anchors: HashMap<usize, Json>,
}

impl Loader<'_> {
    fn next(&mut self) -> Result<Event> {
        self.parser
            .next_token()
            .map(|(ev, _)| ev)
            .map_err(|e| AnnotateError::decode(format!("parsing document: {}", e)))
    }

    fn node(&mut self, ev: Event) -> Result<Json> {
        match ev {
            Event::Scalar(text, style, anchor, tag) => {
                let value = resolve(text, style, tag.as_ref());
                Ok(self.remember(anchor, value))
            }
            Event::SequenceStart(anchor, _) => {
                let mut items = Vec::new();
                loop {
                    match self.next()? {
                        Event::SequenceEnd => break,
                        ev => items.push(self.node(ev)?),
                    }
                }
                Ok(self.remember(anchor, Json::Array(items)))
            }
            Event::MappingStart(anchor, _) => {
                let mut map = Map::new();
                loop {
                    let key = match self.next()? {
                        Event::MappingEnd => break,
                        // keys keep their source text
                        Event::Scalar(text, _, anchor, _) => {
                            self.remember(anchor, Json::String(text.clone()));
                            text
                        }
                        ev => match self.node(ev)? {
                            Json::String(s) => s,
                            other => return Err(AnnotateError::decode(format!("unsupported mapping key: {}", other))),
                        },
                    };
                    let ev = self.next()?;
                    let value = self.node(ev)?;
                    map.insert(key, value);
                }
                Ok(self.remember(anchor, Json::Object(map)))
            }
            Event::Alias(id) => {
                self.anchors.get(&id).cloned().ok_or_else(|| AnnotateError::decode(format!("unknown alias #{}", id)))
            }
            other => Err(AnnotateError::decode(format!("unexpected YAML event {:?}", other))),
        }
    }

    fn remember(&mut self, anchor: usize, value: Json) -> Json {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        value
    }
}

fn resolve(text: String, style: TScalarStyle, tag: Option<&Tag>) -> Json {
    let core = tag.filter(|t| t.handle == CORE_SCHEMA || t.handle == "!!").map(|t| t.suffix.as_str());
    match core {
        Some("str") | Some("binary") => Json::String(text),
        Some(_) => plain(text),
        None if style == TScalarStyle::Plain => plain(text),
        None => Json::String(text),
    }
}

fn plain(text: String) -> Json {
    match text.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return Json::Null,
        "y" | "Y" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" | "true" | "True" | "TRUE" => return Json::Bool(true),
        "n" | "N" | "no" | "No" | "NO" | "off" | "Off" | "OFF" | "false" | "False" | "FALSE" => return Json::Bool(false),
        _ => {}
    }
    if let Some(n) = integer(&text) {
        return n;
    }
    if let Some(f) = float(&text) {
        return f;
    }
    Json::String(text)
}

/// Integers with an optional sign and a `0x`, `0o`, `0b` or bare leading-zero
/// (octal) prefix. Underscores are ignored.
fn integer(text: &str) -> Option<Json> {
    let first = *text.as_bytes().first()?;
    if !(first.is_ascii_digit() || first == b'+' || first == b'-') {
        return None;
    }
    let digits = text.replace('_', "");
    let (negative, unsigned) = match digits.as_bytes()[0] {
        b'-' => (true, &digits[1..]),
        b'+' => (false, &digits[1..]),
        _ => (false, digits.as_str()),
    };
    let (radix, body) = if let Some(rest) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = unsigned.strip_prefix("0o").or_else(|| unsigned.strip_prefix("0O")) {
        (8, rest)
    } else if let Some(rest) = unsigned.strip_prefix("0b").or_else(|| unsigned.strip_prefix("0B")) {
        (2, rest)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u64::from_str_radix(body, radix).ok()?;
    if negative {
        i64::try_from(-i128::from(magnitude)).ok().map(Json::from)
    } else {
        Some(Json::from(magnitude))
    }
}

fn float(text: &str) -> Option<Json> {
    let digits = text.replace('_', "");
    let shaped = digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !shaped {
        return None;
    }
    let f = digits.parse::<f64>().ok()?;
    Number::from_f64(f).map(Json::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(s: &str) -> Json {
        document(s.as_bytes()).unwrap()
    }

    #[test]
    fn plain_scalars_resolve_like_kubectl() {
        let doc = load("mode: 0644\nhex: 0x1F\nneg: -010\ndec: 420\nratio: 0.5\nflag: yes\noff: off\nempty:\ntilde: ~\n");
        assert_eq!(
            doc,
            json!({"mode": 420, "hex": 31, "neg": -8, "dec": 420, "ratio": 0.5, "flag": true, "off": false, "empty": null, "tilde": null})
        );
    }

    #[test]
    fn quoted_and_tagged_scalars_stay_strings() {
        let doc = load("a: '0644'\nb: \"yes\"\nc: !!str 0755\nd: |\n  on\ne: 1.20.3\nf: 08x\n");
        assert_eq!(doc, json!({"a": "0644", "b": "yes", "c": "0755", "d": "on\n", "e": "1.20.3", "f": "08x"}));
    }

    #[test]
    fn keys_keep_their_text() {
        let doc = load("on: push\n8080: http\n");
        assert_eq!(doc, json!({"on": "push", "8080": "http"}));
    }

    #[test]
    fn anchors_and_aliases_are_expanded() {
        let doc = load("base: &labels\n  app: web\ncopy: *labels\n");
        assert_eq!(doc["copy"], json!({"app": "web"}));
    }

    #[test]
    fn json_text_loads_unchanged() {
        let doc = load(r#"{"kind": "Pod", "spec": {"n": 3, "s": "010", "b": false}}"#);
        assert_eq!(doc, json!({"kind": "Pod", "spec": {"n": 3, "s": "010", "b": false}}));
    }

    #[test]
    fn comment_only_document_is_null() {
        assert_eq!(load("# nothing here\n"), Json::Null);
    }

    #[test]
    fn malformed_yaml_is_a_decode_error() {
        let err = document(b"a: [unclosed\n").unwrap_err();
        assert!(matches!(err, AnnotateError::Decode { .. }), "{}", err);
    }
}
