//! Document templates with `${field}` placeholders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named document skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    /// Field key -> prompt label
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Extension for generated file names
    #[serde(default)]
    pub ext: Option<String>,
    pub body: String,
}

impl Template {
    /// Substitute every `${key}` with `params[key]`, then `defaults[key]`.
    /// Unknown keys are left as written.
    pub fn render(&self, params: &BTreeMap<String, String>) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = &after[..end];
            match params.get(key).or_else(|| self.defaults.get(key)) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }

    /// RESTXQ module skeleton.
    pub fn restxq() -> Self {
        let fields = [
            ("name", "File name"),
            ("prefix", "Module prefix"),
            ("namespace", "Module namespace"),
        ];
        Self {
            name: "RESTXQ".to_string(),
            fields: fields
                .into_iter()
                .map(|(key, label)| (key.to_string(), label.to_string()))
                .collect(),
            defaults: BTreeMap::from([
                ("prefix".to_string(), "api".to_string()),
                ("namespace".to_string(), "http://exist-db.org/apps/api".to_string()),
            ]),
            ext: Some("xqm".to_string()),
            body: RESTXQ_BODY.to_string(),
        }
    }
}

const RESTXQ_BODY: &str = r#"xquery version "3.1";

module namespace ${prefix}="${namespace}";

declare namespace rest="http://exquery.org/ns/restxq";
declare namespace output="http://www.w3.org/2010/xslt-xquery-serialization";

declare
  %rest:GET
  %rest:path("/${prefix}/hello")
  %rest:query-param("name", "{$name}", "world")
  %output:method("json")
function ${prefix}:hello($name as xs:string*) {
  map {
    "greeting": "Hello, " || $name
  }
};
"#;
