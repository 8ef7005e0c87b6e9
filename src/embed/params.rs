//! Dashboard display parameters and frame source URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kiosk display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kiosk {
    /// Navigation and sidebar hidden.
    On,
    /// Persistent "tv" kiosk variant.
    Tv,
}

impl Kiosk {
    fn as_param(&self) -> &'static str {
        match self {
            Kiosk::On => "1",
            Kiosk::Tv => "tv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Template variable value; multi-valued variables repeat the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    One(String),
    Many(Vec<String>),
}

/// Display parameters appended to the frame source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlParams {
    pub kiosk: Option<Kiosk>,
    pub theme: Option<Theme>,
    /// Auto-refresh interval, e.g. "30s".
    pub refresh: Option<String>,
    /// Time range start, e.g. "now-1h".
    pub from: Option<String>,
    /// Time range end, e.g. "now".
    pub to: Option<String>,
    pub org_id: Option<u64>,
    pub auth_token: Option<String>,
    pub variables: BTreeMap<String, VarValue>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl UrlParams {
    /// Form-encoded query string; empty when no parameter is set.
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());

        if let Some(kiosk) = self.kiosk {
            query.append_pair("kiosk", kiosk.as_param());
        }
        if let Some(token) = non_empty(&self.auth_token) {
            query.append_pair("auth_token", token);
        }
        if let Some(theme) = self.theme {
            query.append_pair("theme", theme.as_str());
        }
        if let Some(refresh) = non_empty(&self.refresh) {
            query.append_pair("refresh", refresh);
        }
        if let Some(from) = non_empty(&self.from) {
            query.append_pair("from", from);
        }
        if let Some(to) = non_empty(&self.to) {
            query.append_pair("to", to);
        }
        if let Some(org_id) = self.org_id {
            query.append_pair("orgId", &org_id.to_string());
        }
        for (name, value) in &self.variables {
            let key = format!("var-{name}");
            match value {
                VarValue::One(v) => {
                    query.append_pair(&key, v);
                }
                VarValue::Many(values) => {
                    for v in values {
                        query.append_pair(&key, v);
                    }
                }
            }
        }

        query.finish()
    }
}

/// Dashboard to embed, addressed through the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedTarget {
    /// Proxy base URL, usually the proxy path prefix ("/api/grafana").
    pub base_url: String,
    pub dashboard_uid: String,
    pub dashboard_slug: String,
    pub params: UrlParams,
}

impl EmbedTarget {
    pub fn new(base_url: impl Into<String>, dashboard_uid: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            dashboard_uid: dashboard_uid.into(),
            dashboard_slug: "dashboard".to_string(),
            params: UrlParams::default(),
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.dashboard_slug = slug.into();
        self
    }

    pub fn with_params(mut self, params: UrlParams) -> Self {
        self.params = params;
        self
    }

    /// Path fragment the loaded frame's location must contain.
    ///
    /// Uses the same encoding as [`src`](Self::src), which also escapes
    /// `!'()*` and `:`, so the location check compares like with like.
    pub fn content_path(&self) -> String {
        format!("/d/{}", urlencoding::encode(&self.dashboard_uid))
    }

    /// Frame source: `{base}/d/{uid}/{slug}[?query]`.
    pub fn src(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut src = format!(
            "{}{}/{}",
            base,
            self.content_path(),
            urlencoding::encode(&self.dashboard_slug)
        );
        let query = self.params.to_query();
        if !query.is_empty() {
            src.push('?');
            src.push_str(&query);
        }
        src
    }

    /// Key that changes on every retry so the frame is remounted.
    pub fn frame_key(&self, attempt: u32) -> String {
        format!("{}-{}", self.dashboard_uid, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params() {
        assert_eq!(UrlParams::default().to_query(), "");
    }

    #[test]
    fn test_param_order_and_encoding() {
        let params = UrlParams {
            kiosk: Some(Kiosk::On),
            theme: Some(Theme::Dark),
            refresh: Some("30s".into()),
            from: Some("now-1h".into()),
            to: Some("now".into()),
            org_id: Some(2),
            auth_token: Some("tok en".into()),
            variables: BTreeMap::new(),
        };
        assert_eq!(
            params.to_query(),
            "kiosk=1&auth_token=tok+en&theme=dark&refresh=30s&from=now-1h&to=now&orgId=2"
        );
    }

    #[test]
    fn test_tv_kiosk_and_empty_strings() {
        let params = UrlParams {
            kiosk: Some(Kiosk::Tv),
            refresh: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(params.to_query(), "kiosk=tv");
    }

    #[test]
    fn test_variables_repeat() {
        let mut variables = BTreeMap::new();
        variables.insert("host".to_string(), VarValue::Many(vec!["a".into(), "b".into()]));
        variables.insert("env".to_string(), VarValue::One("prod".into()));
        let params = UrlParams {
            variables,
            ..Default::default()
        };
        assert_eq!(params.to_query(), "var-env=prod&var-host=a&var-host=b");
    }

    #[test]
    fn test_variables_deserialize() {
        let params: UrlParams = serde_json::from_str(
            r#"{"kiosk":"tv","theme":"light","variables":{"host":["a","b"],"env":"prod"}}"#,
        )
        .unwrap();
        assert_eq!(params.kiosk, Some(Kiosk::Tv));
        assert_eq!(params.variables["env"], VarValue::One("prod".into()));
    }

    #[test]
    fn test_embed_src() {
        let target = EmbedTarget::new("/api/grafana", "abc123");
        assert_eq!(target.src(), "/api/grafana/d/abc123/dashboard");
        assert_eq!(target.content_path(), "/d/abc123");

        let target = EmbedTarget::new("/api/grafana/", "abc123")
            .with_slug("my-dash")
            .with_params(UrlParams {
                kiosk: Some(Kiosk::On),
                from: Some("now-1h".into()),
                ..Default::default()
            });
        assert_eq!(target.src(), "/api/grafana/d/abc123/my-dash?kiosk=1&from=now-1h");
        assert_eq!(target.frame_key(2), "abc123-2");
    }
}
