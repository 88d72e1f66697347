//! Links for the response envelope: pagination and catalog navigation.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";
pub const JSON_MEDIA_TYPE: &str = "application/json";

// RFC 3986 unreserved characters stay as they are.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encode one path segment (`/` included).
pub fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRel {
    Next,
    Previous,
    #[serde(rename = "self")]
    Itself,
    Root,
    Parent,
    Child,
    Items,
    Conformance,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: LinkRel,
    #[serde(rename = "type")]
    pub media_type: String,
    pub method: LinkMethod,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merge: bool,
}

impl Link {
    /// Plain navigation link, followed with GET.
    pub fn nav(rel: LinkRel, media_type: &str, href: impl Into<String>) -> Self {
        Self {
            rel,
            media_type: media_type.to_string(),
            method: LinkMethod::Get,
            href: href.into(),
            title: None,
            body: None,
            merge: false,
        }
    }

    pub fn titled(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Follow-up for a POST search: resend the original body with `token`
    /// merged in.
    pub fn post(rel: LinkRel, base_url: &str, token: &str) -> Self {
        Self {
            rel,
            media_type: GEOJSON_MEDIA_TYPE.to_string(),
            method: LinkMethod::Post,
            href: format!("{}/search", base_url.trim_end_matches('/')),
            title: None,
            body: Some(json!({ "token": token })),
            merge: true,
        }
    }

    /// Follow-up for a GET endpoint: `href` carries the original query
    /// string with its `token` replaced.
    pub fn get<I, K, V>(rel: LinkRel, base_url: &str, path: &str, query: I, token: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            if key.as_ref() != "token" {
                serializer.append_pair(key.as_ref(), value.as_ref());
            }
        }
        serializer.append_pair("token", token);

        Self {
            rel,
            media_type: GEOJSON_MEDIA_TYPE.to_string(),
            method: LinkMethod::Get,
            href: format!(
                "{}/{}?{}",
                base_url.trim_end_matches('/'),
                path.trim_start_matches('/'),
                serializer.finish()
            ),
            title: None,
            body: None,
            merge: false,
        }
    }
}
