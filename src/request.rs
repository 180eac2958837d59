//! Mapping of SDK operations onto the Flagsmith HTTP API.
use std::collections::HashMap;

use reqwest::Method;
use serde_json::json;

use crate::models::{Trait, TraitWithIdentity, TraitsWithIdentity};

pub(crate) const ENVIRONMENT_KEY_HEADER: &str = "X-Environment-Key";

const FLAGS_ENDPOINT: &str = "/flags/";
const IDENTITIES_ENDPOINT: &str = "/identities/";
const TRAITS_ENDPOINT: &str = "/traits/";
const ANALYTICS_ENDPOINT: &str = "/analytics/flags/";

/// An operation against the Flagsmith API.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Flags of the environment, without identity.
    GetFlags,
    /// Flags and traits of an identity. Traits, if any, are stored on the identity before flags
    /// are evaluated.
    #[allow(missing_docs)]
    GetIdentityFlagsAndTraits {
        identity: String,
        traits: Option<Vec<Trait>>,
    },
    /// Store a single trait.
    #[allow(missing_docs)]
    SetTrait { trait_: Trait, identity: String },
    /// Store multiple traits at once.
    #[allow(missing_docs)]
    SetTraits { traits: Vec<Trait>, identity: String },
    /// Upload flag evaluation counts, keyed by feature name.
    #[allow(missing_docs)]
    PostAnalytics { counts: HashMap<String, u64> },
}

/// Wire representation of a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL.
    pub path: &'static str,
    /// Query parameters.
    pub query: Vec<(&'static str, String)>,
    /// Headers, including the environment key.
    pub headers: Vec<(&'static str, String)>,
    /// JSON body, if the request carries one.
    pub body: Option<serde_json::Value>,
}

impl Request {
    /// HTTP method of the request.
    pub fn method(&self) -> Method {
        match self {
            Request::GetFlags => Method::GET,
            Request::GetIdentityFlagsAndTraits { .. }
            | Request::SetTrait { .. }
            | Request::SetTraits { .. }
            | Request::PostAnalytics { .. } => Method::POST,
        }
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Request::GetFlags => FLAGS_ENDPOINT,
            Request::GetIdentityFlagsAndTraits { .. } | Request::SetTraits { .. } => {
                IDENTITIES_ENDPOINT
            }
            Request::SetTrait { .. } => TRAITS_ENDPOINT,
            Request::PostAnalytics { .. } => ANALYTICS_ENDPOINT,
        }
    }

    /// Query parameters attached to the URL.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Request::GetIdentityFlagsAndTraits { identity, .. } => {
                vec![("identifier", identity.clone())]
            }
            Request::GetFlags
            | Request::SetTrait { .. }
            | Request::SetTraits { .. }
            | Request::PostAnalytics { .. } => Vec::new(),
        }
    }

    /// JSON body of the request.
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            Request::GetFlags => None,
            Request::GetIdentityFlagsAndTraits { identity, traits } => {
                // An absent `traits` key (rather than an empty list) keeps stored traits intact.
                let body = match traits.as_deref() {
                    Some(traits) if !traits.is_empty() => {
                        json!({ "identifier": identity, "traits": traits })
                    }
                    _ => json!({ "identifier": identity }),
                };
                Some(body)
            }
            Request::SetTrait { trait_, identity } => {
                Some(json!(TraitWithIdentity::new(trait_, identity)))
            }
            Request::SetTraits { traits, identity } => Some(json!(TraitsWithIdentity {
                identifier: identity,
                traits,
            })),
            Request::PostAnalytics { counts } => Some(json!(counts)),
        }
    }

    /// Build the full wire representation of this request.
    ///
    /// This never fails. An empty environment key is sent as an empty header value and it is up to
    /// the dispatcher to reject it.
    pub fn descriptor(&self, environment_key: &str) -> RequestDescriptor {
        let body = self.body();

        let mut headers = vec![(ENVIRONMENT_KEY_HEADER, environment_key.to_owned())];
        if body.is_some() {
            headers.push(("Content-Type", "application/json".to_owned()));
        }

        RequestDescriptor {
            method: self.method(),
            path: self.path(),
            query: self.query(),
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use reqwest::Method;
    use serde_json::json;

    use super::Request;
    use crate::Trait;

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn get_flags() {
        let descriptor = Request::GetFlags.descriptor("env-key");

        assert_eq!(descriptor.method, Method::GET);
        assert_eq!(descriptor.path, "/flags/");
        assert_eq!(descriptor.body, None);
        assert!(descriptor.query.is_empty());
        assert_eq!(header(&descriptor.headers, "X-Environment-Key"), Some("env-key"));
        assert_eq!(header(&descriptor.headers, "Content-Type"), None);
    }

    #[test]
    fn missing_environment_key_is_sent_empty() {
        let descriptor = Request::GetFlags.descriptor("");
        assert_eq!(header(&descriptor.headers, "X-Environment-Key"), Some(""));
    }

    #[test]
    fn set_trait() {
        let descriptor = Request::SetTrait {
            trait_: Trait::new("k", "v"),
            identity: "u1".to_owned(),
        }
        .descriptor("env-key");

        assert_eq!(descriptor.method, Method::POST);
        assert_eq!(descriptor.path, "/traits/");
        assert_eq!(
            descriptor.body,
            Some(json!({"key": "k", "value": "v", "identity": {"identifier": "u1"}}))
        );
        assert_eq!(
            header(&descriptor.headers, "Content-Type"),
            Some("application/json")
        );
    }

    #[test]
    fn identity_without_traits_omits_traits_key() {
        for traits in [None, Some(vec![])] {
            let descriptor = Request::GetIdentityFlagsAndTraits {
                identity: "u1".to_owned(),
                traits,
            }
            .descriptor("env-key");

            assert_eq!(descriptor.method, Method::POST);
            assert_eq!(descriptor.path, "/identities/");
            assert_eq!(descriptor.body, Some(json!({"identifier": "u1"})));
            assert_eq!(descriptor.query, vec![("identifier", "u1".to_owned())]);
        }
    }

    #[test]
    fn identity_with_traits() {
        let descriptor = Request::GetIdentityFlagsAndTraits {
            identity: "u1".to_owned(),
            traits: Some(vec![Trait::new("plan", "premium"), Trait::new("age", 31)]),
        }
        .descriptor("env-key");

        assert_eq!(
            descriptor.body,
            Some(json!({
                "identifier": "u1",
                "traits": [
                    {"key": "plan", "value": "premium"},
                    {"key": "age", "value": 31}
                ]
            }))
        );
    }

    #[test]
    fn set_traits() {
        let descriptor = Request::SetTraits {
            traits: vec![Trait::new("a", true), Trait::new("a", false)],
            identity: "u1".to_owned(),
        }
        .descriptor("env-key");

        assert_eq!(descriptor.method, Method::POST);
        assert_eq!(descriptor.path, "/identities/");
        assert!(descriptor.query.is_empty());
        assert_eq!(
            descriptor.body,
            Some(json!({
                "identifier": "u1",
                "traits": [{"key": "a", "value": true}, {"key": "a", "value": false}]
            }))
        );
    }

    #[test]
    fn post_analytics() {
        let descriptor = Request::PostAnalytics {
            counts: HashMap::from([("banner".to_owned(), 3), ("beta".to_owned(), 1)]),
        }
        .descriptor("env-key");

        assert_eq!(descriptor.method, Method::POST);
        assert_eq!(descriptor.path, "/analytics/flags/");
        assert_eq!(descriptor.body, Some(json!({"banner": 3, "beta": 1})));
    }
}
