//! Event filter deciding which events are remediation candidates.
//!
//! Each detection rule is a named predicate over a [`ClusterEvent`]. The
//! filter accepts an event when any of its rules matches, so new failure
//! signatures are added as rules without touching the engine.

use std::fmt;

use crate::event::ClusterEvent;

/// Probe failure text produced when the kubelet's HTTP probe gave up waiting for headers.
pub const CLIENT_TIMEOUT_SIGNATURE: &str =
    "context deadline exceeded (Client.Timeout exceeded while awaiting headers)";

/// Rule name of the built-in client-timeout signature.
pub const CLIENT_TIMEOUT_RULE: &str = "client-timeout";

/// A named predicate over cluster events.
pub trait EventRule: Send + Sync {
    /// Name used in logs when the rule matches.
    fn name(&self) -> &str;

    /// Whether the event matches this rule.
    fn matches(&self, event: &ClusterEvent) -> bool;
}

/// Matches events whose message contains a literal substring.
///
/// Matching is case-sensitive and exact. An empty signature never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSignature {
    name: String,
    signature: String,
}

impl MessageSignature {
    #[must_use]
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }

    /// The probe client-timeout signature.
    #[must_use]
    pub fn client_timeout() -> Self {
        Self::new(CLIENT_TIMEOUT_RULE, CLIENT_TIMEOUT_SIGNATURE)
    }
}

impl EventRule for MessageSignature {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, event: &ClusterEvent) -> bool {
        !self.signature.is_empty() && event.message.contains(&self.signature)
    }
}

/// Set of detection rules; an event is a candidate when any rule matches.
pub struct EventFilter {
    rules: Vec<Box<dyn EventRule>>,
}

impl EventFilter {
    /// Create a filter from explicit rules.
    #[must_use]
    pub fn new(rules: Vec<Box<dyn EventRule>>) -> Self {
        Self { rules }
    }

    /// Create a filter with one [`MessageSignature`] rule per signature.
    ///
    /// The built-in signature keeps its `client-timeout` name; others are
    /// named `signature-<n>` by position.
    #[must_use]
    pub fn from_signatures<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = signatures
            .into_iter()
            .enumerate()
            .map(|(i, signature)| {
                let signature = signature.into();
                let name = if signature == CLIENT_TIMEOUT_SIGNATURE {
                    CLIENT_TIMEOUT_RULE.to_string()
                } else {
                    format!("signature-{}", i + 1)
                };
                Box::new(MessageSignature::new(name, signature)) as Box<dyn EventRule>
            })
            .collect();
        Self { rules }
    }

    /// Add another rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl EventRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Whether the event should be remediated.
    pub fn is_remediation_candidate(&self, event: &ClusterEvent) -> bool {
        self.matching_rule(event).is_some()
    }

    /// Name of the first rule matching the event.
    pub fn matching_rule(&self, event: &ClusterEvent) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(event))
            .map(|rule| rule.name())
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(vec![Box::new(MessageSignature::client_timeout())])
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field(
                "rules",
                &self.rules.iter().map(|rule| rule.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(message: &str) -> ClusterEvent {
        ClusterEvent::unhealthy_pod("api-7f", message)
    }

    #[test]
    fn test_accepts_signature_anywhere_in_message() {
        let filter = EventFilter::default();
        let messages = [
            CLIENT_TIMEOUT_SIGNATURE.to_string(),
            format!("Readiness probe failed: Get \"http://10.0.0.1:8080/ready\": {CLIENT_TIMEOUT_SIGNATURE}"),
            format!("{CLIENT_TIMEOUT_SIGNATURE} after 1s"),
            format!("probe: {CLIENT_TIMEOUT_SIGNATURE}; retrying"),
        ];

        for message in &messages {
            assert!(filter.is_remediation_candidate(&event(message)), "{message}");
        }
    }

    #[test]
    fn test_rejects_partial_or_differently_cased_signatures() {
        let filter = EventFilter::default();
        let messages = [
            "OOMKilled",
            "ctx deadline exceeded",
            "context deadline exceeded",
            "Readiness probe failed: context deadline exceeded (Client.Timeout exceeded)",
            "CONTEXT DEADLINE EXCEEDED (CLIENT.TIMEOUT EXCEEDED WHILE AWAITING HEADERS)",
            "context deadline exceeded (Client.Timeout exceeded while awaiting header)",
            "",
        ];

        for message in messages {
            assert!(!filter.is_remediation_candidate(&event(message)), "{message}");
        }
    }

    #[test]
    fn test_readiness_probe_scenario() {
        let filter = EventFilter::default();
        let event = event(
            "Readiness probe failed: context deadline exceeded (Client.Timeout exceeded while awaiting headers)",
        );
        assert_eq!(filter.matching_rule(&event), Some(CLIENT_TIMEOUT_RULE));
    }

    #[test]
    fn test_empty_signature_never_matches() {
        let filter = EventFilter::from_signatures([""]);
        assert_eq!(format!("{filter:?}"), r#"EventFilter { rules: ["signature-1"] }"#);
        assert!(!filter.is_remediation_candidate(&event("anything at all")));
    }

    #[test]
    fn test_additional_signatures() {
        let filter = EventFilter::from_signatures([CLIENT_TIMEOUT_SIGNATURE, "i/o timeout"]);
        assert_eq!(
            filter.matching_rule(&event("dial tcp 10.0.0.1:8080: i/o timeout")),
            Some("signature-2")
        );
        assert_eq!(
            filter.matching_rule(&event(CLIENT_TIMEOUT_SIGNATURE)),
            Some(CLIENT_TIMEOUT_RULE)
        );
    }

    #[test]
    fn test_custom_rule() {
        struct NamePrefix;

        impl EventRule for NamePrefix {
            fn name(&self) -> &str {
                "canary"
            }

            fn matches(&self, event: &ClusterEvent) -> bool {
                event.involved_object_name.starts_with("canary-")
            }
        }

        let filter = EventFilter::default().with_rule(NamePrefix);
        let event = ClusterEvent::unhealthy_pod("canary-1", "OOMKilled");
        assert_eq!(filter.matching_rule(&event), Some("canary"));
        assert_eq!(format!("{filter:?}"), r#"EventFilter { rules: ["client-timeout", "canary"] }"#);
    }
}
