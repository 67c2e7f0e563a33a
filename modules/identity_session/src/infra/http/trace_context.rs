//! W3C trace context propagation for outgoing requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::Span;

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Sampled `traceparent` whose parent-id is `span`'s id.
///
/// There is no collector, so the trace id is fresh per request. A disabled
/// span has no id and gets a random parent-id instead.
pub fn traceparent_for(span: &Span) -> String {
    let span_id = span
        .id()
        .map(|id| id.into_u64())
        .unwrap_or_else(rand::random::<u64>);
    let trace_id = rand::random::<u128>();
    format!("00-{trace_id:032x}-{span_id:016x}-01")
}

/// Insert a `traceparent` for `span` unless the caller already set one.
pub fn inject_trace_context(headers: &mut HeaderMap, span: &Span) {
    if headers.contains_key(TRACEPARENT) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&traceparent_for(span)) {
        headers.insert(HeaderName::from_static(TRACEPARENT), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{layer::SubscriberExt, Registry};

    fn parts(value: &str) -> Vec<String> {
        value.split('-').map(str::to_string).collect()
    }

    #[test]
    fn parent_id_is_the_active_span_id() {
        let subscriber = Registry::default().with(tracing_subscriber::fmt::layer());
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("outgoing_http");
            let expected = format!("{:016x}", span.id().unwrap().into_u64());

            let value = traceparent_for(&span);

            let parts = parts(&value);
            assert_eq!(parts.len(), 4, "bad traceparent: {value}");
            assert_eq!(parts[0], "00");
            assert_eq!(parts[1].len(), 32);
            assert_eq!(parts[2], expected);
            assert_eq!(parts[3], "01");
        });
    }

    #[test]
    fn disabled_span_still_yields_a_well_formed_header() {
        let value = traceparent_for(&Span::none());
        let parts = parts(&value);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[2].len(), 16);
    }

    #[test]
    fn existing_traceparent_is_preserved() {
        let upstream = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, upstream.parse().unwrap());

        inject_trace_context(&mut headers, &Span::none());

        assert_eq!(headers.get(TRACEPARENT).unwrap(), upstream);
    }
}
