use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::handlers::ListEnvelope;
use crate::Observatory;

/// How often a fresh metrics envelope is pushed.
pub const STREAM_INTERVAL: Duration = Duration::from_secs(1);

/// `GET {mount}/stream`: the `GET {mount}/metrics` envelope as Server-Sent
/// Events, once per `STREAM_INTERVAL`. Idle connections get a keep-alive
/// comment every 15 seconds.
pub async fn metrics_stream(
    State(obs): State<Observatory>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let ticks = IntervalStream::new(tokio::time::interval(STREAM_INTERVAL));
    let events = ticks.map(move |_| Ok(envelope_event(&obs)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn envelope_event(obs: &Observatory) -> Event {
    let envelope = ListEnvelope::new(obs.metrics().get_metrics());
    match Event::default().json_data(&envelope) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "failed to encode metrics envelope");
            Event::default().event("error").data("encode failed")
        }
    }
}
