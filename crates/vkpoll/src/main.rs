use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use vkpoll_core::{
    attachments::{has_attachments, resolve_attachments, AttachmentRef},
    config::Config,
    events::Event,
    longpoll::{LongPollSession, UpdateStream},
    ports::ApiCaller,
};
use vkpoll_http::{ReqwestLongPollTransport, VkApiClient};

/// Events waiting for attachment lookups before overflow is printed unresolved.
const RESOLVE_BACKLOG: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vkpoll_core::logging::init("vkpoll")?;

    let cfg = Config::load()?;

    let api: Arc<dyn ApiCaller> = Arc::new(VkApiClient::new(
        cfg.access_token.clone(),
        cfg.api_version.clone(),
        cfg.api_base_url.clone(),
        cfg.api_timeout,
    )?);
    let transport = Arc::new(ReqwestLongPollTransport::new());

    let session = LongPollSession::new(
        api.clone(),
        transport,
        cfg.longpoll_kind(),
        cfg.poll_params(),
    )
    .with_retry(cfg.retry_policy());
    let mut stream = UpdateStream::new(session);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("ctrl-c received, stopping");
                cancel.cancel();
            }
        });
    }

    tracing::info!(kind = ?cfg.longpoll_kind(), "polling for events");

    // Attachment lookups are remote calls; keep them off the poll loop. The
    // queue is bounded, overflow is printed unresolved.
    let (tx, mut rx) = mpsc::channel::<Event>(RESOLVE_BACKLOG);
    let resolver = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let resolved = resolve_attachments(&event, api.as_ref()).await;
            print_line(&event, &resolved);
        }
    });

    let resolve = cfg.resolve_attachments;
    let mut on_event = move |event: Event| {
        if resolve && has_attachments(&event) {
            if let Some(event) = enqueue_for_resolution(&tx, event)? {
                print_line(&event, &[]);
            }
        } else {
            print_line(&event, &[]);
        }
        Ok(())
    };
    let result = stream.run(cancel, &mut on_event).await;
    drop(on_event);

    resolver.await?;

    let session = stream.into_session();
    tracing::info!(
        handoffs = session.handoffs(),
        soft_resyncs = session.soft_resyncs(),
        cursor = ?session.cursor(),
        "long-poll stopped"
    );

    result?;
    Ok(())
}

/// Queue an event for attachment resolution. A full queue hands the event
/// back so the caller can emit it without waiting.
fn enqueue_for_resolution(
    tx: &mpsc::Sender<Event>,
    event: Event,
) -> vkpoll_core::Result<Option<Event>> {
    match tx.try_send(event) {
        Ok(()) => Ok(None),
        Err(TrySendError::Full(event)) => {
            tracing::warn!(
                backlog = RESOLVE_BACKLOG,
                "attachment resolver is behind; printing event unresolved"
            );
            Ok(Some(event))
        }
        Err(TrySendError::Closed(_)) => Err(vkpoll_core::Error::External(
            "attachment resolver stopped".to_string(),
        )),
    }
}

fn print_line(event: &Event, resolved: &[AttachmentRef]) {
    match render_line(event, resolved) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
    }
}

/// One JSON line per event: the persisted form plus any resolved attachments.
fn render_line(event: &Event, resolved: &[AttachmentRef]) -> vkpoll_core::Result<String> {
    let mut v = serde_json::to_value(event.to_persisted())?;
    if !resolved.is_empty() {
        if let Some(obj) = v.as_object_mut() {
            obj.insert("resolved_attachments".to_string(), serde_json::to_value(resolved)?);
        }
    }
    Ok(serde_json::to_string(&v)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use vkpoll_core::{
        attachments::DocRef,
        events::decode_update,
    };

    #[test]
    fn full_resolver_queue_hands_the_event_back() {
        let (tx, mut rx) = mpsc::channel::<Event>(1);
        let first = decode_update(&json!([80, 1]));
        let second = decode_update(&json!([80, 2]));

        assert!(enqueue_for_resolution(&tx, first.clone()).unwrap().is_none());
        let back = enqueue_for_resolution(&tx, second.clone()).unwrap();
        assert_eq!(back, Some(second));
        assert_eq!(rx.try_recv().unwrap(), first);

        drop(rx);
        assert!(enqueue_for_resolution(&tx, first).is_err());
    }

    #[test]
    fn line_carries_type_and_resolved_attachments() {
        let ev = decode_update(&json!([4, 1, 1, 42, 1_700_000_000, "hi", {}, {}]));

        let plain: Value = serde_json::from_str(&render_line(&ev, &[]).unwrap()).unwrap();
        assert_eq!(plain["type"], json!(4));
        assert!(plain.get("resolved_attachments").is_none());

        let doc = AttachmentRef::Doc {
            doc: DocRef {
                title: "a.pdf".to_string(),
                ext: "pdf".to_string(),
                url: "https://d/1".to_string(),
                date: 10,
            },
        };
        let line: Value = serde_json::from_str(&render_line(&ev, &[doc]).unwrap()).unwrap();
        assert_eq!(line["resolved_attachments"][0]["type"], json!("doc"));
        assert_eq!(line["resolved_attachments"][0]["doc"]["title"], json!("a.pdf"));
    }
}
