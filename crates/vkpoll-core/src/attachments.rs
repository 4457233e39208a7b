//! Attachment resolution: turn message attachment references into direct URLs.
//!
//! Two tiers, first non-empty wins:
//! 1. `messages.getById` for the whole message and map its attachment list.
//! 2. Inline `attachN` / `attachN_type` tokens from `extra_values`, each looked
//!    up with `photos.getById` / `docs.getById`.
//!
//! Only photos and documents are represented; other kinds are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    events::{Event, Message},
    ports::{ApiCaller, Params},
    utils::{get_i64, get_string, lenient_string},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttachmentRef {
    Photo { photo: PhotoRef },
    Doc { doc: DocRef },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub sizes: Vec<PhotoSize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    /// Size label (`s`, `m`, `x`, `w`, ...).
    #[serde(rename = "type")]
    pub label: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    pub title: String,
    pub ext: String,
    pub url: String,
    pub date: i64,
}

/// Photo object -> ref with every size that has a URL. `None` when no size does.
pub fn map_photo(photo: &Map<String, Value>) -> Option<AttachmentRef> {
    let sizes: Vec<PhotoSize> = photo
        .get("sizes")
        .and_then(Value::as_array)
        .map(|sizes| {
            sizes
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|s| {
                    let url = get_string(s, "url").filter(|u| !u.is_empty())?;
                    Some(PhotoSize {
                        label: get_string(s, "type").unwrap_or_default(),
                        url,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if sizes.is_empty() {
        return None;
    }
    Some(AttachmentRef::Photo {
        photo: PhotoRef { sizes },
    })
}

pub fn map_doc(doc: &Map<String, Value>) -> AttachmentRef {
    AttachmentRef::Doc {
        doc: DocRef {
            title: get_string(doc, "title").unwrap_or_default(),
            ext: get_string(doc, "ext").unwrap_or_default(),
            url: get_string(doc, "url").unwrap_or_default(),
            date: get_i64(doc, "date").unwrap_or(0),
        },
    }
}

/// Map a platform attachment list (`[{type, photo|doc: {...}}, ...]`), keeping order.
pub fn map_attachments(list: &[Value]) -> Vec<AttachmentRef> {
    list.iter()
        .filter_map(|a| {
            let kind = a.get("type").and_then(Value::as_str)?;
            let payload = a.get(kind).and_then(Value::as_object)?;
            match kind {
                "photo" => map_photo(payload),
                "doc" => Some(map_doc(payload)),
                _ => None,
            }
        })
        .collect()
}

/// Whether the event references any attachment at all (no remote calls).
pub fn has_attachments(event: &Event) -> bool {
    let Some(m) = event.message() else {
        return false;
    };
    let listed = matches!(&m.attachments, Value::Array(xs) if !xs.is_empty());
    listed || !message_tokens(m).is_empty()
}

/// Resolve the event's attachments. Never fails; lookups that error are skipped.
pub async fn resolve_attachments(event: &Event, api: &dyn ApiCaller) -> Vec<AttachmentRef> {
    let Some(msg) = event.message() else {
        return Vec::new();
    };

    let bulk = map_attachments(&bulk_lookup(event, msg, api).await);
    if !bulk.is_empty() {
        return bulk;
    }

    resolve_inline(message_tokens(msg), api).await
}

/// Inline tokens from `extra_values`, else from a long-poll `attachments` object.
fn message_tokens(msg: &Message) -> Vec<InlineToken> {
    let tokens = inline_tokens(&msg.extra_values);
    match &msg.attachments {
        Value::Object(listed) if tokens.is_empty() => inline_tokens(listed),
        _ => tokens,
    }
}

/// Lookup attempts for `messages.getById`, most specific first.
fn bulk_attempts(event: &Event, msg: &Message) -> Vec<Params> {
    let mut attempts = Vec::new();

    let by_id = msg.message_id.map(|id| vec![("message_ids", id.to_string())]);

    if let (Some(_), Some(cmid), Some(peer_id)) =
        (&event.callback, msg.conversation_message_id, msg.peer_id)
    {
        attempts.push(vec![
            ("cmids", cmid.to_string()),
            ("peer_id", peer_id.to_string()),
        ]);
    } else if let (Some(params), Some(group_id)) = (&by_id, event.group_id()) {
        let mut scoped = params.clone();
        scoped.push(("group_id", group_id.to_string()));
        attempts.push(scoped);
    }

    if let Some(params) = by_id {
        attempts.push(params);
    }
    attempts
}

async fn bulk_lookup(event: &Event, msg: &Message, api: &dyn ApiCaller) -> Vec<Value> {
    for params in bulk_attempts(event, msg) {
        match api.call("messages.getById", params).await {
            Ok(resp) => return first_item_attachments(&resp),
            Err(e) => {
                tracing::debug!(error = %e, "messages.getById failed");
            }
        }
    }
    Vec::new()
}

fn first_item_attachments(resp: &Value) -> Vec<Value> {
    resp.get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("attachments"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// One `attachN` entry from `extra_values`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineToken {
    pub index: usize,
    pub kind: String,
    pub token: String,
}

/// Inline tokens `attach1`, `attach2`, ... up to the first index missing either key.
pub fn inline_tokens(extra_values: &Map<String, Value>) -> Vec<InlineToken> {
    let mut out = Vec::new();
    for index in 1.. {
        let (Some(token), Some(kind)) = (
            extra_values.get(&format!("attach{index}")),
            extra_values.get(&format!("attach{index}_type")),
        ) else {
            break;
        };
        out.push(InlineToken {
            index,
            kind: lenient_string(kind).unwrap_or_default(),
            token: lenient_string(token).unwrap_or_default(),
        });
    }
    out
}

async fn resolve_inline(tokens: Vec<InlineToken>, api: &dyn ApiCaller) -> Vec<AttachmentRef> {
    let mut out = Vec::new();
    for t in tokens {
        let Some((owner_id, item_id)) = t.token.split_once('_') else {
            tracing::warn!(index = t.index, token = %t.token, "malformed attachment token; skipping");
            continue;
        };
        let id = format!("{owner_id}_{item_id}");

        match lookup_inline(&t.kind, id, api).await {
            Ok(Some(r)) => out.push(r),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(index = t.index, kind = %t.kind, error = %e, "attachment lookup failed; skipping");
            }
        }
    }
    out
}

async fn lookup_inline(kind: &str, id: String, api: &dyn ApiCaller) -> Result<Option<AttachmentRef>> {
    match kind {
        "photo" => {
            let resp = api
                .call(
                    "photos.getById",
                    vec![("photos", id), ("photo_sizes", "1".to_string())],
                )
                .await?;
            Ok(first_object(&resp).and_then(map_photo))
        }
        "doc" => {
            let resp = api.call("docs.getById", vec![("docs", id)]).await?;
            Ok(first_object(&resp).map(map_doc))
        }
        _ => Ok(None),
    }
}

/// `getById` methods answer with a bare list; some API versions wrap it in `items`.
fn first_object(resp: &Value) -> Option<&Map<String, Value>> {
    let list = match resp {
        Value::Array(xs) => xs,
        other => other.get("items").and_then(Value::as_array)?,
    };
    list.first().and_then(Value::as_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, events::decode_update};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&str, &Params) -> Result<Value> + Send + Sync>;

    struct FakeApi {
        handler: Handler,
        calls: Mutex<Vec<(String, Params)>>,
    }

    impl FakeApi {
        fn new(handler: impl Fn(&str, &Params) -> Result<Value> + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Params)> {
            self.calls.lock().unwrap().clone()
        }

        fn methods(&self) -> Vec<String> {
            self.calls().into_iter().map(|(m, _)| m).collect()
        }
    }

    #[async_trait]
    impl ApiCaller for FakeApi {
        async fn call(&self, method: &str, params: Params) -> Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params.clone()));
            (self.handler)(method, &params)
        }
    }

    fn api_error() -> Error {
        Error::Api {
            code: 100,
            message: "one of the parameters specified was missing or invalid".to_string(),
        }
    }

    fn photo(url: &str) -> Value {
        json!({"type": "photo", "photo": {"sizes": [
            {"type": "s", "url": url},
            {"type": "x", "url": ""},
            {"type": "m"}
        ]}})
    }

    fn new_message(extra: Value) -> Event {
        decode_update(&json!([4, 555, 1, 42, 1_700_000_000, "", extra, {}]))
    }

    #[tokio::test]
    async fn bulk_tier_maps_photos_and_docs_in_order() {
        let api = FakeApi::new(|method, _| {
            assert_eq!(method, "messages.getById");
            Ok(json!({"items": [{"attachments": [
                photo("https://p/1"),
                {"type": "sticker", "sticker": {"id": 1}},
                {"type": "doc", "doc": {"title": "a.pdf", "ext": "pdf", "url": "https://d/1", "date": 10}}
            ]}]}))
        });

        let out = resolve_attachments(&new_message(json!({"attach1": "1_2", "attach1_type": "photo"})), &api).await;

        assert_eq!(
            out,
            vec![
                AttachmentRef::Photo {
                    photo: PhotoRef {
                        sizes: vec![PhotoSize {
                            label: "s".to_string(),
                            url: "https://p/1".to_string()
                        }]
                    }
                },
                AttachmentRef::Doc {
                    doc: DocRef {
                        title: "a.pdf".to_string(),
                        ext: "pdf".to_string(),
                        url: "https://d/1".to_string(),
                        date: 10
                    }
                },
            ]
        );
        assert_eq!(api.methods(), vec!["messages.getById"]);
    }

    #[tokio::test]
    async fn photo_without_url_and_no_tokens_yields_empty() {
        let api = FakeApi::new(|_, _| {
            Ok(json!({"items": [{"attachments": [
                {"type": "photo", "photo": {"sizes": [{"type": "s"}]}}
            ]}]}))
        });

        let out = resolve_attachments(&new_message(json!({})), &api).await;
        assert!(out.is_empty());
        assert_eq!(api.methods(), vec!["messages.getById"]);
    }

    #[tokio::test]
    async fn group_scoped_lookup_retries_unscoped_once() {
        let api = FakeApi::new(|_, params| {
            if params.iter().any(|(k, _)| *k == "group_id") {
                Err(api_error())
            } else {
                Ok(json!({"items": [{"attachments": [photo("https://p/2")]}]}))
            }
        });

        let ev = decode_update(&json!([4, 9, 1, -77, 1, ""]));
        let out = resolve_attachments(&ev, &api).await;

        assert_eq!(out.len(), 1);
        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.contains(&("group_id", "77".to_string())));
        assert_eq!(calls[1].1, vec![("message_ids", "9".to_string())]);
    }

    #[tokio::test]
    async fn webhook_lookup_uses_conversation_message_id_first() {
        let api = FakeApi::new(|_, params| {
            if params.iter().any(|(k, _)| *k == "cmids") {
                Err(api_error())
            } else {
                Ok(json!({"items": []}))
            }
        });

        let ev = decode_update(&json!({
            "type": "message_new",
            "group_id": 3,
            "object": {"message": {"id": 0, "conversation_message_id": 8, "peer_id": 2_000_000_001}}
        }));
        let out = resolve_attachments(&ev, &api).await;

        assert!(out.is_empty());
        let calls = api.calls();
        assert_eq!(
            calls[0].1,
            vec![
                ("cmids", "8".to_string()),
                ("peer_id", "2000000001".to_string())
            ]
        );
        assert_eq!(calls[1].1, vec![("message_ids", "0".to_string())]);
    }

    #[tokio::test]
    async fn inline_tier_skips_bad_entries_and_keeps_index_order() {
        let api = FakeApi::new(|method, params| match method {
            "messages.getById" => Err(api_error()),
            "photos.getById" => {
                assert_eq!(params[0], ("photos", "10_20".to_string()));
                Ok(json!([{"sizes": [{"type": "m", "url": "https://p/20"}]}]))
            }
            "docs.getById" => {
                if params[0].1 == "30_bad" {
                    Err(api_error())
                } else {
                    Ok(json!([{"title": "t", "ext": "txt", "url": "https://d/40", "date": 4}]))
                }
            }
            other => panic!("unexpected method {other}"),
        });

        let ev = new_message(json!({
            "attach1": "10_20", "attach1_type": "photo",
            "attach2": "no-separator", "attach2_type": "photo",
            "attach3": "30_bad", "attach3_type": "doc",
            "attach4": "40_41", "attach4_type": "doc",
            "attach5": "50_51", "attach5_type": "audio",
            "attach7": "70_71", "attach7_type": "photo"
        }));
        let out = resolve_attachments(&ev, &api).await;

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], AttachmentRef::Photo { photo } if photo.sizes[0].url == "https://p/20"));
        assert!(matches!(&out[1], AttachmentRef::Doc { doc } if doc.url == "https://d/40"));
        assert_eq!(
            api.methods(),
            vec!["messages.getById", "photos.getById", "docs.getById", "docs.getById"]
        );
    }

    #[tokio::test]
    async fn non_message_events_resolve_to_nothing() {
        let api = FakeApi::new(|_, _| panic!("no calls expected"));
        let ev = decode_update(&json!([61, 5, 1]));
        assert!(resolve_attachments(&ev, &api).await.is_empty());
    }

    #[test]
    fn inline_tokens_stop_at_first_gap() {
        let extra = json!({"attach1": 5, "attach1_type": "doc", "attach3": "x", "attach3_type": "doc"});
        let tokens = inline_tokens(extra.as_object().unwrap());
        assert_eq!(
            tokens,
            vec![InlineToken {
                index: 1,
                kind: "doc".to_string(),
                token: "5".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn inline_tokens_are_read_from_the_attachments_object() {
        let api = FakeApi::new(|method, params| match method {
            "messages.getById" => Err(api_error()),
            "photos.getById" => {
                assert_eq!(params[0], ("photos", "1_2".to_string()));
                Ok(json!([{"sizes": [{"type": "x", "url": "https://p/2"}]}]))
            }
            other => panic!("unexpected method {other}"),
        });

        let ev = decode_update(&json!([
            4, 555, 1, 42, 1_700_000_000, "", {},
            {"attach1": "1_2", "attach1_type": "photo"}
        ]));
        assert!(has_attachments(&ev));

        let out = resolve_attachments(&ev, &api).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], AttachmentRef::Photo { photo } if photo.sizes[0].url == "https://p/2"));
    }

    #[test]
    fn has_attachments_checks_list_and_inline_tokens() {
        assert!(has_attachments(&new_message(json!({"attach1": "1_2", "attach1_type": "photo"}))));
        assert!(!has_attachments(&new_message(json!({"title": "x"}))));
        let fwd_only = decode_update(&json!([4, 1, 1, 42, 1, "", {}, {"fwd": "0_0"}]));
        assert!(!has_attachments(&fwd_only));
        let ev = decode_update(&json!({
            "type": "message_new",
            "object": {"message": {"attachments": [photo("u")]}}
        }));
        assert!(has_attachments(&ev));
    }

    #[test]
    fn attachment_refs_serialize_in_platform_shape() {
        let r = AttachmentRef::Doc {
            doc: DocRef {
                title: "t".to_string(),
                ext: "e".to_string(),
                url: "u".to_string(),
                date: 1,
            },
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"type": "doc", "doc": {"title": "t", "ext": "e", "url": "u", "date": 1}})
        );
    }
}
