use super::*;
use crate::chunk::render::render_to_string;
use crate::stream::transport::MemoryTransport;

fn writer() -> StreamWriter<MemoryTransport> {
    StreamWriter::with_threshold(MemoryTransport::new(), 1024)
}

#[test]
fn needs_a_runtime() {
    let err = AsyncSlots::new(&RenderContext::new(), &StreamOpts::default()).unwrap_err();
    assert!(matches!(err, SluiceError::Response(_)));
}

#[test]
fn slot_ids_are_simple_hex() {
    let id = SlotId::mint();
    let s = id.to_string();
    assert_eq!(s.len(), 32);
    assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(id, SlotId::mint());
}

#[tokio::test]
async fn placeholder_names_the_slot_and_wraps_fallback() {
    let ctx = RenderContext::new();
    let slots = AsyncSlots::new(&ctx, &StreamOpts::default()).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let slot = slots.register("loading…", |_| async move {
        let _ = rx.await;
        Ok(el("p").child("done"))
    });

    let html = render_to_string(&slot.placeholder(), &ctx).unwrap();
    assert_eq!(html, format!("<slot name=\"{}\">loading…</slot>", slot.id()));
    assert!(slots.state(slot.id()).unwrap() >= SlotState::PlaceholderEmitted);

    tx.send(()).unwrap();
    let mut w = writer();
    let report = slots.drain(&mut w).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(slots.state(slot.id()), Some(SlotState::Delivered));
    assert_eq!(
        w.transport().body_string(),
        format!("<p slot=\"{}\">done</p>", slot.id())
    );
}

#[tokio::test]
async fn existing_slot_attribute_is_replaced() {
    let ctx = RenderContext::new();
    let slots = AsyncSlots::new(&ctx, &StreamOpts::default()).unwrap();
    let slot = slots.register(Node::empty(), |_| async {
        Ok(el("div").attr("slot", "bogus").attr("id", "x"))
    });
    let mut w = writer();
    slots.drain(&mut w).await.unwrap();
    assert_eq!(
        w.transport().body_string(),
        format!("<div slot=\"{}\" id=\"x\"></div>", slot.id())
    );
}

#[tokio::test]
async fn panicking_producer_is_a_failed_slot() {
    let ctx = RenderContext::new();
    let slots = AsyncSlots::new(&ctx, &StreamOpts::default()).unwrap();
    let slot = slots.register_with_error(
        Node::empty(),
        |err| el("p").class("slot-error").child(err.to_string()),
        |_| async {
            if true {
                panic!("producer blew up");
            }
            Ok(el("p"))
        },
    );
    let mut w = writer();
    let report = slots.drain(&mut w).await.unwrap();
    assert_eq!(report, DrainReport { delivered: 0, aborted: 0, failed: 1 });
    assert_eq!(slots.state(slot.id()), Some(SlotState::Failed));
    let body = w.transport().body_string();
    assert!(body.contains("slot producer panicked"));
    assert!(body.contains(&format!("slot=\"{}\"", slot.id())));
}

#[tokio::test]
async fn abort_all_writes_nothing() {
    let ctx = RenderContext::new();
    let slots = AsyncSlots::new(&ctx, &StreamOpts::default()).unwrap();
    let a = slots.register(Node::empty(), |_| async {
        std::future::pending::<()>().await;
        Ok(el("p"))
    });
    let b = slots.register(Node::empty(), |_| async { Ok(el("p")) });
    assert_eq!(slots.abort_all(), 2);
    assert_eq!(slots.abort_all(), 0);

    let mut w = writer();
    let report = slots.drain(&mut w).await.unwrap();
    assert_eq!(report.total(), 0);
    assert!(w.transport().body().is_empty());
    assert_eq!(
        slots.states(),
        vec![(a.id(), SlotState::Aborted), (b.id(), SlotState::Aborted)]
    );
}

#[tokio::test]
async fn slots_registered_while_rendering_are_drained() {
    let ctx = RenderContext::new();
    let slots = AsyncSlots::new(&ctx, &StreamOpts::default()).unwrap();
    let registry = slots.clone();
    let page = crate::tree::node::component(move |_| {
        Ok(registry
            .register("…", |_| async { Ok(el("b").child("late")) })
            .into())
    });
    let html = render_to_string(&page, &ctx).unwrap();
    assert!(html.starts_with("<slot name=\""));
    assert_eq!(slots.len(), 1);

    let mut w = writer();
    let report = slots.drain(&mut w).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert!(w.transport().body_string().ends_with(">late</b>"));
}
