//! End-to-end: a diamond-shaped reactive graph, watched by a root effect,
//! driving a live session's inbound click handling and outbound patch
//! delivery over an in-memory transport.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use loom_ui::layout::ComputedRect;
use loom_ui::render::RenderNode;
use loom_ui::session::{sync_handler, InMemoryTransport};
use loom_ui::{reactivity, Derived, EngineConfig, HtmlRenderer, InboundEvent, PatchPayload, Renderer, Session, Signal};

#[tokio::test]
async fn diamond_dependency_updates_flow_through_a_live_session() {
    let a = Signal::new(1);
    let (a_b, a_c) = (a.clone(), a.clone());
    let b = Derived::new(move || a_b.get() + 1);
    let c = Derived::new(move || a_c.get() * 2);
    let (b_d, c_d) = (b.clone(), c.clone());
    let d = Derived::new(move || b_d.get() + c_d.get());

    let d_for_render = d.clone();
    let render_subtree = move |target_id: u64| {
        let mut renderer = HtmlRenderer::new();
        let node = RenderNode {
            id: target_id,
            tag: "span".to_string(),
            text: Some(d_for_render.get_untracked().to_string()),
            attrs: vec![],
            utility_classes: vec![],
            has_explicit_layout_props: false,
            rect: ComputedRect::default(),
            children: vec![],
        };
        PatchPayload::Html(renderer.render(&node))
    };

    let (transport, mut handle) = InMemoryTransport::pair(8);
    let mut session = Session::new(transport, EngineConfig::default(), Box::new(render_subtree));

    let updates = session.updates();
    let d_for_effect = d.clone();
    let root_effect = reactivity::effect(move || {
        d_for_effect.get();
        updates.mark_dirty(1);
    });
    session.set_root_effect(root_effect);

    let clicks = Rc::new(RefCell::new(0));
    session.registry_mut().register(1, "click", sync_handler({
        let a = a.clone();
        let clicks = clicks.clone();
        move |_, _| {
            a.update(|v| *v += 1);
            *clicks.borrow_mut() += 1;
        }
    }));

    handle
        .inbound
        .send(InboundEvent { kind: "click".into(), target_id: 1, value: None, key: None })
        .await
        .unwrap();
    drop(handle.inbound);

    session.run(Duration::from_millis(50)).await.unwrap();

    // a starts at 1: d = (1+1) + (1*2) = 4. One click brings a to 2:
    // d = (2+1) + (2*2) = 7.
    let initial = handle.outbound.recv().await.unwrap();
    assert_eq!(initial.target_id, 1);
    assert!(matches!(&initial.payload, PatchPayload::Html(h) if h.contains(">4<")));

    let after_click = handle.outbound.recv().await.unwrap();
    assert!(matches!(&after_click.payload, PatchPayload::Html(h) if h.contains(">7<")));

    assert!(handle.outbound.try_recv().is_err(), "no further patches once the click settles");
    assert_eq!(*clicks.borrow(), 1);
}

#[tokio::test]
async fn unknown_handler_on_a_known_target_is_discarded_not_fatal() {
    let (transport, mut handle) = InMemoryTransport::pair(8);
    let mut session = Session::new(transport, EngineConfig::default(), Box::new(|_| PatchPayload::Html(String::new())));
    session.registry_mut().register(1, "click", sync_handler(|_, _| {}));

    handle
        .inbound
        .send(InboundEvent { kind: "hover".into(), target_id: 1, value: None, key: None })
        .await
        .unwrap();
    drop(handle.inbound);

    let result = session.run(Duration::from_millis(50)).await;
    assert!(result.is_ok());
    assert!(handle.outbound.try_recv().is_err(), "a discarded event produces no patch");
}
