use super::*;
use crate::chunk::render::render_to_string;
use crate::foundation::context::RenderContext;
use crate::tree::element::el;
use crate::tree::node::{boundary, component, deferred, fragment, text};
use crate::tree::property::{Property, attr, class};

fn purity(node: &Node) -> Vec<bool> {
    node.chunks().map(|c| c.is_pure()).collect()
}

#[test]
fn text_is_exactly_one_pure_chunk() {
    for s in ["", "plain", "<script>alert('x')</script>", "ümlaut & co"] {
        let node = text(s);
        let chunks: Vec<Chunk> = node.chunks().collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_pure());
        let out = render_to_string(&node, &RenderContext::new()).unwrap();
        assert_eq!(out, crate::foundation::escape::escape_html(s));
    }
}

#[test]
fn static_element_is_fully_pure() {
    let node: Node = el("a").attr("href", "/").class("link").child(text("home")).into();
    // <a, href, class, >, text, </a>
    assert_eq!(purity(&node), vec![true; 6]);
}

#[test]
fn deferred_element_marks_attribute_chunks_impure() {
    let node: Node = el("div")
        .class("base")
        .deferred(|_| Ok(class("dark")))
        .child(text("body"))
        .into();
    // <div, deferred, finalize, >, text, </div>
    assert_eq!(purity(&node), vec![true, false, false, true, true, true]);

    let without: Node = el("div").class("base").child(text("body")).into();
    assert!(purity(&without).iter().all(|p| *p));
}

#[test]
fn deferred_parent_leaves_children_pure() {
    let node: Node = el("ul")
        .deferred(|_| Ok(attr("data-x", "1")))
        .child(el("li").child(text("one")))
        .into();
    let p = purity(&node);
    // <ul, deferred, finalize, >, then <li > one </li> all pure, </ul>
    assert_eq!(&p[..4], &[true, false, false, true]);
    assert!(p[4..].iter().all(|x| *x));
}

#[test]
fn one_impure_chunk_per_deferred_property() {
    let node: Node = el("input")
        .deferred(|_| Ok(attr("a", "1")))
        .deferred(|_| Ok(attr("b", "2")))
        .deferred(|_| Ok(attr("c", "3")))
        .into();
    // void: <input, 3 deferred, finalize, >
    assert_eq!(purity(&node), vec![true, false, false, false, false, true]);
    assert_eq!(
        render_to_string(&node, &RenderContext::new()).unwrap(),
        r#"<input a="1" b="2" c="3">"#
    );
}

#[test]
fn component_always_yields_an_impure_chunk() {
    for inner in [Node::empty(), text("x"), el("p").into()] {
        let node = component(move |_| Ok(inner.clone()));
        let chunks: Vec<Chunk> = node.chunks().collect();
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].is_pure());
    }
}

#[test]
fn chunk_order_is_document_order() {
    let node = fragment([
        text("1"),
        el("b")
            .child(text("2"))
            .child(fragment([text("3"), text("4")]))
            .into(),
        text("5"),
    ]);
    assert_eq!(
        render_to_string(&node, &RenderContext::new()).unwrap(),
        "1<b>234</b>5"
    );
    let labels: Vec<String> = node.chunks().map(|c| format!("{c:?}")).collect();
    assert_eq!(labels.len(), 8);
}

#[test]
fn deferred_state_does_not_leak_between_renders() {
    struct Dark(bool);
    let node: Node = el("body")
        .class("page")
        .deferred(|ctx| {
            Ok(if ctx.get::<Dark>().is_some_and(|d| d.0) {
                class("dark")
            } else {
                Property::Group(vec![])
            })
        })
        .into();
    let dark = RenderContext::new().with_value(Dark(true));
    let light = RenderContext::new();
    assert_eq!(
        render_to_string(&node, &dark).unwrap(),
        r#"<body class="page dark"></body>"#
    );
    assert_eq!(
        render_to_string(&node, &light).unwrap(),
        r#"<body class="page"></body>"#
    );
}

#[test]
fn stray_deferred_property_fails_fast() {
    let node = fragment([text("x"), deferred(|_| Ok(class("y")))]);
    let err = render_to_string(&node, &RenderContext::new()).unwrap_err();
    assert!(err.to_string().contains("outside of an element"));
}

#[test]
fn panicking_component_is_a_render_error() {
    let node: Node = el("p").child(component(|_| panic!("thunk blew up"))).into();
    let err = render_to_string(&node, &RenderContext::new()).unwrap_err();
    assert_eq!(err.to_string(), "render error: component panicked");
}

#[test]
fn boundary_catches_panicking_component() {
    let node: Node = el("div")
        .child(boundary(component(|_| panic!("thunk blew up")), |err| {
            text(err.to_string())
        }))
        .into();
    let out = render_to_string(&node, &RenderContext::new()).unwrap();
    assert_eq!(out, "<div>render error: component panicked</div>");
}

#[test]
fn panicking_deferred_property_is_a_render_error() {
    let node: Node = el("p").deferred(|_| -> SluiceResult<Property> { panic!("no class") }).into();
    let err = render_to_string(&node, &RenderContext::new()).unwrap_err();
    assert_eq!(err.to_string(), "render error: deferred property panicked");
}
