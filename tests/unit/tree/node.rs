use super::*;
use crate::chunk::render::render_to_string;
use crate::tree::element::el;

#[test]
fn text_is_escaped_and_raw_is_not() {
    let ctx = RenderContext::new();
    assert_eq!(render_to_string(&text("<b>"), &ctx).unwrap(), "&lt;b&gt;");
    assert_eq!(render_to_string(&raw("<b>"), &ctx).unwrap(), "<b>");
    assert_eq!(
        render_to_string(&doctype(), &ctx).unwrap(),
        "<!doctype html>"
    );
}

#[test]
fn fragments_and_options_compose() {
    let ctx = RenderContext::new();
    let node = fragment([
        text("a"),
        Node::from(None::<Node>),
        fragment([text("b"), el("i").into()]),
        Node::empty(),
    ]);
    assert_eq!(render_to_string(&node, &ctx).unwrap(), "ab<i></i>");
}

#[test]
fn component_reads_context() {
    struct Name(&'static str);
    let node = component(|ctx| {
        let name = ctx.get::<Name>().map(|n| n.0).unwrap_or("anon");
        Ok(text(format!("hi {name}")))
    });
    let ctx = RenderContext::new().with_value(Name("ada"));
    assert_eq!(render_to_string(&node, &ctx).unwrap(), "hi ada");
    assert_eq!(
        render_to_string(&node, &RenderContext::new()).unwrap(),
        "hi anon"
    );
}

#[test]
fn boundary_renders_fallback_without_partial_output() {
    let failing = el("section").child(text("partial")).child(component(|_| {
        Err(SluiceError::render("backend down"))
    }));
    let node = fragment([
        text("["),
        boundary(failing, |err| text(format!("oops: {err}"))),
        text("]"),
    ]);
    let out = render_to_string(&node, &RenderContext::new()).unwrap();
    assert_eq!(out, "[oops: render error: backend down]");
}

#[test]
fn boundary_passes_success_through() {
    let node = boundary(el("b").child(text("ok")), |_| text("fallback"));
    assert_eq!(
        render_to_string(&node, &RenderContext::new()).unwrap(),
        "<b>ok</b>"
    );
}

#[test]
fn kind_names_variants() {
    assert_eq!(text("x").kind(), "text");
    assert_eq!(Node::from(el("a")).kind(), "element");
    assert_eq!(deferred(|_| Ok(Property::Group(vec![]))).kind(), "deferred property");
}
