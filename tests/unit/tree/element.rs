use super::*;
use crate::chunk::render::render_to_string;
use crate::tree::node::text;
use crate::tree::property::{attr, class, unique_attr};

fn html(el: Element) -> String {
    render_to_string(&el.into(), &RenderContext::new()).unwrap()
}

#[test]
fn bare_element_renders_open_and_close() {
    assert_eq!(html(el("div")), "<div></div>");
}

#[test]
fn void_element_drops_children() {
    let input = el("input").attr("type", "text").child(text("ignored"));
    assert!(input.is_void());
    assert_eq!(input.child_nodes().len(), 1);
    assert_eq!(html(input), r#"<input type="text">"#);
    assert!(is_void_tag("BR"));
    assert!(!is_void_tag("div"));
}

#[test]
fn properties_apply_in_argument_order() {
    let node = el("button").with_all([
        class("btn"),
        attr("type", "button"),
        unique_attr("aria-pressed", "false"),
        Property::from("Go"),
        class("btn-primary"),
        unique_attr("aria-pressed", "true"),
    ]);
    assert_eq!(
        html(node),
        r#"<button type="button" aria-pressed="true" class="btn btn-primary">Go</button>"#
    );
}

#[test]
fn groups_flatten_and_register_deferred() {
    let node = el("p")
        .with(vec![class("a"), class("b")])
        .deferred(|_| Ok(class("c")));
    assert!(node.has_deferred());
    assert_eq!(node.attrs().classes().len(), 2);
    assert_eq!(html(node), r#"<p class="a b c"></p>"#);
}

#[test]
fn try_new_rejects_unsafe_tags() {
    assert!(Element::try_new("my-widget").is_ok());
    assert!(Element::try_new("").is_err());
    assert!(Element::try_new("div onclick").is_err());
    assert!(Element::try_new("1abc").is_err());
}

#[test]
fn deferred_child_node_becomes_deferred_property() {
    let e = el("div")
        .child("a")
        .child(crate::tree::node::deferred(|_| Ok(Property::Class("late".into()))))
        .children(["b", "c"]);
    assert_eq!(e.child_nodes().len(), 3);
    assert!(e.has_deferred());
}
