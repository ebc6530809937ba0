use super::*;

fn written(set: &AttrSet) -> String {
    let mut out = Vec::new();
    set.write_to(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn classes_accumulate_in_order() {
    let mut set = AttrSet::new();
    set.push(Attribute::new("class", "a"));
    set.push(Attribute::new("class", "b"));
    set.push_class("a");
    assert_eq!(set.classes().len(), 3);
    assert_eq!(written(&set), r#" class="a b a""#);
}

#[test]
fn empty_classes_are_skipped() {
    let mut set = AttrSet::new();
    set.push_class("");
    set.push_class("  ");
    assert!(set.class_string().is_none());
    assert!(set.is_empty());
    set.push_class(" x ");
    assert_eq!(set.class_string().as_deref(), Some("x"));
}

#[test]
fn plain_duplicates_are_all_kept() {
    let mut set = AttrSet::new();
    set.push(Attribute::new("data-x", "1"));
    set.push(Attribute::new("data-x", "2"));
    set.push(Attribute::bare("hidden"));
    set.push(Attribute::bare("hidden"));
    assert_eq!(
        written(&set),
        r#" data-x="1" data-x="2" hidden hidden"#
    );
}

#[test]
fn dedupe_keeps_last_value_in_first_slot() {
    let mut set = AttrSet::new();
    set.push(Attribute::new("id", "a").deduped());
    set.push(Attribute::new("role", "button"));
    set.push(Attribute::new("id", "b").deduped());
    assert_eq!(written(&set), r#" id="b" role="button""#);
}

#[test]
fn dedupe_empty_value_renders_bare() {
    let mut set = AttrSet::new();
    set.push(Attribute::new("disabled", "false").deduped());
    set.push(Attribute::new("disabled", "").deduped());
    assert_eq!(written(&set), " disabled");

    let mut plain = AttrSet::new();
    plain.push(Attribute::new("alt", ""));
    assert_eq!(written(&plain), r#" alt="""#);
}

#[test]
fn values_are_escaped_and_class_goes_last() {
    let mut set = AttrSet::new();
    set.push_class("c");
    set.push(Attribute::new("title", r#"say "hi" & <go>"#));
    assert_eq!(
        written(&set),
        r#" title="say &quot;hi&quot; &amp; &lt;go&gt;" class="c""#
    );
    let fin = set.finalized();
    assert_eq!(fin.len(), 2);
    assert_eq!(fin[1].key(), "class");
}

#[test]
fn class_key_matches_any_case_and_bare_class_adds_nothing() {
    let mut set = AttrSet::new();
    set.push(Attribute::new("CLASS", "a"));
    set.push(Attribute::bare("class"));
    set.push(Attribute::new("Class", "b"));
    assert!(set.attrs().is_empty());
    assert_eq!(written(&set), r#" class="a b""#);
}
