use super::*;

#[test]
fn escapes_markup_significant_bytes() {
    assert_eq!(
        escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
    );
}

#[test]
fn plain_and_unicode_text_pass_through() {
    assert_eq!(escape_html(""), "");
    assert_eq!(escape_html("hello"), "hello");
    assert_eq!(escape_html("héllo → wörld"), "héllo → wörld");
    assert_eq!(escape_html("ü<ü"), "ü&lt;ü");
}

#[test]
fn writer_variant_matches_string_variant() {
    let mut out = Vec::new();
    write_escaped(&mut out, "a<b>&c").unwrap();
    assert_eq!(out, b"a&lt;b&gt;&amp;c");
}
