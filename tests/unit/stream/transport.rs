use super::*;

#[test]
fn chunked_framing_and_terminator() {
    let mut t = ChunkedHttp::new(Vec::new());
    t.send_head(&ResponseHead::html()).unwrap();
    t.write_all(b"hello").unwrap();
    t.write_all(b"").unwrap();
    t.write_all(&[b'x'; 26]).unwrap();
    t.finish().unwrap();
    t.finish().unwrap();

    let wire = String::from_utf8(t.into_inner()).unwrap();
    let expected = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/html; charset=utf-8\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n1a\r\n{}\r\n0\r\n\r\n",
        "x".repeat(26)
    );
    assert_eq!(wire, expected);
}

#[test]
fn chunked_rejects_writes_after_finish() {
    let mut t = ChunkedHttp::new(Vec::new());
    t.finish().unwrap();
    assert!(t.write(b"late").is_err());
}

#[test]
fn memory_transport_groups_bytes_by_flush() {
    let mut t = MemoryTransport::new();
    t.write_all(b"ab").unwrap();
    t.write_all(b"c").unwrap();
    t.flush().unwrap();
    t.flush().unwrap();
    t.write_all(b"d").unwrap();
    assert_eq!(t.flushed(), &[b"abc".to_vec()]);
    assert_eq!(t.unflushed(), b"d");
    assert_eq!(t.flush_calls(), 2);
    assert_eq!(t.body_string(), "abcd");
}

#[test]
fn head_helpers() {
    let head = ResponseHead::new(503).header("Content-Type", "text/plain");
    assert_eq!(head.reason(), "Service Unavailable");
    assert_eq!(head.content_type(), Some("text/plain"));
    assert_eq!(ResponseHead::default().status, 200);

    let mut plain = PlainTransport::new(Vec::new());
    plain.send_head(&head).unwrap();
    plain.write_all(b"body").unwrap();
    assert_eq!(plain.into_inner(), b"body");
}
