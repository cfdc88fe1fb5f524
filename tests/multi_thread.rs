//! Concurrency tests
//!
//! Documents are shared read-only across threads; registries are shared
//! through one `XmpContext` and written to concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use xmpengine::{ns, ArrayType, XmpContext, XmpMeta, XmpValue};

const XML: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="TestApp"
                   dc:format="image/tiff"/>
</rdf:RDF>
<?xpacket end="w"?>"#;

#[test]
fn test_concurrent_reads() {
    let meta = Arc::new(XmpMeta::parse(XML).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let meta = Arc::clone(&meta);
            thread::spawn(move || {
                let value = meta.get_property(ns::XMP, "CreatorTool").map(|p| p.value);
                assert_eq!(value, Some(XmpValue::String("TestApp".to_string())));
                assert_eq!(
                    meta.get_property(ns::DC, "format").unwrap().as_str(),
                    Some("image/tiff")
                );
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_namespace_registration() {
    let ctx = XmpContext::new();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                // Every thread asks for the same prefix with its own URI
                let uri = format!("http://ns.example.com/thread/{}/", i);
                let prefix = ctx.register_namespace(&uri, "thread").unwrap();
                assert_eq!(ctx.get_namespace_uri(&prefix).as_deref(), Some(uri.as_str()));
                prefix
            })
        })
        .collect();

    let prefixes: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(prefixes.len(), 8);
}

#[test]
fn test_concurrent_edits_on_shared_context() {
    let ctx = XmpContext::new();
    ctx.register_namespace("http://ns.example.com/shared/", "shared")
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let mut meta = XmpMeta::parse_with_context(XML, ctx).unwrap();
                for n in 0..20 {
                    meta.append_array_item(
                        "shared",
                        "items",
                        ArrayType::Ordered,
                        format!("{}-{}", i, n),
                    )
                    .unwrap();
                }
                let xml = meta.serialize_packet().unwrap();
                let back = XmpMeta::parse_with_context(&xml, meta.context().clone()).unwrap();
                back.count_array_items("shared", "items")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 20);
    }
}

#[test]
fn test_contexts_stay_isolated_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let ctx = XmpContext::new();
                let uri = format!("http://ns.example.com/iso/{}/", i);
                let prefix = ctx.register_namespace(&uri, "iso").unwrap();
                assert_eq!(prefix, "iso");
                ctx
            })
        })
        .collect();

    let contexts: Vec<Arc<XmpContext>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, ctx) in contexts.iter().enumerate() {
        let expected = format!("http://ns.example.com/iso/{}/", i);
        assert_eq!(ctx.get_namespace_uri("iso").as_deref(), Some(expected.as_str()));
    }
}
