//! Tests for XmpUtils against parsed documents

use pretty_assertions::assert_eq;
use xmpengine::{
    ns, AppendOptions, ArrayIndex, ArrayType, RemoveOptions, SeparateOptions, XmpContext,
    XmpMeta, XmpUtils,
};

const KEYWORDS_XMP: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
      xmlns:dc="http://purl.org/dc/elements/1.1/"
      xmlns:xmp="http://ns.adobe.com/xap/1.0/"
      xmp:CreatorTool="Scanner 1.0"
      dc:format="image/jpeg">
    <dc:subject>
      <rdf:Bag>
        <rdf:li>harbour</rdf:li>
        <rdf:li>boats, sails</rdf:li>
        <rdf:li>dusk</rdf:li>
      </rdf:Bag>
    </dc:subject>
    <dc:contributor>
      <rdf:Seq>
        <rdf:li rdf:parseType="Resource">
          <dc:identifier>a</dc:identifier>
          <dc:description>first</dc:description>
        </rdf:li>
        <rdf:li rdf:parseType="Resource">
          <dc:identifier>b</dc:identifier>
          <dc:description>second</dc:description>
        </rdf:li>
      </rdf:Seq>
    </dc:contributor>
  </rdf:Description>
</rdf:RDF>"#;

fn keywords(ctx: std::sync::Arc<XmpContext>) -> XmpMeta {
    XmpMeta::parse_with_context(KEYWORDS_XMP, ctx).unwrap()
}

#[test]
fn catenate_quotes_embedded_commas() {
    let meta = keywords(XmpContext::new());
    let text = XmpUtils::catenate_array_items(&meta, ns::DC, "subject", "; ", "\"", false)
        .unwrap();
    assert_eq!(text, "harbour; \"boats, sails\"; dusk");

    let mut copy = XmpMeta::with_context(meta.context().clone());
    XmpUtils::separate_array_items(
        &mut copy,
        ns::DC,
        "subject",
        SeparateOptions::default().array_type(ArrayType::Unordered),
        &text,
    )
    .unwrap();
    assert_eq!(copy.count_array_items(ns::DC, "subject"), 3);
    assert_eq!(
        copy.get_array_item(ns::DC, "subject", 2).unwrap().as_str(),
        Some("boats, sails")
    );
}

#[test]
fn composed_paths_address_parsed_nodes() {
    let meta = keywords(XmpContext::new());

    let item = XmpUtils::compose_array_item_path(&meta, ns::DC, "contributor", ArrayIndex::Last)
        .unwrap();
    let field = XmpUtils::compose_struct_field_path(&meta, ns::DC, &item, ns::DC, "description")
        .unwrap();
    assert_eq!(field, "contributor[last()]/dc:description");
    assert_eq!(meta.get_property(ns::DC, &field).unwrap().as_str(), Some("second"));

    let selector =
        XmpUtils::compose_field_selector(&meta, ns::DC, "contributor", ns::DC, "identifier", "a")
            .unwrap();
    let path = format!("{}/dc:description", selector);
    assert_eq!(meta.get_property(ns::DC, &path).unwrap().as_str(), Some("first"));
}

#[test]
fn append_skips_internal_properties() {
    let ctx = XmpContext::new();
    let source = keywords(ctx.clone());
    let mut dest = XmpMeta::with_context(ctx);
    dest.append_array_item(ns::DC, "subject", ArrayType::Unordered, "dusk")
        .unwrap();

    XmpUtils::append_properties(&source, &mut dest, AppendOptions::default()).unwrap();

    assert!(!dest.has_property(ns::XMP, "CreatorTool"));
    assert!(!dest.has_property(ns::DC, "format"));
    assert_eq!(dest.count_array_items(ns::DC, "contributor"), 2);
    // "dusk" already present; only the other two are added
    assert_eq!(dest.count_array_items(ns::DC, "subject"), 3);
    assert_eq!(
        dest.get_array_item(ns::DC, "subject", 1).unwrap().as_str(),
        Some("dusk")
    );
}

#[test]
fn remove_external_then_everything() {
    let mut meta = keywords(XmpContext::new());
    XmpUtils::remove_properties(&mut meta, "", "", RemoveOptions::default()).unwrap();
    assert!(!meta.has_property(ns::DC, "subject"));
    assert!(meta.has_property(ns::DC, "format"));
    assert!(meta.has_property(ns::XMP, "CreatorTool"));

    XmpUtils::remove_properties(&mut meta, "", "", RemoveOptions::default().do_all_properties(true))
        .unwrap();
    assert!(meta.is_empty());
}
