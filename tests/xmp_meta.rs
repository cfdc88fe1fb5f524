//! Tests for the XmpMeta API
//!
//! These tests go through the public surface only: parse a packet, query
//! and edit the tree, serialize it and parse it back.

use xmpengine::{
    ns, ArrayIndex, ArrayType, CharEncoding, IteratorOptions, PropKind, SerializeOptions,
    XmpContext, XmpError, XmpMeta, XmpValue,
};

const PHOTO_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:exif="http://ns.adobe.com/exif/1.0/"
    xmp:CreatorTool="Adobe Photoshop CS2 Windows"
    xmp:Rating="4"
    xmp:CreateDate="2006-04-27T15:38:36.655+02:00">
   <dc:subject>
    <rdf:Bag>
     <rdf:li>purple</rdf:li>
     <rdf:li>square</rdf:li>
    </rdf:Bag>
   </dc:subject>
   <dc:title>
    <rdf:Alt>
     <rdf:li xml:lang="x-default">Purple Square</rdf:li>
     <rdf:li xml:lang="en-US">Purple Square</rdf:li>
     <rdf:li xml:lang="fr-FR">Carré violet</rdf:li>
    </rdf:Alt>
   </dc:title>
   <dc:creator>
    <rdf:Seq>
     <rdf:li>Jane Doe</rdf:li>
    </rdf:Seq>
   </dc:creator>
   <exif:Flash rdf:parseType="Resource">
    <exif:Fired>False</exif:Fired>
    <exif:Mode>2</exif:Mode>
   </exif:Flash>
   <dc:rights rdf:parseType="Resource">
    <rdf:value>All rights reserved</rdf:value>
    <xmp:note>Licensed</xmp:note>
   </dc:rights>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

fn photo() -> XmpMeta {
    XmpMeta::parse_with_context(PHOTO_XMP, XmpContext::new()).unwrap()
}

mod from_str {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn happy_path() {
        let m = PHOTO_XMP.parse::<XmpMeta>().unwrap();
        assert_eq!(
            m.get_property(ns::XMP, "CreatorTool").map(|p| p.value),
            Some(XmpValue::String("Adobe Photoshop CS2 Windows".to_string()))
        );
        assert_eq!(m.about_uri(), Some(""));
    }

    #[test]
    fn bad_xmp() {
        let err = "<x:xmpmeta".parse::<XmpMeta>().unwrap_err();
        assert!(matches!(err, XmpError::ParseError(_)));
    }

    #[test]
    fn empty_input_is_empty_meta() {
        let m = "".parse::<XmpMeta>().unwrap();
        assert!(m.is_empty());
    }
}

mod properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_getters() {
        let m = photo();
        assert_eq!(m.get_property_int(ns::XMP, "Rating").unwrap(), Some(4));
        assert_eq!(m.get_property_bool(ns::EXIF, "Flash/exif:Fired").unwrap(), Some(false));

        let created = m.get_date_time(ns::XMP, "CreateDate").unwrap();
        assert_eq!(created.format(), "2006-04-27T15:38:36.655+02:00");
        assert!(m.get_property_int(ns::XMP, "CreatorTool").is_err());
    }

    #[test]
    fn arrays() {
        let mut m = photo();
        assert_eq!(m.count_array_items(ns::DC, "subject"), 2);
        assert_eq!(
            m.get_property(ns::DC, "subject").unwrap().kind,
            PropKind::Array(ArrayType::Unordered)
        );
        assert_eq!(
            m.get_array_item(ns::DC, "subject", ArrayIndex::Last)
                .unwrap()
                .as_str(),
            Some("square")
        );
        assert_eq!(
            m.get_property(ns::DC, "subject[1]").unwrap().as_str(),
            Some("purple")
        );

        m.append_array_item(ns::DC, "subject", ArrayType::Unordered, "violet")
            .unwrap();
        m.delete_array_item(ns::DC, "subject", 1).unwrap();
        assert_eq!(
            m.get_property(ns::DC, "subject").unwrap().value,
            XmpValue::Array(vec!["square".into(), "violet".into()])
        );
    }

    #[test]
    fn structs_and_qualifiers() {
        let m = photo();
        assert_eq!(
            m.get_struct_field(ns::EXIF, "Flash", ns::EXIF, "Mode")
                .unwrap()
                .as_str(),
            Some("2")
        );
        let rights = m.get_property(ns::DC, "rights").unwrap();
        assert_eq!(rights.as_str(), Some("All rights reserved"));
        assert!(rights.has_qualifiers);
        assert_eq!(
            m.get_qualifier(ns::DC, "rights", ns::XMP, "note")
                .unwrap()
                .as_str(),
            Some("Licensed")
        );
    }

    #[test]
    fn missing_paths_return_none() {
        let m = photo();
        assert!(m.get_property(ns::DC, "description").is_none());
        assert!(m.get_array_item(ns::DC, "subject", 3).is_none());
        assert!(m.get_struct_field(ns::EXIF, "Flash", ns::EXIF, "Return").is_none());
        assert!(!m.has_property("http://unregistered.example/", "x"));
        assert_eq!(m.count_array_items(ns::DC, "missing"), 0);
    }

    #[test]
    fn malformed_paths_are_errors() {
        let mut m = photo();
        assert!(matches!(
            m.set_property(ns::DC, "subject[", "x"),
            Err(XmpError::BadXPath(_))
        ));
        assert!(matches!(
            m.set_property(ns::DC, "", "x"),
            Err(XmpError::BadXPath(_)) | Err(XmpError::BadParam(_))
        ));
    }
}

mod localized_text {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_order() {
        let m = photo();
        let exact = m.get_localized_text(ns::DC, "title", "fr", "fr-FR").unwrap();
        assert_eq!(exact, ("Carré violet".to_string(), "fr-FR".to_string()));

        let generic = m.get_localized_text(ns::DC, "title", "en", "en-GB").unwrap();
        assert_eq!(generic.1, "en-US");

        let fallback = m.get_localized_text(ns::DC, "title", "de", "de-DE").unwrap();
        assert_eq!(fallback, ("Purple Square".to_string(), "x-default".to_string()));
    }

    #[test]
    fn x_default_follows_matching_item() {
        let mut m = photo();
        m.set_localized_text(ns::DC, "title", "en", "en-US", "Violet Square")
            .unwrap();
        assert_eq!(
            m.get_localized_text(ns::DC, "title", "", "x-default").unwrap().0,
            "Violet Square"
        );

        m.set_localized_text(ns::DC, "title", "fr", "fr-FR", "Carré pourpre")
            .unwrap();
        assert_eq!(
            m.get_localized_text(ns::DC, "title", "", "x-default").unwrap().0,
            "Violet Square"
        );
        assert_eq!(m.count_array_items(ns::DC, "title"), 3);

        m.delete_localized_text(ns::DC, "title", "fr-FR").unwrap();
        assert_eq!(m.count_array_items(ns::DC, "title"), 2);
    }

    #[test]
    fn not_an_alt_array() {
        let m = photo();
        assert!(m.get_localized_text(ns::DC, "subject", "", "x-default").is_none());
    }
}

mod aliases {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parsed_aliases_land_on_actual_property() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
      xmlns:pdf="http://ns.adobe.com/pdf/1.3/"
      pdf:Author="Jane Doe"/>
</rdf:RDF>"#;
        let m = XmpMeta::parse_with_context(xml, XmpContext::new()).unwrap();
        assert_eq!(
            m.get_array_item(ns::DC, "creator", 1).unwrap().as_str(),
            Some("Jane Doe")
        );
        assert_eq!(m.get_property(ns::PDF, "Author").unwrap().as_str(), Some("Jane Doe"));
    }

    #[test]
    fn aliases_are_written_under_actual_name() {
        let mut m = XmpMeta::with_context(XmpContext::new());
        m.set_property(ns::XMP, "Author", "Jane Doe").unwrap();
        let xml = m.serialize().unwrap();
        assert!(xml.contains("dc:creator"));
        assert!(!xml.contains("xmp:Author"));
    }
}

mod serialization {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn packet_round_trip() {
        let m = photo();
        let packet = m.serialize_packet().unwrap();
        assert!(packet.starts_with("<?xpacket begin="));
        assert!(packet.ends_with("<?xpacket end=\"w\"?>"));

        let back = XmpMeta::parse_with_context(&packet, m.context().clone()).unwrap();
        assert_eq!(back.dump_object(), m.dump_object());
    }

    #[test]
    fn compact_round_trip() {
        let m = photo();
        let xml = m
            .serialize_with(&SerializeOptions::default().use_compact_format(true))
            .unwrap();
        let back = XmpMeta::parse_with_context(&xml, m.context().clone()).unwrap();
        assert_eq!(back.dump_object(), m.dump_object());
    }

    #[test]
    fn utf16_bytes_round_trip() {
        let m = photo();
        let bytes = m
            .serialize_to_bytes(&SerializeOptions::default().encoding(CharEncoding::Utf16Le))
            .unwrap();
        assert_eq!(&bytes[..2], &[b'<', 0x00]);

        let back = XmpMeta::from_bytes_with_context(&bytes, m.context().clone()).unwrap();
        assert_eq!(back.dump_object(), m.dump_object());
    }

    #[test]
    fn exact_length_and_conflicts() {
        let m = photo();
        let bytes = m
            .serialize_to_bytes(&SerializeOptions::default().exact_packet_length(6000))
            .unwrap();
        assert_eq!(bytes.len(), 6000);

        let conflicting = SerializeOptions::default()
            .omit_packet_wrapper(true)
            .exact_packet_length(6000);
        assert!(matches!(
            m.serialize_with(&conflicting),
            Err(XmpError::BadOptions(_))
        ));
    }

    #[test]
    fn sort_is_stable_across_serialization() {
        let mut m = photo();
        m.sort();
        let once = m.serialize().unwrap();
        let mut back = XmpMeta::parse_with_context(&once, m.context().clone()).unwrap();
        back.sort();
        assert_eq!(back.serialize().unwrap(), once);
    }
}

mod iteration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn leaf_values() {
        let m = photo();
        let subjects: Vec<String> = m
            .iter_property(ns::DC, "subject", IteratorOptions::default().just_children(true))
            .filter_map(|p| p.as_str().map(str::to_string))
            .collect();
        assert_eq!(subjects, vec!["purple", "square"]);
    }

    #[test]
    fn every_top_level_property_is_visited() {
        let m = photo();
        let top: Vec<String> = m
            .iter(IteratorOptions::default())
            .map(|p| p.path)
            .filter(|p| !p.contains('/') && !p.contains('['))
            .collect();
        for name in [
            "xmp:CreatorTool",
            "xmp:Rating",
            "xmp:CreateDate",
            "dc:subject",
            "dc:title",
            "dc:creator",
            "exif:Flash",
            "dc:rights",
        ] {
            assert!(top.contains(&name.to_string()), "{} not visited", name);
        }
    }
}

mod contexts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_registers_into_given_context() {
        let ctx = XmpContext::new();
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:cam="http://ns.example.com/camera/1.0/" cam:Lens="50mm"/>
</rdf:RDF>"#;
        let m = XmpMeta::parse_with_context(xml, ctx.clone()).unwrap();
        assert_eq!(
            ctx.get_namespace_prefix("http://ns.example.com/camera/1.0/").as_deref(),
            Some("cam")
        );
        assert_eq!(m.get_property("cam", "Lens").unwrap().as_str(), Some("50mm"));
    }

    #[test]
    fn terminated_context_rejects_work() {
        let ctx = XmpContext::new();
        ctx.terminate();
        assert!(matches!(
            XmpMeta::parse_with_context(PHOTO_XMP, ctx),
            Err(XmpError::Terminated)
        ));
    }
}
