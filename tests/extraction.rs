mod common;

use common::*;
use slidetile::geometry::{BoundingBox, Point};
use slidetile::model::{
    Alignment, ArrowSize, ArrowType, Color, DashStyle, Fill, Shadow, Slide, cm_to_emu,
};
use slidetile::sample::{DescriptorBody, FillStyle, Sample, ShapeKind, classify};
use slidetile::{Error, pptx};

fn deck_of(slides: Vec<SlideSpec>) -> slidetile::model::Deck {
    pptx::open_bytes(&build_pptx(SLIDE_20X15, &slides)).unwrap()
}

#[test]
fn reads_presentation_structure() {
    let deck = deck_of(vec![SlideSpec::new(text_box(2, "T", &xfrm(1.0, 1.0, 2.0, 1.0), "x"))]);
    assert_eq!((deck.slide_width, deck.slide_height), SLIDE_20X15);
    assert!(approx(deck.slide_width_cm(), 20.0));
    assert_eq!(
        deck.layouts,
        vec![
            "ppt/slideLayouts/slideLayout1.xml".to_string(),
            "ppt/slideLayouts/slideLayout2.xml".to_string()
        ]
    );
    assert_eq!(deck.slides.len(), 1);
    assert_eq!(deck.slides[0].layout, 1);
}

#[test]
fn text_box_captures_label_and_style() {
    let deck = deck_of(vec![SlideSpec::new(text_box(
        2,
        "Name Box",
        &xfrm(1.0, 2.0, 9.0, 5.0),
        "  Name ",
    ))]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    assert_eq!(sample.bounding_box(), BoundingBox::new(1.0, 2.0, 9.0, 5.0));

    let d = &sample.descriptors()[0];
    assert_eq!(d.kind(), ShapeKind::TextBox);
    assert_eq!(d.label(), Some("name"));
    assert_eq!(d.geometry, BoundingBox::new(0.0, 0.0, 9.0, 5.0));
    let DescriptorBody::TextBox(slot) = &d.body else {
        panic!("expected a text box, got {:?}", d.body);
    };
    assert_eq!(slot.template_text, "  Name ");
    assert_eq!(slot.alignment, Alignment::Center);
    assert_eq!(slot.font.size, Some(24.0));
    assert_eq!(slot.font.bold, Some(true));
    assert_eq!(slot.font.family.as_deref(), Some("Arial"));
    assert_eq!(slot.font.color, Some(Color::Rgb([255, 0, 0])));
    assert_eq!(slot.fill, FillStyle::NoFill);
}

#[test]
fn auto_shape_carries_fill_line_and_shadow() {
    let extra = r#"<a:solidFill><a:schemeClr val="accent1"><a:lumMod val="60000"/><a:lumOff val="40000"/></a:schemeClr></a:solidFill><a:ln w="12700"><a:noFill/></a:ln><a:effectLst/>"#;
    let deck = deck_of(vec![SlideSpec::new(auto_shape(
        2,
        "Badge",
        "roundRect",
        &xfrm(0.0, 0.0, 4.0, 2.0),
        "Role",
        extra,
    ))]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    let d = &sample.descriptors()[0];
    assert_eq!(d.kind(), ShapeKind::AutoShape);
    assert_eq!(d.shadow, Shadow::Off);
    assert_eq!(d.line.width, Some(12700));
    assert_eq!(d.line.fill, Fill::NoFill);
    let DescriptorBody::AutoShape { preset, text } = &d.body else {
        panic!("expected an auto shape");
    };
    assert_eq!(preset, "roundRect");
    assert_eq!(text.label, "role");
    match &text.fill {
        FillStyle::Solid(Color::Theme { scheme, brightness }) => {
            assert_eq!(scheme, "accent1");
            assert!(approx(*brightness, 0.4));
        }
        other => panic!("unexpected fill {other:?}"),
    }
}

#[test]
fn picture_label_comes_from_alt_text_only() {
    let png = png_bytes([10, 20, 30]);
    let spec = SlideSpec::new(format!(
        "{}{}",
        picture(2, "Picture 1", "Photo", "rId2", &xfrm(0.0, 0.0, 3.0, 4.0), r#"<a:srcRect l="10000" b="25000"/>"#),
        picture(3, "Logo", "", "rId2", &xfrm(3.0, 0.0, 1.0, 1.0), ""),
    ))
    .with_image("rId2", png.clone());
    let deck = deck_of(vec![spec]);
    assert_eq!(deck.slides[0].images.len(), 1, "same target is loaded once");

    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    let labels: Vec<_> = sample.descriptors().iter().map(|d| d.label()).collect();
    assert_eq!(labels, vec![Some("photo"), None]);
    let DescriptorBody::Image { image, crop, .. } = &sample.descriptors()[0].body else {
        panic!("expected an image");
    };
    assert_eq!(&image.bytes[..], &png[..]);
    assert_eq!(image.extension, "png");
    assert!(approx(crop.left, 0.1));
    assert!(approx(crop.bottom, 0.25));
    assert_eq!(crop.top, 0.0);
}

#[test]
fn connector_endpoints_follow_flips() {
    let x = format!(
        r#"<a:xfrm flipH="1"><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        cm(2.0),
        cm(1.0),
        cm(4.0),
        cm(3.0)
    );
    let deck = deck_of(vec![SlideSpec::new(connector(2, "Arrow", &x))]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    let d = &sample.descriptors()[0];
    assert_eq!(d.kind(), ShapeKind::Connector);
    let DescriptorBody::Connector { begin, end } = d.body else {
        panic!("expected a connector");
    };
    // sample origin is (2, 1)
    assert_eq!(begin, Point::new(4.0, 0.0));
    assert_eq!(end, Point::new(0.0, 3.0));
    assert_eq!(d.line.width, Some(19050));
    assert_eq!(d.line.dash, Some(DashStyle::Dash));
    let tail = d.line.tail.expect("tail end");
    assert_eq!(tail.kind, ArrowType::Triangle);
    assert_eq!(tail.width, Some(ArrowSize::Medium));
    assert_eq!(tail.length, Some(ArrowSize::Large));
    assert!(d.line.head.is_none());
    assert_eq!(
        d.line.fill,
        Fill::Solid(Color::Theme {
            scheme: "accent2".into(),
            brightness: -0.25
        })
    );
}

#[test]
fn group_children_are_mapped_into_slide_space() {
    let children = format!(
        "{}{}",
        text_box(3, "Top", &xfrm(0.0, 0.0, 8.0, 2.0), "title"),
        text_box(4, "Bottom", &xfrm(0.0, 2.0, 8.0, 2.0), "subtitle"),
    );
    let deck = deck_of(vec![SlideSpec::new(group(
        2,
        "Group 1",
        (2.0, 2.0, 4.0, 2.0),
        (0.0, 0.0, 8.0, 4.0),
        &children,
    ))]);
    assert_eq!(classify(&deck.slides[0].shapes[0]), Some(ShapeKind::Group));

    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    assert_eq!(sample.descriptors().len(), 2);
    assert_eq!(sample.bounding_box(), BoundingBox::new(2.0, 2.0, 4.0, 2.0));
    assert_eq!(sample.descriptors()[0].geometry, BoundingBox::new(0.0, 0.0, 4.0, 1.0));
    assert_eq!(sample.descriptors()[1].geometry, BoundingBox::new(0.0, 1.0, 4.0, 1.0));
}

#[test]
fn rotated_shape_widens_the_sample() {
    let deck = deck_of(vec![SlideSpec::new(text_box(
        2,
        "Tilted",
        &xfrm_rot(5.0, 5.0, 10.0, 4.0, 90.0),
        "name",
    ))]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    assert!(approx(sample.width(), 4.0));
    assert!(approx(sample.height(), 10.0));
    assert_eq!(sample.descriptors()[0].rotation, 90.0);
}

#[test]
fn empty_placeholder_is_dropped_and_filled_one_inherits_its_frame() {
    let mut spec = SlideSpec::new(format!(
        "{}{}",
        placeholder(2, "Empty", "body", 1, None),
        text_box(3, "Caption", &xfrm(0.0, 0.0, 2.0, 1.0), "caption"),
    ));
    spec.layout = 1;
    let mut filled = SlideSpec::new(placeholder(2, "Body", "body", 1, Some("Company")));
    filled.layout = 1;
    let deck = deck_of(vec![spec, filled]);

    assert_eq!(classify(&deck.slides[0].shapes[0]), None);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    assert_eq!(sample.descriptors().len(), 1);
    assert_eq!(sample.descriptors()[0].label(), Some("caption"));

    let sample = Sample::from_slide(&deck.slides[1]).unwrap();
    assert_eq!(sample.descriptors()[0].kind(), ShapeKind::TextBox);
    assert_eq!(sample.bounding_box(), BoundingBox::new(2.0, 3.0, 16.0, 10.0));
}

#[test]
fn slide_without_usable_shapes_is_an_authoring_error() {
    let deck = deck_of(vec![SlideSpec::new(placeholder(2, "Empty", "body", 1, None))]);
    let err = Sample::from_slide(&deck.slides[0]).unwrap_err();
    assert!(matches!(err, Error::Authoring(_)), "{err}");
}

#[test]
fn tables_and_freeforms_are_rejected() {
    let deck = deck_of(vec![
        SlideSpec::new(format!(
            "{}{}",
            text_box(2, "Ok", &xfrm(0.0, 0.0, 1.0, 1.0), "ok"),
            table_frame(3, "Table 1")
        )),
        SlideSpec::new(freeform(2, "Scribble", &xfrm(0.0, 0.0, 1.0, 1.0))),
    ]);
    assert_eq!(classify(&deck.slides[0].shapes[1]), Some(ShapeKind::Unsupported));
    for slide in &deck.slides {
        match Sample::from_slide(slide) {
            Err(Error::Authoring(msg)) => assert!(msg.contains("not supported"), "{msg}"),
            other => panic!("expected an authoring error, got {other:?}"),
        }
    }
}

#[test]
fn duplicate_labels_are_reported() {
    let deck = deck_of(vec![SlideSpec::new(format!(
        "{}{}",
        text_box(2, "A", &xfrm(0.0, 0.0, 2.0, 1.0), "Name"),
        text_box(3, "B", &xfrm(0.0, 1.0, 2.0, 1.0), "name "),
    ))]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();
    match sample.check_labels() {
        Err(Error::Authoring(msg)) => assert!(msg.contains("'name'"), "{msg}"),
        other => panic!("expected duplicate label error, got {other:?}"),
    }
}

fn mixed_sample_slide() -> SlideSpec {
    SlideSpec::new(format!(
        "{}{}{}",
        text_box(2, "Name", &xfrm(1.3, 2.7, 4.1, 1.9), "name"),
        auto_shape(3, "Tag", "ellipse", &xfrm_rot(6.2, 3.3, 3.0, 2.0, 30.0), "tag", "<a:noFill/>"),
        picture(4, "Photo", "", "rId2", &xfrm(0.4, 0.9, 2.2, 2.6), ""),
    ))
    .with_image("rId2", png_bytes([0, 0, 0]))
}

#[test]
fn drawing_at_the_sample_origin_reproduces_the_template() {
    let deck = deck_of(vec![mixed_sample_slide()]);
    let original = &deck.slides[0];
    let sample = Sample::from_slide(original).unwrap();

    let mut target = Slide::generated(1);
    for mut cloner in sample.cloners() {
        cloner.draw(&mut target, sample.bounding_box().origin()).unwrap();
    }
    assert_eq!(target.shapes.len(), original.shapes.len());
    for (drawn, source) in target.shapes.iter().zip(&original.shapes) {
        let (a, b) = (drawn.transform, source.transform);
        assert_eq!((a.x, a.y, a.cx, a.cy), (b.x, b.y, b.cx, b.cy), "{}", source.name);
        assert_eq!(a.rotation, b.rotation);
    }
}

#[test]
fn drawing_at_zero_offset_uses_origin_relative_geometry() {
    let deck = deck_of(vec![mixed_sample_slide()]);
    let sample = Sample::from_slide(&deck.slides[0]).unwrap();

    let mut target = Slide::generated(1);
    for mut cloner in sample.cloners() {
        let id = cloner.draw(&mut target, Point::new(0.0, 0.0)).unwrap();
        let g = cloner.descriptor().geometry;
        let t = target.shape(id).unwrap().transform;
        assert_eq!(
            (t.x, t.y, t.cx, t.cy),
            (cm_to_emu(g.left), cm_to_emu(g.top), cm_to_emu(g.width), cm_to_emu(g.height))
        );
    }
    // the picture bytes were copied into the target slide
    assert_eq!(target.images.len(), 1);
}
