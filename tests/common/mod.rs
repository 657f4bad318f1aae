#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};

pub const PML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const DML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const SML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// 20cm x 15cm, the slide used by most scenarios.
pub const SLIDE_20X15: (i64, i64) = (7_200_000, 5_400_000);

pub fn cm(v: f64) -> i64 {
    (v * 360_000.0).round() as i64
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

pub fn png_bytes(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn xfrm(x: f64, y: f64, w: f64, h: f64) -> String {
    xfrm_rot(x, y, w, h, 0.0)
}

pub fn xfrm_rot(x: f64, y: f64, w: f64, h: f64, rot_deg: f64) -> String {
    let rot = if rot_deg == 0.0 {
        String::new()
    } else {
        format!(r#" rot="{}""#, (rot_deg * 60_000.0).round() as i64)
    };
    format!(
        r#"<a:xfrm{rot}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        cm(x),
        cm(y),
        cm(w),
        cm(h)
    )
}

fn styled_paragraph(text: &str) -> String {
    format!(
        r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="2400" b="1"><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill><a:latin typeface="Arial"/></a:rPr><a:t>{text}</a:t></a:r></a:p>"#
    )
}

pub fn text_box(id: u32, name: &str, xfrm: &str, text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="none"/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        styled_paragraph(text)
    )
}

/// `extra` goes after the geometry inside spPr (fill, ln, effectLst).
pub fn auto_shape(id: u32, name: &str, prst: &str, xfrm: &str, text: &str, extra: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{xfrm}<a:prstGeom prst="{prst}"><a:avLst/></a:prstGeom>{extra}</p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        styled_paragraph(text)
    )
}

pub fn freeform(id: u32, name: &str, xfrm: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{xfrm}<a:custGeom><a:pathLst/></a:custGeom></p:spPr></p:sp>"#
    )
}

pub fn picture(id: u32, name: &str, descr: &str, rid: &str, xfrm: &str, src_rect: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{name}" descr="{descr}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rid}"/>{src_rect}<a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
    )
}

pub fn connector(id: u32, name: &str, xfrm: &str) -> String {
    format!(
        r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr>{xfrm}<a:prstGeom prst="straightConnector1"><a:avLst/></a:prstGeom><a:ln w="19050"><a:solidFill><a:schemeClr val="accent2"><a:lumMod val="75000"/></a:schemeClr></a:solidFill><a:prstDash val="dash"/><a:tailEnd type="triangle" w="med" len="lg"/></a:ln></p:spPr></p:cxnSp>"#
    )
}

pub fn group(
    id: u32,
    name: &str,
    off_ext: (f64, f64, f64, f64),
    ch_off_ext: (f64, f64, f64, f64),
    children: &str,
) -> String {
    let (x, y, w, h) = off_ext;
    let (cx0, cy0, cw, ch) = ch_off_ext;
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/><a:chOff x="{}" y="{}"/><a:chExt cx="{}" cy="{}"/></a:xfrm></p:grpSpPr>{children}</p:grpSp>"#,
        cm(x),
        cm(y),
        cm(w),
        cm(h),
        cm(cx0),
        cm(cy0),
        cm(cw),
        cm(ch)
    )
}

pub fn table_frame(id: u32, name: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="{name}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="0" y="0"/><a:ext cx="360000" cy="360000"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl/></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

/// Placeholder with no own transform; `text` of `None` leaves it empty.
pub fn placeholder(id: u32, name: &str, ph_type: &str, idx: u32, text: Option<&str>) -> String {
    let body = match text {
        Some(t) => format!(
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{t}</a:t></a:r></a:p></p:txBody>"#
        ),
        None => r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody>"#.to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="{ph_type}" idx="{idx}"/></p:nvPr></p:nvSpPr><p:spPr/>{body}</p:sp>"#
    )
}

pub struct SlideSpec {
    /// 1-based slide layout number.
    pub layout: usize,
    pub shapes: String,
    /// Relationship id and PNG bytes of each embedded image.
    pub images: Vec<(String, Vec<u8>)>,
}

impl SlideSpec {
    pub fn new(shapes: impl Into<String>) -> Self {
        Self {
            layout: 2,
            shapes: shapes.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, rid: &str, bytes: Vec<u8>) -> Self {
        self.images.push((rid.to_string(), bytes));
        self
    }
}

fn sp_tree(shapes: &str) -> String {
    format!(
        r#"<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld>"#
    )
}

fn rels(entries: &[(String, &str, String)]) -> String {
    let mut out = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL}">"#
    );
    for (id, rel_type, target) in entries {
        out.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{REL}/{rel_type}" Target="{target}"/>"#
        ));
    }
    out.push_str("</Relationships>");
    out
}

fn zip_parts(parts: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Minimal but complete presentation: one master, layout 1 "Title and
/// Content" (body placeholder idx 1 at 2cm,3cm 16x10cm), layout 2 blank.
pub fn build_pptx(size: (i64, i64), slides: &[SlideSpec]) -> Vec<u8> {
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
    let mut overrides = String::new();
    let ns = format!(r#"xmlns:a="{DML}" xmlns:r="{REL}" xmlns:p="{PML}""#);

    let mut sld_ids = String::new();
    let mut pres_rels = vec![(
        "rId1".to_string(),
        "slideMaster",
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    let mut media_no = 0;
    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1));
        pres_rels.push((format!("rId{}", n + 1), "slide", format!("slides/slide{n}.xml")));
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));

        let mut slide_rels = vec![(
            "rId1".to_string(),
            "slideLayout",
            format!("../slideLayouts/slideLayout{}.xml", slide.layout),
        )];
        for (rid, bytes) in &slide.images {
            media_no += 1;
            let media = format!("image{media_no}.png");
            parts.push((format!("ppt/media/{media}"), bytes.clone()));
            slide_rels.push((rid.clone(), "image", format!("../media/{media}")));
        }
        parts.push((
            format!("ppt/slides/slide{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {ns}>{}<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
                sp_tree(&slide.shapes)
            )
            .into_bytes(),
        ));
        parts.push((format!("ppt/slides/_rels/slide{n}.xml.rels"), rels(&slide_rels).into_bytes()));
    }

    parts.push((
        "ppt/presentation.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {ns}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{sld_ids}</p:sldIdLst><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            size.0, size.1
        )
        .into_bytes(),
    ));
    parts.push(("ppt/_rels/presentation.xml.rels".to_string(), rels(&pres_rels).into_bytes()));

    let title = format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr></p:sp>"#,
        xfrm(1.0, 1.0, 18.0, 2.0)
    );
    parts.push((
        "ppt/slideMasters/slideMaster1.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {ns}>{}<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#,
            sp_tree(&title)
        )
        .into_bytes(),
    ));
    parts.push((
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
        rels(&[
            ("rId1".to_string(), "slideLayout", "../slideLayouts/slideLayout1.xml".to_string()),
            ("rId2".to_string(), "slideLayout", "../slideLayouts/slideLayout2.xml".to_string()),
        ])
        .into_bytes(),
    ));

    let body = format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr></p:sp>"#,
        xfrm(2.0, 3.0, 16.0, 10.0)
    );
    for (n, shapes, name) in [(1, body.as_str(), "Title and Content"), (2, "", "Blank")] {
        parts.push((
            format!("ppt/slideLayouts/slideLayout{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {ns}><p:cSld name="{name}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sldLayout>"#
            )
            .into_bytes(),
        ));
        parts.push((
            format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"),
            rels(&[(
                "rId1".to_string(),
                "slideMaster",
                "../slideMasters/slideMaster1.xml".to_string(),
            )])
            .into_bytes(),
        ));
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slideLayouts/slideLayout{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#
        ));
    }

    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>{overrides}</Types>"#
    );
    let root_rels = rels(&[(
        "rId1".to_string(),
        "officeDocument",
        "ppt/presentation.xml".to_string(),
    )]);

    let mut all = vec![
        ("[Content_Types].xml".to_string(), content_types.into_bytes()),
        ("_rels/.rels".to_string(), root_rels.into_bytes()),
    ];
    all.extend(parts);
    zip_parts(&all)
}

fn column_letter(mut col: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

/// First-sheet workbook; numeric-looking cells are written as numbers, the rest
/// as shared strings, empty cells are omitted.
pub fn build_xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let mut shared: Vec<String> = Vec::new();
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let reference = format!("{}{}", column_letter(c), r + 1);
            if value.parse::<f64>().is_ok() {
                sheet_rows.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                let index = match shared.iter().position(|s| s == value) {
                    Some(i) => i,
                    None => {
                        shared.push(value.to_string());
                        shared.len() - 1
                    }
                };
                sheet_rows.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
            }
        }
        sheet_rows.push_str("</row>");
    }
    build_xlsx_sheet(&sheet_rows, &shared)
}

/// Workbook around hand-written `sheetData` rows and a shared string table.
pub fn build_xlsx_sheet(sheet_rows: &str, shared: &[String]) -> Vec<u8> {
    let sst: String = shared
        .iter()
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect();
    let parts = vec![
        (
            "[Content_Types].xml".to_string(),
            br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_vec(),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{SML}" xmlns:r="{REL}"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#
            )
            .into_bytes(),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            rels(&[("rId1".to_string(), "worksheet", "worksheets/data.xml".to_string())])
                .into_bytes(),
        ),
        (
            "xl/worksheets/data.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{SML}"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            )
            .into_bytes(),
        ),
        (
            "xl/sharedStrings.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{SML}" count="{0}" uniqueCount="{0}">{sst}</sst>"#,
                shared.len()
            )
            .into_bytes(),
        ),
    ];
    zip_parts(&parts)
}

/// Raw text of a part in a written package.
pub fn read_part(package: &[u8], name: &str) -> Option<String> {
    use std::io::Read;
    let mut zip = zip::ZipArchive::new(Cursor::new(package)).ok()?;
    let mut out = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut out).ok()?;
    Some(out)
}

pub fn part_names(package: &[u8]) -> Vec<String> {
    let zip = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    zip.file_names().map(String::from).collect()
}
