//! PPT Deck Writer Module
//! Writes the strategy deck as a `.pptx`: text slides plus one chart and
//! insight box per chart slide.
//!
//! Uses direct ZIP/XML generation so images can be embedded without a
//! presentation library.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::narrative::Slide;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("failed to write deck: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build deck archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Writer for the consulting deck
pub struct DeckWriter;

/// EMU (English Metric Units) conversion: 914400 EMU = 1 inch
const EMU_PER_INCH: f64 = 914400.0;
/// Standard 4:3 slide dimensions (in EMU)
const SLIDE_WIDTH: i64 = 9144000; // 10 inches
const SLIDE_HEIGHT: i64 = 6858000; // 7.5 inches

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Frame {
    fn inches(x: f64, y: f64, w: f64, h: f64) -> Self {
        let emu = |v: f64| (v * EMU_PER_INCH).round() as i64;
        Frame {
            x: emu(x),
            y: emu(y),
            cx: emu(w),
            cy: emu(h),
        }
    }

    /// Largest frame with the image's aspect ratio that fits inside `self`,
    /// centred. Unknown dimensions fill the whole box.
    fn fit(self, dims: Option<(u32, u32)>) -> Self {
        let Some((w, h)) = dims.filter(|(w, h)| *w > 0 && *h > 0) else {
            return self;
        };
        let scale = (self.cx as f64 / w as f64).min(self.cy as f64 / h as f64);
        let cx = (w as f64 * scale).round() as i64;
        let cy = (h as f64 * scale).round() as i64;
        Frame {
            x: self.x + (self.cx - cx) / 2,
            y: self.y + (self.cy - cy) / 2,
            cx,
            cy,
        }
    }
}

/// Text style for one text box.
struct TextStyle {
    size_pt: u32,
    bold: bool,
    centered: bool,
}

/// A slide rendered to XML, with the media index it embeds (if any).
struct SlidePart {
    xml: String,
    image_id: Option<usize>,
}

impl DeckWriter {
    /// Write `slides` to `output_path`. Chart images that cannot be read
    /// are left out of their slide with a warning; the insight text stays.
    pub fn write(slides: &[Slide], output_path: &Path, title: &str) -> Result<(), DeckError> {
        let mut media: Vec<Vec<u8>> = Vec::new();
        let mut parts: Vec<SlidePart> = Vec::with_capacity(slides.len());

        for slide in slides {
            let part = match slide {
                Slide::Title { title, subtitle } => SlidePart {
                    xml: Self::title_slide_xml(title, subtitle),
                    image_id: None,
                },
                Slide::Bullets { title, lines } => SlidePart {
                    xml: Self::bullet_slide_xml(title, lines),
                    image_id: None,
                },
                Slide::ChartInsight {
                    title,
                    image: chart_path,
                    insight,
                } => {
                    let picture = match fs::read(chart_path) {
                        Ok(bytes) => {
                            let dims = image::image_dimensions(chart_path).ok();
                            media.push(bytes);
                            Some(Frame::inches(0.6, 1.4, 6.5, 4.0).fit(dims))
                        }
                        Err(err) => {
                            warn!(
                                image = %chart_path.display(),
                                error = %err,
                                "failed to add image to slide"
                            );
                            None
                        }
                    };
                    SlidePart {
                        xml: Self::chart_slide_xml(title, insight, picture),
                        image_id: picture.map(|_| media.len()),
                    }
                }
            };
            parts.push(part);
        }

        let slide_count = parts.len();
        let file = File::create(output_path)?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default();

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml(slide_count).as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. ppt/_rels/presentation.xml.rels
        zip.start_file("ppt/_rels/presentation.xml.rels", options)?;
        zip.write_all(Self::presentation_rels_xml(slide_count).as_bytes())?;

        // 4. ppt/presentation.xml
        zip.start_file("ppt/presentation.xml", options)?;
        zip.write_all(Self::presentation_xml(slide_count).as_bytes())?;

        // 5. Slides and their relationships
        for (idx, part) in parts.iter().enumerate() {
            let slide_num = idx + 1;
            zip.start_file(format!("ppt/slides/_rels/slide{}.xml.rels", slide_num), options)?;
            zip.write_all(Self::slide_rels_xml(part.image_id).as_bytes())?;

            zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;
            zip.write_all(part.xml.as_bytes())?;
        }

        // 6. Slide layout
        zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)?;
        zip.write_all(Self::slide_layout_xml().as_bytes())?;
        zip.start_file("ppt/slideLayouts/_rels/slideLayout1.xml.rels", options)?;
        zip.write_all(Self::layout_rels_xml().as_bytes())?;

        // 7. Slide master
        zip.start_file("ppt/slideMasters/slideMaster1.xml", options)?;
        zip.write_all(Self::slide_master_xml().as_bytes())?;
        zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)?;
        zip.write_all(Self::master_rels_xml().as_bytes())?;

        // 8. Theme
        zip.start_file("ppt/theme/theme1.xml", options)?;
        zip.write_all(Self::theme_xml().as_bytes())?;

        // 9. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(title).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml(slide_count).as_bytes())?;

        // 10. Chart images
        for (idx, bytes) in media.iter().enumerate() {
            zip.start_file(format!("ppt/media/image{}.png", idx + 1), options)?;
            zip.write_all(bytes)?;
        }

        zip.finish()?;

        info!(
            path = %output_path.display(),
            slides = slide_count,
            images = media.len(),
            "deck written"
        );
        Ok(())
    }

    fn title_slide_xml(title: &str, subtitle: &str) -> String {
        let shapes = [
            Self::text_shape(
                2,
                "Title",
                Frame::inches(0.75, 2.4, 8.5, 1.3),
                &[title],
                &TextStyle {
                    size_pt: 36,
                    bold: true,
                    centered: true,
                },
            ),
            Self::text_shape(
                3,
                "Subtitle",
                Frame::inches(1.5, 3.9, 7.0, 0.8),
                &[subtitle],
                &TextStyle {
                    size_pt: 20,
                    bold: false,
                    centered: true,
                },
            ),
        ];
        Self::slide_xml(&shapes.concat())
    }

    fn bullet_slide_xml(title: &str, lines: &[String]) -> String {
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let shapes = [
            Self::heading_shape(title),
            Self::text_shape(
                3,
                "Body",
                Frame::inches(0.6, 1.4, 8.8, 5.6),
                &lines,
                &TextStyle {
                    size_pt: 16,
                    bold: false,
                    centered: false,
                },
            ),
        ];
        Self::slide_xml(&shapes.concat())
    }

    fn chart_slide_xml(title: &str, insight: &str, picture: Option<Frame>) -> String {
        let mut shapes = Self::heading_shape(title);
        if let Some(frame) = picture {
            shapes.push_str(&Self::picture_shape(3, frame));
        }
        shapes.push_str(&Self::text_shape(
            4,
            "Insight",
            Frame::inches(7.3, 1.6, 2.7, 3.6),
            &[insight],
            &TextStyle {
                size_pt: 12,
                bold: false,
                centered: false,
            },
        ));
        Self::slide_xml(&shapes)
    }

    fn heading_shape(title: &str) -> String {
        Self::text_shape(
            2,
            "Title",
            Frame::inches(0.5, 0.3, 9.0, 0.9),
            &[title],
            &TextStyle {
                size_pt: 28,
                bold: true,
                centered: false,
            },
        )
    }

    fn text_shape(
        id: usize,
        name: &str,
        frame: Frame,
        paragraphs: &[&str],
        style: &TextStyle,
    ) -> String {
        let align = if style.centered { "ctr" } else { "l" };
        let bold = if style.bold { r#" b="1""# } else { "" };
        let body: String = paragraphs
            .iter()
            .map(|text| {
                format!(
                    r#"<a:p><a:pPr algn="{}"/><a:r><a:rPr lang="en-US" sz="{}"{} dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    align,
                    style.size_pt * 100,
                    bold,
                    escape_xml(text)
                )
            })
            .collect();

        format!(
            r#"
<p:sp>
<p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
<a:noFill/>
</p:spPr>
<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody>
</p:sp>"#,
            id, name, id, frame.x, frame.y, frame.cx, frame.cy, body
        )
    }

    fn picture_shape(id: usize, frame: Frame) -> String {
        format!(
            r#"
<p:pic>
<p:nvPicPr>
<p:cNvPr id="{}" name="Picture {}"/>
<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
<p:nvPr/>
</p:nvPicPr>
<p:blipFill>
<a:blip r:embed="rId2"/>
<a:stretch><a:fillRect/></a:stretch>
</p:blipFill>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
</p:spPr>
</p:pic>"#,
            id, id, frame.x, frame.y, frame.cx, frame.cy
        )
    }

    fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld>
<p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>
{}
</p:spTree>
</p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
            shapes
        )
    }

    fn content_types_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i
            ));
            xml.push('\n');
        }
        xml.push_str("</Types>");
        xml
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn presentation_rels_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                i + 2, i
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn presentation_xml(slide_count: usize) -> String {
        let slide_ids: String = (1..=slide_count)
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 2))
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst>{}</p:sldIdLst>
<p:sldSz cx="{}" cy="{}" type="screen4x3"/>
<p:notesSz cx="{}" cy="{}"/>
</p:presentation>"#,
            slide_ids, SLIDE_WIDTH, SLIDE_HEIGHT, SLIDE_HEIGHT, SLIDE_WIDTH
        )
    }

    fn slide_rels_xml(image_id: Option<usize>) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
"#.to_string();

        if let Some(img_id) = image_id {
            xml.push_str(&format!(
                r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{}.png"/>"#,
                img_id
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn slide_layout_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">
<p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#
    }

    fn layout_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#
    }

    fn slide_master_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>
</p:sldMaster>"#
    }

    fn master_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>
</Relationships>"#
    }

    fn theme_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Olist Insights">
<a:themeElements>
<a:clrScheme name="Olist"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="2C3E50"/></a:dk2><a:lt2><a:srgbClr val="ECF0F1"/></a:lt2><a:accent1><a:srgbClr val="3498DB"/></a:accent1><a:accent2><a:srgbClr val="F39C12"/></a:accent2><a:accent3><a:srgbClr val="2ECC71"/></a:accent3><a:accent4><a:srgbClr val="E74C3C"/></a:accent4><a:accent5><a:srgbClr val="9B59B6"/></a:accent5><a:accent6><a:srgbClr val="1ABC9C"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme>
<a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>
<a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:tint val="50000"/></a:schemeClr></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:shade val="80000"/></a:schemeClr></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:tint val="95000"/></a:schemeClr></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:shade val="90000"/></a:schemeClr></a:solidFill></a:bgFillStyleLst></a:fmtScheme>
</a:themeElements>
<a:objectDefaults/>
<a:extraClrSchemeLst/>
</a:theme>"#
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>Olist Insights</dc:creator>
<cp:lastModifiedBy>Olist Insights</cp:lastModifiedBy>
<cp:revision>1</cp:revision>
</cp:coreProperties>"#,
            escape_xml(title)
        )
    }

    fn app_props_xml(slide_count: usize) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<TotalTime>0</TotalTime>
<Application>Olist Insights</Application>
<PresentationFormat>On-screen Show (4:3)</PresentationFormat>
<Slides>{}</Slides>
<Notes>0</Notes>
<HiddenSlides>0</HiddenSlides>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>16.0000</AppVersion>
</Properties>"#,
            slide_count
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
