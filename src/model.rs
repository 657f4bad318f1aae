use std::sync::Arc;

pub const EMU_PER_CM: f64 = 360_000.0;

pub fn emu_to_cm(emu: i64) -> f64 {
    emu as f64 / EMU_PER_CM
}

pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM).round() as i64
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Color {
    Rgb([u8; 3]),
    /// Scheme color such as `accent1`; brightness in [-1, 1], 0 = unmodified.
    Theme { scheme: String, brightness: f64 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    pub family: Option<String>,
    pub east_asian_family: Option<String>,
    pub size: Option<f64>, // points
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub language: Option<String>,
    pub color: Option<Color>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: Font,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub alignment: Option<Alignment>,
    pub runs: Vec<TextRun>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBody {
    pub paragraphs: Vec<Paragraph>,
}

impl TextBody {
    /// Text of all paragraphs, joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.runs.iter().map(|r| r.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn first_paragraph(&self) -> Option<&Paragraph> {
        self.paragraphs.first()
    }

    pub fn first_run(&self) -> Option<&TextRun> {
        self.paragraphs.first().and_then(|p| p.runs.first())
    }
}

/// Index into the owning slide's image collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

/// Index into the owning slide's top-level shape list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub bytes: Arc<[u8]>,
    /// File extension without the dot (`png`, `jpeg`, ...).
    pub extension: String,
}

impl ImageData {
    pub fn new(bytes: impl Into<Arc<[u8]>>, extension: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension.into(),
        }
    }

    /// Sniff the format from the bytes, falling back to `fallback_ext`.
    pub fn sniff(bytes: Vec<u8>, fallback_ext: &str) -> Self {
        let extension = image::guess_format(&bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or(fallback_ext)
            .to_ascii_lowercase();
        Self::new(bytes, extension)
    }

    pub fn content_type(&self) -> String {
        image_content_type(&self.extension)
    }
}

/// MIME type of an image part by file extension.
pub fn image_content_type(extension: &str) -> String {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg".to_string(),
        "svg" => "image/svg+xml".to_string(),
        "emf" => "image/x-emf".to_string(),
        "wmf" => "image/x-wmf".to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        ext => format!("image/{ext}"),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Fill {
    /// No fill element present; the shape takes its style from the theme.
    Inherit,
    NoFill,
    Solid(Color),
    Picture(ImageId),
    /// Gradient, pattern or group fill; kept only so it can be reported.
    Unsupported(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DashStyle {
    Solid,
    Dot,
    Dash,
    LongDash,
    DashDot,
    LongDashDot,
    LongDashDotDot,
    SysDash,
    SysDot,
    SysDashDot,
    SysDashDotDot,
}

impl DashStyle {
    pub fn from_preset(val: &str) -> Option<Self> {
        Some(match val {
            "solid" => DashStyle::Solid,
            "dot" => DashStyle::Dot,
            "dash" => DashStyle::Dash,
            "lgDash" => DashStyle::LongDash,
            "dashDot" => DashStyle::DashDot,
            "lgDashDot" => DashStyle::LongDashDot,
            "lgDashDotDot" => DashStyle::LongDashDotDot,
            "sysDash" => DashStyle::SysDash,
            "sysDot" => DashStyle::SysDot,
            "sysDashDot" => DashStyle::SysDashDot,
            "sysDashDotDot" => DashStyle::SysDashDotDot,
            _ => return None,
        })
    }

    pub fn preset(self) -> &'static str {
        match self {
            DashStyle::Solid => "solid",
            DashStyle::Dot => "dot",
            DashStyle::Dash => "dash",
            DashStyle::LongDash => "lgDash",
            DashStyle::DashDot => "dashDot",
            DashStyle::LongDashDot => "lgDashDot",
            DashStyle::LongDashDotDot => "lgDashDotDot",
            DashStyle::SysDash => "sysDash",
            DashStyle::SysDot => "sysDot",
            DashStyle::SysDashDot => "sysDashDot",
            DashStyle::SysDashDotDot => "sysDashDotDot",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArrowType {
    None,
    Triangle,
    Stealth,
    Diamond,
    Oval,
    Arrow,
}

impl ArrowType {
    pub fn from_attr(val: &str) -> Self {
        match val {
            "triangle" => ArrowType::Triangle,
            "stealth" => ArrowType::Stealth,
            "diamond" => ArrowType::Diamond,
            "oval" => ArrowType::Oval,
            "arrow" => ArrowType::Arrow,
            _ => ArrowType::None,
        }
    }

    pub fn attr(self) -> &'static str {
        match self {
            ArrowType::None => "none",
            ArrowType::Triangle => "triangle",
            ArrowType::Stealth => "stealth",
            ArrowType::Diamond => "diamond",
            ArrowType::Oval => "oval",
            ArrowType::Arrow => "arrow",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArrowSize {
    Small,
    Medium,
    Large,
}

impl ArrowSize {
    pub fn from_attr(val: &str) -> Option<Self> {
        match val {
            "sm" => Some(ArrowSize::Small),
            "med" => Some(ArrowSize::Medium),
            "lg" => Some(ArrowSize::Large),
            _ => None,
        }
    }

    pub fn attr(self) -> &'static str {
        match self {
            ArrowSize::Small => "sm",
            ArrowSize::Medium => "med",
            ArrowSize::Large => "lg",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrowHead {
    pub kind: ArrowType,
    pub width: Option<ArrowSize>,
    pub length: Option<ArrowSize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub width: Option<i64>, // EMU
    pub dash: Option<DashStyle>,
    pub fill: Fill,
    pub head: Option<ArrowHead>,
    pub tail: Option<ArrowHead>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: None,
            dash: None,
            fill: Fill::Inherit,
            head: None,
            tail: None,
        }
    }
}

impl LineStyle {
    pub fn is_inherited(&self) -> bool {
        self.width.is_none()
            && self.dash.is_none()
            && self.fill == Fill::Inherit
            && self.head.is_none()
            && self.tail.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OuterShadow {
    pub blur_radius: Option<i64>, // EMU
    pub distance: Option<i64>,    // EMU
    pub direction: Option<f64>,   // degrees
    pub color: Option<Color>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Shadow {
    /// No effect list: the shadow comes from the theme.
    #[default]
    Inherit,
    /// Empty effect list: explicitly no shadow.
    Off,
    Outer(OuterShadow),
}

/// Crop fractions, each in [0, 1).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Crop {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    pub rotation: f64, // degrees, clockwise
    pub flip_h: bool,
    pub flip_v: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaceholderKind {
    Picture,
    Title,
    Body,
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Picture {
    pub image: ImageId,
    pub description: String,
    pub crop: Crop,
    pub line: LineStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AutoShape {
    pub text_box: bool,
    /// Preset geometry name; `None` for custom (freeform) geometry.
    pub preset: Option<String>,
    pub text: Option<TextBody>,
    pub fill: Fill,
    pub line: LineStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Connector {
    pub preset: String,
    pub line: LineStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub child_x: i64,
    pub child_y: i64,
    pub child_cx: i64,
    pub child_cy: i64,
    pub children: Vec<Shape>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeContent {
    Picture(Picture),
    AutoShape(AutoShape),
    Connector(Connector),
    Group(Group),
    /// Graphic frame: table, chart, diagram or OLE object.
    Graphic(String),
    /// Any other spTree child, tag name recorded.
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: u32,
    pub name: String,
    pub transform: Transform,
    pub placeholder: Option<PlaceholderKind>,
    pub shadow: Shadow,
    pub content: ShapeContent,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SlideOrigin {
    /// Slide read from the template; written back byte-for-byte from this part.
    Package(String),
    Generated,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Slide {
    pub origin: SlideOrigin,
    pub layout: usize,
    pub shapes: Vec<Shape>,
    pub images: Vec<ImageData>,
}

impl Slide {
    pub fn generated(layout: usize) -> Self {
        Self {
            origin: SlideOrigin::Generated,
            layout,
            shapes: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageData> {
        self.images.get(id.0)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0)
    }
}

/// Raw package part carried through unchanged from the template.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Deck {
    pub slide_width: i64,  // EMU
    pub slide_height: i64, // EMU
    pub slides: Vec<Slide>,
    /// Slide layout part names (`ppt/slideLayouts/slideLayout1.xml`) in master order.
    pub layouts: Vec<String>,
    pub parts: Vec<Part>,
}

impl Deck {
    pub fn slide_width_cm(&self) -> f64 {
        emu_to_cm(self.slide_width)
    }

    pub fn slide_height_cm(&self) -> f64 {
        emu_to_cm(self.slide_height)
    }

    pub fn add_slide(&mut self, layout: usize) -> &mut Slide {
        self.slides.push(Slide::generated(layout));
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }
}
