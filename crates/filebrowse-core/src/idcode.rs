//! Datablock type codes and the matching filter mask.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Type of a datablock stored inside a library container.
///
/// The string form is the group name used inside containers (`Material`, `Object`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum IdCode {
    Action,
    Armature,
    Brush,
    CacheFile,
    Camera,
    Collection,
    Curve,
    Curves,
    #[strum(serialize = "VFont")]
    Font,
    GreasePencil,
    Image,
    Lattice,
    Light,
    LightProbe,
    #[strum(serialize = "FreestyleLineStyle")]
    LineStyle,
    Mask,
    Material,
    Mesh,
    #[strum(serialize = "MetaBall")]
    Metaball,
    MovieClip,
    NodeTree,
    Object,
    PaintCurve,
    Palette,
    PointCloud,
    Scene,
    Sound,
    Speaker,
    Text,
    Texture,
    Volume,
    WorkSpace,
    World,
}

impl IdCode {
    /// Two-letter code as stored in container files, packed little-endian.
    pub fn code(self) -> u16 {
        let tag: &[u8; 2] = match self {
            IdCode::Action => b"AC",
            IdCode::Armature => b"AR",
            IdCode::Brush => b"BR",
            IdCode::CacheFile => b"CF",
            IdCode::Camera => b"CA",
            IdCode::Collection => b"GR",
            IdCode::Curve => b"CU",
            IdCode::Curves => b"CV",
            IdCode::Font => b"VF",
            IdCode::GreasePencil => b"GP",
            IdCode::Image => b"IM",
            IdCode::Lattice => b"LT",
            IdCode::Light => b"LA",
            IdCode::LightProbe => b"LP",
            IdCode::LineStyle => b"LS",
            IdCode::Mask => b"MS",
            IdCode::Material => b"MA",
            IdCode::Mesh => b"ME",
            IdCode::Metaball => b"MB",
            IdCode::MovieClip => b"MC",
            IdCode::NodeTree => b"NT",
            IdCode::Object => b"OB",
            IdCode::PaintCurve => b"PC",
            IdCode::Palette => b"PL",
            IdCode::PointCloud => b"PT",
            IdCode::Scene => b"SC",
            IdCode::Sound => b"SO",
            IdCode::Speaker => b"SK",
            IdCode::Text => b"TX",
            IdCode::Texture => b"TE",
            IdCode::Volume => b"VO",
            IdCode::WorkSpace => b"WS",
            IdCode::World => b"WO",
        };
        u16::from_le_bytes(*tag)
    }

    /// Look up a code from its container group name.
    pub fn from_group_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Container group name.
    pub fn group_name(self) -> &'static str {
        self.into()
    }

    /// The filter bit selecting this type.
    pub fn filter_bit(self) -> IdFilter {
        match self {
            IdCode::Action => IdFilter::ACTION,
            IdCode::Armature => IdFilter::ARMATURE,
            IdCode::Brush => IdFilter::BRUSH,
            IdCode::CacheFile => IdFilter::CACHE_FILE,
            IdCode::Camera => IdFilter::CAMERA,
            IdCode::Collection => IdFilter::COLLECTION,
            IdCode::Curve => IdFilter::CURVE,
            IdCode::Curves => IdFilter::CURVES,
            IdCode::Font => IdFilter::FONT,
            IdCode::GreasePencil => IdFilter::GREASE_PENCIL,
            IdCode::Image => IdFilter::IMAGE,
            IdCode::Lattice => IdFilter::LATTICE,
            IdCode::Light => IdFilter::LIGHT,
            IdCode::LightProbe => IdFilter::LIGHT_PROBE,
            IdCode::LineStyle => IdFilter::LINE_STYLE,
            IdCode::Mask => IdFilter::MASK,
            IdCode::Material => IdFilter::MATERIAL,
            IdCode::Mesh => IdFilter::MESH,
            IdCode::Metaball => IdFilter::METABALL,
            IdCode::MovieClip => IdFilter::MOVIE_CLIP,
            IdCode::NodeTree => IdFilter::NODE_TREE,
            IdCode::Object => IdFilter::OBJECT,
            IdCode::PaintCurve => IdFilter::PAINT_CURVE,
            IdCode::Palette => IdFilter::PALETTE,
            IdCode::PointCloud => IdFilter::POINT_CLOUD,
            IdCode::Scene => IdFilter::SCENE,
            IdCode::Sound => IdFilter::SOUND,
            IdCode::Speaker => IdFilter::SPEAKER,
            IdCode::Text => IdFilter::TEXT,
            IdCode::Texture => IdFilter::TEXTURE,
            IdCode::Volume => IdFilter::VOLUME,
            IdCode::WorkSpace => IdFilter::WORKSPACE,
            IdCode::World => IdFilter::WORLD,
        }
    }

    /// All codes in declaration order.
    pub fn all() -> impl Iterator<Item = IdCode> {
        IdCode::iter()
    }
}

bitflags! {
    /// Mask of datablock types a listing shows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct IdFilter: u64 {
        const ACTION = 1 << 0;
        const ARMATURE = 1 << 1;
        const BRUSH = 1 << 2;
        const CACHE_FILE = 1 << 3;
        const CAMERA = 1 << 4;
        const COLLECTION = 1 << 5;
        const CURVE = 1 << 6;
        const CURVES = 1 << 7;
        const FONT = 1 << 8;
        const GREASE_PENCIL = 1 << 9;
        const IMAGE = 1 << 10;
        const LATTICE = 1 << 11;
        const LIGHT = 1 << 12;
        const LIGHT_PROBE = 1 << 13;
        const LINE_STYLE = 1 << 14;
        const MASK = 1 << 15;
        const MATERIAL = 1 << 16;
        const MESH = 1 << 17;
        const METABALL = 1 << 18;
        const MOVIE_CLIP = 1 << 19;
        const NODE_TREE = 1 << 20;
        const OBJECT = 1 << 21;
        const PAINT_CURVE = 1 << 22;
        const PALETTE = 1 << 23;
        const POINT_CLOUD = 1 << 24;
        const SCENE = 1 << 25;
        const SOUND = 1 << 26;
        const SPEAKER = 1 << 27;
        const TEXT = 1 << 28;
        const TEXTURE = 1 << 29;
        const VOLUME = 1 << 30;
        const WORKSPACE = 1 << 31;
        const WORLD = 1 << 32;
    }
}

impl IdFilter {
    /// Everything.
    pub const ALL: IdFilter = IdFilter::all();

    /// Whether a datablock of the given type passes this mask.
    pub fn accepts(self, code: IdCode) -> bool {
        self.intersects(code.filter_bit())
    }
}

impl Default for IdFilter {
    fn default() -> Self {
        Self::ALL
    }
}
