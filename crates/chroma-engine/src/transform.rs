//! Declarative transform nodes.
//!
//! Transforms describe *what* to do; the compiler lowers them into the
//! op list that does it. Nodes are plain data: cloning is a deep copy and
//! a node handed to the compiler is copied in, so later mutation of the
//! caller's tree never reaches a built processor.
//!
//! The whole tree serializes (YAML via serde), which is what the
//! persisted processor cache stores. The inline [`Lut1DTransform`] and
//! [`Lut3DTransform`] nodes exist for that cache: a processor rebuilt
//! from disk carries its tables inline and skips LUT file I/O.

use std::path::PathBuf;

use chroma_lut::Interpolation;
use serde::{Deserialize, Serialize};

/// Transform application direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Apply as declared.
    #[default]
    Forward,
    /// Apply the inverse.
    Inverse,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }

    /// Combines an outer direction with this node's own.
    #[inline]
    pub fn combine(self, outer: Direction) -> Self {
        match outer {
            Direction::Forward => self,
            Direction::Inverse => self.inverse(),
        }
    }

    /// True when the combined result is forward.
    #[inline]
    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// Serde bridge for [`chroma_lut::Interpolation`].
mod interp_serde {
    use chroma_lut::Interpolation;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Interpolation, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match v {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
            Interpolation::Tetrahedral => "tetrahedral",
            Interpolation::Best => "best",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Interpolation, D::Error> {
        match String::deserialize(d)?.as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            "tetrahedral" => Ok(Interpolation::Tetrahedral),
            "best" => Ok(Interpolation::Best),
            other => Err(D::Error::custom(format!("unknown interpolation: {other}"))),
        }
    }
}

fn default_interp() -> Interpolation {
    Interpolation::Best
}

/// A declarative color transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Transform {
    /// Conversion between two named color spaces.
    ColorSpace(ColorSpaceTransform),
    /// Conversion through a display/view pair.
    DisplayView(DisplayViewTransform),
    /// Conversion applying a chain of named looks.
    Look(LookTransform),
    /// Ops loaded from a LUT file.
    File(FileTransform),
    /// Ordered chain of transforms.
    Group(GroupTransform),
    /// 4x4 matrix plus offset.
    Matrix(MatrixTransform),
    /// Per-channel power.
    Exponent(ExponentTransform),
    /// Power with a linear segment near black.
    ExponentWithLinear(ExponentWithLinearTransform),
    /// Pure logarithm of a given base.
    Log(LogTransform),
    /// Affine log with per-channel slopes and offsets.
    LogAffine(LogAffineTransform),
    /// Range remap with clamping.
    Range(RangeTransform),
    /// ASC CDL grade.
    Cdl(CdlTransform),
    /// Allocation shaper (uniform or lg2).
    Allocation(AllocationTransform),
    /// Named fixed-function kernel.
    FixedFunction(FixedFunctionTransform),
    /// Primary grade.
    GradingPrimary(GradingPrimaryTransform),
    /// Per-channel B-spline curves.
    GradingRgbCurve(GradingRgbCurveTransform),
    /// Exposure/contrast/gamma adjustment.
    ExposureContrast(ExposureContrastTransform),
    /// Inline 1D LUT (persisted-cache form of a file LUT).
    Lut1D(Lut1DTransform),
    /// Inline 3D LUT (persisted-cache form of a file LUT).
    Lut3D(Lut3DTransform),
}

impl Transform {
    /// A matrix transform from row-major coefficients.
    pub fn matrix(m: [f64; 16]) -> Self {
        Self::Matrix(MatrixTransform {
            matrix: m,
            offset: [0.0; 4],
            direction: Direction::Forward,
        })
    }

    /// A group over an ordered list of transforms.
    pub fn group(transforms: Vec<Transform>) -> Self {
        Self::Group(GroupTransform {
            transforms,
            direction: Direction::Forward,
        })
    }

    /// A file transform with default interpolation.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(FileTransform {
            src: path.into(),
            ccc_id: None,
            interpolation: Interpolation::Best,
            direction: Direction::Forward,
        })
    }

    /// A conversion between two named color spaces.
    pub fn colorspace(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self::ColorSpace(ColorSpaceTransform {
            src: src.into(),
            dst: dst.into(),
            direction: Direction::Forward,
        })
    }

    /// This node's own direction.
    pub fn direction(&self) -> Direction {
        match self {
            Self::ColorSpace(t) => t.direction,
            Self::DisplayView(t) => t.direction,
            Self::Look(t) => t.direction,
            Self::File(t) => t.direction,
            Self::Group(t) => t.direction,
            Self::Matrix(t) => t.direction,
            Self::Exponent(t) => t.direction,
            Self::ExponentWithLinear(t) => t.direction,
            Self::Log(t) => t.direction,
            Self::LogAffine(t) => t.direction,
            Self::Range(t) => t.direction,
            Self::Cdl(t) => t.direction,
            Self::Allocation(t) => t.direction,
            Self::FixedFunction(t) => t.direction,
            Self::GradingPrimary(t) => t.direction,
            Self::GradingRgbCurve(t) => t.direction,
            Self::ExposureContrast(t) => t.direction,
            Self::Lut1D(t) => t.direction,
            Self::Lut3D(t) => t.direction,
        }
    }

    /// Sets this node's direction.
    pub fn set_direction(&mut self, direction: Direction) {
        *self.direction_mut() = direction;
    }

    /// Returns this transform with its direction flipped.
    pub fn inverse(mut self) -> Self {
        let dir = self.direction_mut();
        *dir = dir.inverse();
        self
    }

    fn direction_mut(&mut self) -> &mut Direction {
        match self {
            Self::ColorSpace(t) => &mut t.direction,
            Self::DisplayView(t) => &mut t.direction,
            Self::Look(t) => &mut t.direction,
            Self::File(t) => &mut t.direction,
            Self::Group(t) => &mut t.direction,
            Self::Matrix(t) => &mut t.direction,
            Self::Exponent(t) => &mut t.direction,
            Self::ExponentWithLinear(t) => &mut t.direction,
            Self::Log(t) => &mut t.direction,
            Self::LogAffine(t) => &mut t.direction,
            Self::Range(t) => &mut t.direction,
            Self::Cdl(t) => &mut t.direction,
            Self::Allocation(t) => &mut t.direction,
            Self::FixedFunction(t) => &mut t.direction,
            Self::GradingPrimary(t) => &mut t.direction,
            Self::GradingRgbCurve(t) => &mut t.direction,
            Self::ExposureContrast(t) => &mut t.direction,
            Self::Lut1D(t) => &mut t.direction,
            Self::Lut3D(t) => &mut t.direction,
        }
    }
}

/// Conversion between two named color spaces (or roles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSpaceTransform {
    /// Source color-space or role name.
    pub src: String,
    /// Destination color-space or role name.
    pub dst: String,
    /// Direction.
    pub direction: Direction,
}

/// Conversion from a source space through a display/view pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayViewTransform {
    /// Source color-space or role name.
    pub src: String,
    /// Display name.
    pub display: String,
    /// View name within the display.
    pub view: String,
    /// Direction.
    pub direction: Direction,
}

/// Conversion applying a chain of looks between two spaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookTransform {
    /// Source color-space or role name.
    pub src: String,
    /// Destination color-space or role name.
    pub dst: String,
    /// Look token list: comma or colon separated, `+`/`-` prefixed.
    pub looks: String,
    /// Direction.
    pub direction: Direction,
}

/// Ops loaded from a LUT file through the reader registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTransform {
    /// Source path; may contain context variables.
    pub src: PathBuf,
    /// Correction ID for multi-grade container formats.
    pub ccc_id: Option<String>,
    /// Lookup interpolation handed to the reader.
    #[serde(with = "interp_serde", default = "default_interp")]
    pub interpolation: Interpolation,
    /// Direction.
    pub direction: Direction,
}

/// Ordered chain of transforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTransform {
    /// Members, applied first to last when forward.
    pub transforms: Vec<Transform>,
    /// Direction; inverse reverses and inverts the members.
    pub direction: Direction,
}

/// 4x4 matrix plus RGBA offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixTransform {
    /// Row-major coefficients.
    pub matrix: [f64; 16],
    /// Post-multiply offset.
    pub offset: [f64; 4],
    /// Direction.
    pub direction: Direction,
}

impl MatrixTransform {
    /// Row-major identity.
    pub const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
}

/// Negative-value policy for exponent transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NegativeStyle {
    /// Clamp negatives to zero before the power.
    #[default]
    Clamp,
    /// Mirror the curve through the origin.
    Mirror,
    /// Pass negatives through unchanged.
    PassThru,
}

/// Per-channel power.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentTransform {
    /// Exponent per channel [R, G, B, A].
    pub value: [f64; 4],
    /// Negative-value policy.
    pub negative_style: NegativeStyle,
    /// Direction.
    pub direction: Direction,
}

/// Power curve with a linear toe spliced in near black.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentWithLinearTransform {
    /// Exponent per channel [R, G, B, A].
    pub gamma: [f64; 4],
    /// Toe offset per channel [R, G, B, A].
    pub offset: [f64; 4],
    /// Direction.
    pub direction: Direction,
}

/// Pure logarithm of a given base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogTransform {
    /// Logarithm base; 2 and 10 are the common cases.
    pub base: f64,
    /// Direction.
    pub direction: Direction,
}

/// Per-channel affine log parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogAffineParams {
    /// Slope on the log side.
    pub log_side_slope: f64,
    /// Offset on the log side.
    pub log_side_offset: f64,
    /// Slope on the linear side.
    pub lin_side_slope: f64,
    /// Offset on the linear side.
    pub lin_side_offset: f64,
    /// Linear-domain break; present switches to the camera curve.
    pub lin_side_break: Option<f64>,
    /// Slope of the linear segment below the break.
    pub linear_slope: Option<f64>,
}

impl Default for LogAffineParams {
    fn default() -> Self {
        Self {
            log_side_slope: 1.0,
            log_side_offset: 0.0,
            lin_side_slope: 1.0,
            lin_side_offset: 0.0,
            lin_side_break: None,
            linear_slope: None,
        }
    }
}

/// Affine log transform: `log_base(lin*ls + lo) * s + o` per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogAffineTransform {
    /// Logarithm base.
    pub base: f64,
    /// Parameters per channel [R, G, B].
    pub params: [LogAffineParams; 3],
    /// Direction.
    pub direction: Direction,
}

/// Range remap; all-None bounds is the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeTransform {
    /// Input low bound.
    pub min_in: Option<f64>,
    /// Input high bound.
    pub max_in: Option<f64>,
    /// Output low bound.
    pub min_out: Option<f64>,
    /// Output high bound.
    pub max_out: Option<f64>,
    /// Direction.
    pub direction: Direction,
}

/// ASC CDL grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdlTransform {
    /// Slope per channel [R, G, B].
    pub slope: [f64; 3],
    /// Offset per channel [R, G, B].
    pub offset: [f64; 3],
    /// Power per channel [R, G, B].
    pub power: [f64; 3],
    /// Saturation, 1.0 = unchanged.
    pub saturation: f64,
    /// Direction.
    pub direction: Direction,
}

impl Default for CdlTransform {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            direction: Direction::Forward,
        }
    }
}

/// Allocation encoding of a color space's dynamic range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Allocation {
    /// Linear span between the vars.
    #[default]
    Uniform,
    /// Base-2 log span between the vars, with an optional offset.
    Lg2,
}

/// Allocation shaper: maps the declared span onto [0, 1].
///
/// `vars` is `[min, max]` for uniform, `[min, max]` or
/// `[min, max, offset]` for lg2 (min/max in log2 units).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTransform {
    /// Allocation kind.
    pub allocation: Allocation,
    /// Span variables.
    pub vars: Vec<f64>,
    /// Direction.
    pub direction: Direction,
}

/// Fixed-function kernel selector.
///
/// Parameterized styles take their numbers from the transform's `params`
/// list; the compiler checks the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedFunctionStyle {
    /// ACES 0.3/0.7 red modifier.
    AcesRedMod03,
    /// ACES 1.0 red modifier.
    AcesRedMod10,
    /// ACES 0.3/0.7 glow.
    AcesGlow03,
    /// ACES 1.0 glow.
    AcesGlow10,
    /// ACES 1.0 dark-to-dim surround correction.
    AcesDarkToDim10,
    /// ACES 1.3 gamut compression; 7 params (limits, thresholds, power).
    AcesGamutComp13,
    /// Rec.2100 surround correction; 1 param (gamma).
    Rec2100Surround,
    /// RGB to HSV.
    RgbToHsv,
    /// CIE XYZ to xyY.
    XyzToXyy,
    /// CIE XYZ to u'v'Y.
    XyzToUvy,
    /// CIE XYZ to L*u*v*.
    XyzToLuv,
    /// Linear to ST 2084 PQ.
    LinToPq,
    /// Linear to a double-log curve; 13 params.
    LinToDoubleLog,
}

/// Named fixed-function kernel with optional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedFunctionTransform {
    /// Kernel selector.
    pub style: FixedFunctionStyle,
    /// Style-specific parameters; empty for the parameterless styles.
    pub params: Vec<f64>,
    /// Direction.
    pub direction: Direction,
}

/// Grade encoding for the grading transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradeStyle {
    /// Log-encoded working values.
    #[default]
    Log,
    /// Scene-linear working values.
    Linear,
    /// Display-referred video values.
    Video,
}

/// RGB triple plus a master applied to all three.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgbm {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Master.
    pub master: f64,
}

impl Rgbm {
    /// All components zero.
    pub fn zero() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, master: 0.0 }
    }

    /// All components one.
    pub fn one() -> Self {
        Self { r: 1.0, g: 1.0, b: 1.0, master: 1.0 }
    }
}

/// Primary grade transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingPrimaryTransform {
    /// Grade encoding.
    pub style: GradeStyle,
    /// Additive brightness (log).
    pub brightness: Rgbm,
    /// Multiplicative contrast around the pivot.
    pub contrast: Rgbm,
    /// Power between the black and white pivots.
    pub gamma: Rgbm,
    /// Additive offset (linear, video).
    pub offset: Rgbm,
    /// Exposure in stops (linear).
    pub exposure: Rgbm,
    /// Shadow lift (video).
    pub lift: Rgbm,
    /// Highlight gain (video).
    pub gain: Rgbm,
    /// Saturation, 1.0 = unchanged.
    pub saturation: f64,
    /// Contrast pivot.
    pub pivot: f64,
    /// Lower gamma pivot.
    pub pivot_black: f64,
    /// Upper gamma pivot.
    pub pivot_white: f64,
    /// Final clamp floor; None = unclamped.
    pub clamp_black: Option<f64>,
    /// Final clamp ceiling; None = unclamped.
    pub clamp_white: Option<f64>,
    /// Expose the grade through a dynamic handle.
    pub dynamic: bool,
    /// Direction.
    pub direction: Direction,
}

impl GradingPrimaryTransform {
    /// Identity grade for a style, with the style's customary pivot.
    pub fn identity(style: GradeStyle) -> Self {
        let pivot = match style {
            GradeStyle::Log => -0.2,
            GradeStyle::Linear | GradeStyle::Video => 0.18,
        };
        Self {
            style,
            brightness: Rgbm::zero(),
            contrast: Rgbm::one(),
            gamma: Rgbm::one(),
            offset: Rgbm::zero(),
            exposure: Rgbm::zero(),
            lift: Rgbm::zero(),
            gain: Rgbm::one(),
            saturation: 1.0,
            pivot,
            pivot_black: 0.0,
            pivot_white: 1.0,
            clamp_black: None,
            clamp_white: None,
            dynamic: false,
            direction: Direction::Forward,
        }
    }
}

/// Per-channel B-spline curve grade.
///
/// Each channel is a list of `(x, y)` control points with strictly
/// increasing x; two points `(0,0) (1,1)` is the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingRgbCurveTransform {
    /// Grade encoding; `Linear` wraps the curves in a lin-to-log shaper.
    pub style: GradeStyle,
    /// Red control points.
    pub red: Vec<[f64; 2]>,
    /// Green control points.
    pub green: Vec<[f64; 2]>,
    /// Blue control points.
    pub blue: Vec<[f64; 2]>,
    /// Master control points, applied after (forward) the channels.
    pub master: Vec<[f64; 2]>,
    /// Expose the curves through a dynamic handle.
    pub dynamic: bool,
    /// Direction.
    pub direction: Direction,
}

impl Default for GradingRgbCurveTransform {
    fn default() -> Self {
        let identity = vec![[0.0, 0.0], [1.0, 1.0]];
        Self {
            style: GradeStyle::Log,
            red: identity.clone(),
            green: identity.clone(),
            blue: identity.clone(),
            master: identity,
            dynamic: false,
            direction: Direction::Forward,
        }
    }
}

/// Exposure/contrast style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExposureContrastStyle {
    /// Scene-linear values.
    #[default]
    Linear,
    /// Video-encoded values.
    Video,
    /// Log-encoded values.
    Logarithmic,
}

/// Exposure/contrast/gamma transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureContrastTransform {
    /// Value encoding.
    pub style: ExposureContrastStyle,
    /// Exposure in stops.
    pub exposure: f64,
    /// Contrast, 1.0 = unchanged.
    pub contrast: f64,
    /// Gamma, 1.0 = unchanged.
    pub gamma: f64,
    /// Contrast pivot.
    pub pivot: f64,
    /// Expose exposure through a dynamic handle.
    pub dynamic_exposure: bool,
    /// Expose contrast through a dynamic handle.
    pub dynamic_contrast: bool,
    /// Expose gamma through a dynamic handle.
    pub dynamic_gamma: bool,
    /// Direction.
    pub direction: Direction,
}

impl ExposureContrastTransform {
    /// Neutral adjustment of a style, 0.18 pivot.
    pub fn neutral(style: ExposureContrastStyle) -> Self {
        Self {
            style,
            exposure: 0.0,
            contrast: 1.0,
            gamma: 1.0,
            pivot: 0.18,
            dynamic_exposure: false,
            dynamic_contrast: false,
            dynamic_gamma: false,
            direction: Direction::Forward,
        }
    }
}

/// Inline 1D LUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lut1DTransform {
    /// Red (or mono) channel table.
    pub r: Vec<f32>,
    /// Green channel table; None reuses red.
    pub g: Option<Vec<f32>>,
    /// Blue channel table; None reuses red.
    pub b: Option<Vec<f32>>,
    /// Input domain low edge.
    pub domain_min: f32,
    /// Input domain high edge.
    pub domain_max: f32,
    /// Lookup interpolation.
    #[serde(with = "interp_serde", default = "default_interp")]
    pub interpolation: Interpolation,
    /// Direction.
    pub direction: Direction,
}

/// Inline 3D LUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lut3DTransform {
    /// Grid side length.
    pub size: usize,
    /// RGB triples, red-major with blue varying fastest.
    pub data: Vec<[f32; 3]>,
    /// Lookup interpolation.
    #[serde(with = "interp_serde", default = "default_interp")]
    pub interpolation: Interpolation,
    /// Direction.
    pub direction: Direction,
}
