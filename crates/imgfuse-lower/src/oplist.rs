//! Op-list ingestion: `serde`-derived structs mirroring the
//! closed JSON schema, grounded in the original `readOpList` reader
//! (which validated the same closed `type` set against a linked C++ JSON
//! library). Parsing now happens in-crate with `serde_json` instead.

use serde::{Deserialize, Serialize};

use crate::error::LowerError;

/// Output pixel format, selected from the first `cvtColor*` op encountered
/// (default `Bgr` if the pipeline never converts color).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Bgr,
    Rgb,
    Gray,
    Bgra,
    Nv12,
    Nv21,
}

impl Format {
    pub fn channels(self) -> usize {
        match self {
            Format::Gray => 1,
            Format::Bgr | Format::Rgb => 3,
            Format::Bgra => 4,
            Format::Nv12 | Format::Nv21 => 3,
        }
    }

    /// NV12/NV21 always take the floating bilinear path.
    pub fn forces_float_bilinear(self) -> bool {
        matches!(self, Format::Nv12 | Format::Nv21)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResizeArgs {
    pub interpolation: Interpolation,
    pub shape: [u32; 2],
    #[serde(default = "default_true")]
    pub dynamic: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CropArgs {
    pub shape: [u32; 2],
    pub tlbr: Option<[i32; 4]>,
    #[serde(default = "default_true")]
    pub dynamic: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NormArgs {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PadArgs {
    pub paddings: [i32; 4],
    pub shape: [u32; 2],
    pub pad_val: f32,
    #[serde(default = "default_true")]
    pub dynamic: bool,
}

fn default_true() -> bool {
    true
}

/// One element of the op-list JSON array. `#[serde(tag = "type")]` enforces
/// the closed type set at deserialization time; any other `type` value is a
/// `serde_json` error, surfaced as [`LowerError::MalformedOpList`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum OpSpec {
    #[serde(rename = "cvtColorBGR")]
    CvtColorBgr,
    #[serde(rename = "cvtColorRGB")]
    CvtColorRgb,
    #[serde(rename = "cvtColorGray")]
    CvtColorGray,
    #[serde(rename = "Resize")]
    Resize(ResizeArgs),
    #[serde(rename = "CenterCrop")]
    CenterCrop(CropArgs),
    #[serde(rename = "Normalize")]
    Normalize(NormArgs),
    #[serde(rename = "Pad")]
    Pad(PadArgs),
    #[serde(rename = "CastFloat")]
    CastFloat,
    #[serde(rename = "HWC2CHW")]
    Hwc2Chw,
}

/// Parses an op-list JSON document into an ordered list of [`OpSpec`]
/// values. An empty array, an unparseable document, or an unrecognized
/// `type` are all [`LowerError::MalformedOpList`] (mirroring the original
/// reader's `ELENA_ABORT` on the same conditions).
pub fn parse_op_list(json: &str) -> Result<Vec<OpSpec>, LowerError> {
    let ops: Vec<OpSpec> = serde_json::from_str(json).map_err(|e| LowerError::MalformedOpList {
        reason: e.to_string(),
    })?;
    if ops.is_empty() {
        return Err(LowerError::MalformedOpList {
            reason: "op list is empty".to_string(),
        });
    }
    Ok(ops)
}

/// Color format implied by `op`, if any. Used by the pipeline assembler to
/// pick `Format` from the first `cvtColor*` op.
pub fn format_of(op: &OpSpec) -> Option<Format> {
    match op {
        OpSpec::CvtColorBgr => Some(Format::Bgr),
        OpSpec::CvtColorRgb => Some(Format::Rgb),
        OpSpec::CvtColorGray => Some(Format::Gray),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closed_type_set() {
        let json = r#"[
            {"type": "cvtColorBGR"},
            {"type": "Resize", "interpolation": "bilinear", "shape": [224, 224], "dynamic": false},
            {"type": "CastFloat"}
        ]"#;
        let ops = parse_op_list(json).unwrap();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], OpSpec::CvtColorBgr));
    }

    #[test]
    fn rejects_unknown_type() {
        let json = r#"[{"type": "Sharpen"}]"#;
        let err = parse_op_list(json).unwrap_err();
        assert!(matches!(err, LowerError::MalformedOpList { .. }));
    }

    #[test]
    fn rejects_empty_list() {
        let err = parse_op_list("[]").unwrap_err();
        assert!(matches!(err, LowerError::MalformedOpList { .. }));
    }

    #[test]
    fn format_of_picks_first_cvtcolor() {
        assert_eq!(format_of(&OpSpec::CvtColorRgb), Some(Format::Rgb));
        assert_eq!(format_of(&OpSpec::CastFloat), None);
    }

    #[test]
    fn nv12_forces_float_bilinear() {
        assert!(Format::Nv12.forces_float_bilinear());
        assert!(!Format::Bgr.forces_float_bilinear());
    }
}
