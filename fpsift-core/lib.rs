//! Shared data model for fingerprint SIFT templates.
//!
//! A [`Template`] is what extraction produces and what comparison consumes:
//! detected [`Keypoint`]s paired row-by-row with a [`DescriptorMatrix`].
//! Shape invariants are checked when a template is built or deserialized so
//! the numeric stages never see ragged or mismatched data.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Descriptor length produced by the standard 4x4x8 SIFT configuration.
pub const DESCRIPTOR_SIZE: usize = 128;

/// Angle value used when a keypoint carries no orientation.
pub const UNDEFINED_ANGLE: f32 = -1.0;

/// Class id of a keypoint that belongs to no group.
pub const UNUSED_CLASS_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("descriptor row {row} has {actual} values, expected {expected}")]
    RaggedDescriptors {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("descriptor row {row} is empty")]
    EmptyDescriptor { row: usize },
    #[error("descriptor row {row} contains a non-finite value")]
    NonFiniteDescriptor { row: usize },
    #[error("template has {keypoints} keypoints but {descriptors} descriptors")]
    LengthMismatch { keypoints: usize, descriptors: usize },
    #[error("malformed template: {0}")]
    Parse(String),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Detected feature location with scale, orientation and detector metadata.
///
/// `octave` keeps the detector's packed encoding: the low byte is the octave
/// index (two's complement, so the upsampled base octave reads as 255), the
/// second byte the layer inside the octave and the upper bits the
/// interpolated sub-layer offset scaled to 0..=255.
///
/// Fields missing from serialized input take their [`Default`] values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Keypoint {
    pub pt: [f32; 2],
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
    pub class_id: i32,
}

impl Default for Keypoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            pt: [x, y],
            size,
            angle: UNDEFINED_ANGLE,
            response: 0.0,
            octave: 0,
            class_id: UNUSED_CLASS_ID,
        }
    }

    pub fn x(&self) -> f32 {
        self.pt[0]
    }

    pub fn y(&self) -> f32 {
        self.pt[1]
    }

    pub fn has_orientation(&self) -> bool {
        self.angle >= 0.0
    }

    /// Decode the packed octave into `(octave, layer, scale)` where `scale`
    /// maps image coordinates onto the octave's own resolution.
    pub fn unpack_octave(&self) -> (i32, usize, f32) {
        let raw = self.octave & 255;
        let octave = if raw < 128 { raw } else { raw - 256 };
        let layer = ((self.octave >> 8) & 255) as usize;
        let scale = if octave >= 0 {
            1.0 / (1u32 << octave) as f32
        } else {
            (1u32 << (-octave)) as f32
        };
        (octave, layer, scale)
    }
}

/// Row-major `rows x cols` matrix of f32 descriptors.
///
/// An empty matrix has zero columns; every non-empty matrix has at least one
/// column and all rows share the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorMatrix {
    cols: usize,
    data: Vec<f32>,
}

impl DescriptorMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from flat row-major data. `data.len()` must be a multiple of `cols`.
    pub fn from_flat(cols: usize, data: Vec<f32>) -> TemplateResult<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }
        if cols == 0 {
            return Err(TemplateError::EmptyDescriptor { row: 0 });
        }
        if data.len() % cols != 0 {
            let rows = data.len() / cols;
            return Err(TemplateError::RaggedDescriptors {
                row: rows,
                expected: cols,
                actual: data.len() % cols,
            });
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(TemplateError::NonFiniteDescriptor { row: pos / cols });
        }
        Ok(Self { cols, data })
    }

    /// Build from individual rows, rejecting ragged or empty rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> TemplateResult<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self::empty());
        };
        let cols = first.as_ref().len();
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.is_empty() {
                return Err(TemplateError::EmptyDescriptor { row });
            }
            if values.len() != cols {
                return Err(TemplateError::RaggedDescriptors {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(TemplateError::NonFiniteDescriptor { row });
            }
            data.extend_from_slice(values);
        }
        Ok(Self { cols, data })
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.data.len() / self.cols
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Descriptor dimensionality, or 0 when empty.
    pub fn dim(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.cols.max(1))
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

#[cfg(feature = "serde")]
impl Serialize for DescriptorMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for DescriptorMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<f32>>::deserialize(deserializer)?;
        DescriptorMatrix::from_rows(&rows).map_err(serde::de::Error::custom)
    }
}

/// Keypoints and their descriptors extracted from one image.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TemplatePayload"))]
pub struct Template {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
}

impl Template {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: DescriptorMatrix) -> TemplateResult<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(TemplateError::LengthMismatch {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }

    pub fn num_features(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, DescriptorMatrix) {
        (self.keypoints, self.descriptors)
    }

    /// Parse a template out of an arbitrary JSON value, reporting every shape
    /// problem as a [`TemplateError`].
    #[cfg(feature = "serde")]
    pub fn from_json_value(value: serde_json::Value) -> TemplateResult<Self> {
        let payload: TemplatePayload =
            serde_json::from_value(value).map_err(|e| TemplateError::Parse(e.to_string()))?;
        Self::try_from(payload)
    }
}

/// Loosely-typed wire form of a template, validated into [`Template`].
///
/// Only `descriptors` is required. Without `keypoints`, each descriptor gets
/// a default keypoint, since comparison reads descriptors alone.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct TemplatePayload {
    #[cfg_attr(feature = "serde", serde(default))]
    pub keypoints: Option<Vec<Keypoint>>,
    pub descriptors: Vec<Vec<f32>>,
}

impl TryFrom<TemplatePayload> for Template {
    type Error = TemplateError;

    fn try_from(payload: TemplatePayload) -> TemplateResult<Self> {
        let descriptors = DescriptorMatrix::from_rows(&payload.descriptors)?;
        let keypoints = payload
            .keypoints
            .unwrap_or_else(|| vec![Keypoint::default(); descriptors.len()]);
        Template::new(keypoints, descriptors)
    }
}

/// Candidate correspondence between a query descriptor and a train descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Euclidean distance; lower is more similar.
    pub distance: f32,
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .build_global()
}

/// Default worker count for the global pool.
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}
