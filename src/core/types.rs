use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Dynamic,
    Boolean,
    F16,
    F32,
    F64,
    I8,
    I32,
    I64,
    U8,
    U32,
}

impl ElementType {
    pub fn is_static(&self) -> bool {
        !matches!(self, ElementType::Dynamic)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Dynamic => "dynamic",
            ElementType::Boolean => "boolean",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::I8 => "i8",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U32 => "u32",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single dimension. Serialized as an integer, `-1` meaning unknown.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(from = "i64", into = "i64")]
pub enum Dim {
    Static(usize),
    Dynamic,
}

impl Dim {
    pub fn is_static(&self) -> bool {
        matches!(self, Dim::Static(_))
    }
}

impl From<i64> for Dim {
    fn from(value: i64) -> Self {
        if value < 0 {
            Dim::Dynamic
        } else {
            Dim::Static(value as usize)
        }
    }
}

impl From<Dim> for i64 {
    fn from(dim: Dim) -> Self {
        match dim {
            Dim::Static(v) => v as i64,
            Dim::Dynamic => -1,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Static(v) => write!(f, "{}", v),
            Dim::Dynamic => f.write_str("?"),
        }
    }
}

/// Shape whose rank may itself be unknown (`null` in JSON).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
#[serde(from = "Option<Vec<Dim>>", into = "Option<Vec<Dim>>")]
pub struct PartialShape {
    dims: Option<Vec<Dim>>,
}

impl PartialShape {
    pub fn dynamic() -> Self {
        Self { dims: None }
    }

    pub fn new(dims: Vec<Dim>) -> Self {
        Self { dims: Some(dims) }
    }

    pub fn from_static(dims: &[usize]) -> Self {
        Self::new(dims.iter().map(|&d| Dim::Static(d)).collect())
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.len())
    }

    pub fn is_rank_static(&self) -> bool {
        self.rank().is_some()
    }

    pub fn is_static(&self) -> bool {
        self.dims
            .as_ref()
            .is_some_and(|dims| dims.iter().all(Dim::is_static))
    }
}

impl From<Option<Vec<Dim>>> for PartialShape {
    fn from(dims: Option<Vec<Dim>>) -> Self {
        Self { dims }
    }
}

impl From<PartialShape> for Option<Vec<Dim>> {
    fn from(shape: PartialShape) -> Self {
        shape.dims
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => f.write_str("[...]"),
            Some(dims) => {
                let dims = dims.iter().map(|d| d.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", dims.join(","))
            }
        }
    }
}

/// Frozen tensor value of an input place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConstantValue {
    pub element_type: ElementType,
    #[serde(default)]
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ConstantValue {
    pub fn scalar(element_type: ElementType, value: f64) -> Self {
        Self { element_type, shape: vec![], values: vec![value] }
    }

    pub fn shape(&self) -> PartialShape {
        PartialShape::from_static(&self.shape)
    }
}
