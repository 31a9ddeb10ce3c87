use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LieError;

/// Tag identifying the Lie group or Lie algebra a tensor encodes.
///
/// Group tags have a closed-form conversion from matrices. Algebra tags describe tangent
/// space vectors and are only carried around as labels.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LieType {
    /// 3D rotation `[qx, qy, qz, qw]`.
    #[serde(rename = "SO3")]
    SO3,
    /// 3D rigid transform `[tx, ty, tz, qx, qy, qz, qw]`.
    #[serde(rename = "SE3")]
    SE3,
    /// 3D similarity transform `[tx, ty, tz, qx, qy, qz, qw, s]`.
    #[serde(rename = "Sim3")]
    Sim3,
    /// 3D scaled rotation `[qx, qy, qz, qw, s]`.
    #[serde(rename = "RxSO3")]
    RxSO3,
    /// Tangent space of SO3, axis-angle vector.
    #[serde(rename = "so3")]
    SO3Algebra,
    /// Tangent space of SE3.
    #[serde(rename = "se3")]
    SE3Algebra,
    /// Tangent space of Sim3.
    #[serde(rename = "sim3")]
    Sim3Algebra,
    /// Tangent space of RxSO3.
    #[serde(rename = "rxso3")]
    RxSO3Algebra,
}

impl LieType {
    /// Length of the trailing dimension of a tensor of this type.
    pub fn dimension(&self) -> usize {
        match self {
            LieType::SO3 => 4,
            LieType::SE3 => 7,
            LieType::Sim3 => 8,
            LieType::RxSO3 => 5,
            LieType::SO3Algebra => 3,
            LieType::SE3Algebra => 6,
            LieType::Sim3Algebra => 7,
            LieType::RxSO3Algebra => 4,
        }
    }

    /// Whether the tag names a group (as opposed to its algebra).
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            LieType::SO3 | LieType::SE3 | LieType::Sim3 | LieType::RxSO3
        )
    }

    /// Canonical name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            LieType::SO3 => "SO3",
            LieType::SE3 => "SE3",
            LieType::Sim3 => "Sim3",
            LieType::RxSO3 => "RxSO3",
            LieType::SO3Algebra => "so3",
            LieType::SE3Algebra => "se3",
            LieType::Sim3Algebra => "sim3",
            LieType::RxSO3Algebra => "rxso3",
        }
    }
}

impl fmt::Display for LieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LieType {
    type Err = LieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SO3" => Ok(LieType::SO3),
            "SE3" => Ok(LieType::SE3),
            "Sim3" => Ok(LieType::Sim3),
            "RxSO3" => Ok(LieType::RxSO3),
            "so3" => Ok(LieType::SO3Algebra),
            "se3" => Ok(LieType::SE3Algebra),
            "sim3" => Ok(LieType::Sim3Algebra),
            "rxso3" => Ok(LieType::RxSO3Algebra),
            other => Err(LieError::UnsupportedVariant(other.to_string())),
        }
    }
}
