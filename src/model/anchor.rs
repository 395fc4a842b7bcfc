// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/anchor.rs - 锚框宽高比先验
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use crate::model::ConfigError;

/// TinyYoloV2 的默认锚框 (width_ratio, height_ratio)
pub const DEFAULT_ANCHORS: [(f32, f32); 5] = [
  (1.08, 1.19),
  (3.42, 4.41),
  (6.63, 11.38),
  (9.42, 5.11),
  (16.62, 10.52),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
  pub width_ratio: f32,
  pub height_ratio: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTable {
  anchors: Box<[Anchor]>,
}

impl Default for AnchorTable {
  fn default() -> Self {
    Self::from(&DEFAULT_ANCHORS[..])
  }
}

impl From<&[(f32, f32)]> for AnchorTable {
  fn from(pairs: &[(f32, f32)]) -> Self {
    let anchors = pairs
      .iter()
      .map(|&(width_ratio, height_ratio)| Anchor {
        width_ratio,
        height_ratio,
      })
      .collect();
    Self { anchors }
  }
}

impl AnchorTable {
  /// 由嵌套列表构造，每一项必须恰好是 (width, height) 两个值
  pub fn from_pairs(pairs: &[Vec<f32>]) -> Result<Self, ConfigError> {
    let mut anchors = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
      match pair.as_slice() {
        &[width_ratio, height_ratio] => anchors.push(Anchor {
          width_ratio,
          height_ratio,
        }),
        other => {
          return Err(ConfigError::AnchorPairWidth {
            index,
            len: other.len(),
          });
        }
      }
    }
    Ok(Self {
      anchors: anchors.into_boxed_slice(),
    })
  }

  /// 由展平的 `w0, h0, w1, h1, ...` 列表构造
  pub fn from_flat(values: &[f32]) -> Result<Self, ConfigError> {
    if values.len() % 2 != 0 {
      return Err(ConfigError::OddAnchorList(values.len()));
    }
    let pairs: Vec<(f32, f32)> = values.chunks_exact(2).map(|c| (c[0], c[1])).collect();
    Ok(Self::from(pairs.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.anchors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.anchors.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Anchor> {
    self.anchors.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
    self.anchors.iter()
  }

  pub fn validate(&self, boxes_per_cell: usize) -> Result<(), ConfigError> {
    if self.anchors.len() != boxes_per_cell {
      return Err(ConfigError::AnchorCountMismatch {
        expected: boxes_per_cell,
        actual: self.anchors.len(),
      });
    }
    for (index, anchor) in self.anchors.iter().enumerate() {
      if !(anchor.width_ratio.is_finite() && anchor.width_ratio > 0.0)
        || !(anchor.height_ratio.is_finite() && anchor.height_ratio > 0.0)
      {
        return Err(ConfigError::InvalidValue {
          key: "anchors".to_string(),
          value: format!(
            "#{}: ({}, {})",
            index, anchor.width_ratio, anchor.height_ratio
          ),
        });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_matches_five_boxes() {
    let table = AnchorTable::default();
    assert_eq!(table.len(), 5);
    assert!(table.validate(5).is_ok());
    assert_eq!(table.get(2).map(|a| a.height_ratio), Some(11.38));
  }

  #[test]
  fn count_mismatch_is_error() {
    let table = AnchorTable::default();
    assert!(matches!(
      table.validate(3),
      Err(ConfigError::AnchorCountMismatch {
        expected: 3,
        actual: 5
      })
    ));
  }

  #[test]
  fn pair_width_is_checked() {
    let pairs = vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]];
    assert!(matches!(
      AnchorTable::from_pairs(&pairs),
      Err(ConfigError::AnchorPairWidth { index: 1, len: 3 })
    ));
  }

  #[test]
  fn flat_list_pairs_up() {
    let table = AnchorTable::from_flat(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
      table.get(1),
      Some(&Anchor {
        width_ratio: 3.0,
        height_ratio: 4.0
      })
    );
    assert!(matches!(
      AnchorTable::from_flat(&[1.0, 2.0, 3.0]),
      Err(ConfigError::OddAnchorList(3))
    ));
  }

  #[test]
  fn non_positive_ratio_is_error() {
    let table = AnchorTable::from(&[(1.0, 0.0)][..]);
    assert!(matches!(
      table.validate(1),
      Err(ConfigError::InvalidValue { .. })
    ));
  }
}
