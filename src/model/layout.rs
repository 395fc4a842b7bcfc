// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/layout.rs - 网格输出张量布局
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

/// 每个候选框固定的特征数量: x, y, width, height, confidence
pub const BOX_FEATURE_COUNT: usize = 5;

// TinyYoloV2 的默认布局
pub const DEFAULT_ROW_COUNT: usize = 13;
pub const DEFAULT_COLUMN_COUNT: usize = 13;
pub const DEFAULT_CLASS_COUNT: usize = 20;
pub const DEFAULT_BOXES_PER_CELL: usize = 5;
pub const DEFAULT_CELL_WIDTH: u32 = 32;
pub const DEFAULT_CELL_HEIGHT: u32 = 32;

/// 候选框内的特征通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
  X,
  Y,
  Width,
  Height,
  Confidence,
  Class(usize),
}

impl Feature {
  pub fn index(self) -> usize {
    match self {
      Feature::X => 0,
      Feature::Y => 1,
      Feature::Width => 2,
      Feature::Height => 3,
      Feature::Confidence => 4,
      Feature::Class(c) => BOX_FEATURE_COUNT + c,
    }
  }
}

/// 模型输出张量的布局描述
///
/// 张量按通道优先、网格行优先的顺序展平：
/// 每个锚框占 `5 + class_count` 个通道，每个通道包含全部 `row_count * column_count` 个网格的值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
  pub row_count: usize,
  pub column_count: usize,
  pub class_count: usize,
  pub boxes_per_cell: usize,
  pub cell_width: u32,
  pub cell_height: u32,
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      row_count: DEFAULT_ROW_COUNT,
      column_count: DEFAULT_COLUMN_COUNT,
      class_count: DEFAULT_CLASS_COUNT,
      boxes_per_cell: DEFAULT_BOXES_PER_CELL,
      cell_width: DEFAULT_CELL_WIDTH,
      cell_height: DEFAULT_CELL_HEIGHT,
    }
  }
}

impl LayoutConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    let fields = [
      ("row_count", self.row_count),
      ("column_count", self.column_count),
      ("class_count", self.class_count),
      ("boxes_per_cell", self.boxes_per_cell),
      ("cell_width", self.cell_width as usize),
      ("cell_height", self.cell_height as usize),
    ];
    for (name, value) in fields {
      if value == 0 {
        return Err(ConfigError::ZeroDimension(name));
      }
    }

    // 张量长度必须能用 usize 表示，之后的下标计算都不会再溢出
    let len = self
      .class_count
      .checked_add(BOX_FEATURE_COUNT)
      .and_then(|v| v.checked_mul(self.boxes_per_cell))
      .and_then(|v| v.checked_mul(self.row_count))
      .and_then(|v| v.checked_mul(self.column_count));
    if len.is_none() {
      return Err(ConfigError::InvalidValue {
        key: "layout".to_string(),
        value: format!(
          "{} x {} 网格, {} 个锚框, {} 个类别的张量长度溢出",
          self.row_count, self.column_count, self.boxes_per_cell, self.class_count
        ),
      });
    }
    Ok(())
  }

  pub fn cells_per_channel(&self) -> usize {
    self.row_count * self.column_count
  }

  pub fn values_per_anchor(&self) -> usize {
    BOX_FEATURE_COUNT + self.class_count
  }

  /// 单张图像输出张量的期望长度
  pub fn tensor_len(&self) -> usize {
    self.boxes_per_cell * self.values_per_anchor() * self.cells_per_channel()
  }

  /// 计算 (row, col, anchor, feature) 在展平张量中的下标
  ///
  /// 越界的参数属于调用方的编程错误，直接 panic。
  pub fn offset(&self, row: usize, col: usize, anchor: usize, feature: Feature) -> usize {
    assert!(row < self.row_count, "行下标越界: {} >= {}", row, self.row_count);
    assert!(
      col < self.column_count,
      "列下标越界: {} >= {}",
      col,
      self.column_count
    );
    assert!(
      anchor < self.boxes_per_cell,
      "锚框下标越界: {} >= {}",
      anchor,
      self.boxes_per_cell
    );
    if let Feature::Class(c) = feature {
      assert!(c < self.class_count, "类别下标越界: {} >= {}", c, self.class_count);
    }

    let channel_base = anchor * self.values_per_anchor();
    let cell_position = row * self.column_count + col;
    (channel_base + feature.index()) * self.cells_per_channel() + cell_position
  }
}
