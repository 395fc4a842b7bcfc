// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/palette.rs - 类别显示颜色
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

const FALLBACK_COLOR: [u8; 3] = [255, 0, 0]; // 红色

const DEFAULT_COLORS: [[u8; 3]; 20] = [
  [240, 230, 140], // khaki
  [255, 0, 255],   // fuchsia
  [192, 192, 192], // silver
  [65, 105, 225],  // royal blue
  [0, 128, 0],     // green
  [255, 140, 0],   // dark orange
  [128, 0, 128],   // purple
  [255, 215, 0],   // gold
  [255, 0, 0],     // red
  [127, 255, 212], // aquamarine
  [0, 255, 0],     // lime
  [240, 248, 255], // alice blue
  [160, 82, 45],   // sienna
  [218, 112, 214], // orchid
  [210, 180, 140], // tan
  [255, 182, 193], // light pink
  [255, 255, 0],   // yellow
  [255, 105, 180], // hot pink
  [107, 142, 35],  // olive drab
  [244, 164, 96],  // sandy brown
];

/// 按类别下标轮换的显示颜色表，仅用于展示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
  colors: Box<[[u8; 3]]>,
}

impl Default for ColorTable {
  fn default() -> Self {
    Self::from(DEFAULT_COLORS.to_vec())
  }
}

impl From<Vec<[u8; 3]>> for ColorTable {
  fn from(colors: Vec<[u8; 3]>) -> Self {
    Self {
      colors: colors.into_boxed_slice(),
    }
  }
}

impl ColorTable {
  pub fn color_for(&self, class_index: usize) -> [u8; 3] {
    if self.colors.is_empty() {
      return FALLBACK_COLOR;
    }
    self.colors[class_index % self.colors.len()]
  }
}
