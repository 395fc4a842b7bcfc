// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/geometry.rs - 边界框几何映射与 IoU
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

use serde::Serialize;

use crate::model::{anchor::Anchor, layout::LayoutConfig, math::sigmoid};

/// 像素坐标下的矩形，(x, y) 为左上角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl Rect {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn area(&self) -> i64 {
    self.width as i64 * self.height as i64
  }

  pub fn right(&self) -> i64 {
    self.x as i64 + self.width as i64
  }

  pub fn bottom(&self) -> i64 {
    self.y as i64 + self.height as i64
  }

  /// 交并比；任一矩形面积非正或不相交时为 0
  pub fn iou(&self, other: &Rect) -> f32 {
    let area_a = self.area();
    let area_b = other.area();
    if area_a <= 0 || area_b <= 0 {
      return 0.0;
    }

    let min_x = (self.x as i64).max(other.x as i64);
    let min_y = (self.y as i64).max(other.y as i64);
    let max_x = self.right().min(other.right());
    let max_y = self.bottom().min(other.bottom());

    let intersection = (max_x - min_x).max(0) * (max_y - min_y).max(0);
    let union = area_a + area_b - intersection;

    (intersection as f64 / union as f64) as f32
  }
}

/// 单个 (网格, 锚框) 的原始几何 logit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxLogits {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

/// 几何映射中出现的非有限值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonFiniteGeometry {
  pub center_x: f32,
  pub center_y: f32,
  pub width: f32,
  pub height: f32,
}

/// 把网格内的 logit 映射到图像像素坐标
///
/// 行号对应 x、列号对应 y，与参考模型的约定保持一致；
/// 仅在 `row_count == column_count` 时与转置约定等价。
pub fn map_box(
  logits: &BoxLogits,
  row: usize,
  col: usize,
  anchor: &Anchor,
  layout: &LayoutConfig,
) -> Result<Rect, NonFiniteGeometry> {
  let cell_width = layout.cell_width as f32;
  let cell_height = layout.cell_height as f32;

  let center_x = (row as f32 + sigmoid(logits.x)) * cell_width;
  let center_y = (col as f32 + sigmoid(logits.y)) * cell_height;
  let width = logits.width.exp() * cell_width * anchor.width_ratio;
  let height = logits.height.exp() * cell_height * anchor.height_ratio;

  let top_left_x = center_x - width / 2.0;
  let top_left_y = center_y - height / 2.0;

  let values = [top_left_x, top_left_y, width, height];
  if values
    .iter()
    // i32::MAX as f32 == 2^31，本身已无法表示
    .any(|v| !v.is_finite() || v.abs() >= i32::MAX as f32)
  {
    return Err(NonFiniteGeometry {
      center_x,
      center_y,
      width,
      height,
    });
  }

  Ok(Rect::new(
    top_left_x.round_ties_even() as i32,
    top_left_y.round_ties_even() as i32,
    width.round_ties_even() as i32,
    height.round_ties_even() as i32,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn anchor(w: f32, h: f32) -> Anchor {
    Anchor {
      width_ratio: w,
      height_ratio: h,
    }
  }

  #[test]
  fn zero_logits_center_in_cell() {
    let layout = LayoutConfig {
      row_count: 1,
      column_count: 1,
      class_count: 2,
      boxes_per_cell: 1,
      cell_width: 32,
      cell_height: 32,
    };
    let logits = BoxLogits {
      x: 0.0,
      y: 0.0,
      width: 0.0,
      height: 0.0,
    };
    let rect = map_box(&logits, 0, 0, &anchor(2.0, 1.0), &layout).unwrap();
    // 中心 (16, 16)，尺寸 64 x 32
    assert_eq!(rect, Rect::new(-16, 0, 64, 32));
  }

  #[test]
  fn row_maps_to_x() {
    let layout = LayoutConfig {
      row_count: 3,
      column_count: 2,
      class_count: 1,
      boxes_per_cell: 1,
      cell_width: 10,
      cell_height: 20,
    };
    let logits = BoxLogits {
      x: 0.0,
      y: 0.0,
      width: 0.0,
      height: 0.0,
    };
    let rect = map_box(&logits, 2, 1, &anchor(1.0, 1.0), &layout).unwrap();
    // center_x = (2 + 0.5) * 10 = 25, center_y = (1 + 0.5) * 20 = 30
    assert_eq!(rect, Rect::new(20, 20, 10, 20));
  }

  #[test]
  fn overflowing_size_is_reported() {
    let layout = LayoutConfig::default();
    let logits = BoxLogits {
      x: 0.0,
      y: 0.0,
      width: 200.0,
      height: 0.0,
    };
    assert!(map_box(&logits, 0, 0, &anchor(1.0, 1.0), &layout).is_err());
  }

  #[test]
  fn size_of_exactly_two_pow_31_is_reported() {
    let layout = LayoutConfig {
      row_count: 1,
      column_count: 1,
      class_count: 1,
      boxes_per_cell: 1,
      cell_width: 1,
      cell_height: 1,
    };
    let logits = BoxLogits {
      x: 0.0,
      y: 0.0,
      width: 0.0,
      height: 0.0,
    };
    let err = map_box(&logits, 0, 0, &anchor(2147483648.0, 1.0), &layout).unwrap_err();
    assert_eq!(err.width, 2147483648.0);
  }

  #[test]
  fn iou_of_identical_rect_is_one() {
    let r = Rect::new(3, 4, 10, 7);
    assert_eq!(r.iou(&r), 1.0);
  }

  #[test]
  fn iou_of_disjoint_or_touching_rects_is_zero() {
    let a = Rect::new(0, 0, 10, 10);
    assert_eq!(a.iou(&Rect::new(20, 20, 5, 5)), 0.0);
    assert_eq!(a.iou(&Rect::new(10, 0, 10, 10)), 0.0);
  }

  #[test]
  fn iou_of_degenerate_rect_is_zero() {
    let a = Rect::new(0, 0, 10, 10);
    assert_eq!(a.iou(&Rect::new(0, 0, 0, 10)), 0.0);
    assert_eq!(a.iou(&Rect::new(0, 0, -5, 10)), 0.0);
  }

  #[test]
  fn iou_of_half_overlap() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, 0, 10, 10);
    // 交 50，并 150
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(a.iou(&b), b.iou(&a));
  }
}
