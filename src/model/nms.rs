// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/nms.rs - 置信度过滤与非极大值抑制
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

use thiserror::Error;
use tracing::trace;

use crate::model::Detection;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.0;
pub const DEFAULT_MAX_BOXES: usize = 5;
pub const DEFAULT_MAX_OVERLAP: f32 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
  #[error("置信度阈值必须在 [0, 1] 内: {0}")]
  ConfidenceOutOfRange(f32),
  #[error("IoU 阈值必须在 [0, 1] 内: {0}")]
  OverlapOutOfRange(f32),
  #[error("每张图像的最大检测数必须为正数")]
  ZeroMaxBoxes,
}

/// 过滤与抑制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionParams {
  pub confidence_threshold: f32,
  pub max_boxes: usize,
  pub max_overlap: f32,
}

impl Default for SuppressionParams {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      max_boxes: DEFAULT_MAX_BOXES,
      max_overlap: DEFAULT_MAX_OVERLAP,
    }
  }
}

impl SuppressionParams {
  pub fn validate(&self) -> Result<(), ParamsError> {
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(ParamsError::ConfidenceOutOfRange(self.confidence_threshold));
    }
    if !(0.0..=1.0).contains(&self.max_overlap) {
      return Err(ParamsError::OverlapOutOfRange(self.max_overlap));
    }
    if self.max_boxes == 0 {
      return Err(ParamsError::ZeroMaxBoxes);
    }
    Ok(())
  }
}

/// 贪心非极大值抑制
///
/// 先按阈值过滤，再按置信度稳定降序排序；依次保留仍处于活动状态的候选框，
/// 并使其后与之 IoU 超过 `max_overlap` 的候选框失效。至多返回 `max_boxes` 个结果。
pub fn suppress(candidates: Vec<Detection>, params: &SuppressionParams) -> Vec<Detection> {
  let mut boxes: Vec<Detection> = candidates
    .into_iter()
    .filter(|d| d.confidence >= params.confidence_threshold)
    .collect();
  // sort_by 为稳定排序，同分时保持原有顺序
  boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut active = vec![true; boxes.len()];
  let mut active_count = boxes.len();
  let mut kept = Vec::new();

  for i in 0..boxes.len() {
    if active_count == 0 {
      break;
    }
    if !active[i] {
      continue;
    }
    active[i] = false;
    active_count -= 1;
    kept.push(i);
    if kept.len() >= params.max_boxes {
      break;
    }

    for j in (i + 1)..boxes.len() {
      if active[j] && boxes[i].rect.iou(&boxes[j].rect) > params.max_overlap {
        trace!("候选框 {} 被 {} 抑制", j, i);
        active[j] = false;
        active_count -= 1;
      }
    }
  }

  let mut slots: Vec<Option<Detection>> = boxes.into_iter().map(Some).collect();
  kept
    .into_iter()
    .filter_map(|i| slots[i].take())
    .collect()
}
