// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 网格检测模型输出解码
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

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub mod anchor;
pub mod geometry;
pub mod layout;
pub mod math;
pub mod nms;
pub mod palette;
pub mod scorer;

mod decoder;
pub use self::decoder::{GRID_SCHEME, GridDecoder, GridDecoderBuilder};

use self::geometry::Rect;

pub trait Model {
  type Input: ?Sized;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

pub trait WithLabel {
  fn label_of(&self, class_index: usize) -> String;
}

/// 单个检测结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub rect: Rect,
  pub label: String,
  /// 框置信度与最高类别概率之积
  pub confidence: f32,
  pub class_index: usize,
  /// softmax 后的类别概率分布
  pub class_scores: Box<[f32]>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("布局参数 {0} 必须为正数")]
  ZeroDimension(&'static str),
  #[error("锚框数量 ({actual}) 与每个网格的框数 ({expected}) 不一致")]
  AnchorCountMismatch { expected: usize, actual: usize },
  #[error("第 {index} 个锚框必须是 (width, height) 两个值，实际为 {len} 个")]
  AnchorPairWidth { index: usize, len: usize },
  #[error("展平的锚框列表长度必须为偶数，实际为 {0}")]
  OddAnchorList(usize),
  #[error("配置项 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("检测参数无效: {0}")]
  Params(#[from] nms::ParamsError),
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: &'static str, actual: String },
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 单张图像的解码错误，不影响同批次的其它图像
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
  #[error("张量长度不匹配: 期望 {expected}, 实际 {actual}")]
  Shape { expected: usize, actual: usize },
  #[error("数值计算异常 (行 {row}, 列 {col}, 锚框 {anchor}): {what}")]
  Computation {
    row: usize,
    col: usize,
    anchor: usize,
    what: String,
  },
}

pub type ImageResult = Result<Box<[Detection]>, DecodeError>;

/// 图像标识到检测结果的映射，每张输入图像恰有一项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  entries: BTreeMap<String, ImageResult>,
}

impl FromIterator<(String, ImageResult)> for DetectionSet {
  fn from_iter<I: IntoIterator<Item = (String, ImageResult)>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().collect(),
    }
  }
}

impl DetectionSet {
  pub fn insert(&mut self, id: impl Into<String>, result: ImageResult) {
    self.entries.insert(id.into(), result);
  }

  pub fn get(&self, id: &str) -> Option<&ImageResult> {
    self.entries.get(id)
  }

  /// 成功解码的图像的检测结果
  pub fn detections(&self, id: &str) -> Option<&[Detection]> {
    match self.entries.get(id) {
      Some(Ok(items)) => Some(items),
      _ => None,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageResult)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn failures(&self) -> impl Iterator<Item = (&str, &DecodeError)> {
    self.entries.iter().filter_map(|(k, v)| match v {
      Err(e) => Some((k.as_str(), e)),
      Ok(_) => None,
    })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// 所有成功图像的检测总数
  pub fn total_detections(&self) -> usize {
    self
      .entries
      .values()
      .filter_map(|v| v.as_ref().ok())
      .map(|items| items.len())
      .sum()
  }
}
